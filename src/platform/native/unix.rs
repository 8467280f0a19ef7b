use std::{
    io::{ErrorKind, Read, Write},
    net::Shutdown,
    os::unix::net::UnixStream,
};

use crate::transport::{Transport, TransportError};

/// A stream connection to the forwarder's Unix socket.
pub struct UnixTransport {
    path: String,
    stream: Option<UnixStream>,
}

impl UnixTransport {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stream: None,
        }
    }
}

impl Transport for UnixTransport {
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = UnixStream::connect(&self.path).map_err(|err| {
            log::warn!("unix connect to {} failed: {err}", self.path);
            TransportError::ConnectFailed
        })?;
        stream
            .set_nonblocking(true)
            .map_err(|_| TransportError::ConnectFailed)?;
        log::debug!("unix transport connected to {}", self.path);
        self.stream = Some(stream);
        Ok(())
    }

    fn try_send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        let mut stream = self.stream.take().ok_or(TransportError::NotConnected)?;
        let mut sent = 0;
        while sent < packet.len() {
            match stream.write(&packet[sent..]) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => sent += n,
                Err(err) if err.kind() == ErrorKind::WouldBlock => super::idle_wait(1),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    log::warn!("unix send failed: {err}");
                    return Err(TransportError::Disconnected);
                }
            }
        }
        self.stream = Some(stream);
        Ok(())
    }

    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        match stream.read(dst) {
            Ok(0) => {
                log::debug!("unix peer closed the connection");
                self.stream = None;
                Err(TransportError::Disconnected)
            }
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => {
                log::warn!("unix receive failed: {err}");
                self.stream = None;
                Err(TransportError::Disconnected)
            }
        }
    }

    fn wait_readable(&mut self, max_wait_ms: u64) {
        #[cfg(feature = "poller")]
        if let Some(stream) = &self.stream {
            use std::os::fd::AsFd;
            super::wait_readable_fd(stream.as_fd(), max_wait_ms);
            return;
        }
        super::idle_wait(max_wait_ms);
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            log::debug!("unix transport to {} closed", self.path);
        }
    }
}
