use std::{
    io::{ErrorKind, Read, Write},
    net::{Shutdown, TcpStream},
};

use crate::transport::{Transport, TransportError};

/// A stream connection to the forwarder's TCP listener. Any send or
/// receive failure drops the stream; a later `connect` starts over.
pub struct TcpTransport {
    addr: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
        }
    }
}

impl Transport for TcpTransport {
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = TcpStream::connect(&self.addr).map_err(|err| {
            log::warn!("tcp connect to {} failed: {err}", self.addr);
            TransportError::ConnectFailed
        })?;
        stream.set_nodelay(true).ok();
        stream
            .set_nonblocking(true)
            .map_err(|_| TransportError::ConnectFailed)?;
        log::debug!("tcp transport connected to {}", self.addr);
        self.stream = Some(stream);
        Ok(())
    }

    fn try_send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        // Taken out so a failed send drops the broken stream.
        let mut stream = self.stream.take().ok_or(TransportError::NotConnected)?;
        let mut sent = 0;
        while sent < packet.len() {
            match stream.write(&packet[sent..]) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => sent += n,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    // Brief backpressure; the forwarder drains quickly.
                    super::idle_wait(1);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    log::warn!("tcp send failed: {err}");
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
                log::debug!("tcp peer closed the connection");
                self.stream = None;
                Err(TransportError::Disconnected)
            }
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => {
                log::warn!("tcp receive failed: {err}");
                self.stream = None;
                Err(TransportError::Disconnected)
            }
        }
    }

    fn wait_readable(&mut self, max_wait_ms: u64) {
        #[cfg(all(feature = "poller", unix))]
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
            log::debug!("tcp transport to {} closed", self.addr);
        }
    }
}
