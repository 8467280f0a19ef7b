use std::{io::ErrorKind, net::UdpSocket};

use crate::transport::{Transport, TransportError};

/// A connected datagram socket to the forwarder. Each packet travels as
/// one datagram.
pub struct UdpTransport {
    local_addr: String,
    remote_addr: String,
    socket: Option<UdpSocket>,
}

impl UdpTransport {
    pub fn new(local_addr: impl Into<String>, remote_addr: impl Into<String>) -> Self {
        Self {
            local_addr: local_addr.into(),
            remote_addr: remote_addr.into(),
            socket: None,
        }
    }
}

impl Transport for UdpTransport {
    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = UdpSocket::bind(&self.local_addr)
            .and_then(|socket| {
                socket.connect(&self.remote_addr)?;
                socket.set_nonblocking(true)?;
                Ok(socket)
            })
            .map_err(|err| {
                log::warn!(
                    "udp bind {} / connect {} failed: {err}",
                    self.local_addr,
                    self.remote_addr
                );
                TransportError::ConnectFailed
            })?;
        log::debug!("udp transport connected to {}", self.remote_addr);
        self.socket = Some(socket);
        Ok(())
    }

    fn try_send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket.take().ok_or(TransportError::NotConnected)?;
        loop {
            match socket.send(packet) {
                Ok(n) if n == packet.len() => break,
                Ok(_) => return Err(TransportError::Disconnected),
                Err(err) if err.kind() == ErrorKind::WouldBlock => super::idle_wait(1),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    log::warn!("udp send failed: {err}");
                    return Err(TransportError::Disconnected);
                }
            }
        }
        self.socket = Some(socket);
        Ok(())
    }

    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        match socket.recv(dst) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            // Transient when the forwarder is not up yet.
            Err(err) if err.kind() == ErrorKind::ConnectionRefused => Ok(0),
            Err(err) => {
                log::warn!("udp receive failed: {err}");
                self.socket = None;
                Err(TransportError::Disconnected)
            }
        }
    }

    fn wait_readable(&mut self, max_wait_ms: u64) {
        #[cfg(all(feature = "poller", unix))]
        if let Some(socket) = &self.socket {
            use std::os::fd::AsFd;
            super::wait_readable_fd(socket.as_fd(), max_wait_ms);
            return;
        }
        super::idle_wait(max_wait_ms);
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            log::debug!("udp transport to {} closed", self.remote_addr);
        }
    }
}
