use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The connection attempt failed.
    ConnectFailed,
    /// The peer closed the connection or it broke mid-use.
    Disconnected,
    /// An operation was attempted before `connect`.
    NotConnected,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectFailed => f.write_str("connection attempt failed"),
            TransportError::Disconnected => f.write_str("connection lost"),
            TransportError::NotConnected => f.write_str("not connected"),
        }
    }
}

/// One connection to the local forwarder.
///
/// Implementations are non-blocking: `try_send` either ships the whole
/// packet or fails, `try_recv` returns 0 when nothing is ready, and
/// `wait_readable` is the only place the event loop is allowed to rest.
pub trait Transport {
    fn is_connected(&self) -> bool;

    /// Establishes the connection. A no-op once connected.
    fn connect(&mut self) -> Result<(), TransportError>;

    fn try_send(&mut self, packet: &[u8]) -> Result<(), TransportError>;

    /// Copies available bytes into `dst`, returning how many were read.
    /// Returns `Ok(0)` when the peer has nothing for us right now.
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError>;

    /// Blocks until the connection is likely readable, or until roughly
    /// `max_wait_ms` elapsed, whichever comes first. Spurious wakeups
    /// are fine.
    fn wait_readable(&mut self, max_wait_ms: u64);

    fn close(&mut self);
}
