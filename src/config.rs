//! Connection configuration.

use std::time::Duration;

use crate::codec::{DEFAULT_MAX_FRAME_LENGTH, clamp_frame_length};

/// Default bound on establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on each readiness wait in the I/O loop.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(1);
/// Default number of bytes requested per socket read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// Settings applied when a [`crate::Connection`] is established.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tickwire::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .readiness_timeout(Duration::from_millis(250))
///     .read_chunk_size(4096);
/// assert_eq!(config.readiness_timeout_value(), Duration::from_millis(250));
/// assert_eq!(config.read_chunk_size_value(), 4096);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    connect_timeout: Duration,
    readiness_timeout: Duration,
    read_chunk_size: usize,
    max_frame_length: usize,
    nodelay: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            nodelay: true,
        }
    }
}

impl ConnectionConfig {
    /// Bound the time spent resolving and connecting.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound each readiness wait so the loop re-checks its write interest and
    /// shutdown signal even when the socket is idle.
    ///
    /// Zero is replaced with one millisecond.
    #[must_use]
    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Set the number of bytes requested per read. Zero is treated as one.
    #[must_use]
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Set the largest frame accepted or sent.
    ///
    /// Values below [`crate::codec::MIN_FRAME_LENGTH`] are raised to it;
    /// `usize::MAX` removes the limit.
    #[must_use]
    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.max_frame_length = clamp_frame_length(length);
        self
    }

    /// Configure `TCP_NODELAY` on the connected socket.
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Configured connect timeout.
    #[must_use]
    pub fn connect_timeout_value(&self) -> Duration { self.connect_timeout }

    /// Configured readiness timeout.
    #[must_use]
    pub fn readiness_timeout_value(&self) -> Duration { self.readiness_timeout }

    /// Configured read chunk size.
    #[must_use]
    pub fn read_chunk_size_value(&self) -> usize { self.read_chunk_size }

    /// Configured maximum frame length.
    #[must_use]
    pub fn max_frame_length_value(&self) -> usize { self.max_frame_length }

    /// Whether `TCP_NODELAY` is requested.
    #[must_use]
    pub fn nodelay_value(&self) -> bool { self.nodelay }
}
