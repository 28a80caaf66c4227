//! Metric helpers for `tickwire`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open connections.
pub const CONNECTIONS_ACTIVE: &str = "tickwire_connections_active";
/// Name of the counter tracking frames moved across the wire.
pub const FRAMES_TOTAL: &str = "tickwire_frames_total";
/// Name of the counter tracking connections that ended in failure.
pub const ERRORS_TOTAL: &str = "tickwire_errors_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames decoded from the peer.
    Inbound,
    /// Frames written to the peer.
    Outbound,
}

impl Direction {
    /// Label value used for the `direction` label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the active connections gauge.
#[cfg(feature = "metrics")]
pub fn inc_connections() { gauge!(CONNECTIONS_ACTIVE).increment(1.0); }

/// Decrement the active connections gauge.
#[cfg(feature = "metrics")]
pub fn dec_connections() { gauge!(CONNECTIONS_ACTIVE).decrement(1.0); }

/// Record `count` frames for the given direction.
#[cfg(feature = "metrics")]
pub fn inc_frames(direction: Direction, count: usize) {
    counter!(FRAMES_TOTAL, "direction" => direction.as_str())
        .increment(u64::try_from(count).unwrap_or(u64::MAX));
}

/// Record a connection failure, labelled with the error category.
#[cfg(feature = "metrics")]
pub fn inc_errors(kind: &'static str) { counter!(ERRORS_TOTAL, "kind" => kind).increment(1); }

#[cfg(not(feature = "metrics"))]
pub fn inc_connections() {}

#[cfg(not(feature = "metrics"))]
pub fn dec_connections() {}

#[cfg(not(feature = "metrics"))]
pub fn inc_frames(_direction: Direction, _count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn inc_errors(_kind: &'static str) {}

/// RAII guard holding one slot of [`CONNECTIONS_ACTIVE`].
pub(crate) struct ActiveConnection;

impl ActiveConnection {
    pub(crate) fn new() -> Self {
        inc_connections();
        Self
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) { dec_connections(); }
}
