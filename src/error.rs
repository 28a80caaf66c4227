//! Error types surfaced by connections and their I/O loops.

use std::{io, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::{codec::CodecError, state::ConnectionState};

/// Errors raised while establishing a connection.
///
/// No attempt is retried; the caller decides whether to connect again.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Host name resolution failed.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        /// Host that was looked up.
        host: String,
        /// Port that was looked up.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no addresses.
    #[error("{host}:{port} resolved to no addresses")]
    NoAddresses {
        /// Host that was looked up.
        host: String,
        /// Port that was looked up.
        port: u16,
    },
    /// Every resolved address refused or failed the connection.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Last address attempted.
        addr: SocketAddr,
        /// Error from the final attempt.
        #[source]
        source: io::Error,
    },
    /// Establishment did not finish within the configured timeout.
    #[error("timed out connecting to {host}:{port} after {timeout:?}")]
    Timeout {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// Applying socket options failed.
    #[error("failed to configure socket: {0}")]
    Socket(#[source] io::Error),
    /// The registration message could not be serialized.
    #[error("failed to encode registration message")]
    Registration(#[from] serde_json::Error),
}

/// Errors returned by [`crate::Connection::send`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The connection was closed locally or by the peer.
    #[error("connection closed")]
    Closed,
    /// The connection's I/O loop stopped on an error.
    #[error("connection failed")]
    Failed,
    /// The message exceeds the configured maximum frame length.
    #[error("message of {size} bytes exceeds maximum frame length {max}")]
    Oversized {
        /// Encoded payload size in bytes.
        size: usize,
        /// Configured maximum frame length.
        max: usize,
    },
}

impl SendError {
    pub(crate) fn for_state(state: ConnectionState) -> Option<Self> {
        match state {
            ConnectionState::Closed => Some(Self::Closed),
            ConnectionState::Failed => Some(Self::Failed),
            ConnectionState::Disconnected
            | ConnectionState::Connecting
            | ConnectionState::Connected => None,
        }
    }
}

/// Reasons an I/O loop stops.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the stream at a frame boundary.
    #[error("connection closed by peer")]
    PeerClosed,
    /// Decoding or encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A socket operation failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Cloneable summary of why a connection entered `Failed`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FailureReason {
    /// The inbound stream could not be parsed.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// The peer closed the stream part way through a frame.
    #[error("stream truncated: {0}")]
    Truncated(String),
    /// A socket operation failed.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// Kind of the underlying error.
        kind: io::ErrorKind,
        /// Display text of the underlying error.
        message: String,
    },
}

impl From<&TransportError> for FailureReason {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Codec(codec) if codec.is_malformed() => {
                Self::MalformedFrame(codec.to_string())
            }
            TransportError::Codec(CodecError::Eof(eof)) => Self::Truncated(eof.to_string()),
            TransportError::Codec(CodecError::Io(io)) | TransportError::Io(io) => Self::Io {
                kind: io.kind(),
                message: io.to_string(),
            },
            TransportError::Codec(other) => Self::Io {
                kind: io::ErrorKind::InvalidData,
                message: other.to_string(),
            },
            TransportError::PeerClosed => Self::Io {
                kind: io::ErrorKind::UnexpectedEof,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::codec::{EofError, FramingError};

    #[test]
    fn malformed_codec_errors_map_to_malformed_frame() {
        let err = TransportError::from(CodecError::Framing(FramingError::EmptyLengthPrefix));
        assert!(matches!(
            FailureReason::from(&err),
            FailureReason::MalformedFrame(msg) if msg.contains("empty length prefix")
        ));
    }

    #[test]
    fn eof_errors_map_to_truncated() {
        let err = TransportError::from(CodecError::Eof(EofError::MidFrame {
            bytes_received: 1,
            expected: 4,
        }));
        assert!(matches!(FailureReason::from(&err), FailureReason::Truncated(_)));
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err = TransportError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(
            FailureReason::from(&err),
            FailureReason::Io {
                kind: io::ErrorKind::ConnectionReset,
                ..
            }
        ));
    }

    #[rstest]
    #[case(ConnectionState::Closed, Some(SendError::Closed))]
    #[case(ConnectionState::Failed, Some(SendError::Failed))]
    #[case(ConnectionState::Connected, None)]
    fn send_error_follows_state(#[case] state: ConnectionState, #[case] expected: Option<SendError>) {
        assert_eq!(SendError::for_state(state), expected);
    }
}
