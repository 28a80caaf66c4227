//! Error types for the codec layer.
//!
//! The taxonomy separates framing errors (the length prefix or declared size
//! cannot be trusted), payload errors (a complete frame carried bytes that are
//! not UTF-8 text), EOF conditions, and transport I/O errors.
//!
//! Every framing error leaves the byte stream misaligned, so the connection
//! that produced it cannot continue. [`CodecError::is_malformed`] identifies
//! the errors that report a malformed frame to the connection state.

use std::{io, string::FromUtf8Error};

use thiserror::Error;

/// Framing-level errors raised while locating frame boundaries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The delimiter arrived before any length digits.
    #[error("empty length prefix")]
    EmptyLengthPrefix,

    /// A byte other than an ASCII digit appeared in the length prefix.
    #[error("invalid byte {byte:#04x} in length prefix")]
    InvalidLengthByte {
        /// The offending byte.
        byte: u8,
    },

    /// More prefix digits arrived than any accepted length could need.
    #[error("length prefix of {len} bytes has no delimiter (max {max} digits)")]
    UnterminatedLengthPrefix {
        /// Prefix bytes buffered without a delimiter.
        len: usize,
        /// Longest prefix the decoder accepts.
        max: usize,
    },

    /// The declared length does not fit in `usize`.
    #[error("length prefix overflows")]
    LengthOverflow,

    /// The declared or encoded length exceeds the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Size declared by the prefix or carried by the payload.
        size: usize,
        /// Maximum allowed frame size.
        max: usize,
    },
}

/// EOF conditions distinguishing clean closure from truncation.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// The peer closed the stream at a frame boundary.
    #[error("connection closed cleanly at frame boundary")]
    CleanClose,

    /// The stream ended while the length prefix was still being read.
    #[error("premature EOF during length prefix: {bytes_received} bytes buffered")]
    MidPrefix {
        /// Prefix bytes received before EOF.
        bytes_received: usize,
    },

    /// The stream ended part way through a payload.
    #[error("premature EOF: {bytes_received} bytes of {expected} byte frame received")]
    MidFrame {
        /// Payload bytes received before EOF.
        bytes_received: usize,
        /// Length declared by the prefix.
        expected: usize,
    },
}

/// Top-level codec error.
///
/// # Examples
///
/// ```
/// use tickwire::codec::{CodecError, FramingError};
///
/// let err = CodecError::Framing(FramingError::EmptyLengthPrefix);
/// assert!(err.is_malformed());
/// assert_eq!(err.error_type(), "framing");
/// ```
#[derive(Debug, Error)]
pub enum CodecError {
    /// Wire-level framing error.
    #[error("malformed frame: {0}")]
    Framing(#[from] FramingError),

    /// A complete frame carried a payload that is not valid UTF-8.
    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// Transport layer I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// End-of-stream handling.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),
}

impl CodecError {
    /// Returns `true` when the byte stream can no longer be parsed.
    ///
    /// Framing errors and undecodable payloads both count: the former
    /// misalign the stream, the latter break the text contract of a message.
    #[must_use]
    pub fn is_malformed(&self) -> bool { matches!(self, Self::Framing(_) | Self::InvalidUtf8(_)) }

    /// Returns `true` if this error represents a clean connection close.
    #[must_use]
    pub fn is_clean_close(&self) -> bool { matches!(self, Self::Eof(EofError::CleanClose)) }

    /// Returns the error category as a string for logging and metrics.
    ///
    /// One of `"framing"`, `"utf8"`, `"io"`, or `"eof"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Framing(_) => "framing",
            Self::InvalidUtf8(_) => "utf8",
            Self::Io(_) => "io",
            Self::Eof(_) => "eof",
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            CodecError::Framing(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            CodecError::InvalidUtf8(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            CodecError::Eof(e) => io::Error::new(io::ErrorKind::UnexpectedEof, e),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
