//! Decimal length-prefixed framing.
//!
//! Every frame on the wire is the payload length written as ASCII decimal
//! digits, a single [`DELIMITER`] byte, and then exactly that many payload
//! bytes:
//!
//! ```text
//! <ASCII decimal length>\r<payload bytes>
//! ```
//!
//! There is no terminator; the next length prefix starts immediately after the
//! payload. The same format is used in both directions.
//!
//! [`DecimalDecoder`] and [`DecimalEncoder`] implement the `tokio_util` codec
//! traits so they can drive a [`tokio_util::codec::Framed`] stream.
//! [`IncrementalDecoder`] wraps the decoder with its own reusable buffer for
//! callers that receive raw chunks from a socket and want every frame those
//! chunks complete.
//!
//! # Error Handling
//!
//! Framing errors are fatal to the stream. See the [`error`] module.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::Frame;

pub mod error;

pub use error::{CodecError, EofError, FramingError};

/// Byte separating the ASCII length prefix from the payload.
pub const DELIMITER: u8 = b'\r';

/// Minimum configurable frame length in bytes.
pub const MIN_FRAME_LENGTH: usize = 64;

/// Frame length limit used when none is configured (16 MiB).
///
/// Any larger limit up to `usize::MAX` may be configured explicitly.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

// Largest up-front reservation made for a declared payload; the buffer grows
// past this as bytes actually arrive.
const MAX_RESERVE: usize = 64 * 1024;

// Digits in `usize::MAX` on 64-bit targets; enough scratch space for any prefix.
const MAX_USIZE_DIGITS: usize = 20;

pub(crate) fn clamp_frame_length(value: usize) -> usize { value.max(MIN_FRAME_LENGTH) }

/// Number of decimal digits needed to write `value`.
fn decimal_digits(mut value: usize) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

/// Append the framed form of `payload` to `dst`.
///
/// The length prefix is the byte length of `payload`, so multi-byte UTF-8
/// text is counted in bytes rather than characters.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use tickwire::codec::encode_into;
///
/// let mut buf = BytesMut::new();
/// encode_into("héllo".as_bytes(), &mut buf);
/// assert_eq!(&buf[..], b"6\rh\xc3\xa9llo");
/// ```
pub fn encode_into(payload: &[u8], dst: &mut BytesMut) {
    let mut digits = [0u8; MAX_USIZE_DIGITS];
    let mut cursor = digits.len();
    let mut remaining = payload.len();
    loop {
        cursor -= 1;
        digits[cursor] = b"0123456789"[remaining % 10];
        remaining /= 10;
        if remaining == 0 {
            break;
        }
    }
    dst.reserve(digits.len() - cursor + 1 + payload.len());
    dst.extend_from_slice(&digits[cursor..]);
    dst.extend_from_slice(&[DELIMITER]);
    dst.extend_from_slice(payload);
}

/// Frame `payload` into a freshly allocated buffer.
///
/// # Examples
///
/// ```
/// use tickwire::codec::encode;
///
/// assert_eq!(&encode(b"abc")[..], b"3\rabc");
/// assert_eq!(&encode(b"")[..], b"0\r");
/// ```
#[must_use]
pub fn encode(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(MAX_USIZE_DIGITS + 1 + payload.len());
    encode_into(payload, &mut buf);
    buf.freeze()
}

/// Codec configuration shared by decoders and encoders.
///
/// # Examples
///
/// ```
/// use tickwire::codec::{DEFAULT_MAX_FRAME_LENGTH, DecimalFrameCodec, MIN_FRAME_LENGTH};
///
/// assert_eq!(DecimalFrameCodec::default().max_frame_length(), DEFAULT_MAX_FRAME_LENGTH);
/// assert_eq!(DecimalFrameCodec::new(1).max_frame_length(), MIN_FRAME_LENGTH);
/// assert_eq!(DecimalFrameCodec::new(usize::MAX).max_frame_length(), usize::MAX);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecimalFrameCodec {
    max_frame_length: usize,
}

impl DecimalFrameCodec {
    /// Construct a codec accepting frames up to `max_frame_length` bytes.
    ///
    /// Limits below [`MIN_FRAME_LENGTH`] are raised to it. Pass `usize::MAX`
    /// to accept any length the prefix can express.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            max_frame_length: clamp_frame_length(max_frame_length),
        }
    }

    /// Return the maximum frame length accepted by this codec.
    #[must_use]
    pub fn max_frame_length(&self) -> usize { self.max_frame_length }

    /// Longest length prefix, in digits, this codec can ever accept.
    #[must_use]
    pub fn max_prefix_len(&self) -> usize { decimal_digits(self.max_frame_length) }

    /// Create a decoder for this codec.
    #[must_use]
    pub fn decoder(&self) -> DecimalDecoder {
        DecimalDecoder {
            state: DecodeState::AwaitingLength,
            max_frame_length: self.max_frame_length,
            max_prefix_len: self.max_prefix_len(),
        }
    }

    /// Create an encoder for this codec.
    #[must_use]
    pub fn encoder(&self) -> DecimalEncoder {
        DecimalEncoder {
            max_frame_length: self.max_frame_length,
        }
    }

    /// Create a chunk-fed decoder for this codec.
    #[must_use]
    pub fn incremental_decoder(&self) -> IncrementalDecoder {
        IncrementalDecoder {
            decoder: self.decoder(),
            buffer: BytesMut::new(),
        }
    }
}

impl Default for DecimalFrameCodec {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecodeState {
    AwaitingLength,
    AwaitingPayload { declared: usize },
}

/// Stateful decoder for decimal length-prefixed frames.
///
/// The decoder consumes prefix bytes from the source buffer once the
/// delimiter has arrived and leaves payload bytes in place until the whole
/// frame is buffered, at which point the payload is split off without
/// copying.
#[derive(Debug)]
pub struct DecimalDecoder {
    state: DecodeState,
    max_frame_length: usize,
    max_prefix_len: usize,
}

impl DecimalDecoder {
    /// Declared length of the frame currently being assembled, if any.
    #[must_use]
    pub fn pending_frame_length(&self) -> Option<usize> {
        match self.state {
            DecodeState::AwaitingLength => None,
            DecodeState::AwaitingPayload { declared } => Some(declared),
        }
    }

    /// Locate and consume a complete length prefix at the start of `src`.
    ///
    /// Returns `Ok(None)` while the prefix is still arriving. Prefix bytes are
    /// left in `src` until the delimiter shows up, so a prefix split across
    /// reads is reassembled rather than rejected.
    fn take_prefix(&self, src: &mut BytesMut) -> Result<Option<usize>, FramingError> {
        let window = &src[..src.len().min(self.max_prefix_len + 1)];
        let Some(pos) = window.iter().position(|&b| b == DELIMITER) else {
            if let Some(&byte) = window.iter().find(|b| !b.is_ascii_digit()) {
                return Err(FramingError::InvalidLengthByte { byte });
            }
            if window.len() > self.max_prefix_len {
                return Err(FramingError::UnterminatedLengthPrefix {
                    len: window.len(),
                    max: self.max_prefix_len,
                });
            }
            return Ok(None);
        };

        let declared = parse_length(&window[..pos])?;
        if declared > self.max_frame_length {
            return Err(FramingError::OversizedFrame {
                size: declared,
                max: self.max_frame_length,
            });
        }
        src.advance(pos + 1);
        Ok(Some(declared))
    }
}

fn parse_length(digits: &[u8]) -> Result<usize, FramingError> {
    if digits.is_empty() {
        return Err(FramingError::EmptyLengthPrefix);
    }
    digits.iter().try_fold(0usize, |acc, &byte| {
        if !byte.is_ascii_digit() {
            return Err(FramingError::InvalidLengthByte { byte });
        }
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(usize::from(byte - b'0')))
            .ok_or(FramingError::LengthOverflow)
    })
}

impl Decoder for DecimalDecoder {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let declared = match self.state {
            DecodeState::AwaitingLength => match self.take_prefix(src)? {
                Some(declared) => {
                    self.state = DecodeState::AwaitingPayload { declared };
                    src.reserve(declared.saturating_sub(src.len()).min(MAX_RESERVE));
                    declared
                }
                None => return Ok(None),
            },
            DecodeState::AwaitingPayload { declared } => declared,
        };

        if src.len() < declared {
            return Ok(None);
        }
        self.state = DecodeState::AwaitingLength;
        Ok(Some(Frame::new(src.split_to(declared).freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        match self.state {
            DecodeState::AwaitingLength if src.is_empty() => Ok(None),
            DecodeState::AwaitingLength => Err(EofError::MidPrefix {
                bytes_received: src.len(),
            }
            .into()),
            DecodeState::AwaitingPayload { declared } => {
                tracing::debug!(
                    declared,
                    buffered = src.len(),
                    "stream ended inside a frame payload"
                );
                Err(EofError::MidFrame {
                    bytes_received: src.len(),
                    expected: declared,
                }
                .into())
            }
        }
    }
}

/// Encoder writing decimal length-prefixed frames.
#[derive(Clone, Copy, Debug)]
pub struct DecimalEncoder {
    max_frame_length: usize,
}

impl Encoder<Bytes> for DecimalEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&[u8]>>::encode(self, item.as_ref(), dst)
    }
}

impl Encoder<&[u8]> for DecimalEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_length {
            return Err(FramingError::OversizedFrame {
                size: item.len(),
                max: self.max_frame_length,
            }
            .into());
        }
        encode_into(item, dst);
        Ok(())
    }
}

/// Chunk-fed decoder owning its reassembly buffer.
///
/// Feed raw reads with [`decode`](Self::decode); each call returns every
/// frame completed so far, in stream order, and keeps any partial prefix or
/// payload buffered for the next call. Splitting a byte stream into chunks at
/// any boundaries yields the same frames as feeding it whole.
///
/// # Examples
///
/// ```
/// use tickwire::codec::DecimalFrameCodec;
///
/// let mut decoder = DecimalFrameCodec::default().incremental_decoder();
/// assert!(decoder.decode(b"1").expect("partial prefix").is_empty());
/// let frames = decoder.decode(b"1\rhello world3\rab").expect("valid frames");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].payload(), b"hello world");
/// assert_eq!(decoder.remaining(), Some(1));
/// ```
#[derive(Debug)]
pub struct IncrementalDecoder {
    decoder: DecimalDecoder,
    buffer: BytesMut,
}

impl IncrementalDecoder {
    /// Append `chunk` and return every frame it completes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Framing`] if the buffered prefix can never form a
    /// valid length. The decoder must not be fed further input after an
    /// error; the stream is misaligned.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, CodecError> {
        let mut frames = Vec::new();
        self.decode_into(chunk, &mut frames)?;
        Ok(frames)
    }

    /// Append `chunk` and push every frame it completes onto `out`.
    ///
    /// Frames completed before a framing error are still pushed, so a caller
    /// can deliver them before tearing the stream down.
    ///
    /// # Errors
    ///
    /// As for [`decode`](Self::decode).
    pub fn decode_into(&mut self, chunk: &[u8], out: &mut Vec<Frame>) -> Result<(), CodecError> {
        self.buffer.extend_from_slice(chunk);
        while let Some(frame) = self.decoder.decode(&mut self.buffer)? {
            out.push(frame);
        }
        Ok(())
    }

    /// Payload bytes still missing from the frame being assembled.
    ///
    /// `None` while waiting for a length prefix. Buffered payload bytes plus
    /// the remaining count always equal the declared length.
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        self.decoder
            .pending_frame_length()
            .map(|declared| declared.saturating_sub(self.buffer.len()))
    }

    /// Number of bytes buffered but not yet emitted as frames.
    #[must_use]
    pub fn buffered(&self) -> usize { self.buffer.len() }

    /// Classify how the stream ended.
    ///
    /// Returns [`EofError::CleanClose`] when the stream stopped at a frame
    /// boundary, and [`EofError::MidPrefix`] or [`EofError::MidFrame`] when
    /// it stopped inside a frame.
    #[must_use]
    pub fn finish(&mut self) -> CodecError {
        match self.decoder.decode_eof(&mut self.buffer) {
            Ok(_) => EofError::CleanClose.into(),
            Err(err) => err,
        }
    }
}
