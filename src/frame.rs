//! Complete frames produced by the decoder.

use std::string::FromUtf8Error;

use bytes::Bytes;

/// One fully assembled frame payload.
///
/// A `Frame` only exists once every byte its length prefix declared has
/// arrived; partial payloads stay inside the decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Wrap a complete payload.
    #[must_use]
    pub fn new(payload: Bytes) -> Self { Self { payload } }

    /// Borrow the payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.payload.len() }

    /// Returns `true` for a zero-length frame.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.payload.is_empty() }

    /// Consume the frame, returning the payload without copying.
    #[must_use]
    pub fn into_bytes(self) -> Bytes { self.payload }

    /// Consume the frame, returning its payload as a message string.
    ///
    /// # Errors
    ///
    /// Returns [`FromUtf8Error`] if the payload is not valid UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use tickwire::frame::Frame;
    ///
    /// let frame = Frame::new(Bytes::from_static(b"{\"type\":\"ping\"}"));
    /// assert_eq!(frame.into_message().expect("utf-8"), "{\"type\":\"ping\"}");
    /// ```
    pub fn into_message(self) -> Result<String, FromUtf8Error> {
        String::from_utf8(Vec::from(self.payload))
    }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self { Self::new(payload) }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] { &self.payload }
}
