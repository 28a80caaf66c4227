//! Byte-level builders for expected wire content.

use tickwire::{codec, envelope::Registration};

/// Frame a single payload as `<len>\r<payload>`.
#[must_use]
pub fn frame(payload: &str) -> Vec<u8> { codec::encode(payload.as_bytes()).to_vec() }

/// Concatenate the framed form of every payload.
#[must_use]
pub fn frames(payloads: &[&str]) -> Vec<u8> {
    payloads.iter().flat_map(|payload| frame(payload)).collect()
}

/// Registration text a connection announcing `identifier` sends first.
///
/// # Panics
///
/// Panics if the registration record cannot be serialized.
#[must_use]
pub fn registration(identifier: &str) -> String {
    Registration::new(identifier)
        .to_json()
        .expect("registration serializes")
}
