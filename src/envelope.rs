//! JSON records exchanged above the transport.
//!
//! The transport itself treats every payload as opaque text. These types
//! build the registration record sent during the handshake and offer a helper
//! for the routed message envelope that peers commonly exchange afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// First record sent on every connection, naming this endpoint.
///
/// # Examples
///
/// ```
/// use tickwire::envelope::Registration;
///
/// let json = Registration::new("unity-01").to_json().expect("serializable");
/// assert_eq!(json, r#"{"type":"registration","value":"unity-01"}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "registration")]
pub struct Registration {
    /// Endpoint identifier announced to the peer.
    pub value: String,
}

impl Registration {
    /// Build a registration for `identifier`.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            value: identifier.into(),
        }
    }

    /// Serialize to the JSON text carried in the registration frame.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string(self) }
}

/// Routed message between named endpoints.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tickwire::envelope::Envelope;
///
/// let outgoing = Envelope::new("display", "sensor", json!({"temp": 21}));
/// let text = outgoing.to_json().expect("serializable");
/// let incoming = Envelope::from_json(&text).expect("valid envelope");
/// assert_eq!(incoming.to, "display");
/// assert_eq!(incoming.data["temp"], 21);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "message")]
pub struct Envelope {
    /// Identifier of the receiving endpoint.
    pub to: String,
    /// Identifier of the sending endpoint.
    pub from: String,
    /// Arbitrary JSON body.
    pub data: Value,
}

impl Envelope {
    /// Build an envelope addressed from `from` to `to`.
    #[must_use]
    pub fn new(to: impl Into<String>, from: impl Into<String>, data: Value) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            data,
        }
    }

    /// Parse an envelope from message text.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if `text` is not a message envelope.
    pub fn from_json(text: &str) -> serde_json::Result<Self> { serde_json::from_str(text) }

    /// Serialize to message text.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string(self) }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn registration_escapes_identifier() {
        let json = Registration::new("a\"b").to_json().expect("serializable");
        assert_eq!(json, r#"{"type":"registration","value":"a\"b"}"#);
    }

    #[test]
    fn envelope_rejects_other_record_types() {
        let text = r#"{"type":"registration","value":"x"}"#;
        assert!(Envelope::from_json(text).is_err());
    }

    #[test]
    fn envelope_serializes_type_tag_first() {
        let text = Envelope::new("b", "a", json!("hi"))
            .to_json()
            .expect("serializable");
        assert_eq!(text, r#"{"type":"message","to":"b","from":"a","data":"hi"}"#);
    }
}
