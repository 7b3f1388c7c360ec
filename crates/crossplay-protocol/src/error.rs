//! Error types for the protocol layer.
//!
//! Each crate in Crossplay defines its own error enum. A `ProtocolError`
//! always means the problem is in turning messages into text or back,
//! never in networking or the world store.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into text).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning text into a message).
    ///
    /// Common causes: malformed JSON, a required field is missing, or a
    /// field has the wrong type (`"radius": "two"`).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The inbound object carries no `type` tag, so it cannot be routed.
    #[error("message has no \"type\" field")]
    MissingType,
}

impl ProtocolError {
    /// `true` for errors caused by malformed inbound text.
    ///
    /// The dispatcher logs these and keeps the connection open.
    pub fn is_decode(&self) -> bool {
        match self {
            #[cfg(feature = "json")]
            Self::Decode(_) => true,
            Self::MissingType => true,
            #[cfg(feature = "json")]
            Self::Encode(_) => false,
        }
    }
}
