//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" (coder/decoder) converts between Rust types and the text
//! frames that travel over the live connection. The rest of the server
//! only needs something that implements [`Codec`]; [`JsonCodec`] is the
//! implementation the web map client speaks.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{InboundMessage, ProtocolError};

/// A codec that can encode Rust types to text and decode text back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → shared by the connection tasks, the periodic update
///   tasks and the event bridge, which may all run on different threads.
/// - `'static` → the codec owns everything it needs, so it can live inside
///   the long-lived hub.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the text is malformed or doesn't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;

    /// Decodes an inbound client request.
    ///
    /// The `type` tag is read first. A missing tag is an error; a tag that
    /// names no known request becomes [`InboundMessage::Unrecognized`] so
    /// the caller can log it and move on. Known tags are then decoded in
    /// full, and any malformed field fails the whole message.
    fn decode_inbound(&self, text: &str) -> Result<InboundMessage, ProtocolError> {
        let tag: TypeTag = self.decode(text)?;
        let Some(kind) = tag.kind else {
            return Err(ProtocolError::MissingType);
        };
        if InboundMessage::is_known_tag(&kind) {
            self.decode(text)
        } else {
            Ok(InboundMessage::Unrecognized { tag: kind })
        }
    }
}

/// Just the routing tag of an inbound object; every other field is ignored.
#[derive(Deserialize)]
struct TypeTag {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use crossplay_protocol::{Codec, InboundMessage, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg = codec
///     .decode_inbound(r#"{"type":"subscribe_chunks","centerX":0,"centerZ":0,"radius":2}"#)
///     .unwrap();
/// assert_eq!(
///     msg,
///     InboundMessage::SubscribeChunks { center_x: 0, center_z: 0, radius: 2 }
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
