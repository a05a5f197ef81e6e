//! SSAP message definitions.
//!
//! Every frame on the socket is a JSON text message. Outgoing frames are
//! [`CommandEnvelope`]s; everything the television sends back is parsed into
//! a [`ResponseEnvelope`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Scheme prefix for every endpoint URI.
pub const SSAP_SCHEME: &str = "ssap://";

/// Response type sent once the device accepted the client key.
pub const RESPONSE_REGISTERED: &str = "registered";

/// Response type for ordinary replies (including the pairing prompt notice).
pub const RESPONSE_RESPONSE: &str = "response";

/// Response type for rejected requests.
pub const RESPONSE_ERROR: &str = "error";

/// Pairing type announced when the television shows an on-screen prompt.
pub const PAIRING_TYPE_PROMPT: &str = "PROMPT";

/// Kind of an outgoing message, serialized into the envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Registration handshake.
    Register,
    /// Request that is answered with exactly one reply.
    Request,
    /// Fire-and-forget command; no reply is read.
    Button,
}

impl MessageKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Register => "register",
            MessageKind::Request => "request",
            MessageKind::Button => "button",
        }
    }

    /// Whether the sender must wait for a reply after dispatching.
    pub fn expects_reply(&self) -> bool {
        matches!(self, MessageKind::Request)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the `ssap://` URI for an endpoint.
pub fn ssap_uri(endpoint: &str) -> String {
    format!("{}{}", SSAP_SCHEME, endpoint)
}

/// Formats a correlation id as `<kind>_<counter>`.
pub fn correlation_id(kind: MessageKind, counter: u64) -> String {
    format!("{}_{}", kind, counter)
}

/// An outgoing command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Correlation id, `<kind>_<counter>`.
    pub id: String,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Target endpoint, `ssap://<endpoint>`.
    pub uri: String,
    /// Endpoint-specific payload; `{}` when the endpoint takes no arguments.
    pub payload: Value,
}

impl CommandEnvelope {
    /// Creates an envelope for `endpoint` using `counter` as correlation value.
    ///
    /// A missing payload becomes an empty JSON object.
    pub fn new(kind: MessageKind, counter: u64, endpoint: &str, payload: Option<Value>) -> Self {
        Self {
            id: correlation_id(kind, counter),
            kind,
            uri: ssap_uri(endpoint),
            payload: payload.unwrap_or_else(|| Value::Object(Map::new())),
        }
    }

    /// Returns the counter embedded in the correlation id.
    pub fn counter(&self) -> Option<u64> {
        self.id.rsplit_once('_')?.1.parse().ok()
    }

    /// Returns the endpoint without the `ssap://` prefix.
    pub fn endpoint(&self) -> &str {
        self.uri.strip_prefix(SSAP_SCHEME).unwrap_or(&self.uri)
    }

    /// Serializes the envelope to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A frame received from the television.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Response type (`response`, `registered`, `error`, ...).
    #[serde(rename = "type")]
    pub response_type: String,
    /// Correlation id echoed by the device, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Nested payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Error description on `error` replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ResponseEnvelope {
    /// Parses a frame from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// True when the device confirmed registration.
    pub fn is_registered(&self) -> bool {
        self.response_type == RESPONSE_REGISTERED
    }

    /// True when the device rejected the request.
    pub fn is_error(&self) -> bool {
        self.response_type == RESPONSE_ERROR
    }

    /// Returns a payload field by name.
    pub fn payload_field(&self, name: &str) -> Option<&Value> {
        self.payload.as_ref()?.get(name)
    }

    /// The `pairingType` announced in a handshake reply.
    pub fn pairing_type(&self) -> Option<&str> {
        self.payload_field("pairingType")?.as_str()
    }

    /// True when the device is showing the pairing prompt to the user.
    pub fn is_pairing_prompt(&self) -> bool {
        self.response_type == RESPONSE_RESPONSE && self.pairing_type() == Some(PAIRING_TYPE_PROMPT)
    }

    /// The key issued in a `registered` reply.
    pub fn client_key(&self) -> Option<&str> {
        self.payload_field("client-key")?.as_str()
    }

    /// Human-readable error text of an `error` reply.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => format!("device replied with type {:?}", self.response_type),
        }
    }
}
