//! Registration handshake template.
//!
//! The registration frame is vendor-defined: a signed manifest plus the list
//! of permissions the client asks for. It is bundled verbatim and only the
//! `payload.client-key` field is rewritten before each connection.

use serde_json::Value;

use crate::error::{ProtocolError, Result};

/// The bundled registration frame.
pub const HANDSHAKE_TEMPLATE: &str = include_str!("handshake.json");

/// Field patched with the stored authorization key.
pub const CLIENT_KEY_FIELD: &str = "client-key";

/// Parses the bundled template.
pub fn load_template() -> Result<Value> {
    serde_json::from_str(HANDSHAKE_TEMPLATE)
        .map_err(|e| ProtocolError::Serialization(format!("invalid handshake template: {}", e)))
}

/// Sets `payload.client-key` on a parsed template.
///
/// `None` writes JSON `null`, which makes the device start the pairing prompt.
pub fn patch_client_key(template: &mut Value, client_key: Option<&str>) -> Result<()> {
    let payload = template
        .get_mut("payload")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            ProtocolError::Serialization("handshake template has no payload object".to_string())
        })?;

    let key = client_key.map_or(Value::Null, |k| Value::String(k.to_string()));
    payload.insert(CLIENT_KEY_FIELD.to_string(), key);
    Ok(())
}

/// Builds the registration frame text for the given key.
pub fn registration_message(client_key: Option<&str>) -> Result<String> {
    let mut handshake = load_template()?;
    patch_client_key(&mut handshake, client_key)?;
    Ok(serde_json::to_string(&handshake)?)
}
