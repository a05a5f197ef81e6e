//! # webOS Remote Protocol Library
//!
//! Wire-level definitions for talking to an LG webOS television over its
//! SSAP WebSocket interface. This crate does no I/O.
//!
//! ## Overview
//!
//! - **Messages**: outgoing [`CommandEnvelope`]s and incoming [`ResponseEnvelope`]s
//! - **Handshake**: the bundled registration frame and client-key patching
//! - **Endpoints**: the `ssap://` endpoint catalog
//! - **Operations**: the table mapping each remote-control operation to an
//!   endpoint, a message kind and a result projection
//!
//! ## Exchange
//!
//! ```text
//! client                                   television
//!   │ ── register {client-key} ───────────────▶ │
//!   │ ◀──────────── response {pairingType: PROMPT} (first pairing only)
//!   │ ◀──────────── registered {client-key}     │
//!   │ ── request {id, uri, payload} ──────────▶ │
//!   │ ◀──────────── response {id, payload}      │
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{operations, CommandEnvelope};
//!
//! let op = operations::GET_VOLUME;
//! let envelope = CommandEnvelope::new(op.kind, 1, op.endpoint, None);
//! assert_eq!(envelope.uri, "ssap://audio/getVolume");
//! assert_eq!(envelope.id, "request_1");
//! assert_eq!(op.project(None), serde_json::json!(0));
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: envelope types
//! - [`handshake`]: registration template
//! - [`endpoints`]: endpoint names
//! - [`operations`]: operation table and projection
//! - [`error`]: error types

pub mod endpoints;
pub mod error;
pub mod handshake;
pub mod messages;
pub mod operations;

pub use error::{ProtocolError, Result};
pub use messages::{
    correlation_id, ssap_uri, CommandEnvelope, MessageKind, ResponseEnvelope,
    PAIRING_TYPE_PROMPT, RESPONSE_ERROR, RESPONSE_REGISTERED, RESPONSE_RESPONSE, SSAP_SCHEME,
};
pub use operations::{Fallback, Operation, PayloadRule, Projection, OPERATIONS};
