//! Network module for talking to the television.
//!
//! - [`websocket`]: the plaintext WebSocket transport
//! - [`session`]: one connect → register → dispatch → close round trip

pub mod session;
pub mod websocket;

use std::future::Future;
use std::pin::Pin;

use protocol::error::Result;

/// A text-frame connection to the television.
///
/// This trait abstracts over the concrete socket so the session state
/// machine can be driven by a scripted peer in tests.
pub trait Transport: Send {
    /// Sends one text frame.
    fn send_text<'a>(
        &'a mut self,
        text: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Receives the next text frame, skipping control frames.
    fn recv_text<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Closes the connection gracefully.
    fn close<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

// Re-export key types
pub use session::{ProtocolSession, SessionConfig, SessionPhase, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
pub use websocket::WebSocketTransport;
