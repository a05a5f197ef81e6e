//! Error types for the protocol crate.

use std::path::PathBuf;

use thiserror::Error;

/// Protocol error type covering all possible failure modes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    // Connection errors
    /// The WebSocket could not be opened (refused, unreachable, bad URL).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection was closed unexpectedly.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Operation timed out.
    #[error("operation timed out: {0}")]
    Timeout(String),

    // Pairing errors
    /// The handshake finished without a usable client key.
    #[error("pairing failed: {0}")]
    PairingFailed(String),

    // Wire errors
    /// Failed to serialize data.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Failed to deserialize data.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The device sent a frame that does not fit the exchange.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    // Caller errors
    /// No operation with this name exists in the table.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    // Storage errors
    /// The key file could not be read, parsed or written.
    #[error("key storage error: {0}")]
    Storage(String),

    // Filesystem errors
    /// A local file referenced by a command could not be read.
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ProtocolError {
    /// Returns true for errors raised while opening or holding the socket.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::ConnectionFailed(_)
                | ProtocolError::ConnectionClosed(_)
                | ProtocolError::Timeout(_)
        )
    }
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

// Conversions from underlying crate errors

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_eof() || err.is_syntax() {
            ProtocolError::Deserialization(err.to_string())
        } else {
            ProtocolError::Serialization(err.to_string())
        }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut => ProtocolError::Timeout(err.to_string()),
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed(err.to_string()),
            _ => ProtocolError::ConnectionFailed(err.to_string()),
        }
    }
}
