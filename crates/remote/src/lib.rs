//! # webOS Remote Library
//!
//! Remote control for LG webOS televisions over the SSAP WebSocket protocol.
//!
//! ## Overview
//!
//! - **Pairing**: the registration handshake, including the on-screen prompt
//!   shown the first time a client connects
//! - **Key storage**: client keys issued by devices, persisted per address
//! - **Operations**: power, volume, channels, apps, inputs, media keys and
//!   notifications, driven by the operation table in [`protocol::operations`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       WebOsClient                        │
//! │        (key, correlation counter, last response)         │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────┐  ┌──────────────────────┐  │
//! │  │     ProtocolSession      │  │       KeyStore       │  │
//! │  │ connect → register →     │──▶  address → key JSON  │  │
//! │  │ dispatch → close         │  └──────────────────────┘  │
//! │  └──────────────────────────┘                            │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │        WebSocketTransport (ws://<tv>:3000)         │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remote::{ClientConfig, WebOsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WebOsClient::new(ClientConfig::new("192.168.1.20"))?;
//!
//!     if !client.is_registered().await {
//!         // Accept the prompt on the television.
//!         client.register().await?;
//!     }
//!
//!     client.set_volume(12).await?;
//!     println!("volume is now {}", client.get_volume().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`client`]: the client and its named operations
//! - [`config`]: configuration loading and defaults
//! - [`keys`]: client key storage
//! - [`network`]: WebSocket transport and the protocol session

pub mod client;
pub mod config;
pub mod keys;
pub mod network;

// Re-export protocol for convenience
pub use protocol;

pub use client::{ClientConfig, WebOsClient};
pub use config::{Config, ConfigError};
pub use keys::{resolve_key_file_path, KeyStore, KEY_FILE_NAME};
pub use network::{
    ProtocolSession, SessionConfig, SessionPhase, Transport, WebSocketTransport,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT,
};
