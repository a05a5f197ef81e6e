//! One protocol round trip with the television.
//!
//! Every command runs on a fresh connection:
//!
//! ```text
//! Unconnected → Connecting → Handshaking → [Paired | AwaitingPrompt] → Dispatching → Closed
//! ```
//!
//! The handshake is mandatory before every command. With a stored client key
//! the device answers `registered` straight away; without one it first
//! announces a `PROMPT` pairing and only sends `registered` once the user
//! accepts on screen. Newly issued keys are written to the key file before
//! anything else happens on the connection.

use std::path::PathBuf;
use std::time::Duration;

use protocol::error::{ProtocolError, Result};
use protocol::handshake;
use protocol::messages::{CommandEnvelope, ResponseEnvelope};

use super::websocket::{build_device_url, WebSocketTransport};
use super::Transport;
use crate::keys::KeyStore;

/// Port the television's SSAP server listens on.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bound on opening the WebSocket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolved settings for talking to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Device address (host name or IP).
    pub address: String,
    /// WebSocket port.
    pub port: u16,
    /// Key file that receives newly issued client keys.
    pub key_file: PathBuf,
    /// Bound on opening the WebSocket.
    pub connect_timeout: Duration,
    /// Bound on each reply; `None` waits indefinitely.
    pub response_timeout: Option<Duration>,
    /// Bound on the user accepting the on-screen prompt; `None` waits indefinitely.
    pub pairing_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Creates a configuration with default port and timeouts.
    pub fn new(address: impl Into<String>, key_file: impl Into<PathBuf>) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_PORT,
            key_file: key_file.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: None,
            pairing_timeout: None,
        }
    }

    /// The device URL, `ws://<address>:<port>`.
    pub fn url(&self) -> Result<String> {
        build_device_url(&self.address, self.port)
    }
}

/// Where a session is in its round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No socket yet.
    Unconnected,
    /// Opening the WebSocket.
    Connecting,
    /// Registration frame sent, waiting for the answer.
    Handshaking,
    /// The device is showing the pairing prompt.
    AwaitingPrompt,
    /// The device accepted the client key.
    Paired,
    /// Command sent (and reply awaited for requests).
    Dispatching,
    /// Socket released.
    Closed,
}

/// Drives a single connection through registration and dispatch.
pub struct ProtocolSession<'a> {
    config: &'a SessionConfig,
    client_key: Option<String>,
    phase: SessionPhase,
}

impl<'a> ProtocolSession<'a> {
    /// Creates a session that registers with `client_key` (if any).
    pub fn new(config: &'a SessionConfig, client_key: Option<String>) -> Self {
        Self {
            config,
            client_key,
            phase: SessionPhase::Unconnected,
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Returns the client key known after the handshake.
    pub fn client_key(&self) -> Option<&str> {
        self.client_key.as_deref()
    }

    /// Consumes the session, returning the client key it ended with.
    pub fn into_client_key(self) -> Option<String> {
        self.client_key
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            tracing::debug!(
                address = %self.config.address,
                from = ?self.phase,
                to = ?phase,
                "Session phase changed"
            );
            self.phase = phase;
        }
    }

    /// Opens the WebSocket to the device.
    pub async fn connect(&mut self) -> Result<WebSocketTransport> {
        self.set_phase(SessionPhase::Connecting);
        let url = self.config.url()?;
        WebSocketTransport::connect(&url, self.config.connect_timeout).await
    }

    /// Connects, registers and closes without sending a command.
    ///
    /// Succeeds even if no key results; check [`client_key`](Self::client_key).
    pub async fn pair(&mut self) -> Result<()> {
        let mut transport = self.connect().await?;
        let result = self.register(&mut transport).await;
        self.release(&mut transport).await;
        result
    }

    /// Connects, registers, dispatches `envelope` and closes.
    ///
    /// Returns the reply for request-kind envelopes, `None` otherwise. The
    /// socket is closed whether or not the exchange succeeded.
    pub async fn execute(&mut self, envelope: &CommandEnvelope) -> Result<Option<ResponseEnvelope>> {
        let mut transport = self.connect().await?;
        let result = self.execute_on(&mut transport, envelope).await;
        self.release(&mut transport).await;
        result
    }

    /// Registers and dispatches on an already open transport.
    pub async fn execute_on<T: Transport>(
        &mut self,
        transport: &mut T,
        envelope: &CommandEnvelope,
    ) -> Result<Option<ResponseEnvelope>> {
        self.register(transport).await?;

        if self.client_key.is_none() {
            return Err(ProtocolError::PairingFailed(format!(
                "{} did not issue a client key",
                self.config.address
            )));
        }

        self.dispatch(transport, envelope).await
    }

    /// Runs the registration handshake on an open transport.
    pub async fn register<T: Transport>(&mut self, transport: &mut T) -> Result<()> {
        self.set_phase(SessionPhase::Handshaking);

        let registration = handshake::registration_message(self.client_key.as_deref())?;
        transport.send_text(registration).await?;

        let response = self.receive(transport, self.config.response_timeout).await?;

        if response.is_pairing_prompt() {
            self.set_phase(SessionPhase::AwaitingPrompt);
            tracing::info!(
                "Pairing prompt shown on {}, waiting for the user to accept",
                self.config.address
            );

            let response = self.receive(transport, self.config.pairing_timeout).await?;
            if !response.is_registered() {
                return Err(ProtocolError::PairingFailed(format!(
                    "pairing was not accepted: {}",
                    response.error_message()
                )));
            }
            return self.accept_registration(&response);
        }

        self.accept_registration(&response)
    }

    fn accept_registration(&mut self, response: &ResponseEnvelope) -> Result<()> {
        if response.is_error() {
            return Err(ProtocolError::PairingFailed(response.error_message()));
        }

        if !response.is_registered() {
            tracing::warn!(
                response_type = %response.response_type,
                "Unexpected handshake reply from {}",
                self.config.address
            );
            return Ok(());
        }

        match response.client_key() {
            Some(key) if self.client_key.as_deref() != Some(key) => {
                KeyStore::save(&self.config.key_file, &self.config.address, key)?;
                tracing::info!("Paired with {}", self.config.address);
                self.client_key = Some(key.to_string());
            }
            Some(_) => {}
            None => {
                tracing::warn!("Registration reply from {} carried no client key", self.config.address);
            }
        }

        if self.client_key.is_some() {
            self.set_phase(SessionPhase::Paired);
        }
        Ok(())
    }

    /// Sends a command and reads the reply if its kind expects one.
    pub async fn dispatch<T: Transport>(
        &mut self,
        transport: &mut T,
        envelope: &CommandEnvelope,
    ) -> Result<Option<ResponseEnvelope>> {
        self.set_phase(SessionPhase::Dispatching);
        tracing::debug!(id = %envelope.id, uri = %envelope.uri, "Sending command");

        transport.send_text(envelope.to_json()?).await?;

        if !envelope.kind.expects_reply() {
            return Ok(None);
        }

        let response = self.receive(transport, self.config.response_timeout).await?;
        if response.is_error() {
            tracing::warn!(id = %envelope.id, "Device rejected command: {}", response.error_message());
        }
        Ok(Some(response))
    }

    async fn receive<T: Transport>(
        &self,
        transport: &mut T,
        timeout: Option<Duration>,
    ) -> Result<ResponseEnvelope> {
        let text = match timeout {
            Some(limit) => tokio::time::timeout(limit, transport.recv_text())
                .await
                .map_err(|_| {
                    ProtocolError::Timeout(format!(
                        "no reply from {} within {:?}",
                        self.config.address, limit
                    ))
                })??,
            None => transport.recv_text().await?,
        };

        tracing::trace!("Received frame: {}", text);
        ResponseEnvelope::from_json(&text)
    }

    async fn release<T: Transport>(&mut self, transport: &mut T) {
        if let Err(e) = transport.close().await {
            tracing::debug!(error = %e, "Error while closing connection");
        }
        self.set_phase(SessionPhase::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::messages::MessageKind;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use tempfile::TempDir;

    /// Transport that replays canned replies and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: VecDeque<String>,
        sent: Vec<String>,
        reads: usize,
        closed: bool,
    }

    impl ScriptedTransport {
        fn with_replies(replies: &[&str]) -> Self {
            Self {
                replies: replies.iter().map(|r| r.to_string()).collect(),
                ..Default::default()
            }
        }

        fn sent_json(&self, index: usize) -> serde_json::Value {
            serde_json::from_str(&self.sent[index]).unwrap()
        }
    }

    impl Transport for ScriptedTransport {
        fn send_text<'a>(
            &'a mut self,
            text: String,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.sent.push(text);
                Ok(())
            })
        }

        fn recv_text<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
            Box::pin(async move {
                self.reads += 1;
                self.replies
                    .pop_front()
                    .ok_or_else(|| ProtocolError::ConnectionClosed("script exhausted".to_string()))
            })
        }

        fn close<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.closed = true;
                Ok(())
            })
        }
    }

    const REGISTERED_K1: &str = r#"{"type":"registered","id":"register_0","payload":{"client-key":"k1"}}"#;
    const PROMPT: &str = r#"{"type":"response","id":"register_0","payload":{"pairingType":"PROMPT","returnValue":true}}"#;

    fn test_config(temp_dir: &TempDir) -> SessionConfig {
        SessionConfig::new("192.168.1.20", temp_dir.path().join("keys.json"))
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("tv.lan", "/tmp/keys");
        assert_eq!(config.port, 3000);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.response_timeout, None);
        assert_eq!(config.pairing_timeout, None);
        assert_eq!(config.url().unwrap(), "ws://tv.lan:3000");
    }

    #[tokio::test]
    async fn test_first_pairing_with_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut transport = ScriptedTransport::with_replies(&[PROMPT, REGISTERED_K1]);

        let mut session = ProtocolSession::new(&config, None);
        session.register(&mut transport).await.unwrap();

        assert_eq!(session.client_key(), Some("k1"));
        assert_eq!(session.phase(), SessionPhase::Paired);
        assert!(transport.sent_json(0)["payload"]["client-key"].is_null());

        let store = KeyStore::load(&config.key_file).unwrap();
        assert_eq!(store.get("192.168.1.20"), Some("k1"));
    }

    #[tokio::test]
    async fn test_stored_key_skips_prompt_and_keeps_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut transport = ScriptedTransport::with_replies(&[REGISTERED_K1]);

        let mut session = ProtocolSession::new(&config, Some("k1".to_string()));
        session.register(&mut transport).await.unwrap();

        assert_eq!(session.client_key(), Some("k1"));
        assert_eq!(transport.reads, 1);
        assert_eq!(transport.sent_json(0)["payload"]["client-key"], "k1");
        // Same key as before: nothing written.
        assert!(!config.key_file.exists());
    }

    #[tokio::test]
    async fn test_prompt_rejected_fails_pairing() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut transport = ScriptedTransport::with_replies(&[
            PROMPT,
            r#"{"type":"error","id":"register_0","error":"403 User denied access"}"#,
        ]);

        let mut session = ProtocolSession::new(&config, None);
        let result = session.register(&mut transport).await;

        match result {
            Err(ProtocolError::PairingFailed(msg)) => assert!(msg.contains("403")),
            other => panic!("expected PairingFailed, got {:?}", other),
        }
        assert_eq!(session.client_key(), None);
    }

    #[tokio::test]
    async fn test_error_reply_to_registration_fails_pairing() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut transport =
            ScriptedTransport::with_replies(&[r#"{"type":"error","error":"500 Application error"}"#]);

        let mut session = ProtocolSession::new(&config, Some("stale".to_string()));
        let result = session.register(&mut transport).await;
        assert!(matches!(result, Err(ProtocolError::PairingFailed(_))));
    }

    #[tokio::test]
    async fn test_no_key_blocks_dispatch() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        // Device answers with something that is neither a prompt nor registered.
        let mut transport =
            ScriptedTransport::with_replies(&[r#"{"type":"response","payload":{"returnValue":true}}"#]);

        let envelope = CommandEnvelope::new(MessageKind::Button, 1, "system/turnOff", None);
        let mut session = ProtocolSession::new(&config, None);
        let result = session.execute_on(&mut transport, &envelope).await;

        assert!(matches!(result, Err(ProtocolError::PairingFailed(_))));
        // Only the registration frame went out.
        assert_eq!(transport.sent.len(), 1);
    }

    #[tokio::test]
    async fn test_button_does_not_read_reply() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut transport = ScriptedTransport::with_replies(&[REGISTERED_K1]);

        let envelope = CommandEnvelope::new(MessageKind::Button, 1, "audio/volumeUp", None);
        let mut session = ProtocolSession::new(&config, Some("k1".to_string()));
        let response = session.execute_on(&mut transport, &envelope).await.unwrap();

        assert!(response.is_none());
        assert_eq!(transport.reads, 1);
        assert_eq!(transport.sent.len(), 2);
        assert_eq!(transport.sent_json(1)["type"], "button");
        assert_eq!(transport.sent_json(1)["uri"], "ssap://audio/volumeUp");
    }

    #[tokio::test]
    async fn test_request_reads_one_reply() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut transport = ScriptedTransport::with_replies(&[
            REGISTERED_K1,
            r#"{"type":"response","id":"request_1","payload":{"volume":11}}"#,
        ]);

        let envelope = CommandEnvelope::new(MessageKind::Request, 1, "audio/getVolume", None);
        let mut session = ProtocolSession::new(&config, Some("k1".to_string()));
        let response = session
            .execute_on(&mut transport, &envelope)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.payload_field("volume"), Some(&serde_json::json!(11)));
        assert_eq!(session.phase(), SessionPhase::Dispatching);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_deserialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut transport = ScriptedTransport::with_replies(&[REGISTERED_K1, "<html>"]);

        let envelope = CommandEnvelope::new(MessageKind::Request, 1, "audio/getVolume", None);
        let mut session = ProtocolSession::new(&config, Some("k1".to_string()));
        let result = session.execute_on(&mut transport, &envelope).await;

        assert!(matches!(result, Err(ProtocolError::Deserialization(_))));
    }

    #[tokio::test]
    async fn test_pairing_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.pairing_timeout = Some(Duration::from_millis(50));

        /// Answers the registration with a prompt, then never again.
        struct SilentAfterPrompt {
            prompted: bool,
        }

        impl Transport for SilentAfterPrompt {
            fn send_text<'a>(
                &'a mut self,
                _text: String,
            ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
                Box::pin(async { Ok(()) })
            }

            fn recv_text<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
                Box::pin(async move {
                    if !self.prompted {
                        self.prompted = true;
                        return Ok(PROMPT.to_string());
                    }
                    std::future::pending().await
                })
            }

            fn close<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
                Box::pin(async { Ok(()) })
            }
        }

        let mut transport = SilentAfterPrompt { prompted: false };
        let mut session = ProtocolSession::new(&config, None);
        let result = session.register(&mut transport).await;

        assert!(matches!(result, Err(ProtocolError::Timeout(_))));
        assert_eq!(session.phase(), SessionPhase::AwaitingPrompt);
    }

    #[tokio::test]
    async fn test_release_closes_transport() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut transport = ScriptedTransport::default();

        let mut session = ProtocolSession::new(&config, None);
        session.release(&mut transport).await;

        assert!(transport.closed);
        assert_eq!(session.phase(), SessionPhase::Closed);
    }
}
