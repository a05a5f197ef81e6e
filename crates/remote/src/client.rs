//! The remote-control client.
//!
//! [`WebOsClient`] is what callers hold. It owns the client key, the
//! correlation counter and the last reply, and runs every operation of the
//! table through [`ProtocolSession`] on a fresh connection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use protocol::error::{ProtocolError, Result};
use protocol::messages::{CommandEnvelope, MessageKind, ResponseEnvelope};
use protocol::operations::{self, Operation};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::keys::{resolve_key_file_path, KeyStore};
use crate::network::{ProtocolSession, SessionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};

/// Settings for a [`WebOsClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Device address (host name or IP).
    pub address: String,
    /// WebSocket port.
    pub port: u16,
    /// Explicit key file; resolved to the default location when `None`.
    pub key_file: Option<PathBuf>,
    /// Bound on opening the WebSocket.
    pub connect_timeout: Duration,
    /// Bound on each reply.
    pub response_timeout: Option<Duration>,
    /// Bound on the user accepting the pairing prompt.
    pub pairing_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Creates a configuration for `address` with defaults for everything else.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_PORT,
            key_file: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: None,
            pairing_timeout: None,
        }
    }

    /// Sets the WebSocket port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Uses an explicit key file instead of the default location.
    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Sets the bound on opening the WebSocket.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the bound on each reply; `None` waits indefinitely.
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the bound on the pairing prompt; `None` waits indefinitely.
    pub fn with_pairing_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pairing_timeout = timeout;
        self
    }

    fn into_session_config(self) -> SessionConfig {
        SessionConfig {
            key_file: resolve_key_file_path(self.key_file.as_deref()),
            address: self.address,
            port: self.port,
            connect_timeout: self.connect_timeout,
            response_timeout: self.response_timeout,
            pairing_timeout: self.pairing_timeout,
        }
    }
}

#[derive(Debug, Default)]
struct ClientState {
    client_key: Option<String>,
    command_count: u64,
    last_response: Option<ResponseEnvelope>,
}

/// Client for one television.
///
/// Every operation opens its own connection, registers, sends one command and
/// closes. Operations on one client are serialized: a second call waits until
/// the first one has closed its connection.
pub struct WebOsClient {
    session_config: SessionConfig,
    state: Mutex<ClientState>,
}

impl WebOsClient {
    /// Creates a client, loading the stored key for the device (if any).
    pub fn new(config: ClientConfig) -> Result<Self> {
        let session_config = config.into_session_config();
        let store = KeyStore::load(&session_config.key_file)?;
        let client_key = store.get(&session_config.address).map(str::to_string);

        tracing::debug!(
            address = %session_config.address,
            key_file = ?session_config.key_file,
            registered = client_key.is_some(),
            "Created client"
        );

        Ok(Self {
            session_config,
            state: Mutex::new(ClientState {
                client_key,
                ..Default::default()
            }),
        })
    }

    /// Device address this client talks to.
    pub fn address(&self) -> &str {
        &self.session_config.address
    }

    /// Resolved key file path.
    pub fn key_file(&self) -> &Path {
        &self.session_config.key_file
    }

    /// True once a client key is known for the device.
    pub async fn is_registered(&self) -> bool {
        self.state.lock().await.client_key.is_some()
    }

    /// The client key issued by the device, if known.
    pub async fn client_key(&self) -> Option<String> {
        self.state.lock().await.client_key.clone()
    }

    /// The reply to the most recent request, if it produced one.
    pub async fn last_response(&self) -> Option<ResponseEnvelope> {
        self.state.lock().await.last_response.clone()
    }

    /// Number of commands issued so far.
    pub async fn command_count(&self) -> u64 {
        self.state.lock().await.command_count
    }

    /// Connects and registers without sending a command.
    ///
    /// On a first pairing this blocks until the user answers the prompt on the
    /// television (or the pairing timeout expires).
    pub async fn register(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        let mut session = ProtocolSession::new(&self.session_config, state.client_key.clone());
        let result = session.pair().await;
        state.client_key = session.into_client_key();
        result
    }

    /// Sends a command of `kind` to `endpoint`.
    pub async fn command(&self, kind: MessageKind, endpoint: &str, payload: Option<Value>) -> Result<()> {
        let mut state = self.state.lock().await;
        self.command_locked(&mut state, kind, endpoint, payload).await
    }

    /// Sends a request to `endpoint` and stores its reply.
    pub async fn request(&self, endpoint: &str, payload: Option<Value>) -> Result<()> {
        self.command(MessageKind::Request, endpoint, payload).await
    }

    /// Runs one operation of the table and projects its result.
    ///
    /// The payload passes through the operation's [`PayloadRule`](protocol::operations::PayloadRule) first.
    pub async fn run(&self, operation: &Operation, payload: Option<Value>) -> Result<Value> {
        let mut state = self.state.lock().await;
        let payload = operation.build_payload(payload);
        self.command_locked(&mut state, operation.kind, operation.endpoint, payload)
            .await?;
        Ok(operation.project(state.last_response.as_ref()))
    }

    /// Runs the operation called `name`.
    pub async fn call(&self, name: &str, payload: Option<Value>) -> Result<Value> {
        let operation = operations::find(name)
            .ok_or_else(|| ProtocolError::UnknownOperation(name.to_string()))?;
        self.run(operation, payload).await
    }

    async fn command_locked(
        &self,
        state: &mut ClientState,
        kind: MessageKind,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<()> {
        state.command_count += 1;
        let envelope = CommandEnvelope::new(kind, state.command_count, endpoint, payload);
        state.last_response = None;

        let mut session = ProtocolSession::new(&self.session_config, state.client_key.clone());
        let result = session.execute(&envelope).await;
        state.client_key = session.into_client_key();

        state.last_response = result?;
        Ok(())
    }

    // Power

    /// Turns the television off.
    pub async fn power_off(&self) -> Result<()> {
        self.run(&operations::POWER_OFF, None).await.map(drop)
    }

    /// Turns the television on.
    pub async fn power_on(&self) -> Result<()> {
        self.run(&operations::POWER_ON, None).await.map(drop)
    }

    // Services

    /// Lists the services the device offers.
    pub async fn get_services(&self) -> Result<Value> {
        self.run(&operations::GET_SERVICES, None).await
    }

    /// Returns firmware and product information.
    pub async fn get_software_info(&self) -> Result<Value> {
        self.run(&operations::GET_SOFTWARE_INFO, None).await
    }

    // Apps

    /// Lists the installed apps (launch points).
    pub async fn get_apps(&self) -> Result<Value> {
        self.run(&operations::GET_APPS, None).await
    }

    /// Id of the foreground app, if the device reported one.
    pub async fn get_current_app(&self) -> Result<Option<String>> {
        let value = self.run(&operations::GET_CURRENT_APP, None).await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// Launches an app by id.
    pub async fn launch_app(&self, app: &str) -> Result<()> {
        self.run(&operations::LAUNCH_APP, Some(json!({ "id": app })))
            .await
            .map(drop)
    }

    /// Launches an app with launch parameters.
    pub async fn launch_app_with_params(&self, app: &str, params: Value) -> Result<()> {
        self.run(&operations::LAUNCH_APP, Some(json!({ "id": app, "params": params })))
            .await
            .map(drop)
    }

    /// Closes an app by id.
    pub async fn close_app(&self, app: &str) -> Result<()> {
        self.run(&operations::CLOSE_APP, Some(json!({ "id": app })))
            .await
            .map(drop)
    }

    // 3D

    /// Enables 3D mode.
    pub async fn turn_3d_on(&self) -> Result<()> {
        self.run(&operations::TURN_3D_ON, None).await.map(drop)
    }

    /// Disables 3D mode.
    pub async fn turn_3d_off(&self) -> Result<()> {
        self.run(&operations::TURN_3D_OFF, None).await.map(drop)
    }

    // Inputs

    /// Lists external inputs.
    pub async fn get_inputs(&self) -> Result<Value> {
        self.run(&operations::GET_INPUTS, None).await
    }

    /// The current input is reported as the foreground app.
    pub async fn get_input(&self) -> Result<Option<String>> {
        self.get_current_app().await
    }

    /// Switches to an external input.
    pub async fn set_input(&self, input: &str) -> Result<()> {
        self.run(&operations::SET_INPUT, Some(json!({ "inputId": input })))
            .await
            .map(drop)
    }

    // Audio

    /// Returns the full audio status.
    pub async fn get_audio_status(&self) -> Result<Value> {
        self.run(&operations::GET_AUDIO_STATUS, None).await
    }

    /// Mute state, or `None` if the device did not report one.
    pub async fn get_muted(&self) -> Result<Option<bool>> {
        let value = self.run(&operations::GET_MUTED, None).await?;
        Ok(value.as_bool())
    }

    /// Mutes or unmutes the sound.
    pub async fn set_mute(&self, mute: bool) -> Result<()> {
        self.run(&operations::SET_MUTE, Some(json!({ "mute": mute })))
            .await
            .map(drop)
    }

    /// Current volume level, 0 if the device did not report one.
    pub async fn get_volume(&self) -> Result<i64> {
        let value = self.run(&operations::GET_VOLUME, None).await?;
        Ok(value.as_i64().unwrap_or(0))
    }

    /// Sets the volume; negative levels are sent as 0.
    pub async fn set_volume(&self, volume: i64) -> Result<()> {
        self.run(&operations::SET_VOLUME, Some(json!({ "volume": volume })))
            .await
            .map(drop)
    }

    /// Raises the volume one step.
    pub async fn volume_up(&self) -> Result<()> {
        self.run(&operations::VOLUME_UP, None).await.map(drop)
    }

    /// Lowers the volume one step.
    pub async fn volume_down(&self) -> Result<()> {
        self.run(&operations::VOLUME_DOWN, None).await.map(drop)
    }

    // TV channels

    /// Switches to the next channel.
    pub async fn channel_up(&self) -> Result<()> {
        self.run(&operations::CHANNEL_UP, None).await.map(drop)
    }

    /// Switches to the previous channel.
    pub async fn channel_down(&self) -> Result<()> {
        self.run(&operations::CHANNEL_DOWN, None).await.map(drop)
    }

    /// Lists TV channels.
    pub async fn get_channels(&self) -> Result<Value> {
        self.run(&operations::GET_CHANNELS, None).await
    }

    /// Returns the channel being watched.
    pub async fn get_current_channel(&self) -> Result<Value> {
        self.run(&operations::GET_CURRENT_CHANNEL, None).await
    }

    /// Returns programme information for the current channel.
    pub async fn get_channel_info(&self) -> Result<Value> {
        self.run(&operations::GET_CHANNEL_INFO, None).await
    }

    /// Switches to a channel by id.
    pub async fn set_channel(&self, channel: &str) -> Result<()> {
        self.run(&operations::SET_CHANNEL, Some(json!({ "channelId": channel })))
            .await
            .map(drop)
    }

    // Media

    /// Resumes playback.
    pub async fn play(&self) -> Result<()> {
        self.run(&operations::PLAY, None).await.map(drop)
    }

    /// Pauses playback.
    pub async fn pause(&self) -> Result<()> {
        self.run(&operations::PAUSE, None).await.map(drop)
    }

    /// Stops playback.
    pub async fn stop(&self) -> Result<()> {
        self.run(&operations::STOP, None).await.map(drop)
    }

    /// Closes the media viewer.
    pub async fn close(&self) -> Result<()> {
        self.run(&operations::CLOSE_MEDIA, None).await.map(drop)
    }

    /// Rewinds.
    pub async fn rewind(&self) -> Result<()> {
        self.run(&operations::REWIND, None).await.map(drop)
    }

    /// Fast-forwards.
    pub async fn fast_forward(&self) -> Result<()> {
        self.run(&operations::FAST_FORWARD, None).await.map(drop)
    }

    // Keys

    /// Presses the enter key of the on-screen keyboard.
    pub async fn send_enter_key(&self) -> Result<()> {
        self.run(&operations::SEND_ENTER_KEY, None).await.map(drop)
    }

    /// Presses the delete key of the on-screen keyboard.
    pub async fn send_delete_key(&self) -> Result<()> {
        self.run(&operations::SEND_DELETE_KEY, None).await.map(drop)
    }

    // Web

    /// Opens a URL in the browser.
    pub async fn open_url(&self, url: &str) -> Result<()> {
        self.run(&operations::OPEN_URL, Some(json!({ "target": url })))
            .await
            .map(drop)
    }

    /// Closes the web browser.
    pub async fn close_web(&self) -> Result<()> {
        self.run(&operations::CLOSE_WEB, None).await.map(drop)
    }

    // Notifications

    /// Shows a toast on screen, optionally with an icon read from disk.
    ///
    /// The icon is read before connecting; a read failure is returned as
    /// [`ProtocolError::FileRead`] and nothing is sent.
    pub async fn send_message(&self, message: &str, icon_path: Option<&Path>) -> Result<()> {
        let payload = message_payload(message, icon_path).await?;
        self.run(&operations::SEND_MESSAGE, Some(payload))
            .await
            .map(drop)
    }
}

async fn message_payload(message: &str, icon_path: Option<&Path>) -> Result<Value> {
    let (icon_data, icon_extension) = match icon_path {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| ProtocolError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            (STANDARD.encode(bytes), extension)
        }
        None => (String::new(), String::new()),
    };

    Ok(json!({
        "message": message,
        "iconData": icon_data,
        "iconExtension": icon_extension,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new("tv.lan")
            .with_port(3001)
            .with_key_file("/tmp/keys.json")
            .with_connect_timeout(Duration::from_secs(5))
            .with_response_timeout(Some(Duration::from_secs(10)))
            .with_pairing_timeout(Some(Duration::from_secs(60)));

        assert_eq!(config.port, 3001);
        assert_eq!(config.key_file, Some(PathBuf::from("/tmp/keys.json")));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.response_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.pairing_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new("tv.lan");
        assert_eq!(config.port, 3000);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.key_file, None);
        assert_eq!(config.response_timeout, None);
    }

    #[tokio::test]
    async fn test_new_loads_stored_key() {
        let temp_dir = TempDir::new().unwrap();
        let key_file = temp_dir.path().join("keys.json");
        KeyStore::save(&key_file, "192.168.1.20", "k1").unwrap();

        let client = WebOsClient::new(ClientConfig::new("192.168.1.20").with_key_file(&key_file)).unwrap();
        assert!(client.is_registered().await);
        assert_eq!(client.client_key().await.as_deref(), Some("k1"));
        assert_eq!(client.key_file(), key_file.as_path());

        let other = WebOsClient::new(ClientConfig::new("192.168.1.21").with_key_file(&key_file)).unwrap();
        assert!(!other.is_registered().await);
    }

    #[tokio::test]
    async fn test_new_rejects_malformed_key_file() {
        let temp_dir = TempDir::new().unwrap();
        let key_file = temp_dir.path().join("keys.json");
        std::fs::write(&key_file, "not json").unwrap();

        let result = WebOsClient::new(ClientConfig::new("tv.lan").with_key_file(&key_file));
        assert!(matches!(result, Err(ProtocolError::Storage(_))));
    }

    #[tokio::test]
    async fn test_message_payload_without_icon() {
        let payload = message_payload("Hello", None).await.unwrap();
        assert_eq!(
            payload,
            json!({ "message": "Hello", "iconData": "", "iconExtension": "" })
        );
    }

    #[tokio::test]
    async fn test_message_payload_with_icon() {
        let temp_dir = TempDir::new().unwrap();
        let icon = temp_dir.path().join("icon.png");
        std::fs::write(&icon, b"PNG").unwrap();

        let payload = message_payload("Hello", Some(&icon)).await.unwrap();
        assert_eq!(payload["iconData"], "UE5H");
        assert_eq!(payload["iconExtension"], "png");
    }

    #[tokio::test]
    async fn test_message_payload_missing_icon() {
        let temp_dir = TempDir::new().unwrap();
        let icon = temp_dir.path().join("missing.png");

        let result = message_payload("Hello", Some(&icon)).await;
        match result {
            Err(ProtocolError::FileRead { path, .. }) => assert_eq!(path, icon),
            other => panic!("expected FileRead, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_operation_fails_without_connecting() {
        let temp_dir = TempDir::new().unwrap();
        let client = WebOsClient::new(
            ClientConfig::new("127.0.0.1").with_key_file(temp_dir.path().join("keys.json")),
        )
        .unwrap();

        let result = client.call("self_destruct", None).await;
        assert!(matches!(result, Err(ProtocolError::UnknownOperation(_))));
        assert_eq!(client.command_count().await, 0);
    }
}
