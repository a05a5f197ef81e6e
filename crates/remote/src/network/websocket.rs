//! Plaintext WebSocket transport.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use protocol::error::{ProtocolError, Result};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use url::Url;

use super::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Builds `ws://<address>:<port>`, bracketing bare IPv6 addresses.
pub fn build_device_url(address: &str, port: u16) -> Result<String> {
    let host = if address.contains(':') && !address.starts_with('[') {
        format!("[{}]", address)
    } else {
        address.to_string()
    };

    let ws_url = format!("ws://{}:{}", host, port);
    Url::parse(&ws_url)
        .map_err(|e| ProtocolError::ConnectionFailed(format!("invalid device URL {}: {}", ws_url, e)))?;
    Ok(ws_url)
}

/// A WebSocket connection to the television.
pub struct WebSocketTransport {
    stream: WsStream,
}

impl WebSocketTransport {
    /// Opens a connection, giving up after `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        tracing::debug!("Connecting to {}", url);

        let (stream, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                ProtocolError::Timeout(format!("connecting to {} took longer than {:?}", url, timeout))
            })?
            .map_err(|e| match e {
                WsError::Io(io_err) => ProtocolError::from(io_err),
                _ => ProtocolError::ConnectionFailed(format!("WebSocket connection failed: {}", e)),
            })?;

        tracing::debug!("Connected to {}", url);
        Ok(Self { stream })
    }
}

impl Transport for WebSocketTransport {
    fn send_text<'a>(
        &'a mut self,
        text: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.stream
                .send(WsMessage::Text(text))
                .await
                .map_err(|e| ProtocolError::ConnectionClosed(format!("failed to send frame: {}", e)))
        })
    }

    fn recv_text<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            while let Some(result) = self.stream.next().await {
                match result {
                    Ok(WsMessage::Text(text)) => return Ok(text),
                    Ok(WsMessage::Binary(bytes)) => {
                        return String::from_utf8(bytes).map_err(|e| {
                            ProtocolError::UnexpectedMessage(format!("binary frame is not UTF-8: {}", e))
                        });
                    }
                    Ok(WsMessage::Close(_)) => {
                        return Err(ProtocolError::ConnectionClosed(
                            "device closed connection".to_string(),
                        ));
                    }
                    Ok(_) => {
                        // Ping/pong and raw frames
                    }
                    Err(e) => {
                        return Err(ProtocolError::ConnectionClosed(format!(
                            "WebSocket error: {}",
                            e
                        )));
                    }
                }
            }

            Err(ProtocolError::ConnectionClosed(
                "connection ended before a reply arrived".to_string(),
            ))
        })
    }

    fn close<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            match self.stream.close(None).await {
                Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
                Err(e) => Err(ProtocolError::ConnectionClosed(format!(
                    "failed to close connection: {}",
                    e
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_device_url() {
        assert_eq!(build_device_url("192.168.1.20", 3000).unwrap(), "ws://192.168.1.20:3000");
        assert_eq!(build_device_url("tv.lan", 3001).unwrap(), "ws://tv.lan:3001");
    }

    #[test]
    fn test_build_device_url_ipv6() {
        assert_eq!(build_device_url("fe80::1", 3000).unwrap(), "ws://[fe80::1]:3000");
        assert_eq!(build_device_url("[fe80::1]", 3000).unwrap(), "ws://[fe80::1]:3000");
    }

    #[test]
    fn test_build_device_url_rejects_garbage() {
        let result = build_device_url("not a host", 3000);
        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = build_device_url("127.0.0.1", port).unwrap();
        let result = WebSocketTransport::connect(&url, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ref e) if e.is_connection_error()));
    }

    #[tokio::test]
    async fn test_connect_times_out_without_upgrade() {
        // Accepts TCP but never answers the HTTP upgrade.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let url = build_device_url("127.0.0.1", port).unwrap();
        let result = WebSocketTransport::connect(&url, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(ProtocolError::Timeout(_))));
    }
}
