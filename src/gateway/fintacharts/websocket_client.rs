//! Fintacharts WebSocket client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::trader::error::GatewayError;

/// WebSocket message handler type
pub type WsMessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Called once when a connection ends without `disconnect`
pub type WsCloseHandler = Arc<dyn Fn(GatewayError) + Send + Sync>;

/// WebSocket client for the Fintacharts realtime API
pub struct FintachartsWebSocketClient {
    /// Message handler
    handler: Arc<RwLock<Option<WsMessageHandler>>>,
    /// Close handler
    close_handler: Arc<RwLock<Option<WsCloseHandler>>>,
    /// Message sender for sending to WebSocket
    tx: Arc<RwLock<Option<mpsc::UnboundedSender<Message>>>>,
    /// Active flag of the current connection
    active: Arc<RwLock<Arc<AtomicBool>>>,
    /// Gateway name for logging
    gateway_name: String,
}

impl FintachartsWebSocketClient {
    /// Create a new WebSocket client
    pub fn new(gateway_name: &str) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            close_handler: Arc::new(RwLock::new(None)),
            tx: Arc::new(RwLock::new(None)),
            active: Arc::new(RwLock::new(Arc::new(AtomicBool::new(false)))),
            gateway_name: gateway_name.to_string(),
        }
    }

    /// Set the message handler used by the next connection
    pub async fn set_handler(&self, handler: WsMessageHandler) {
        *self.handler.write().await = Some(handler);
    }

    /// Set the close handler used by the next connection
    pub async fn set_close_handler(&self, handler: WsCloseHandler) {
        *self.close_handler.write().await = Some(handler);
    }

    /// Connect to WebSocket.
    ///
    /// Handlers are captured at connect time, so a connection that is still
    /// winding down never reaches the handlers of a newer one. The query
    /// string may carry credentials and is kept out of the log.
    pub async fn connect(&self, url: &Url) -> Result<(), GatewayError> {
        info!(
            "{}: Connecting to WebSocket: {}{}",
            self.gateway_name,
            url.origin().ascii_serialization(),
            url.path()
        );

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| GatewayError::Connect(format!("WebSocket connection failed: {}", e)))?;

        info!("{}: WebSocket connected", self.gateway_name);

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel::<Message>();

        let active = Arc::new(AtomicBool::new(true));
        *self.active.write().await = Arc::clone(&active);
        *self.tx.write().await = Some(tx);

        // Write task
        let gateway_name = self.gateway_name.clone();
        tokio::spawn(async move {
            let mut write = write;
            let mut rx = rx;
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    error!("{}: WebSocket write error: {}", gateway_name, e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // Read task
        let handler = self.handler.read().await.clone();
        let close_handler = self.close_handler.read().await.clone();
        let gateway_name = self.gateway_name.clone();
        tokio::spawn(async move {
            let mut read = read;
            let reason = loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<Value>(&text) {
                        Ok(value) => {
                            if let Some(h) = handler.as_ref() {
                                h(value);
                            }
                        }
                        Err(e) => debug!("{}: Ignoring non-JSON message: {}", gateway_name, e),
                    },
                    Some(Ok(Message::Ping(_))) => {
                        debug!("{}: Received ping", gateway_name);
                    }
                    Some(Ok(Message::Close(_))) => {
                        warn!("{}: WebSocket closed by server", gateway_name);
                        break GatewayError::Closed;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("{}: WebSocket read error: {}", gateway_name, e);
                        break GatewayError::Stream(e.to_string());
                    }
                    None => break GatewayError::Closed,
                }
            };

            if active.swap(false, Ordering::SeqCst) {
                if let Some(h) = close_handler.as_ref() {
                    h(reason);
                }
            }
            debug!("{}: WebSocket read loop ended", gateway_name);
        });

        Ok(())
    }

    /// Disconnect from WebSocket. The close handler is not called.
    pub async fn disconnect(&self) {
        self.active.read().await.store(false, Ordering::SeqCst);
        if let Some(tx) = self.tx.write().await.take() {
            let _ = tx.send(Message::Close(None));
            info!("{}: WebSocket disconnected", self.gateway_name);
        }
    }

    /// Check if connected
    pub async fn is_connected(&self) -> bool {
        self.active.read().await.load(Ordering::SeqCst)
    }

    /// Send a message
    pub async fn send(&self, message: &Value) -> Result<(), GatewayError> {
        let text = serde_json::to_string(message)
            .map_err(|e| GatewayError::Subscribe(format!("Failed to serialize message: {}", e)))?;

        match self.tx.read().await.as_ref() {
            Some(tx) => tx
                .send(Message::Text(text.into()))
                .map_err(|e| GatewayError::Subscribe(format!("Failed to send message: {}", e))),
            None => Err(GatewayError::Subscribe("WebSocket not connected".to_string())),
        }
    }
}

impl Default for FintachartsWebSocketClient {
    fn default() -> Self {
        Self::new("FINTACHARTS")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_without_connection() {
        let client = FintachartsWebSocketClient::default();
        assert!(!client.is_connected().await);

        let result = client.send(&json!({"type": "ping"})).await;
        assert!(matches!(result, Err(GatewayError::Subscribe(_))));

        // Disconnecting an idle client is a no-op
        client.disconnect().await;
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let client = FintachartsWebSocketClient::default();
        let url = Url::parse("ws://127.0.0.1:1/ws").unwrap();
        let result = client.connect(&url).await;
        assert!(matches!(result, Err(GatewayError::Connect(_))));
    }
}
