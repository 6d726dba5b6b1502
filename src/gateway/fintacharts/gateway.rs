//! Fintacharts realtime gateway.

use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use url::Url;

use super::config::FintachartsConfig;
use super::constants::{L1_KINDS, L1_SNAPSHOT, L1_SUBSCRIPTION, L1_UPDATE};
use super::websocket_client::{FintachartsWebSocketClient, WsCloseHandler, WsMessageHandler};
use crate::trader::error::GatewayError;
use crate::trader::gateway::{BaseGateway, GatewayEvent, GatewayEventSender, TickStream};
use crate::trader::object::{SubscribeRequest, TickData};
use crate::trader::utility::parse_iso_datetime;

/// Gateway streaming last-trade prices of one instrument
pub struct FintachartsGateway {
    gateway_name: String,
    config: FintachartsConfig,
    market_ws: Arc<FintachartsWebSocketClient>,
    event_sender: Arc<RwLock<Option<GatewayEventSender>>>,
}

impl FintachartsGateway {
    pub fn new(gateway_name: &str, config: FintachartsConfig) -> Self {
        Self {
            gateway_name: gateway_name.to_string(),
            config,
            market_ws: Arc::new(FintachartsWebSocketClient::new(gateway_name)),
            event_sender: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &FintachartsConfig {
        &self.config
    }
}

/// Realtime endpoint with the access token attached as the `token` query pair
pub fn stream_url(ws_url: &str, token: &str) -> Result<Url, GatewayError> {
    let mut url = Url::parse(ws_url)
        .map_err(|e| GatewayError::Connect(format!("invalid WebSocket url {}: {}", ws_url, e)))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Build the level-1 subscription message for `req`
pub fn subscription_message(req: &SubscribeRequest, provider: &str, request_id: &str) -> Value {
    json!({
        "type": L1_SUBSCRIPTION,
        "id": request_id,
        "instrumentId": req.instrument_id,
        "provider": provider,
        "subscribe": true,
        "kinds": L1_KINDS,
        "token": req.token,
    })
}

/// Extract the last-trade tick from an `l1-snapshot` / `l1-update` message.
///
/// Other messages, and quotes without a usable `last` entry, yield `None`.
pub fn parse_l1_message(packet: &Value, tz: &Tz) -> Option<TickData> {
    let msg_type = packet.get("type").and_then(|t| t.as_str())?;
    if msg_type != L1_SNAPSHOT && msg_type != L1_UPDATE {
        return None;
    }

    let instrument_id = packet.get("instrumentId").and_then(|i| i.as_str())?;
    let last = packet.get("last")?;
    let price = last.get("price").and_then(|p| p.as_f64())?;
    let timestamp = last.get("timestamp").and_then(|t| t.as_str())?;

    match parse_iso_datetime(timestamp, tz) {
        Ok(datetime) => Some(TickData::new(instrument_id, datetime, price)),
        Err(e) => {
            warn!("Dropping quote with bad timestamp: {}", e);
            None
        }
    }
}

#[async_trait]
impl BaseGateway for FintachartsGateway {
    fn gateway_name(&self) -> &str {
        &self.gateway_name
    }

    async fn subscribe(&self, req: SubscribeRequest) -> Result<TickStream, GatewayError> {
        // One instrument at a time
        self.unsubscribe().await;

        let url = stream_url(&self.config.ws_url, &req.token)?;
        let (sender, stream) = mpsc::unbounded_channel();
        *self.event_sender.write().await = Some(sender.clone());

        let timezone = self.config.timezone;
        let tick_sender = sender.clone();
        let handler: WsMessageHandler = Arc::new(move |packet| {
            if let Some(tick) = parse_l1_message(&packet, &timezone) {
                let _ = tick_sender.send(GatewayEvent::Tick(tick));
            }
        });
        let close_handler: WsCloseHandler = Arc::new(move |e| {
            let _ = sender.send(GatewayEvent::Error(e));
        });

        self.market_ws.set_handler(handler).await;
        self.market_ws.set_close_handler(close_handler).await;
        self.market_ws.connect(&url).await?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let message = subscription_message(&req, &self.config.provider, &request_id);
        if let Err(e) = self.market_ws.send(&message).await {
            self.unsubscribe().await;
            return Err(e);
        }

        info!(
            "{}: Subscribed {} ({})",
            self.gateway_name, req.instrument_id, self.config.provider
        );
        Ok(stream)
    }

    async fn unsubscribe(&self) {
        self.market_ws.disconnect().await;
        if self.event_sender.write().await.take().is_some() {
            info!("{}: Unsubscribed", self.gateway_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_subscription_message() {
        let req = SubscribeRequest::new("ad9e5345-4c3b-41fc-9437-1d253f62db52", "secret");
        let message = subscription_message(&req, "oanda", "1");

        assert_eq!(message["type"], "l1-subscription");
        assert_eq!(message["id"], "1");
        assert_eq!(message["instrumentId"], "ad9e5345-4c3b-41fc-9437-1d253f62db52");
        assert_eq!(message["provider"], "oanda");
        assert_eq!(message["subscribe"], true);
        assert_eq!(message["kinds"], json!(["ask", "bid", "last"]));
        assert_eq!(message["token"], "secret");
    }

    #[test]
    fn test_stream_url() {
        let url = stream_url("wss://platform.fintacharts.com/api/streaming/ws/v1/realtime", "a b&c").unwrap();
        assert_eq!(url.path(), "/api/streaming/ws/v1/realtime");
        assert_eq!(url.query(), Some("token=a+b%26c"));

        let url = stream_url("ws://localhost:9000/ws?lang=en", "secret").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:9000/ws?lang=en&token=secret");

        assert!(matches!(stream_url("not a url", "secret"), Err(GatewayError::Connect(_))));
    }

    #[test]
    fn test_parse_l1_update() {
        let packet = json!({
            "type": "l1-update",
            "instrumentId": "EURUSD",
            "provider": "oanda",
            "last": {"timestamp": "2024-05-01T10:00:05.123Z", "price": 1.07153, "volume": 100},
            "ask": {"timestamp": "2024-05-01T10:00:05.123Z", "price": 1.0716, "volume": 100}
        });

        let tick = parse_l1_message(&packet, &Tz::UTC).unwrap();
        assert_eq!(tick.instrument_id, "EURUSD");
        assert_eq!(tick.last_price, 1.07153);
        assert_eq!(
            tick.datetime,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 5).unwrap() + chrono::Duration::milliseconds(123)
        );
    }

    #[test]
    fn test_parse_l1_ignores_other_messages() {
        let tz = Tz::UTC;

        // Quote without a trade
        let packet = json!({"type": "l1-snapshot", "instrumentId": "EURUSD", "ask": {"price": 1.0}});
        assert!(parse_l1_message(&packet, &tz).is_none());

        let packet = json!({"type": "response", "requestId": "1"});
        assert!(parse_l1_message(&packet, &tz).is_none());

        let packet = json!({
            "type": "l1-update",
            "instrumentId": "EURUSD",
            "last": {"timestamp": "yesterday", "price": 1.0}
        });
        assert!(parse_l1_message(&packet, &tz).is_none());
    }

    #[tokio::test]
    async fn test_subscribe_unreachable() {
        let config = FintachartsConfig {
            ws_url: "ws://127.0.0.1:1/ws".to_string(),
            ..FintachartsConfig::default()
        };
        let gateway = FintachartsGateway::new("FINTACHARTS", config);
        assert_eq!(gateway.gateway_name(), "FINTACHARTS");

        let result = gateway.subscribe(SubscribeRequest::new("EURUSD", "token")).await;
        assert!(matches!(result, Err(GatewayError::Connect(_))));

        gateway.unsubscribe().await;
    }

    #[tokio::test]
    async fn test_subscribe_sends_token_on_handshake() {
        use futures_util::StreamExt;
        use tokio::net::TcpListener;
        use tokio::sync::oneshot;
        use tokio_tungstenite::accept_hdr_async;
        use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
        use tokio_tungstenite::tungstenite::Message;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (uri_tx, uri_rx) = oneshot::channel::<String>();
        let (frame_tx, frame_rx) = oneshot::channel::<String>();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let _ = uri_tx.send(req.uri().to_string());
                Ok(resp)
            };
            let mut ws = accept_hdr_async(tcp, callback).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    let _ = frame_tx.send(text.as_str().to_string());
                    break;
                }
            }
        });

        let config = FintachartsConfig {
            ws_url: format!("ws://{}/ws", addr),
            ..FintachartsConfig::default()
        };
        let gateway = FintachartsGateway::new("FINTACHARTS", config);
        let _stream = gateway
            .subscribe(SubscribeRequest::new("EURUSD", "secret-token"))
            .await
            .unwrap();

        assert_eq!(uri_rx.await.unwrap(), "/ws?token=secret-token");

        let frame: Value = serde_json::from_str(&frame_rx.await.unwrap()).unwrap();
        assert_eq!(frame["type"], "l1-subscription");
        assert_eq!(frame["instrumentId"], "EURUSD");

        gateway.unsubscribe().await;
        server.await.unwrap();
    }
}
