//! Abstract collaborators feeding the live series: the tick stream gateway
//! and the access token provider.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::GatewayError;
use super::object::{SubscribeRequest, TickData};

/// Event delivered on a tick stream
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Tick(TickData),
    /// The stream failed; no more ticks follow
    Error(GatewayError),
}

/// Receiving half of a tick stream. Unbounded: tick volume for a single
/// instrument is low.
pub type TickStream = mpsc::UnboundedReceiver<GatewayEvent>;

/// Sending half handed to gateway implementations
pub type GatewayEventSender = mpsc::UnboundedSender<GatewayEvent>;

/// Gateway delivering price ticks for one subscribed instrument.
///
/// Implementations should:
/// - deliver ticks in non-decreasing time order where they can (consumers
///   tolerate violations)
/// - end the stream with [`GatewayEvent::Error`] or by dropping the sender
///   when the connection is lost
/// - make [`BaseGateway::unsubscribe`] idempotent
#[async_trait]
pub trait BaseGateway: Send + Sync {
    /// Get the gateway name
    fn gateway_name(&self) -> &str;

    /// Open a tick stream for the instrument in `req`
    async fn subscribe(&self, req: SubscribeRequest) -> Result<TickStream, GatewayError>;

    /// Close the current tick stream, if any
    async fn unsubscribe(&self);
}

/// Supplies the bearer credential used for history and tick requests
pub trait TokenProvider: Send + Sync {
    /// Current access token, `None` when not logged in
    fn access_token(&self) -> Option<String>;
}

/// Token provider returning a fixed value
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: if token.trim().is_empty() { None } else { Some(token) },
        }
    }

    pub fn empty() -> Self {
        Self { token: None }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}
