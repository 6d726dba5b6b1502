//! Fintacharts market data gateway.
//!
//! Supports:
//! - Historical bars over REST (FintachartsDatafeed)
//! - Level-1 last-trade streaming over WebSocket (FintachartsGateway)

mod config;
mod constants;
mod datafeed;
mod gateway;
mod rest_client;
mod websocket_client;

pub use config::FintachartsConfig;
pub use constants::*;
pub use datafeed::FintachartsDatafeed;
pub use gateway::{parse_l1_message, subscription_message, FintachartsGateway};
pub use rest_client::FintachartsRestClient;
pub use websocket_client::FintachartsWebSocketClient;
