//! Candle Feed - A live OHLC candle series engine written in Rust
//!
//! This crate keeps a fixed-size window of candlestick bars for one
//! instrument up to date:
//!
//! - Seeds the window from a historical bars endpoint
//! - Aggregates streaming price ticks into the open bar, rolling over on
//!   period boundaries in a configurable reference time zone
//! - Infers the display precision from the prices it has seen
//! - Drives the load/stream lifecycle, discarding results of superseded
//!   selections
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use candle_feed::gateway::{FintachartsConfig, FintachartsDatafeed, FintachartsGateway};
//! use candle_feed::trader::{
//!     LiveSeriesController, LoggingRenderSink, Periodicity, SeriesSettings, StaticTokenProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FintachartsConfig::default();
//!     let mut controller = LiveSeriesController::new(
//!         SeriesSettings::default(),
//!         Arc::new(StaticTokenProvider::new("access-token")),
//!         Arc::new(FintachartsDatafeed::new(&config)?),
//!         Arc::new(FintachartsGateway::new("FINTACHARTS", config)),
//!         Box::new(LoggingRenderSink::new()),
//!     );
//!
//!     controller.select(Some("ad9e5345-4c3b-41fc-9437-1d253f62db52"), Periodicity::Minute).await?;
//!     loop {
//!         controller.step().await?;
//!     }
//! }
//! ```

pub mod gateway;
pub mod trader;

// Re-export commonly used types
pub use trader::{
    // Constants
    ControllerState, Periodicity,
    // Data objects
    BarData, SeriesSnapshot, TickData,
    // Requests
    HistoryRequest, SubscribeRequest,
    // Engine
    LiveSeriesController, LoggingRenderSink, RenderSink,
    // Collaborators
    BaseDatafeed, BaseGateway, GatewayEvent, StaticTokenProvider, TokenProvider,
    // Series
    BarGenerator, BarSeriesBuffer,
    // Errors
    FetchError, GatewayError, SeriesError,
};

// Re-export Fintacharts transport
pub use gateway::fintacharts::{FintachartsDatafeed, FintachartsGateway};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
