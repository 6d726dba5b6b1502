//! Gateway module - Market data gateway implementations.
//!
//! - **fintacharts**: Fintacharts bars REST API and realtime WebSocket

pub mod fintacharts;

// Re-exports
pub use fintacharts::{FintachartsConfig, FintachartsDatafeed, FintachartsGateway};
