//! Fintacharts API constants.

use std::time::Duration;

// ============================================================================
// Hosts
// ============================================================================

/// REST API host (production)
pub const REST_HOST: &str = "https://platform.fintacharts.com";

/// Realtime WebSocket endpoint (production)
pub const WS_HOST: &str = "wss://platform.fintacharts.com/api/streaming/ws/v1/realtime";

/// Bars endpoint returning the most recent `barsCount` bars
pub const BARS_COUNT_BACK_PATH: &str = "/api/bars/v1/bars/count-back";

/// Market data provider used when none is configured
pub const DEFAULT_PROVIDER: &str = "oanda";

/// Timeout of a single REST request
pub const REST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Streaming message types
// ============================================================================

pub const L1_SUBSCRIPTION: &str = "l1-subscription";
pub const L1_SNAPSHOT: &str = "l1-snapshot";
pub const L1_UPDATE: &str = "l1-update";

/// Quote kinds requested on subscription
pub const L1_KINDS: [&str; 3] = ["ask", "bid", "last"];
