//! Fintacharts connection configuration.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_PROVIDER, REST_HOST, WS_HOST};
use crate::trader::period::parse_timezone;
use crate::trader::setting::Settings;

/// Endpoints and provider of a Fintacharts connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FintachartsConfig {
    /// REST host, without trailing slash
    #[serde(default = "default_rest_host")]
    pub rest_host: String,
    /// Realtime WebSocket URL
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Market data provider (oanda, ...)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Zone for timestamps that carry no offset
    #[serde(skip, default = "default_timezone")]
    pub timezone: Tz,
}

fn default_rest_host() -> String {
    REST_HOST.to_string()
}

fn default_ws_url() -> String {
    WS_HOST.to_string()
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_timezone() -> Tz {
    Tz::UTC
}

impl Default for FintachartsConfig {
    fn default() -> Self {
        Self {
            rest_host: default_rest_host(),
            ws_url: default_ws_url(),
            provider: default_provider(),
            timezone: default_timezone(),
        }
    }
}

impl FintachartsConfig {
    /// Create from `fintacharts.*` and `chart.timezone` settings
    pub fn from_settings(settings: &Settings) -> Self {
        let non_blank = |key: &str| settings.get_string(key).filter(|s| !s.trim().is_empty());

        let rest_host = non_blank("fintacharts.rest_host")
            .map(|host| host.trim_end_matches('/').to_string())
            .unwrap_or_else(default_rest_host);
        let ws_url = non_blank("fintacharts.ws_url").unwrap_or_else(default_ws_url);
        let provider = non_blank("fintacharts.provider").unwrap_or_else(default_provider);
        let timezone = settings
            .get_string("chart.timezone")
            .and_then(|name| parse_timezone(&name).ok())
            .unwrap_or_else(default_timezone);

        Self {
            rest_host,
            ws_url,
            provider,
            timezone,
        }
    }
}
