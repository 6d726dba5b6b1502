//! Fintacharts history datafeed.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::config::FintachartsConfig;
use super::constants::BARS_COUNT_BACK_PATH;
use super::rest_client::FintachartsRestClient;
use crate::trader::datafeed::BaseDatafeed;
use crate::trader::error::FetchError;
use crate::trader::object::HistoryRequest;

/// Datafeed backed by the `bars/count-back` endpoint
pub struct FintachartsDatafeed {
    rest_client: FintachartsRestClient,
    provider: String,
}

impl FintachartsDatafeed {
    pub fn new(config: &FintachartsConfig) -> Result<Self, FetchError> {
        Ok(Self {
            rest_client: FintachartsRestClient::new(&config.rest_host)?,
            provider: config.provider.clone(),
        })
    }

    /// Query parameters of a history request
    pub fn history_params(&self, req: &HistoryRequest) -> Vec<(&'static str, String)> {
        vec![
            ("instrumentId", req.instrument_id.clone()),
            ("provider", self.provider.clone()),
            ("interval", req.interval.to_string()),
            ("periodicity", req.periodicity.value().to_string()),
            ("barsCount", req.bars_count.to_string()),
        ]
    }
}

#[async_trait]
impl BaseDatafeed for FintachartsDatafeed {
    async fn init(&self) -> Result<bool, FetchError> {
        info!(
            "Fintacharts datafeed ready: {} (provider {})",
            self.rest_client.host(),
            self.provider
        );
        Ok(true)
    }

    async fn query_bar_history(&self, req: HistoryRequest, token: &str) -> Result<Value, FetchError> {
        let params = self.history_params(&req);
        self.rest_client.get(BARS_COUNT_BACK_PATH, &params, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trader::constant::Periodicity;

    #[test]
    fn test_history_params() {
        let datafeed = FintachartsDatafeed::new(&FintachartsConfig::default()).unwrap();
        let req = HistoryRequest::new("ebefe2c7-5ac9-43bb-a8b7-4a97bf2c2576", Periodicity::Hour, 20);

        let params = datafeed.history_params(&req);
        assert_eq!(
            params,
            vec![
                ("instrumentId", "ebefe2c7-5ac9-43bb-a8b7-4a97bf2c2576".to_string()),
                ("provider", "oanda".to_string()),
                ("interval", "1".to_string()),
                ("periodicity", "hour".to_string()),
                ("barsCount", "20".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_query_unreachable_host() {
        let config = FintachartsConfig {
            rest_host: "http://127.0.0.1:1".to_string(),
            ..FintachartsConfig::default()
        };
        let datafeed = FintachartsDatafeed::new(&config).unwrap();
        let req = HistoryRequest::new("EURUSD", Periodicity::Minute, 20);

        let result = datafeed.query_bar_history(req, "token").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
