//! Fintacharts REST API client.

use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use super::constants::REST_TIMEOUT;
use crate::trader::error::FetchError;

/// REST API client for Fintacharts
pub struct FintachartsRestClient {
    /// HTTP client
    client: Client,
    /// Base URL
    host: String,
}

impl FintachartsRestClient {
    /// Create a new REST client for `host`
    pub fn new(host: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(REST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build request URL with query parameters
    pub fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, FetchError> {
        let base = format!("{}{}", self.host, path);
        Url::parse_with_params(&base, params)
            .map_err(|e| FetchError::Transport(format!("Invalid URL {}: {}", base, e)))
    }

    /// GET request authorized with a bearer token
    pub async fn get(&self, path: &str, params: &[(&str, String)], token: &str) -> Result<Value, FetchError> {
        let url = self.build_url(path, params)?;

        debug!("Fintacharts API request: GET {}", url);

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            if status.as_u16() == 401 {
                warn!("Fintacharts rejected the access token: {}", text);
            } else {
                error!("Fintacharts API error {}: {}", status, text);
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| FetchError::Malformed(format!("Failed to parse JSON: {} - {}", e, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fintacharts::constants::BARS_COUNT_BACK_PATH;

    #[test]
    fn test_build_url() {
        let client = FintachartsRestClient::new("https://platform.fintacharts.com/").unwrap();
        assert_eq!(client.host(), "https://platform.fintacharts.com");

        let params = [
            ("instrumentId", "ad9e5345-4c3b-41fc-9437-1d253f62db52".to_string()),
            ("provider", "oanda".to_string()),
            ("barsCount", "20".to_string()),
        ];
        let url = client.build_url(BARS_COUNT_BACK_PATH, &params).unwrap();

        assert_eq!(url.path(), "/api/bars/v1/bars/count-back");
        assert_eq!(
            url.query(),
            Some("instrumentId=ad9e5345-4c3b-41fc-9437-1d253f62db52&provider=oanda&barsCount=20")
        );
    }

    #[test]
    fn test_build_url_rejects_bad_host() {
        let client = FintachartsRestClient::new("not a host").unwrap();
        assert!(matches!(
            client.build_url("/x", &[]),
            Err(FetchError::Transport(_))
        ));
    }
}
