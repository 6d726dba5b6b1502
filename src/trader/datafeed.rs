//! Datafeed abstraction for historical bars.

use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use super::error::FetchError;
use super::object::{BarData, HistoryRequest};
use super::utility::parse_iso_datetime;

/// Source of historical bars.
///
/// Implementations return the raw response body; shape checking happens in
/// [`parse_bar_history`]. Request timeouts are the implementation's concern.
#[async_trait]
pub trait BaseDatafeed: Send + Sync {
    /// Initialize datafeed service connection
    async fn init(&self) -> Result<bool, FetchError> {
        Ok(false)
    }

    /// Query the most recent bars described by `req`
    async fn query_bar_history(&self, _req: HistoryRequest, _token: &str) -> Result<Value, FetchError> {
        Err(FetchError::NotConfigured)
    }
}

/// Datafeed used when nothing is configured
pub struct EmptyDatafeed;

impl EmptyDatafeed {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmptyDatafeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDatafeed for EmptyDatafeed {
    async fn init(&self) -> Result<bool, FetchError> {
        tracing::warn!("No datafeed configured, history queries will fail");
        Ok(false)
    }
}

/// Bar as sent by the bars endpoint. Volume (`v`) is not used.
#[derive(Debug, Deserialize)]
struct InstrumentBar {
    t: String,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

/// Convert a bars response `{ "data": [{t, o, h, l, c, v}, ...] }` into bars.
///
/// Timestamps become bar boundaries as-is and prices are copied verbatim. A
/// missing or non-array `data` field, or any malformed element, fails the
/// whole response.
pub fn parse_bar_history(payload: &Value, tz: &Tz) -> Result<Vec<BarData>, FetchError> {
    let data = payload
        .get("data")
        .ok_or_else(|| FetchError::Malformed("response has no \"data\" field".to_string()))?;

    let items = data.as_array().ok_or_else(|| {
        FetchError::Malformed(format!("\"data\" is not an array: {}", data))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(ix, item)| {
            let raw: InstrumentBar = serde_json::from_value(item.clone())
                .map_err(|e| FetchError::Malformed(format!("bar {}: {}", ix, e)))?;
            let datetime = parse_iso_datetime(&raw.t, tz)
                .map_err(|e| FetchError::Malformed(format!("bar {}: {}", ix, e)))?;
            Ok(BarData::from_ohlc(datetime, raw.o, raw.h, raw.l, raw.c))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trader::constant::Periodicity;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_empty_datafeed() {
        let datafeed = EmptyDatafeed::new();

        let result = tokio_test::block_on(datafeed.init());
        assert!(!result.unwrap());

        let req = HistoryRequest::new("EURUSD", Periodicity::Minute, 20);
        let result = tokio_test::block_on(datafeed.query_bar_history(req, "token"));
        assert_eq!(result.unwrap_err(), FetchError::NotConfigured);
    }

    #[test]
    fn test_parse_bar_history() {
        let payload = json!({
            "data": [
                {"t": "2024-05-01T10:00:00+00:00", "o": 1.0712, "h": 1.0718, "l": 1.0709, "c": 1.0715, "v": 120},
                {"t": "2024-05-01T10:01:00+00:00", "o": 1.0715, "h": 1.072, "l": 1.0711, "c": 1.0719, "v": 87}
            ]
        });

        let bars = parse_bar_history(&payload, &Tz::UTC).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].datetime, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        assert_eq!(bars[0].prices(), [1.0712, 1.0718, 1.0709, 1.0715]);
        assert_eq!(bars[1].high_price, 1.072);
    }

    #[test]
    fn test_parse_bar_history_rejects_non_array_data() {
        let tz = Tz::UTC;

        let err = parse_bar_history(&json!({"data": {"t": "x"}}), &tz).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));

        let err = parse_bar_history(&json!({"data": null}), &tz).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));

        let err = parse_bar_history(&json!({"bars": []}), &tz).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));

        let err = parse_bar_history(&json!([1, 2, 3]), &tz).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_parse_bar_history_rejects_bad_element() {
        let tz = Tz::UTC;
        let payload = json!({"data": [{"t": "2024-05-01T10:00:00Z", "o": "1.0", "h": 1.0, "l": 1.0, "c": 1.0}]});
        assert!(parse_bar_history(&payload, &tz).is_err());

        let payload = json!({"data": [{"t": "not a time", "o": 1.0, "h": 1.0, "l": 1.0, "c": 1.0}]});
        assert!(parse_bar_history(&payload, &tz).is_err());
    }

    #[test]
    fn test_parse_empty_history() {
        let bars = parse_bar_history(&json!({"data": []}), &Tz::UTC).unwrap();
        assert!(bars.is_empty());
    }
}
