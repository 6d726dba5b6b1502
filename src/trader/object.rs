//! Basic data structures flowing through the live candle series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constant::{Periodicity, DEFAULT_INTERVAL_MULTIPLIER};

/// Candlestick bar of a certain period.
///
/// `datetime` is the bar boundary. `open_price` is fixed when the bar is
/// created; the other prices only move while the bar is the newest one in
/// its series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarData {
    pub datetime: DateTime<Utc>,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
}

impl BarData {
    /// Create a new bar from a single price
    pub fn new(datetime: DateTime<Utc>, price: f64) -> Self {
        Self {
            datetime,
            open_price: price,
            high_price: price,
            low_price: price,
            close_price: price,
        }
    }

    /// Create a bar from explicit OHLC values
    pub fn from_ohlc(datetime: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            datetime,
            open_price: open,
            high_price: high,
            low_price: low,
            close_price: close,
        }
    }

    /// Fold a price into the bar
    pub fn update(&mut self, price: f64) {
        self.high_price = self.high_price.max(price);
        self.low_price = self.low_price.min(price);
        self.close_price = price;
    }

    /// Open, high, low and close in that order
    pub fn prices(&self) -> [f64; 4] {
        [self.open_price, self.high_price, self.low_price, self.close_price]
    }
}

/// A single real-time price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickData {
    pub instrument_id: String,
    pub datetime: DateTime<Utc>,
    pub last_price: f64,
}

impl TickData {
    pub fn new(instrument_id: impl Into<String>, datetime: DateTime<Utc>, last_price: f64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            datetime,
            last_price,
        }
    }
}

/// Request for the most recent `bars_count` bars of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub instrument_id: String,
    pub interval: u32,
    pub periodicity: Periodicity,
    pub bars_count: usize,
}

impl HistoryRequest {
    pub fn new(instrument_id: impl Into<String>, periodicity: Periodicity, bars_count: usize) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            interval: DEFAULT_INTERVAL_MULTIPLIER,
            periodicity,
            bars_count,
        }
    }
}

/// Request sent to a gateway to open a tick stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub instrument_id: String,
    pub token: String,
}

impl SubscribeRequest {
    pub fn new(instrument_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            token: token.into(),
        }
    }
}

/// Immutable view of the series handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub instrument_id: Option<String>,
    pub periodicity: Periodicity,
    pub bars: Vec<BarData>,
    pub precision: usize,
}

impl SeriesSnapshot {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_bar(&self) -> Option<&BarData> {
        self.bars.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bar_update_keeps_open() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut bar = BarData::new(dt, 1.2345);

        bar.update(1.2360);
        bar.update(1.2300);
        bar.update(1.2350);

        assert_eq!(bar.open_price, 1.2345);
        assert_eq!(bar.high_price, 1.2360);
        assert_eq!(bar.low_price, 1.2300);
        assert_eq!(bar.close_price, 1.2350);
        assert_eq!(bar.datetime, dt);
    }

    #[test]
    fn test_history_request_defaults() {
        let req = HistoryRequest::new("EURUSD", Periodicity::Hour, 20);
        assert_eq!(req.interval, 1);
        assert_eq!(req.bars_count, 20);
    }
}
