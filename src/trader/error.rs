//! Error types for the live candle series.

use thiserror::Error;

/// Failure of a historical bars request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Network or client-side failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("bars endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response did not have the expected shape
    #[error("malformed bars payload: {0}")]
    Malformed(String),

    /// No datafeed is configured
    #[error("no datafeed configured")]
    NotConfigured,
}

/// Failure of the tick stream collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("subscription failed: {0}")]
    Subscribe(String),

    #[error("tick stream closed")]
    Closed,

    #[error("{0}")]
    Stream(String),
}

/// Errors surfaced by the live series
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("no access token available")]
    MissingToken,

    #[error("no instrument selected")]
    MissingInstrument,

    #[error("history fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("tick stream failed: {0}")]
    Stream(#[from] GatewayError),

    #[error("invalid tick price {price}")]
    InvalidTick { price: f64 },

    #[error("unknown periodicity: {0}")]
    UnknownPeriodicity(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("invalid setting {key}: {value}")]
    InvalidSetting { key: String, value: String },
}

impl SeriesError {
    /// Missing credential or instrument: nothing was attempted
    pub fn is_precondition(&self) -> bool {
        matches!(self, SeriesError::MissingToken | SeriesError::MissingInstrument)
    }
}
