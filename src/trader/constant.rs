//! General constant enums used in the live candle series.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SeriesError;

/// Number of bars kept in the live series window
pub const DEFAULT_BAR_COUNT: usize = 20;

/// Largest window a configuration may ask for
pub const MAX_BAR_COUNT: usize = 10_000;

/// Display precision used when no bars are available
pub const DEFAULT_PRECISION: usize = 4;

/// Upper bound for the inferred display precision
pub const MAX_PRECISION: usize = 5;

/// Multiplier sent along with the periodicity when fetching history
pub const DEFAULT_INTERVAL_MULTIPLIER: u32 = 1;

/// Calendar granularity of a bar.
///
/// `Second` and `Quarter` are valid chart time units and are forwarded to the
/// history fetcher as-is, but live bar boundaries are not computed for them:
/// see [`crate::trader::period::period_start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Periodicity {
    /// Wire name used by the bars endpoint
    pub fn value(&self) -> &'static str {
        match self {
            Periodicity::Second => "second",
            Periodicity::Minute => "minute",
            Periodicity::Hour => "hour",
            Periodicity::Day => "day",
            Periodicity::Week => "week",
            Periodicity::Month => "month",
            Periodicity::Quarter => "quarter",
            Periodicity::Year => "year",
        }
    }

    /// Axis label
    pub fn display_name(&self) -> &'static str {
        match self {
            Periodicity::Second => "Second",
            Periodicity::Minute => "Minute",
            Periodicity::Hour => "Hour",
            Periodicity::Day => "Day",
            Periodicity::Week => "Week",
            Periodicity::Month => "Month",
            Periodicity::Quarter => "Quarter",
            Periodicity::Year => "Year",
        }
    }

    /// Whether live bar boundaries are computed natively for this unit
    pub fn is_bar_supported(&self) -> bool {
        !matches!(self, Periodicity::Second | Periodicity::Quarter)
    }

    /// Periodicities offered for selection
    pub fn all() -> Vec<Periodicity> {
        vec![
            Periodicity::Minute,
            Periodicity::Hour,
            Periodicity::Day,
            Periodicity::Week,
            Periodicity::Month,
            Periodicity::Year,
        ]
    }
}

impl Default for Periodicity {
    fn default() -> Self {
        Periodicity::Minute
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for Periodicity {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" => Ok(Periodicity::Second),
            "minute" => Ok(Periodicity::Minute),
            "hour" => Ok(Periodicity::Hour),
            "day" => Ok(Periodicity::Day),
            "week" => Ok(Periodicity::Week),
            "month" => Ok(Periodicity::Month),
            "quarter" => Ok(Periodicity::Quarter),
            "year" => Ok(Periodicity::Year),
            _ => Err(SeriesError::UnknownPeriodicity(s.to_string())),
        }
    }
}

/// Lifecycle state of the live series controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Idle,
    Loading,
    Live,
    Error,
}

impl ControllerState {
    pub fn value(&self) -> &'static str {
        match self {
            ControllerState::Idle => "idle",
            ControllerState::Loading => "loading",
            ControllerState::Live => "live",
            ControllerState::Error => "error",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Whether the bar generator currently has an open bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Empty,
    Open,
}
