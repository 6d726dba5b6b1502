//! General utility functions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use super::constant::{DEFAULT_PRECISION, MAX_PRECISION};
use super::error::SeriesError;
use super::object::BarData;

/// Name of the data folder looked up in cwd and then in home
const DATA_FOLDER_NAME: &str = ".candlefeed";

/// Get data directory
fn get_data_dir(temp_name: &str) -> (PathBuf, PathBuf) {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let temp_path = cwd.join(temp_name);

    if temp_path.exists() {
        return (cwd, temp_path);
    }

    let home_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let temp_path = home_path.join(temp_name);

    if !temp_path.exists() {
        let _ = fs::create_dir_all(&temp_path);
    }

    (home_path, temp_path)
}

/// Data directory holding settings and logs
pub static TEMP_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    let (_, temp_dir) = get_data_dir(DATA_FOLDER_NAME);
    temp_dir
});

/// Get path for a file in the data directory
pub fn get_file_path(filename: &str) -> PathBuf {
    TEMP_DIR.join(filename)
}

/// Get path for a folder in the data directory, creating it if needed
pub fn get_folder_path(folder_name: &str) -> PathBuf {
    let folder_path = TEMP_DIR.join(folder_name);
    if !folder_path.exists() {
        let _ = fs::create_dir_all(&folder_path);
    }
    folder_path
}

/// Get number of digits after decimal point.
///
/// Counts the fractional digits of the shortest decimal representation that
/// round-trips to `value`, i.e. the digits the upstream feed actually sent.
pub fn get_digits(value: f64) -> usize {
    let value_str = format!("{}", value);

    match value_str.split_once('.') {
        Some((_, fraction)) => fraction.len(),
        None => 0,
    }
}

/// Display precision for a set of bars.
///
/// The largest fractional digit count over every open/high/low/close value,
/// clamped to `MAX_PRECISION`. An empty set yields `DEFAULT_PRECISION`.
pub fn infer_precision<'a, I>(bars: I) -> usize
where
    I: IntoIterator<Item = &'a BarData>,
{
    let mut bars = bars.into_iter().peekable();
    if bars.peek().is_none() {
        return DEFAULT_PRECISION;
    }

    bars.flat_map(|bar| bar.prices())
        .map(get_digits)
        .max()
        .unwrap_or(0)
        .min(MAX_PRECISION)
}

/// Render a price with exactly `precision` fractional digits
pub fn format_price(value: f64, precision: usize) -> String {
    match Decimal::from_f64(value) {
        Some(d) => {
            let mut rounded = d.round_dp(precision as u32);
            rounded.rescale(precision as u32);
            rounded.to_string()
        }
        None => format!("{:.*}", precision, value),
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Strings carrying an offset are taken as-is; offset-less strings are wall
/// time in `tz`.
pub fn parse_iso_datetime(value: &str, tz: &Tz) -> Result<DateTime<Utc>, SeriesError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| SeriesError::InvalidTimestamp(value.to_string()))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| SeriesError::InvalidTimestamp(value.to_string()))
}
