//! Bar generator for folding live ticks into the bar series.
//!
//! Each tick either extends the newest bar or opens a new one, depending on
//! the boundary of the bar it falls into. Display precision is recomputed
//! after every change.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use super::bar_buffer::BarSeriesBuffer;
use super::constant::{GeneratorState, Periodicity, DEFAULT_PRECISION};
use super::error::SeriesError;
use super::object::{BarData, SeriesSnapshot, TickData};
use super::period::period_start;
use super::utility::infer_precision;

/// What a tick did to the series
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A bar was opened at `datetime`, possibly evicting the oldest bar
    NewBar {
        datetime: DateTime<Utc>,
        evicted: Option<BarData>,
    },
    /// The newest bar absorbed the price. `late` is set when the tick belongs
    /// to an older boundary than the newest bar.
    Extended { late: bool },
}

/// Aggregates ticks into a bounded bar series for one periodicity.
pub struct BarGenerator {
    periodicity: Periodicity,
    timezone: Tz,
    buffer: BarSeriesBuffer,
    precision: usize,
}

impl BarGenerator {
    /// Create a new, empty bar generator
    pub fn new(periodicity: Periodicity, timezone: Tz, capacity: usize) -> Self {
        Self {
            periodicity,
            timezone,
            buffer: BarSeriesBuffer::new(capacity),
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn periodicity(&self) -> Periodicity {
        self.periodicity
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn buffer(&self) -> &BarSeriesBuffer {
        &self.buffer
    }

    /// `Open` once the series has a newest bar to extend
    pub fn state(&self) -> GeneratorState {
        if self.buffer.is_empty() {
            GeneratorState::Empty
        } else {
            GeneratorState::Open
        }
    }

    /// Seed the series with historical bars, replacing anything held.
    ///
    /// The newest historical bar becomes the current bar.
    pub fn load_history(&mut self, bars: Vec<BarData>) {
        self.buffer.replace_all(bars);
        self.refresh_precision();
    }

    /// Update with a new tick
    pub fn update_tick(&mut self, tick: &TickData) -> Result<TickOutcome, SeriesError> {
        self.update_price(tick.last_price, &tick.datetime)
    }

    /// Fold `price` observed at `datetime` into the series.
    ///
    /// A tick falling into an older boundary than the newest bar (clock skew,
    /// reordering) is merged into the newest bar rather than opening or
    /// amending an older one. Display continuity is preferred over placing
    /// the price in its true bar.
    pub fn update_price(
        &mut self,
        price: f64,
        datetime: &DateTime<Utc>,
    ) -> Result<TickOutcome, SeriesError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(SeriesError::InvalidTick { price });
        }

        let boundary = period_start(datetime, self.periodicity, &self.timezone);

        let outcome = match self.buffer.last_datetime() {
            Some(last_boundary) if boundary <= last_boundary => {
                self.buffer.update_last(price);
                TickOutcome::Extended {
                    late: boundary < last_boundary,
                }
            }
            _ => {
                let evicted = self.buffer.push(BarData::new(boundary, price));
                TickOutcome::NewBar {
                    datetime: boundary,
                    evicted,
                }
            }
        };

        self.refresh_precision();
        debug!(
            "Tick {} at {} -> {:?}, bars {}, precision {}",
            price,
            datetime,
            outcome,
            self.buffer.len(),
            self.precision
        );

        Ok(outcome)
    }

    /// Drop every bar and restore the default precision
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.precision = DEFAULT_PRECISION;
    }

    /// Change the periodicity. Bars of another periodicity are meaningless
    /// here, so the series is reset.
    pub fn set_periodicity(&mut self, periodicity: Periodicity) {
        self.reset();
        self.periodicity = periodicity;
    }

    /// Immutable copy of the series for rendering
    pub fn snapshot(&self, instrument_id: Option<String>) -> SeriesSnapshot {
        SeriesSnapshot {
            instrument_id,
            periodicity: self.periodicity,
            bars: self.buffer.to_vec(),
            precision: self.precision,
        }
    }

    fn refresh_precision(&mut self) {
        self.precision = infer_precision(self.buffer.iter());
    }
}
