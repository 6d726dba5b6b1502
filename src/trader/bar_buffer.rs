//! Bounded window of bars ordered by bar boundary.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::constant::DEFAULT_BAR_COUNT;
use super::object::BarData;

/// Fixed capacity sequence of bars.
///
/// Invariants: `len() <= capacity()`, bars strictly ascending by `datetime`
/// (so at most one bar per boundary). Only the newest bar can be modified and
/// only through [`BarSeriesBuffer::update_last`], which never touches its open
/// price or boundary.
#[derive(Debug, Clone)]
pub struct BarSeriesBuffer {
    bars: VecDeque<BarData>,
    capacity: usize,
}

impl BarSeriesBuffer {
    /// Create an empty buffer holding at most `capacity` bars (at least one).
    /// Storage grows with the bars pushed, not with `capacity`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity.min(DEFAULT_BAR_COUNT) + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Newest bar
    pub fn last(&self) -> Option<&BarData> {
        self.bars.back()
    }

    /// Boundary of the newest bar
    pub fn last_datetime(&self) -> Option<DateTime<Utc>> {
        self.bars.back().map(|bar| bar.datetime)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BarData> {
        self.bars.iter()
    }

    /// Copy of the bars, oldest first
    pub fn to_vec(&self) -> Vec<BarData> {
        self.bars.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }

    /// Append a bar newer than every bar held, evicting the oldest one when
    /// the capacity is exceeded. Returns the evicted bar.
    ///
    /// A bar whose boundary is not after the newest boundary would break the
    /// ordering and is dropped.
    pub fn push(&mut self, bar: BarData) -> Option<BarData> {
        if let Some(last) = self.last_datetime() {
            if bar.datetime <= last {
                warn!(
                    "Dropping bar at {} not after newest bar at {}",
                    bar.datetime, last
                );
                return None;
            }
        }

        self.bars.push_back(bar);
        if self.bars.len() > self.capacity {
            self.bars.pop_front()
        } else {
            None
        }
    }

    /// Fold a price into the newest bar
    pub fn update_last(&mut self, price: f64) -> Option<&BarData> {
        let bar = self.bars.back_mut()?;
        bar.update(price);
        Some(&*bar)
    }

    /// Replace the whole content with `history`.
    ///
    /// Bars are ordered by boundary, a repeated boundary keeps the bar seen
    /// last, and only the newest `capacity` bars are retained.
    pub fn replace_all(&mut self, history: Vec<BarData>) {
        let mut sorted = history;
        sorted.sort_by_key(|bar| bar.datetime);

        self.bars.clear();
        for bar in sorted {
            if self.last_datetime() == Some(bar.datetime) {
                self.bars.pop_back();
            }
            self.bars.push_back(bar);
        }

        while self.bars.len() > self.capacity {
            self.bars.pop_front();
        }
    }
}

impl Default for BarSeriesBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BAR_COUNT)
    }
}
