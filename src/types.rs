//! Core domain types.

use chrono::{DateTime, Utc};

/// Top-of-book observation for one market at one instant.
///
/// Immutable once built: fields are private and only exposed through
/// accessors. Each value is one row of the append-only `rates` log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    ask: f64,
    bid: f64,
    timestamp: DateTime<Utc>,
}

impl Rate {
    #[must_use]
    pub fn new(ask: f64, bid: f64, timestamp: DateTime<Utc>) -> Self {
        Self { ask, bid, timestamp }
    }

    /// Best (lowest) sell price.
    #[must_use]
    pub fn ask(&self) -> f64 {
        self.ask
    }

    /// Best (highest) buy price.
    #[must_use]
    pub fn bid(&self) -> f64 {
        self.bid
    }

    /// Local fetch time, not the exchange's own timestamp.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
