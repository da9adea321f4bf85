/// Lookback window validation and bounds.
///
/// A window is the trailing `days`-day interval ending at the current UTC
/// instant. Every layer that accepts a `days` parameter (report boundary,
/// aggregator, observation stores) validates it through `LookbackWindow::new`
/// so the `[1, 30]` bound lives in one place.
///
/// # Clock injection
/// Functions that depend on the current time take `now: DateTime<Utc>`
/// instead of calling `Utc::now()` internally, which keeps window tests
/// deterministic.

use chrono::{DateTime, Duration, Utc};

use crate::model::ReportError;

/// Smallest accepted lookback, in days.
pub const MIN_WINDOW_DAYS: i64 = 1;

/// Largest accepted lookback, in days.
pub const MAX_WINDOW_DAYS: i64 = 30;

/// A validated number of trailing days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    days: i64,
}

impl LookbackWindow {
    /// Returns `ReportError::InvalidWindow` when `days` is outside `[1, 30]`.
    pub fn new(days: i64) -> Result<Self, ReportError> {
        if (MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&days) {
            Ok(Self { days })
        } else {
            Err(ReportError::InvalidWindow(days))
        }
    }

    pub fn days(&self) -> i64 {
        self.days
    }

    /// Exclusive lower bound of the window: `now - days`.
    pub fn start_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days)
    }

    /// Whether an observation taken at `observed_on` falls inside the window.
    ///
    /// The lower bound is strict and there is no upper bound: records dated
    /// after `now` are still returned.
    pub fn contains_at(&self, observed_on: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        observed_on > self.start_at(now)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
