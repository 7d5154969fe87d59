//! Per-actor usage state.
//!
//! An actor's state is created lazily on its first admission check. Every
//! window resets lazily: nothing is decremented in the background, an
//! expired window is zeroed the next time it is checked.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window lengths in seconds.
pub const MINUTE_SECS: i64 = 60;
pub const HOUR_SECS: i64 = 3_600;
pub const DAY_SECS: i64 = 86_400;

/// One fixed-length request window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowCounter {
    /// Admissions counted in the current window.
    pub count: u32,
    /// When the window rolls over. `None` until the first admission.
    pub reset_time: Option<DateTime<Utc>>,
}

impl WindowCounter {
    /// Returns true once `now` has reached the reset time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.reset_time.is_some_and(|reset| now >= reset)
    }

    /// Starts a fresh window at `now`.
    pub fn reset(&mut self, now: DateTime<Utc>, length_secs: i64) {
        self.count = 0;
        self.reset_time = Some(now + Duration::seconds(length_secs));
    }

    /// Sets the reset time if none was recorded yet.
    pub fn ensure_started(&mut self, now: DateTime<Utc>, length_secs: i64) {
        if self.reset_time.is_none() {
            self.reset_time = Some(now + Duration::seconds(length_secs));
        }
    }

    /// Admissions left under `limit`, floored at zero.
    pub fn remaining(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.count)
    }
}

/// Daily spend accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAccumulator {
    /// Estimated spend in the current day window.
    pub total: f64,
    /// When the spend rolls over. `None` until the first admission.
    pub reset_time: Option<DateTime<Utc>>,
}

impl CostAccumulator {
    /// Returns true once `now` has reached the reset time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.reset_time.is_some_and(|reset| now >= reset)
    }

    /// Zeroes the spend and starts a new day at `now`.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.total = 0.0;
        self.reset_time = Some(now + Duration::seconds(DAY_SECS));
    }

    /// Sets the reset time if none was recorded yet.
    pub fn ensure_started(&mut self, now: DateTime<Utc>) {
        if self.reset_time.is_none() {
            self.reset_time = Some(now + Duration::seconds(DAY_SECS));
        }
    }

    /// Spend that still counts at `now`: zero once the day has rolled over.
    pub fn effective_total(&self, now: DateTime<Utc>) -> f64 {
        if self.is_expired(now) {
            0.0
        } else {
            self.total
        }
    }
}

/// Everything the limiter tracks for one actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorUsageState {
    pub minute: WindowCounter,
    pub hour: WindowCounter,
    pub day: WindowCounter,
    pub cost: CostAccumulator,
    /// Requests currently holding a slot. Never negative.
    pub concurrent: u32,
    /// Set when the store dropped this entry; holders must look it up again.
    #[serde(skip)]
    pub(crate) retired: bool,
}

impl ActorUsageState {
    /// True when all four reset times are in the past.
    ///
    /// A state whose windows never started is not expired; it is only
    /// reachable between creation and the first admission.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.minute.is_expired(now)
            && self.hour.is_expired(now)
            && self.day.is_expired(now)
            && self.cost.is_expired(now)
    }

    /// Whether the store has dropped this entry.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Marks the entry as dropped by the store.
    pub fn retire(&mut self) {
        self.retired = true;
    }
}
