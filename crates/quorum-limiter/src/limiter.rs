//! # Rate Limiter
//!
//! Admission decisions for one actor on one platform.
//!
//! ## Check Order
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! | # | Check | Denial reason |
//! |---|-------|---------------|
//! | 1 | in-flight requests | "Too many concurrent requests" |
//! | 2 | estimated tokens | "Request exceeds maximum token limit" |
//! | 3 | spend + estimate | "Daily cost limit exceeded" |
//! | 4 | minute window | "Minute rate limit exceeded" |
//! | 5 | hour window | "Hourly rate limit exceeded" |
//! | 6 | day window | "Daily rate limit exceeded" |
//!
//! Checks 1-3 never mutate state. Checks 4-6 reset an expired window as a
//! side effect, even when a later window still denies.
//!
//! ## Fail-Open
//!
//! If the usage store fails, the request is admitted with `remaining = 0`,
//! `fail_open = true` and no slot held. An outage of the accounting layer
//! must not become an outage of the product.
//!
//! ## Example
//!
//! ```rust
//! use quorum_limiter::{LimiterConfig, OperationKind, RateLimiter};
//!
//! let limiter = RateLimiter::new(LimiterConfig::default())?;
//! let result = limiter.check_rate_limit("u1", "twitter", OperationKind::Analysis, 0.01, 800);
//! assert!(result.allowed);
//!
//! {
//!     let _slot = limiter.slot_guard("u1");
//!     // ... run the request ...
//! } // slot released here
//!
//! assert_eq!(limiter.get_current_usage("u1")?.unwrap().concurrent, 0);
//! # Ok::<(), quorum_limiter::LimiterError>(())
//! ```

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{LimiterConfig, OperationKind, RateLimitConfig, RateLimitConfigPatch};
use crate::error::Result;
use crate::store::{InMemoryUsageStore, UsageStore};
use crate::usage::{ActorUsageState, DAY_SECS, HOUR_SECS, MINUTE_SECS};

/// Platform key that addresses the fallback budget in
/// [`RateLimiter::update_platform_config`].
pub const DEFAULT_PLATFORM_KEY: &str = "default";

/// Why an admission was refused, or flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitReason {
    TooManyConcurrent,
    TokenLimit,
    DailyCost,
    MinuteWindow,
    HourWindow,
    DayWindow,
    /// Not a denial: the store failed and the request was admitted anyway.
    StoreUnavailable,
}

impl fmt::Display for LimitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TooManyConcurrent => "Too many concurrent requests",
            Self::TokenLimit => "Request exceeds maximum token limit",
            Self::DailyCost => "Daily cost limit exceeded",
            Self::MinuteWindow => "Minute rate limit exceeded",
            Self::HourWindow => "Hourly rate limit exceeded",
            Self::DayWindow => "Daily rate limit exceeded",
            Self::StoreUnavailable => "Usage tracking unavailable, admitted without accounting",
        })
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitResult {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Smallest number of admissions left across the three windows.
    pub remaining: u32,
    /// When the relevant window rolls over.
    pub reset_time: DateTime<Utc>,
    /// Spend left for the day.
    pub cost_remaining: f64,
    /// Denial reason, or the fail-open flag.
    pub reason: Option<LimitReason>,
    /// True when the store failed and nothing was accounted.
    pub fail_open: bool,
}

impl RateLimitResult {
    fn fail_open(now: DateTime<Utc>, limits: &RateLimitConfig) -> Self {
        Self {
            allowed: true,
            remaining: 0,
            reset_time: now + ChronoDuration::seconds(MINUTE_SECS),
            cost_remaining: limits.max_cost_per_day,
            reason: Some(LimitReason::StoreUnavailable),
            fail_open: true,
        }
    }

    /// Returns the reason as its client-facing message.
    pub fn reason_message(&self) -> Option<String> {
        self.reason.map(|r| r.to_string())
    }
}

/// Per-actor admission controller.
pub struct RateLimiter {
    config: RwLock<LimiterConfig>,
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter backed by memory and the system clock.
    pub fn new(config: LimiterConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Arc::new(InMemoryUsageStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// Creates a limiter with an explicit store and clock.
    pub fn with_parts(
        config: LimiterConfig,
        store: Arc<dyn UsageStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(config),
            store,
            clock,
        })
    }

    /// Interval configured for the expired-usage sweep.
    pub fn cleanup_interval(&self) -> Duration {
        self.config.read().cleanup_interval()
    }

    /// Decides whether `actor` may run one more request on `platform`.
    ///
    /// On admission the three windows, the spend and the in-flight count are
    /// all incremented. The caller must release the slot with
    /// [`release_concurrent_slot`](Self::release_concurrent_slot) or a
    /// [`SlotGuard`] unless the result is `fail_open`.
    pub fn check_rate_limit(
        &self,
        actor: &str,
        platform: &str,
        operation: OperationKind,
        estimated_cost: f64,
        estimated_tokens: u32,
    ) -> RateLimitResult {
        let limits = self.get_platform_config(platform);
        let now = self.clock.now();

        let outcome = self.with_live_state(actor, |state| {
            evaluate(state, &limits, now, estimated_cost, estimated_tokens)
        });

        match outcome {
            Ok(result) => {
                if result.allowed {
                    debug!(
                        actor,
                        platform,
                        %operation,
                        remaining = result.remaining,
                        cost_remaining = result.cost_remaining,
                        "request admitted"
                    );
                } else {
                    info!(
                        actor,
                        platform,
                        %operation,
                        reason = ?result.reason_message(),
                        "request denied"
                    );
                }
                result
            }
            Err(e) => {
                warn!(actor, platform, %operation, error = %e, "usage store failed, failing open");
                RateLimitResult::fail_open(now, &limits)
            }
        }
    }

    /// Gives back one in-flight slot. Floors at zero; unknown actors are a no-op.
    pub fn release_concurrent_slot(&self, actor: &str) {
        match self.store.get(actor) {
            Ok(Some(handle)) => {
                let mut state = handle.lock();
                state.concurrent = state.concurrent.saturating_sub(1);
            }
            Ok(None) => debug!(actor, "release for untracked actor ignored"),
            Err(e) => warn!(actor, error = %e, "failed to release concurrency slot"),
        }
    }

    /// Returns a guard that releases one slot for `actor` when dropped.
    pub fn slot_guard(&self, actor: &str) -> SlotGuard<'_> {
        SlotGuard {
            limiter: self,
            actor: actor.to_string(),
            armed: true,
        }
    }

    /// Snapshot of an actor's counters.
    pub fn get_current_usage(&self, actor: &str) -> Result<Option<ActorUsageState>> {
        Ok(self.store.get(actor)?.map(|handle| handle.lock().clone()))
    }

    /// Forgets everything tracked for `actor`. Returns true if it was tracked.
    pub fn reset_user_usage(&self, actor: &str) -> Result<bool> {
        let removed = self.store.remove(actor)?;
        if removed {
            info!(actor, "usage reset");
        }
        Ok(removed)
    }

    /// Budget applied to `platform` (case-insensitive).
    pub fn get_platform_config(&self, platform: &str) -> RateLimitConfig {
        let config = self.config.read();
        config
            .platforms
            .get(&platform.to_ascii_lowercase())
            .copied()
            .unwrap_or(config.default_limits)
    }

    /// Applies `patch` to the budget of `platform` and returns the result.
    ///
    /// A platform without an entry starts from the default budget. The key
    /// [`DEFAULT_PLATFORM_KEY`] patches the default budget itself.
    pub fn update_platform_config(
        &self,
        platform: &str,
        patch: RateLimitConfigPatch,
    ) -> Result<RateLimitConfig> {
        let key = platform.to_ascii_lowercase();
        let mut config = self.config.write();

        let mut updated = if key == DEFAULT_PLATFORM_KEY {
            config.default_limits
        } else {
            config
                .platforms
                .get(&key)
                .copied()
                .unwrap_or(config.default_limits)
        };
        updated.apply(&patch);
        updated.validate()?;

        if key == DEFAULT_PLATFORM_KEY {
            config.default_limits = updated;
        } else {
            config.platforms.insert(key.clone(), updated);
        }

        info!(platform = %key, ?updated, "platform budget updated");
        Ok(updated)
    }

    /// Drops every actor whose four windows have all expired.
    ///
    /// Actors are removed one at a time; admissions for other actors are
    /// never blocked by the sweep.
    pub fn cleanup_expired_usage(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut removed = 0;

        for actor in self.store.actors()? {
            if self.store.remove_if_expired(&actor, now)? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "expired usage swept");
        }
        Ok(removed)
    }

    /// Runs [`cleanup_expired_usage`](Self::cleanup_expired_usage) every
    /// `interval` until `shutdown` flips to true or its sender is dropped.
    pub fn spawn_cleanup_task(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.cleanup_expired_usage() {
                            warn!(error = %e, "usage sweep failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("usage sweep stopped");
                            break;
                        }
                    }
                }
            }
        })
    }

    // A handle can be retired by the sweep between lookup and lock; retry
    // so the update lands on the live entry.
    fn with_live_state<R>(
        &self,
        actor: &str,
        f: impl FnOnce(&mut ActorUsageState) -> R,
    ) -> Result<R> {
        loop {
            let handle = self.store.entry(actor)?;
            let mut state = handle.lock();
            if !state.is_retired() {
                return Ok(f(&mut *state));
            }
        }
    }
}

/// Runs the six checks against one actor's state.
fn evaluate(
    state: &mut ActorUsageState,
    limits: &RateLimitConfig,
    now: DateTime<Utc>,
    estimated_cost: f64,
    estimated_tokens: u32,
) -> RateLimitResult {
    if state.concurrent >= limits.concurrent_requests {
        return denial(state, limits, now, LimitReason::TooManyConcurrent, None);
    }

    if estimated_tokens > limits.max_tokens_per_request {
        return denial(state, limits, now, LimitReason::TokenLimit, None);
    }

    if state.cost.effective_total(now) + estimated_cost > limits.max_cost_per_day {
        let reset = state.cost.reset_time.filter(|t| *t > now);
        return denial(state, limits, now, LimitReason::DailyCost, reset);
    }

    let windows = [
        (limits.requests_per_minute, MINUTE_SECS, LimitReason::MinuteWindow),
        (limits.requests_per_hour, HOUR_SECS, LimitReason::HourWindow),
        (limits.requests_per_day, DAY_SECS, LimitReason::DayWindow),
    ];
    for (limit, length, reason) in windows {
        let window = match reason {
            LimitReason::MinuteWindow => &mut state.minute,
            LimitReason::HourWindow => &mut state.hour,
            _ => &mut state.day,
        };
        if window.is_expired(now) {
            window.reset(now, length);
        } else if window.count >= limit {
            let reset = window.reset_time;
            return denial(state, limits, now, reason, reset);
        }
    }

    if state.cost.is_expired(now) {
        state.cost.reset(now);
    }

    state.minute.count += 1;
    state.hour.count += 1;
    state.day.count += 1;
    state.concurrent += 1;
    state.cost.total += estimated_cost;

    state.minute.ensure_started(now, MINUTE_SECS);
    state.hour.ensure_started(now, HOUR_SECS);
    state.day.ensure_started(now, DAY_SECS);
    state.cost.ensure_started(now);

    RateLimitResult {
        allowed: true,
        remaining: remaining(state, limits),
        reset_time: earliest_reset(state).unwrap_or(now),
        cost_remaining: limits.max_cost_per_day - state.cost.total,
        reason: None,
        fail_open: false,
    }
}

fn denial(
    state: &ActorUsageState,
    limits: &RateLimitConfig,
    now: DateTime<Utc>,
    reason: LimitReason,
    reset: Option<DateTime<Utc>>,
) -> RateLimitResult {
    let reset_time = reset
        .or_else(|| earliest_reset(state).filter(|t| *t > now))
        .unwrap_or_else(|| now + ChronoDuration::seconds(MINUTE_SECS));

    RateLimitResult {
        allowed: false,
        remaining: remaining(state, limits),
        reset_time,
        cost_remaining: (limits.max_cost_per_day - state.cost.effective_total(now)).max(0.0),
        reason: Some(reason),
        fail_open: false,
    }
}

fn remaining(state: &ActorUsageState, limits: &RateLimitConfig) -> u32 {
    state
        .minute
        .remaining(limits.requests_per_minute)
        .min(state.hour.remaining(limits.requests_per_hour))
        .min(state.day.remaining(limits.requests_per_day))
}

fn earliest_reset(state: &ActorUsageState) -> Option<DateTime<Utc>> {
    [state.minute.reset_time, state.hour.reset_time, state.day.reset_time]
        .into_iter()
        .flatten()
        .min()
}

/// Releases one concurrency slot when dropped.
///
/// Built by [`RateLimiter::slot_guard`]. Every exit path of the code holding
/// the guard, including early returns and panics, gives the slot back exactly
/// once.
#[must_use = "dropping the guard immediately releases the slot"]
pub struct SlotGuard<'a> {
    limiter: &'a RateLimiter,
    actor: String,
    armed: bool,
}

impl SlotGuard<'_> {
    /// Actor whose slot this guard holds.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Whether dropping the guard will release a slot.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Turns the guard into a no-op, for admissions that hold no slot.
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.limiter.release_concurrent_slot(&self.actor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::LimiterError;
    use crate::store::SharedUsage;

    fn limiter_with_clock() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimiter::with_parts(
            LimiterConfig::default(),
            Arc::new(InMemoryUsageStore::new()),
            clock.clone(),
        )
        .unwrap();
        (limiter, clock)
    }

    fn check(limiter: &RateLimiter, actor: &str, platform: &str) -> RateLimitResult {
        limiter.check_rate_limit(actor, platform, OperationKind::Analysis, 0.0, 100)
    }

    struct BrokenStore;

    impl UsageStore for BrokenStore {
        fn entry(&self, _actor: &str) -> Result<SharedUsage> {
            Err(LimiterError::Store("connection refused".to_string()))
        }
        fn get(&self, _actor: &str) -> Result<Option<SharedUsage>> {
            Err(LimiterError::Store("connection refused".to_string()))
        }
        fn remove(&self, _actor: &str) -> Result<bool> {
            Err(LimiterError::Store("connection refused".to_string()))
        }
        fn actors(&self) -> Result<Vec<String>> {
            Err(LimiterError::Store("connection refused".to_string()))
        }
        fn remove_if_expired(&self, _actor: &str, _now: DateTime<Utc>) -> Result<bool> {
            Err(LimiterError::Store("connection refused".to_string()))
        }
    }

    #[test]
    fn test_first_admission_initializes_windows() {
        let (limiter, clock) = limiter_with_clock();
        let now = clock.now();
        let result = check(&limiter, "u1", "twitter");

        assert!(result.allowed);
        assert_eq!(result.remaining, 19);
        assert_eq!(result.reset_time, now + ChronoDuration::seconds(60));
        assert!((result.cost_remaining - 3.0).abs() < 1e-9);

        let usage = limiter.get_current_usage("u1").unwrap().unwrap();
        assert_eq!(usage.minute.count, 1);
        assert_eq!(usage.day.count, 1);
        assert_eq!(usage.concurrent, 1);
        assert_eq!(usage.cost.reset_time, Some(now + ChronoDuration::seconds(DAY_SECS)));
    }

    #[test]
    fn test_minute_window_and_lazy_reset() {
        let (limiter, clock) = limiter_with_clock();

        for i in 1..=20 {
            let result = check(&limiter, "u1", "twitter");
            assert!(result.allowed, "call {} should be allowed", i);
            limiter.release_concurrent_slot("u1");
        }

        let denied = check(&limiter, "u1", "twitter");
        assert!(!denied.allowed);
        assert_eq!(denied.reason, Some(LimitReason::MinuteWindow));
        assert_eq!(denied.reason_message().as_deref(), Some("Minute rate limit exceeded"));

        clock.advance(ChronoDuration::seconds(61));
        let result = check(&limiter, "u1", "twitter");
        assert!(result.allowed);
        assert_eq!(limiter.get_current_usage("u1").unwrap().unwrap().minute.count, 1);
    }

    #[test]
    fn test_denial_does_not_count() {
        let (limiter, _) = limiter_with_clock();
        for _ in 0..5 {
            assert!(check(&limiter, "u1", "twitter").allowed);
        }
        let denied = check(&limiter, "u1", "twitter");
        assert_eq!(denied.reason, Some(LimitReason::TooManyConcurrent));

        let usage = limiter.get_current_usage("u1").unwrap().unwrap();
        assert_eq!(usage.minute.count, 5);
        assert_eq!(usage.concurrent, 5);
    }

    #[test]
    fn test_token_cap() {
        let (limiter, _) = limiter_with_clock();
        let result =
            limiter.check_rate_limit("u1", "twitter", OperationKind::Analysis, 0.0, 2001);
        assert!(!result.allowed);
        assert_eq!(result.reason, Some(LimitReason::TokenLimit));
        assert!(limiter.get_current_usage("u1").unwrap().unwrap().minute.count == 0);
    }

    #[test]
    fn test_daily_cost_cap_and_rollover() {
        let (limiter, clock) = limiter_with_clock();

        let first = limiter.check_rate_limit("u1", "twitter", OperationKind::Analysis, 2.5, 100);
        assert!(first.allowed);
        assert!((first.cost_remaining - 0.5).abs() < 1e-9);
        limiter.release_concurrent_slot("u1");

        let second = limiter.check_rate_limit("u1", "twitter", OperationKind::Analysis, 1.0, 100);
        assert!(!second.allowed);
        assert_eq!(second.reason, Some(LimitReason::DailyCost));

        clock.advance(ChronoDuration::seconds(DAY_SECS + 1));
        let third = limiter.check_rate_limit("u1", "twitter", OperationKind::Analysis, 1.0, 100);
        assert!(third.allowed);
        assert!((third.cost_remaining - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_release_floors_at_zero() {
        let (limiter, _) = limiter_with_clock();
        limiter.release_concurrent_slot("nobody");
        assert!(limiter.get_current_usage("nobody").unwrap().is_none());

        assert!(check(&limiter, "u1", "blog").allowed);
        limiter.release_concurrent_slot("u1");
        limiter.release_concurrent_slot("u1");
        assert_eq!(limiter.get_current_usage("u1").unwrap().unwrap().concurrent, 0);
    }

    #[test]
    fn test_slot_guard_releases_once() {
        let (limiter, _) = limiter_with_clock();
        assert!(check(&limiter, "u1", "blog").allowed);
        assert!(check(&limiter, "u1", "blog").allowed);
        {
            let guard = limiter.slot_guard("u1");
            assert!(guard.is_armed());
        }
        assert_eq!(limiter.get_current_usage("u1").unwrap().unwrap().concurrent, 1);

        {
            let mut guard = limiter.slot_guard("u1");
            guard.disarm();
        }
        assert_eq!(limiter.get_current_usage("u1").unwrap().unwrap().concurrent, 1);
    }

    #[test]
    fn test_fail_open_on_store_error() {
        let clock = Arc::new(ManualClock::default());
        let now = clock.now();
        let limiter =
            RateLimiter::with_parts(LimiterConfig::default(), Arc::new(BrokenStore), clock)
                .unwrap();

        let result = check(&limiter, "u1", "twitter");
        assert!(result.allowed);
        assert!(result.fail_open);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.reset_time, now + ChronoDuration::seconds(60));
        assert_eq!(result.reason, Some(LimitReason::StoreUnavailable));

        // Release against a broken store is logged, never raised.
        limiter.release_concurrent_slot("u1");
        assert!(limiter.cleanup_expired_usage().is_err());
    }

    #[test]
    fn test_unknown_platform_uses_default() {
        let (limiter, _) = limiter_with_clock();
        assert_eq!(limiter.get_platform_config("mastodon"), RateLimitConfig::default());
        assert_eq!(limiter.get_platform_config("Twitter").requests_per_minute, 20);
    }

    #[test]
    fn test_update_platform_config() {
        let (limiter, _) = limiter_with_clock();
        let updated = limiter
            .update_platform_config(
                "twitter",
                RateLimitConfigPatch {
                    concurrent_requests: Some(50),
                    ..RateLimitConfigPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.concurrent_requests, 50);
        assert_eq!(updated.requests_per_minute, 20);
        assert_eq!(limiter.get_platform_config("twitter").concurrent_requests, 50);

        let invalid = limiter.update_platform_config(
            "twitter",
            RateLimitConfigPatch {
                requests_per_minute: Some(0),
                ..RateLimitConfigPatch::default()
            },
        );
        assert!(invalid.is_err());
        assert_eq!(limiter.get_platform_config("twitter").requests_per_minute, 20);

        limiter
            .update_platform_config(
                DEFAULT_PLATFORM_KEY,
                RateLimitConfigPatch {
                    requests_per_day: Some(7),
                    ..RateLimitConfigPatch::default()
                },
            )
            .unwrap();
        assert_eq!(limiter.get_platform_config("mastodon").requests_per_day, 7);
    }

    #[test]
    fn test_reset_user_usage() {
        let (limiter, _) = limiter_with_clock();
        assert!(check(&limiter, "u1", "email").allowed);
        assert!(limiter.reset_user_usage("u1").unwrap());
        assert!(limiter.get_current_usage("u1").unwrap().is_none());
        assert!(!limiter.reset_user_usage("u1").unwrap());
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let (limiter, clock) = limiter_with_clock();
        assert!(check(&limiter, "old", "email").allowed);
        clock.advance(ChronoDuration::seconds(DAY_SECS - 10));
        assert!(check(&limiter, "recent", "email").allowed);

        assert_eq!(limiter.cleanup_expired_usage().unwrap(), 0);

        clock.advance(ChronoDuration::seconds(20));
        assert_eq!(limiter.cleanup_expired_usage().unwrap(), 1);
        assert!(limiter.get_current_usage("old").unwrap().is_none());
        assert!(limiter.get_current_usage("recent").unwrap().is_some());
    }
}
