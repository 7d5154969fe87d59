//! # Admission Controller
//!
//! Per-actor budgets checked before any paid backend is called: request
//! windows, a per-request token cap, concurrency slots and a daily spend
//! ceiling.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`RateLimiter`] | Admission checks, slot release, admin operations, sweep |
//! | [`SlotGuard`] | Releases a slot exactly once when dropped |
//! | [`UsageStore`] | Storage seam; [`InMemoryUsageStore`] by default |
//! | [`Clock`] | Time source; [`ManualClock`] for deterministic tests |
//!
//! ## Concurrency
//!
//! Each actor's state sits behind its own mutex inside a sharded map. The
//! three window counters, the spend and the in-flight count of one actor are
//! updated under a single lock, so concurrent requests from the same actor
//! can neither lose updates nor be over-admitted.
//!
//! ## Security Notes
//!
//! - Checks happen BEFORE the guarded request runs
//! - A denied check never consumes budget
//! - A store failure admits the request (fail-open) and is logged at `warn`

mod clock;
mod config;
mod error;
mod limiter;
mod store;
mod usage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    LimiterConfig, OperationKind, RateLimitConfig, RateLimitConfigPatch,
    DEFAULT_CLEANUP_INTERVAL_SECS,
};
pub use error::{LimiterError, Result};
pub use limiter::{LimitReason, RateLimitResult, RateLimiter, SlotGuard, DEFAULT_PLATFORM_KEY};
pub use store::{InMemoryUsageStore, SharedUsage, UsageStore};
pub use usage::{ActorUsageState, CostAccumulator, WindowCounter};
