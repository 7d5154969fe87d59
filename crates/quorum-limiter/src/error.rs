//! Error types for the admission controller.

use thiserror::Error;

/// Result type alias for limiter operations.
pub type Result<T> = std::result::Result<T, LimiterError>;

/// Errors that can occur while tracking usage.
///
/// None of these ever reach a caller of
/// [`check_rate_limit`](crate::RateLimiter::check_rate_limit): store failures
/// there are converted into a fail-open admission.
#[derive(Debug, Error)]
pub enum LimiterError {
    /// The usage store could not read or write an actor's state.
    #[error("usage store failure: {0}")]
    Store(String),

    /// A configuration value is out of range.
    #[error("invalid limiter configuration: {0}")]
    InvalidConfig(String),
}
