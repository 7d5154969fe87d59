//! Error types for the consolidation engine.
//!
//! [`ProviderError`] is what a single backend reports; it never escapes the
//! engine on its own. [`CouncilError`] is what a whole consolidation reports.

use thiserror::Error;

/// Errors a single provider can raise from `analyze` or `is_healthy`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The backend could not be reached or refused the request.
    #[error("provider request failed: {0}")]
    Request(String),

    /// The backend did not answer in time.
    #[error("provider timed out after {0} ms")]
    Timeout(u64),

    /// The backend answered with something that is not an analysis.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// The request asks for more tokens than the backend accepts.
    #[error("request asks for {requested} tokens, provider accepts {limit}")]
    TokenLimit { requested: u32, limit: u32 },

    /// The provider panicked while handling the call.
    #[error("provider panicked: {0}")]
    Panicked(String),
}

/// Errors that can occur during a consolidation.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// Every provider failed its health probe, or none is registered.
    #[error("No healthy AI providers available")]
    NoHealthyProviders,

    /// Every healthy provider failed or returned a soft error.
    #[error("All AI providers failed ({attempted} attempted)")]
    AllProvidersFailed {
        /// Providers that were dispatched.
        attempted: usize,
        /// One `name: error` line per provider.
        failures: Vec<String>,
    },

    /// A configuration value is out of range.
    #[error("Invalid council configuration: {0}")]
    InvalidConfig(String),
}
