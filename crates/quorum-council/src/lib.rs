//! # Consolidation Engine
//!
//! Redundant analysis across interchangeable AI backends, merged into one
//! consensus answer with a confidence score.
//!
//! ## Overview
//!
//! No single backend is trusted to be up or to be right. Each request is sent
//! to every healthy provider at once; failed or malformed answers are dropped
//! and the rest are merged. Disagreement lowers confidence and is reported as
//! conflicts instead of being hidden.
//!
//! ## Failure Model
//!
//! ### Unavailable Backends
//! Health probes run concurrently and are cached per provider for a TTL. A
//! probe that errors marks only that provider unhealthy.
//!
//! ### Partial Failure
//! A provider can fail hard (`analyze` returns `Err`) or soft (a normal
//! response with `error` set). Both are logged and excluded. Siblings are
//! never cancelled.
//!
//! ### Divergent Answers
//! Scores far from the mean and recommendations only one provider made are
//! surfaced as [`Conflict`]s.
//!
//! ## Architecture
//!
//! ```text
//! providers ──► HealthCache ──► dispatch_all ──► partition ──► ConsensusEngine
//!               (TTL probes)    (join_all)       (drop Err     (mean, merge,
//!                                                 and soft)     confidence)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quorum_council::{ConsolidationEngine, AnalysisRequest, Platform};
//!
//! let engine = ConsolidationEngine::new();
//! let request = AnalysisRequest::new("u1", Platform::Blog, content);
//!
//! match engine.consolidate_analysis(&providers, &request).await {
//!     Ok(result) => println!("{} ({:.2})", result.consensus.score, result.confidence),
//!     Err(CouncilError::NoHealthyProviders) => { /* 503 */ }
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

pub mod config;
pub mod consensus;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod health;
pub mod model;
pub mod provider;
pub mod simulated;

pub use config::CouncilConfig;
pub use consensus::{Consensus, ConsensusEngine};
pub use engine::ConsolidationEngine;
pub use error::{CouncilError, ProviderError};
pub use health::HealthCache;
pub use model::{
    Analysis, AnalysisRequest, ConsolidatedResult, Conflict, PerceptionMetrics, Platform,
    ProviderResponse, ResponseMetadata, UsageSummary,
};
pub use provider::{total_cost_per_token, AnalysisProvider, ProviderKind, ProviderRegistry};
pub use simulated::{HealthBehavior, SimulatedFailure, SimulatedProvider};

/// Result type for council operations.
pub type Result<T> = std::result::Result<T, CouncilError>;
