//! # Quorum Core
//!
//! Orchestrator facade for an AI-backend gateway. Sequences the Admission
//! Controller, Security Gate and Consolidation Engine for every request.
//!
//! ## Failure Coverage
//!
//! | Layer | Component | Protects against |
//! |-------|-----------|------------------|
//! | Budget | Admission Controller | Request floods, token blowups, runaway spend |
//! | Input | Security Gate | Prompt injection, trolling, low-quality or risky content |
//! | Output | Consolidation Engine | Down, slow or inconsistent backends |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         QUORUM CORE                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌─────────────────┐                          │
//! │                    │  Orchestrator   │  ← Unified Facade        │
//! │                    └────────┬────────┘                          │
//! │                             │                                   │
//! │         ┌───────────────────┼───────────────────┐               │
//! │         ▼                   ▼                   ▼               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌───────────────┐        │
//! │  │  Admission  │ →  │  Security   │ →  │ Consolidation │        │
//! │  │ Controller  │    │    Gate     │    │    Engine     │        │
//! │  └─────────────┘    └─────────────┘    └───────────────┘        │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use quorum_core::{AnalysisRequest, GatewayConfig, Orchestrator, Platform};
//! use quorum_core::{ProviderKind, SimulatedProvider};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), quorum_core::GatewayError> {
//! let gateway = Orchestrator::new(GatewayConfig::default())?;
//! gateway.register_provider(Arc::new(SimulatedProvider::new("openai", ProviderKind::OpenAi)));
//!
//! let request = AnalysisRequest::new(
//!     "u1",
//!     Platform::Linkedin,
//!     "Our team shipped the new billing dashboard this week.",
//! );
//! let result = gateway.analyze(request).await?;
//! assert_eq!(result.confidence, 0.7);
//! # Ok(())
//! # }
//! ```
//!
//! ## Operational Notes
//!
//! - Order is fixed: admission → security → disarm → consolidation
//! - Admission fails open when usage tracking is down; nothing else does
//! - Untrusted content is never logged, only its digest and length

mod config;
mod error;
mod estimator;
mod orchestrator;

pub use config::{GatewayConfig, GlobalConfig};
pub use error::GatewayError;
pub use estimator::{CostEstimate, CostEstimator, HeuristicEstimator, DEFAULT_OVERHEAD_TOKENS};
pub use orchestrator::Orchestrator;

// Re-export component types for convenience
pub use quorum_council::{
    AnalysisProvider, AnalysisRequest, ConsolidatedResult, Conflict, Platform, ProviderKind,
    ProviderResponse, SimulatedProvider,
};
pub use quorum_firewall::{FirewallConfig, ReasonPolicy, RiskLevel, SecurityVerdict};
pub use quorum_limiter::{ActorUsageState, LimiterConfig, RateLimitConfig, RateLimitConfigPatch};

/// Core result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
