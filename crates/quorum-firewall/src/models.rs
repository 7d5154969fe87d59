//! # Core Types for the Security Gate
//!
//! This module defines the data types shared by every detector and by the
//! gate itself: risk levels, block reasons, per-detector outcomes and the
//! final [`SecurityVerdict`].
//!
//! ## Design Principles
//!
//! 1. **Monotonic risk** - [`RiskLevel`] is totally ordered and a verdict only
//!    ever moves up the ladder while detectors run
//! 2. **Typed reasons** - every block carries a [`BlockReason`] whose `Display`
//!    is the canonical client-facing message
//! 3. **Serializable** - all types derive Serde traits for audit trails

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Risk classification attached to a verdict.
///
/// Ordering is significant: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Nothing suspicious was observed.
    #[default]
    Low,
    /// Suspicious signals, not enough to block.
    Medium,
    /// Blocking-grade signals.
    High,
}

impl RiskLevel {
    /// Returns the next level up, saturating at `High`.
    #[must_use]
    pub const fn step_up(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    /// Returns the lowercase wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a detector wants the running risk level to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Escalation {
    /// Leave the risk level untouched.
    None,
    /// Raise to at least the given level.
    AtLeast(RiskLevel),
    /// Raise to medium if currently low, to high if already medium.
    Step,
}

impl Escalation {
    /// Applies this escalation to `current`. Never lowers the level.
    #[must_use]
    pub fn apply(self, current: RiskLevel) -> RiskLevel {
        match self {
            Self::None => current,
            Self::AtLeast(level) => current.max(level),
            Self::Step => current.step_up(),
        }
    }
}

/// Reasons the gate can block a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    /// Instruction override or role-play imitation.
    PromptInjection,

    /// Content shorter than the platform minimum.
    ContentTooShort {
        /// Platform the minimum applies to.
        platform: String,
        /// Minimum length in characters.
        minimum: usize,
        /// Observed length in characters.
        actual: usize,
    },

    /// Not enough words longer than two characters.
    InsufficientWords {
        /// Meaningful words found.
        found: usize,
        /// Meaningful words required.
        required: usize,
    },

    /// Gibberish or trolling (only when troll blocking is enabled).
    Trolling,
}

impl BlockReason {
    /// Severity used by [`ReasonPolicy::SeverityPrecedence`](crate::ReasonPolicy).
    ///
    /// Higher wins.
    pub const fn severity(&self) -> u8 {
        match self {
            Self::PromptInjection => 3,
            Self::ContentTooShort { .. } | Self::InsufficientWords { .. } => 2,
            Self::Trolling => 1,
        }
    }

    /// Returns true for the quality family of reasons.
    pub const fn is_quality(&self) -> bool {
        matches!(
            self,
            Self::ContentTooShort { .. } | Self::InsufficientWords { .. }
        )
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PromptInjection => write!(f, "Prompt injection attempt detected"),
            Self::ContentTooShort {
                platform, minimum, ..
            } => write!(
                f,
                "Content too short for {} (minimum {} characters)",
                platform, minimum
            ),
            Self::InsufficientWords { required, .. } => write!(
                f,
                "Content must contain at least {} meaningful words",
                required
            ),
            Self::Trolling => write!(f, "Content appears to be spam or trolling"),
        }
    }
}

/// What a single detector observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorOutcome {
    /// Warnings to append to the verdict, in order.
    pub warnings: Vec<String>,
    /// Requested risk movement.
    pub escalation: Escalation,
    /// Block request, if any.
    pub block: Option<BlockReason>,
}

impl DetectorOutcome {
    /// An outcome with no findings.
    pub fn pass() -> Self {
        Self {
            warnings: Vec::new(),
            escalation: Escalation::None,
            block: None,
        }
    }

    /// Returns true if the detector found nothing.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.block.is_none() && self.escalation == Escalation::None
    }

    /// Returns true if the detector asked to block.
    pub fn is_blocking(&self) -> bool {
        self.block.is_some()
    }
}

impl Default for DetectorOutcome {
    fn default() -> Self {
        Self::pass()
    }
}

/// Final decision of the gate for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityVerdict {
    /// `!blocked && risk_level == Low`.
    pub is_safe: bool,
    /// All warnings from all detectors, in detector order.
    pub warnings: Vec<String>,
    /// Highest risk reached.
    pub risk_level: RiskLevel,
    /// Whether the submission must be rejected.
    pub blocked: bool,
    /// The block reason that survived the reason policy.
    pub reason: Option<BlockReason>,
    /// Truncated SHA-256 of the inspected text, for audit logs.
    pub content_digest: String,
}

impl SecurityVerdict {
    /// Returns the block reason as its client-facing message.
    pub fn reason_message(&self) -> Option<String> {
        self.reason.as_ref().map(ToString::to_string)
    }
}

/// Errors raised while configuring the gate.
#[derive(Debug, Error)]
pub enum FirewallError {
    /// A configuration value is out of range.
    #[error("Invalid firewall configuration: {0}")]
    InvalidConfig(String),
}
