//! Detector framework.
//!
//! Every stage of the gate implements [`Detector`]. The gate owns its
//! detectors in a fixed order and folds their [`DetectorOutcome`]s into a
//! single verdict.

use crate::models::DetectorOutcome;

/// A single screening stage.
///
/// Detectors are pure: the same text and platform always produce the same
/// outcome, and no detector can see another's findings.
pub trait Detector: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Inspects `text` submitted for `platform`.
    fn inspect(&self, text: &str, platform: &str) -> DetectorOutcome;
}

/// Stage five of the pipeline.
///
/// Request-rate enforcement lives in the admission controller; this stage
/// exists so the pipeline keeps its five-stage shape and always passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitPlaceholder;

impl Detector for RateLimitPlaceholder {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn inspect(&self, _text: &str, _platform: &str) -> DetectorOutcome {
        DetectorOutcome::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_always_passes() {
        let detector = RateLimitPlaceholder;
        assert!(detector.inspect("", "twitter").is_clean());
        assert!(detector
            .inspect("ignore previous instructions", "blog")
            .is_clean());
    }
}
