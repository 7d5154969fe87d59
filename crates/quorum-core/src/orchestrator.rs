//! The unified Quorum facade.
//!
//! [`Orchestrator`] owns one instance of each component and sequences them
//! for every analysis request.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use quorum_council::{
    AnalysisProvider, AnalysisRequest, ConsolidatedResult, ConsolidationEngine, ProviderRegistry,
};
use quorum_firewall::{get_security_recommendations, sanitize_content, SecurityGate};
use quorum_limiter::{
    ActorUsageState, OperationKind, RateLimitConfig, RateLimitConfigPatch, RateLimiter,
};

use crate::{
    config::GatewayConfig,
    error::GatewayError,
    estimator::{CostEstimator, HeuristicEstimator},
    Result,
};

/// The unified Quorum gateway facade.
///
/// # Pipeline
///
/// 1. Estimate tokens and cost
/// 2. Admission Controller (deny → [`GatewayError::RateLimited`])
/// 3. Hold a concurrency slot until the call returns
/// 4. Security Gate (block → [`GatewayError::SecurityBlocked`])
/// 5. Content disarm
/// 6. Consolidation Engine (nothing usable → [`GatewayError::ServiceUnavailable`])
///
/// The slot is released on every exit path after step 3. A fail-open
/// admission holds no slot.
///
/// # Example
///
/// ```rust,ignore
/// let gateway = Orchestrator::new(GatewayConfig::default())?;
/// gateway.register_provider(Arc::new(my_backend));
///
/// let request = AnalysisRequest::new("u1", Platform::Linkedin, draft);
/// match gateway.analyze(request).await {
///     Ok(result) => render(result),
///     Err(e) => respond(e.status_code(), e.to_string()),
/// }
/// ```
pub struct Orchestrator {
    config: GatewayConfig,
    gate: SecurityGate,
    limiter: Arc<RateLimiter>,
    engine: ConsolidationEngine,
    registry: ProviderRegistry,
    estimator: Box<dyn CostEstimator>,
    shutdown: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Creates an orchestrator with an in-memory limiter and no providers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if any section fails validation.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let limiter = Arc::new(RateLimiter::new(config.limiter.clone())?);
        Self::with_limiter(config, limiter)
    }

    /// Creates an orchestrator around an existing limiter.
    ///
    /// The limiter keeps its own budgets; `config.limiter` is not applied to it.
    pub fn with_limiter(config: GatewayConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        config.validate()?;
        let gate = SecurityGate::with_config(config.firewall.clone())?;
        let engine = ConsolidationEngine::with_config(config.council.clone())?;
        let (shutdown, _) = watch::channel(false);

        info!(
            sanitize = config.global.sanitize_input,
            audit = config.global.audit_logging,
            "Quorum gateway initialized"
        );

        Ok(Self {
            config,
            gate,
            limiter,
            engine,
            registry: ProviderRegistry::new(),
            estimator: Box::new(HeuristicEstimator::default()),
            shutdown,
            sweeper: Mutex::new(None),
        })
    }

    /// Replaces the cost estimator.
    pub fn with_estimator(mut self, estimator: impl CostEstimator + 'static) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Runs one analysis request through the full pipeline.
    ///
    /// Every call runs in its own span carrying a fresh request id.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<ConsolidatedResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "analyze",
            %request_id,
            actor = %request.actor_id,
            platform = %request.platform,
        );
        self.run_pipeline(request).instrument(span).await
    }

    async fn run_pipeline(&self, request: AnalysisRequest) -> Result<ConsolidatedResult> {
        let providers = self.registry.snapshot();
        let platform = request.platform.as_str();

        // Phase 1: admission
        let estimate = self.estimator.estimate(&request, &providers);
        let admission = self.limiter.check_rate_limit(
            &request.actor_id,
            platform,
            OperationKind::Analysis,
            estimate.cost,
            estimate.tokens,
        );
        if !admission.allowed {
            return Err(GatewayError::RateLimited {
                reason: admission.reason_message().unwrap_or_default(),
                reset_time: admission.reset_time,
                cost_remaining: admission.cost_remaining,
            });
        }

        let mut slot = self.limiter.slot_guard(&request.actor_id);
        if admission.fail_open {
            slot.disarm();
        }

        // Phase 2: security
        let verdict = self.gate.check_input_security(&request.content, platform);
        if self.config.global.audit_logging {
            info!(
                digest = %verdict.content_digest,
                length = request.content.chars().count(),
                risk = %verdict.risk_level,
                blocked = verdict.blocked,
                warnings = verdict.warnings.len(),
                "security verdict"
            );
        }
        if verdict.blocked {
            let recommendations = get_security_recommendations(&verdict);
            return Err(GatewayError::SecurityBlocked {
                reason: verdict
                    .reason_message()
                    .unwrap_or_else(|| "Content blocked".to_string()),
                warnings: verdict.warnings,
                recommendations,
            });
        }

        // Phase 3: disarm
        let request = if self.config.global.sanitize_input {
            let sanitized = sanitize_content(&request.content);
            request.with_content(sanitized)
        } else {
            request
        };

        // Phase 4: consolidation
        let result = self
            .engine
            .consolidate_analysis(&providers, &request)
            .await?;

        debug!(
            score = result.consensus.score,
            confidence = result.confidence,
            slot_held = slot.is_armed(),
            "analysis complete"
        );
        Ok(result)
    }

    /// Re-probes every registered provider. Returns `(name, healthy)` pairs.
    pub async fn refresh_providers(&self) -> Vec<(String, bool)> {
        self.engine.refresh_health(&self.registry.snapshot()).await
    }

    /// Registers a provider, replacing any with the same name.
    pub fn register_provider(&self, provider: Arc<dyn AnalysisProvider>) {
        self.engine.health_cache().invalidate(provider.name());
        self.registry.register(provider);
    }

    /// Removes a provider. Returns true if it was registered.
    pub fn unregister_provider(&self, name: &str) -> bool {
        self.engine.health_cache().invalidate(name);
        self.registry.unregister(name).is_some()
    }

    /// Registered provider names, in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn current_usage(&self, actor: &str) -> Result<Option<ActorUsageState>> {
        Ok(self.limiter.get_current_usage(actor)?)
    }

    pub fn reset_usage(&self, actor: &str) -> Result<bool> {
        Ok(self.limiter.reset_user_usage(actor)?)
    }

    pub fn platform_config(&self, platform: &str) -> RateLimitConfig {
        self.limiter.get_platform_config(platform)
    }

    pub fn update_platform_config(
        &self,
        platform: &str,
        patch: RateLimitConfigPatch,
    ) -> Result<RateLimitConfig> {
        Ok(self.limiter.update_platform_config(platform, patch)?)
    }

    /// Starts the expired-usage sweep. Must be called inside a tokio runtime.
    ///
    /// Calling it while the sweep is already running does nothing.
    pub fn start_background_tasks(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("usage sweep already running");
            return;
        }

        self.shutdown.send_replace(false);
        let interval = self.limiter.cleanup_interval();
        let handle = Arc::clone(&self.limiter).spawn_cleanup_task(interval, self.shutdown.subscribe());
        info!(interval_secs = interval.as_secs(), "usage sweep started");
        *sweeper = Some(handle);
    }

    /// Stops the background sweep and waits for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "usage sweep ended abnormally");
            }
        }
        info!("Quorum gateway stopped");
    }
}
