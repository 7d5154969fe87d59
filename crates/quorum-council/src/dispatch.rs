//! Concurrent fan-out to providers.

use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::model::{AnalysisRequest, ProviderResponse};
use crate::provider::AnalysisProvider;

/// Outcome of one provider call.
#[derive(Debug)]
pub struct Dispatched {
    pub provider: String,
    pub outcome: Result<ProviderResponse, ProviderError>,
}

/// Calls `analyze` on every provider at once and waits for all of them.
///
/// One provider failing never cancels the others, and a provider that panics
/// is recorded as a failure like any other. A provider whose `max_tokens` is
/// below the request's token hint is not called. Outcomes come back in input
/// order.
pub async fn dispatch_all(
    providers: &[Arc<dyn AnalysisProvider>],
    request: &AnalysisRequest,
) -> Vec<Dispatched> {
    let calls = providers.iter().map(|provider| async move {
        let started = Instant::now();
        let outcome = call_provider(provider.as_ref(), request).await;
        debug!(
            provider = provider.name(),
            ok = outcome.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "provider returned"
        );
        Dispatched {
            provider: provider.name().to_string(),
            outcome,
        }
    });
    join_all(calls).await
}

async fn call_provider(
    provider: &dyn AnalysisProvider,
    request: &AnalysisRequest,
) -> Result<ProviderResponse, ProviderError> {
    let limit = provider.max_tokens();
    if let Some(requested) = request.max_tokens.filter(|&hint| hint > limit) {
        return Err(ProviderError::TokenLimit { requested, limit });
    }

    match AssertUnwindSafe(provider.analyze(request)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(provider = provider.name(), panic = %message, "provider panicked");
            Err(ProviderError::Panicked(message))
        }
    }
}

/// Best-effort text of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
