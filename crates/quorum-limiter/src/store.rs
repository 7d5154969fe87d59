//! Usage storage.
//!
//! [`UsageStore`] is the seam for keeping counters somewhere other than
//! process memory. The limiter only ever holds one actor's lock at a time and
//! never holds it across a store call.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::Result;
use crate::usage::ActorUsageState;

/// Shared handle to one actor's state.
pub type SharedUsage = Arc<Mutex<ActorUsageState>>;

/// Storage for per-actor usage.
pub trait UsageStore: Send + Sync {
    /// Returns the actor's state, creating an empty one if needed.
    fn entry(&self, actor: &str) -> Result<SharedUsage>;

    /// Returns the actor's state if it exists.
    fn get(&self, actor: &str) -> Result<Option<SharedUsage>>;

    /// Drops the actor's state. Returns true if it existed.
    fn remove(&self, actor: &str) -> Result<bool>;

    /// Known actor ids.
    fn actors(&self) -> Result<Vec<String>>;

    /// Drops the actor's state if every window has expired at `now`.
    fn remove_if_expired(&self, actor: &str, now: DateTime<Utc>) -> Result<bool>;
}

/// In-process store: a sharded map of per-actor mutexes.
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    actors: DashMap<String, SharedUsage>,
}

impl InMemoryUsageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked actors.
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether no actor is tracked.
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl UsageStore for InMemoryUsageStore {
    fn entry(&self, actor: &str) -> Result<SharedUsage> {
        if let Some(existing) = self.actors.get(actor) {
            return Ok(Arc::clone(existing.value()));
        }
        let shared = self
            .actors
            .entry(actor.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ActorUsageState::default())));
        Ok(Arc::clone(shared.value()))
    }

    fn get(&self, actor: &str) -> Result<Option<SharedUsage>> {
        Ok(self.actors.get(actor).map(|e| Arc::clone(e.value())))
    }

    fn remove(&self, actor: &str) -> Result<bool> {
        Ok(match self.actors.remove(actor) {
            Some((_, shared)) => {
                shared.lock().retire();
                true
            }
            None => false,
        })
    }

    fn actors(&self) -> Result<Vec<String>> {
        Ok(self.actors.iter().map(|e| e.key().clone()).collect())
    }

    fn remove_if_expired(&self, actor: &str, now: DateTime<Utc>) -> Result<bool> {
        let removed = self.actors.remove_if(actor, |_, shared| {
            let mut state = shared.lock();
            if state.is_expired(now) {
                state.retire();
                true
            } else {
                false
            }
        });
        Ok(removed.is_some())
    }
}
