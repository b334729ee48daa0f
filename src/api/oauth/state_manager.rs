//! OAuth state management for CSRF protection.
//!
//! Manages temporary state tokens used to prevent CSRF attacks during OAuth flow.

use crate::credentials::CredentialStore;
use chrono::{DateTime, Duration, Utc};
use crmhub_model::Provider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// OAuth state entry: who started the flow, for which provider
#[derive(Clone, Debug)]
pub struct StateEntry {
    pub provider: Provider,
    pub org_id: String,
    pub user_id: String,
    /// PKCE verifier, for providers that require it
    pub code_verifier: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// OAuth state manager with automatic expiration
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, StateEntry>>>,
    expiry_duration: Duration,
}

impl StateManager {
    /// Create a new state manager
    ///
    /// # Arguments
    /// * `expiry_seconds` - How long states remain valid (default: 600 = 10 minutes)
    pub fn new(expiry_seconds: i64) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            expiry_duration: Duration::seconds(expiry_seconds),
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, StateEntry>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Generate a new state token and store it
    ///
    /// Returns the state token (UUID v4)
    pub fn create_state(
        &self,
        provider: Provider,
        org_id: &str,
        user_id: &str,
        code_verifier: Option<String>,
    ) -> String {
        self.create_state_at(provider, org_id, user_id, code_verifier, Utc::now())
    }

    fn create_state_at(
        &self,
        provider: Provider,
        org_id: &str,
        user_id: &str,
        code_verifier: Option<String>,
        now: DateTime<Utc>,
    ) -> String {
        let state = Uuid::new_v4().to_string();
        let entry = StateEntry {
            provider,
            org_id: org_id.to_string(),
            user_id: user_id.to_string(),
            code_verifier,
            created_at: now,
        };

        self.states().insert(state.clone(), entry);
        state
    }

    /// Validate and consume a state token
    ///
    /// Returns the StateEntry if valid and not expired, None otherwise.
    /// The state is removed from the map (single-use).
    pub fn validate_and_consume(&self, state: &str) -> Option<StateEntry> {
        self.validate_and_consume_at(state, Utc::now())
    }

    fn validate_and_consume_at(&self, state: &str, now: DateTime<Utc>) -> Option<StateEntry> {
        let entry = self.states().remove(state)?;

        if now - entry.created_at > self.expiry_duration {
            return None;
        }

        Some(entry)
    }

    /// Clean up expired states (should be called periodically)
    pub fn cleanup_expired(&self) {
        self.cleanup_expired_at(Utc::now());
    }

    fn cleanup_expired_at(&self, now: DateTime<Utc>) {
        let expiry = self.expiry_duration;
        self.states()
            .retain(|_, entry| now - entry.created_at <= expiry);
    }

    /// Get count of active states (for debugging/monitoring)
    pub fn count(&self) -> usize {
        self.states().len()
    }
}

/// Background task: sweep expired OAuth states and credential rows
pub async fn run_state_cleanup(
    manager: StateManager,
    credential_store: Arc<CredentialStore>,
    interval_seconds: u64,
) {
    let mut interval =
        tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds.max(1)));

    loop {
        interval.tick().await;
        manager.cleanup_expired();
        match credential_store.purge_expired() {
            Ok(purged) => tracing::debug!(
                states = manager.count(),
                credentials_purged = purged,
                credentials_stored = credential_store.count().unwrap_or_default(),
                "Cleanup complete"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to purge expired credentials"),
        }
    }
}
