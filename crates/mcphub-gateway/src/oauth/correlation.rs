//! Ephemeral correlation of authorization redirects to callbacks
//!
//! Keyed by the `state` parameter. Entries are consumed exactly once:
//! the first callback carrying a state removes it, so a replayed or
//! duplicated callback finds nothing. Never persisted; a restart aborts
//! in-flight authorizations by design of the flow, not of this store.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use mcphub_core::TenantId;

/// How long an issued state stays redeemable.
pub const CORRELATION_TTL_SECS: u64 = 600;

/// Everything the callback needs to finish a flow started by `initiate`.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub tenant_id: TenantId,
    pub server_name: String,
    pub pkce_verifier: String,
    created_at: Instant,
}

impl PendingAuthorization {
    pub fn new(
        tenant_id: TenantId,
        server_name: impl Into<String>,
        pkce_verifier: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            server_name: server_name.into(),
            pkce_verifier: pkce_verifier.into(),
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// In-memory state-to-flow map with a fixed TTL.
pub struct CorrelationStore {
    pending_by_state: DashMap<String, PendingAuthorization>,
    ttl: Duration,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(CORRELATION_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            pending_by_state: DashMap::new(),
            ttl,
        }
    }

    /// Record a pending authorization under its state token.
    pub fn insert(&self, state: impl Into<String>, pending: PendingAuthorization) {
        self.pending_by_state.insert(state.into(), pending);
    }

    /// Atomically remove and return the entry for a state.
    ///
    /// Returns `None` for an unknown, already-consumed, or expired state.
    /// Removal happens before the expiry check, so even an expired state
    /// is gone after the first attempt.
    pub fn consume(&self, state: &str) -> Option<PendingAuthorization> {
        let (_, pending) = self.pending_by_state.remove(state)?;
        if pending.is_expired(self.ttl) {
            return None;
        }
        Some(pending)
    }

    /// Drop entries past their TTL.
    pub fn purge_expired(&self) -> usize {
        let before = self.pending_by_state.len();
        self.pending_by_state
            .retain(|_, pending| !pending.is_expired(self.ttl));
        before - self.pending_by_state.len()
    }

    pub fn len(&self) -> usize {
        self.pending_by_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_by_state.is_empty()
    }
}

impl Default for CorrelationStore {
    fn default() -> Self {
        Self::new()
    }
}
