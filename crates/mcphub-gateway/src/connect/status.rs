//! Connection status store
//!
//! Tracks each tenant's view of each server: state, cached tool list,
//! and when the connection was established. Entries expire after 24
//! hours; a missing or expired entry reads as DISCONNECTED rather than
//! an error. All writes are last-write-wins.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use mcphub_core::{ConnectionStatus, TenantId};

/// How long a status entry stays readable.
pub const STATUS_TTL_SECS: u64 = 86_400;

/// Key for one tenant's connection to one server. Both parts participate
/// in equality, so tenants can never observe each other's entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusKey {
    pub tenant: TenantId,
    pub server: String,
}

impl StatusKey {
    pub fn new(tenant: TenantId, server: impl Into<String>) -> Self {
        Self {
            tenant,
            server: server.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct StatusEntry {
    status: ConnectionStatus,
    written_at: Instant,
}

impl StatusEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.written_at.elapsed() >= ttl
    }
}

/// In-memory status map with per-entry TTL.
pub struct StatusStore {
    entries: DashMap<StatusKey, StatusEntry>,
    ttl: Duration,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(STATUS_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Overwrite the entry for (tenant, server).
    pub fn set(&self, tenant: &TenantId, server: &str, status: ConnectionStatus) {
        self.entries.insert(
            StatusKey::new(tenant.clone(), server),
            StatusEntry {
                status,
                written_at: Instant::now(),
            },
        );
    }

    /// Current status for (tenant, server).
    ///
    /// Answers the DISCONNECTED default when no live entry exists; an
    /// expired entry is dropped on the way out.
    pub fn get(&self, tenant: &TenantId, server: &str) -> ConnectionStatus {
        let key = StatusKey::new(tenant.clone(), server);
        // The map guard must be released before any removal below.
        let expired = match self.entries.get(&key) {
            Some(entry) => {
                if !entry.is_expired(self.ttl) {
                    return entry.status.clone();
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(&key);
        }
        ConnectionStatus::disconnected()
    }

    /// Names of servers this tenant currently sees as CONNECTED, sorted.
    pub fn connected_servers(&self, tenant: &TenantId) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| {
                entry.key().tenant == *tenant
                    && entry.value().status.is_connected()
                    && !entry.value().is_expired(self.ttl)
            })
            .map(|entry| entry.key().server.clone())
            .collect();
        names.sort();
        names
    }

    /// Drop entries past their TTL.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}
