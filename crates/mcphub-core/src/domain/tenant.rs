//! Tenant identity - the unit of isolation for all stored state.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Portion of the user agent that participates in an anonymous key.
const ANON_USER_AGENT_LEN: usize = 50;

/// Length of the hex digest kept in an anonymous key.
const ANON_DIGEST_LEN: usize = 16;

/// Identity under which registrations, tokens, and connection status are
/// partitioned.
///
/// Either an authenticated user id or a deterministic key derived from
/// stable connection attributes for anonymous sessions. Stores treat the
/// value as opaque; isolation comes from the tenant participating in every
/// composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Tenant for an authenticated user.
    pub fn user(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic tenant for an anonymous session.
    ///
    /// The same client attributes always produce the same key, so an
    /// anonymous browser keeps its identity across requests without any
    /// server-side session. Only the first 50 characters of the user agent
    /// participate.
    pub fn anonymous(ip: &str, user_agent: &str, forwarded_for: &str) -> Self {
        let ua: String = user_agent.chars().take(ANON_USER_AGENT_LEN).collect();
        let fingerprint = format!("{}_{}_{}", ip, ua, forwarded_for);
        let digest = hex::encode(Sha256::digest(fingerprint.as_bytes()));
        Self(format!("anon_{}", &digest[..ANON_DIGEST_LEN]))
    }

    /// Whether this tenant is an anonymous session key.
    pub fn is_anonymous(&self) -> bool {
        self.0.starts_with("anon_")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
