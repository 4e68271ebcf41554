//! Stored OAuth tokens per (tenant, resource origin).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TenantId;

/// Access and refresh tokens for one tenant against one resource-server
/// origin.
///
/// Overwritten wholesale by each successful token exchange; deleted only by
/// explicit revocation. There is no automatic expiry of the record itself -
/// `expires_at` describes the access token, not the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub tenant_id: TenantId,
    pub resource_origin: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(
        tenant_id: TenantId,
        resource_origin: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            resource_origin: resource_origin.into(),
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: None,
            scope: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Whether the access token is past its expiry. Tokens without an
    /// expiry never count as expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() >= at,
            None => false,
        }
    }

    /// Whether the access token expires within the given number of seconds.
    pub fn expires_soon(&self, within_secs: i64) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + chrono::Duration::seconds(within_secs) >= at,
            None => false,
        }
    }

    /// Whether a refresh is possible without a new authorization round.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Composite storage key, aligned with [`ClientRegistration::key`].
    pub fn key(&self) -> String {
        format!("{}:{}", self.tenant_id, self.resource_origin)
    }
}
