//! Dynamic client registrations held per (tenant, resource origin).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TenantId;

/// OAuth endpoints captured during discovery.
///
/// Persisted alongside the registration so the token-exchange step can run
/// without repeating discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
}

/// OAuth client registration obtained via RFC 7591 for one tenant against
/// one resource-server origin.
///
/// Created on first discovery, reused on every later connection attempt,
/// and never visible to another tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub resource_origin: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub metadata: Option<EndpointMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientRegistration {
    pub fn new(
        tenant_id: TenantId,
        resource_origin: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            resource_origin: resource_origin.into(),
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            scope: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_metadata(mut self, metadata: EndpointMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Composite storage key. Both the tenant and the origin participate,
    /// so keys for different tenants can never collide.
    pub fn key(&self) -> String {
        format!("{}:{}", self.tenant_id, self.resource_origin)
    }

    /// Token endpoint recorded at discovery time, if any.
    pub fn token_endpoint(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.token_endpoint.as_str())
    }
}
