//! Discovery and registration pipeline
//!
//! Resolves everything needed before an authorization redirect can be
//! issued: the resource origin, its authorization server, and a client
//! registration for this tenant. Registrations are cached per
//! (tenant, origin); discovery runs only when no usable one exists.

use std::sync::Arc;

use mcphub_core::{
    ClientRegistration, DiscoveryStep, EndpointMetadata, OrchestratorError, RegistrationRepository,
    TenantId,
};
use tracing::{debug, info};

use super::discovery::{origin_of, DiscoveryClient};
use super::registration::{RegistrationClient, RegistrationRequest};

/// Runs metadata discovery and dynamic client registration, backed by the
/// registration store.
pub struct DiscoveryEngine {
    discovery: DiscoveryClient,
    registration: RegistrationClient,
    registrations: Arc<dyn RegistrationRepository>,
    redirect_uri: String,
}

impl DiscoveryEngine {
    pub fn new(
        http_client: reqwest::Client,
        registrations: Arc<dyn RegistrationRepository>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            discovery: DiscoveryClient::new(http_client.clone()),
            registration: RegistrationClient::new(http_client),
            registrations,
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Return a usable client registration for the tenant against the
    /// server's origin, creating one through discovery and RFC 7591
    /// registration when none exists.
    ///
    /// Nothing is persisted until every step has succeeded. A stored
    /// registration without endpoint metadata gets its metadata
    /// re-discovered in place; the issued client credentials are kept.
    pub async fn ensure_registration(
        &self,
        tenant: &TenantId,
        server_url: &str,
    ) -> Result<ClientRegistration, OrchestratorError> {
        let origin = origin_of(server_url).map_err(|e| {
            OrchestratorError::discovery(DiscoveryStep::ProtectedResource, e.to_string())
        })?;

        if let Some(existing) = self.registrations.get(tenant, &origin).await? {
            if existing.metadata.is_some() {
                debug!(
                    tenant = %tenant,
                    origin = %origin,
                    "Reusing existing client registration"
                );
                return Ok(existing);
            }

            // Registered before metadata was persisted alongside; refresh
            // the endpoints but keep the issued credentials.
            let (metadata, _) = self.discover_endpoints(&origin).await?;
            let updated = existing.with_metadata(metadata);
            self.registrations.save(&updated).await?;
            info!(tenant = %tenant, origin = %origin, "Refreshed endpoint metadata for registration");
            return Ok(updated);
        }

        let (metadata, scope) = self.discover_endpoints(&origin).await?;

        let registration_endpoint = metadata.registration_endpoint.as_deref().ok_or_else(|| {
            OrchestratorError::discovery(
                DiscoveryStep::ClientRegistration,
                "Authorization server does not support dynamic client registration",
            )
        })?;

        let request = RegistrationRequest::new(&self.redirect_uri, scope.clone());
        let issued = self
            .registration
            .register(registration_endpoint, &request)
            .await
            .map_err(|e| {
                OrchestratorError::discovery(DiscoveryStep::ClientRegistration, e.to_string())
            })?;

        let mut registration = ClientRegistration::new(
            tenant.clone(),
            &origin,
            issued.client_id,
            &self.redirect_uri,
        )
        .with_metadata(metadata);
        if let Some(secret) = issued.client_secret {
            registration = registration.with_secret(secret);
        }
        if let Some(scope) = issued.scope.or(scope) {
            registration = registration.with_scope(scope);
        }

        self.registrations.save(&registration).await?;
        info!(
            tenant = %tenant,
            origin = %origin,
            client_id = %registration.client_id,
            "Registered OAuth client"
        );
        Ok(registration)
    }

    /// Walk the two metadata documents for an origin.
    async fn discover_endpoints(
        &self,
        origin: &str,
    ) -> Result<(EndpointMetadata, Option<String>), OrchestratorError> {
        let resource = self
            .discovery
            .fetch_protected_resource(origin)
            .await
            .map_err(|e| {
                OrchestratorError::discovery(DiscoveryStep::ProtectedResource, e.to_string())
            })?;

        // A resource that names no authorization server acts as its own.
        let issuer = resource
            .primary_authorization_server()
            .map(str::to_string)
            .unwrap_or_else(|| origin.to_string());

        let auth_server = self
            .discovery
            .fetch_authorization_server(&issuer)
            .await
            .map_err(|e| {
                OrchestratorError::discovery(
                    DiscoveryStep::AuthorizationServerMetadata,
                    e.to_string(),
                )
            })?;

        if !auth_server.supports_pkce() {
            debug!(
                issuer = %issuer,
                "Authorization server does not advertise S256; sending PKCE anyway"
            );
        }

        let scope = resource.scope_string();
        let metadata = EndpointMetadata {
            issuer: auth_server.issuer.or(Some(issuer)),
            authorization_endpoint: auth_server.authorization_endpoint,
            token_endpoint: auth_server.token_endpoint,
            registration_endpoint: auth_server.registration_endpoint,
        };
        Ok((metadata, scope))
    }
}
