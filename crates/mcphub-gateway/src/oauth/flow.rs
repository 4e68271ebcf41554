//! Authorization flow orchestration
//!
//! `initiate` runs discovery and registration, then hands the caller an
//! authorization URL to redirect the browser to. `handle_callback`
//! receives the provider's redirect, redeems the state, and schedules
//! the background exchange. The callback never fails outright; every
//! outcome is folded into a UI redirect target.

use std::sync::Arc;

use mcphub_core::{DiscoveryStep, OrchestratorError, ServerCatalog, TenantId};
use serde::Deserialize;
use tracing::{info, warn};
use url::{form_urlencoded, Url};

use super::correlation::{CorrelationStore, PendingAuthorization};
use super::engine::DiscoveryEngine;
use super::exchange::{ExchangeJob, ExchangeQueue};
use super::pkce::{generate_state, PkceChallenge};

/// What `initiate` hands back to the request layer.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Fully-formed authorization URL to send the browser to
    pub authorization_url: String,
    /// State token correlating the eventual callback
    pub state: String,
}

/// Query parameters a provider may put on the callback redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Orchestrates the authorization-code flow end to end.
pub struct OAuthFlowService {
    engine: DiscoveryEngine,
    catalog: Arc<dyn ServerCatalog>,
    correlation: Arc<CorrelationStore>,
    queue: ExchangeQueue,
    ui_url: String,
}

impl OAuthFlowService {
    pub fn new(
        engine: DiscoveryEngine,
        catalog: Arc<dyn ServerCatalog>,
        correlation: Arc<CorrelationStore>,
        queue: ExchangeQueue,
        ui_url: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            catalog,
            correlation,
            queue,
            ui_url: ui_url.into(),
        }
    }

    /// Start an authorization flow for (tenant, server).
    ///
    /// The correlation entry is written only after discovery and
    /// registration have succeeded and the URL is built, so a failed
    /// initiation leaves nothing behind. Calling again before an earlier
    /// flow completes issues a fresh, independent state.
    pub async fn initiate(
        &self,
        tenant: &TenantId,
        server_name: &str,
    ) -> Result<AuthorizationRequest, OrchestratorError> {
        let server = self
            .catalog
            .get(server_name)
            .await
            .ok_or_else(|| OrchestratorError::UnknownServer(server_name.to_string()))?;

        let registration = self.engine.ensure_registration(tenant, &server.url).await?;
        let metadata = registration.metadata.as_ref().ok_or_else(|| {
            OrchestratorError::discovery(
                DiscoveryStep::AuthorizationServerMetadata,
                "Registration is missing endpoint metadata",
            )
        })?;

        let state = generate_state();
        let pkce = PkceChallenge::generate();

        let mut url = Url::parse(&metadata.authorization_endpoint).map_err(|e| {
            OrchestratorError::discovery(
                DiscoveryStep::AuthorizationServerMetadata,
                format!("Invalid authorization endpoint: {}", e),
            )
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", &registration.client_id);
            pairs.append_pair("redirect_uri", &registration.redirect_uri);
            pairs.append_pair("state", &state);
            pairs.append_pair("code_challenge", &pkce.challenge);
            pairs.append_pair("code_challenge_method", &pkce.method);
            if let Some(scope) = &registration.scope {
                pairs.append_pair("scope", scope);
            }
            // RFC 8707: bind the issued token to this resource server
            pairs.append_pair("resource", &server.url);
        }

        self.correlation.insert(
            state.clone(),
            PendingAuthorization::new(tenant.clone(), server_name, pkce.verifier),
        );

        info!(tenant = %tenant, server = %server_name, "Issued authorization redirect");
        Ok(AuthorizationRequest {
            authorization_url: url.into(),
            state,
        })
    }

    /// Turn a provider callback into a UI redirect target.
    ///
    /// Provider-reported errors pass through verbatim without touching
    /// the correlation store. A consumable state schedules the exchange;
    /// anything else reports an invalid state. No variant blocks on the
    /// exchange itself.
    pub fn handle_callback(&self, params: CallbackParams) -> String {
        match self.accept_callback(params) {
            Ok(server_name) => success_redirect(&self.ui_url, &server_name),
            Err(OrchestratorError::ProviderDenied { error, description }) => {
                error_redirect(&self.ui_url, &error, description.as_deref())
            }
            Err(e) => {
                let description = e.to_string();
                error_redirect(&self.ui_url, "invalid_state", Some(&description))
            }
        }
    }

    /// Validate the callback and schedule the exchange, naming the server
    /// now connecting.
    fn accept_callback(&self, params: CallbackParams) -> Result<String, OrchestratorError> {
        if let Some(error) = params.error {
            warn!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or(""),
                "Provider denied authorization"
            );
            return Err(OrchestratorError::ProviderDenied {
                error,
                description: params.error_description,
            });
        }

        let (code, state) = match (params.code, params.state) {
            (Some(code), Some(state)) => (code, state),
            _ => {
                warn!("Callback arrived without code or state");
                return Err(OrchestratorError::InvalidOrExpiredState);
            }
        };

        let Some(pending) = self.correlation.consume(&state) else {
            warn!("Callback carried an unknown, reused, or expired state");
            return Err(OrchestratorError::InvalidOrExpiredState);
        };

        let server_name = pending.server_name.clone();
        info!(
            tenant = %pending.tenant_id,
            server = %server_name,
            "Authorization code received; scheduling token exchange"
        );
        self.queue.enqueue(ExchangeJob::new(
            pending.tenant_id,
            &server_name,
            code,
            pending.pkce_verifier,
        ));

        Ok(server_name)
    }
}

fn join_query(ui_url: &str, query: String) -> String {
    let sep = if ui_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", ui_url, sep, query)
}

fn success_redirect(ui_url: &str, server_name: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("server", server_name)
        .append_pair("step", "success")
        .finish();
    join_query(ui_url, query)
}

fn error_redirect(ui_url: &str, error: &str, description: Option<&str>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("error", error);
    if let Some(description) = description {
        serializer.append_pair("error_description", description);
    }
    join_query(ui_url, serializer.finish())
}
