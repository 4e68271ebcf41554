//! Token endpoint client
//!
//! Performs the authorization-code exchange and refresh-token grant
//! against the endpoint recorded at discovery time. Client credentials
//! go in the form body (`client_secret_post`), matching how the hub
//! registers itself.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use mcphub_core::{TenantId, TokenRecord};
use serde::Deserialize;
use tracing::debug;

/// Timeout for token endpoint requests
const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Response from the token endpoint (RFC 6749 section 5.1)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a storable record, resolving `expires_in` against the
    /// current clock.
    pub fn into_record(
        self,
        tenant_id: TenantId,
        resource_origin: impl Into<String>,
    ) -> TokenRecord {
        let mut record = TokenRecord::new(tenant_id, resource_origin, self.access_token);
        record.token_type = self.token_type;
        if let Some(refresh) = self.refresh_token {
            record = record.with_refresh_token(refresh);
        }
        if let Some(secs) = self.expires_in {
            record = record.with_expiry(Utc::now() + chrono::Duration::seconds(secs));
        }
        if let Some(scope) = self.scope {
            record = record.with_scope(scope);
        }
        record
    }
}

/// Client for OAuth token endpoints
#[derive(Debug, Clone)]
pub struct TokenClient {
    http_client: reqwest::Client,
}

impl TokenClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Exchange an authorization code for tokens
    #[allow(clippy::too_many_arguments)]
    pub async fn exchange_code(
        &self,
        token_endpoint: &str,
        client_id: &str,
        client_secret: Option<&str>,
        code: &str,
        redirect_uri: &str,
        pkce_verifier: &str,
        resource: Option<&str>,
    ) -> Result<TokenResponse> {
        debug!("Exchanging authorization code at {}", token_endpoint);

        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", redirect_uri);
        params.insert("client_id", client_id);
        params.insert("code_verifier", pkce_verifier);
        if let Some(secret) = client_secret {
            params.insert("client_secret", secret);
        }
        if let Some(resource) = resource {
            params.insert("resource", resource);
        }

        self.post_form(token_endpoint, &params).await
    }

    /// Obtain fresh tokens with a refresh token
    pub async fn refresh(
        &self,
        token_endpoint: &str,
        client_id: &str,
        client_secret: Option<&str>,
        refresh_token: &str,
        resource: Option<&str>,
    ) -> Result<TokenResponse> {
        debug!("Refreshing access token at {}", token_endpoint);

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", client_id);
        if let Some(secret) = client_secret {
            params.insert("client_secret", secret);
        }
        if let Some(resource) = resource {
            params.insert("resource", resource);
        }

        self.post_form(token_endpoint, &params).await
    }

    async fn post_form(
        &self,
        token_endpoint: &str,
        params: &HashMap<&str, &str>,
    ) -> Result<TokenResponse> {
        let response = self
            .http_client
            .post(token_endpoint)
            .form(params)
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", token_endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Token endpoint returned HTTP {} - {}", status, body);
        }

        response.json().await.context("Invalid token response")
    }
}
