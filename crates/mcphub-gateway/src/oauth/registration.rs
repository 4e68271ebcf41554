//! Dynamic Client Registration (RFC 7591)
//!
//! Registers the hub as an OAuth client with an authorization server at
//! connect time, so no provider-specific client credentials need to be
//! provisioned ahead of time.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Timeout for the registration request
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Client metadata submitted to the registration endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl RegistrationRequest {
    /// Build the hub's standard registration payload
    pub fn new(redirect_uri: impl Into<String>, scope: Option<String>) -> Self {
        Self {
            client_name: "MCP Hub".to_string(),
            redirect_uris: vec![redirect_uri.into()],
            grant_types: vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: "client_secret_post".to_string(),
            scope,
        }
    }
}

/// Credentials issued by the registration endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub client_id_issued_at: Option<i64>,
    #[serde(default)]
    pub client_secret_expires_at: Option<i64>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Client for RFC 7591 registration endpoints
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    http_client: reqwest::Client,
}

impl RegistrationClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Register a new client and return the issued credentials
    pub async fn register(
        &self,
        registration_endpoint: &str,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse> {
        debug!(
            "Registering OAuth client at {} as '{}'",
            registration_endpoint, request.client_name
        );

        let response = self
            .http_client
            .post(registration_endpoint)
            .json(request)
            .timeout(REGISTRATION_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", registration_endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Client registration failed: HTTP {} - {}", status, body);
        }

        response.json().await.context("Invalid registration response")
    }
}
