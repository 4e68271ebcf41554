//! OAuth server metadata discovery
//!
//! Resolves the authorization server for a protected MCP resource using
//! RFC 9728 (protected resource metadata) and RFC 8414 (authorization
//! server metadata), with the OpenID Connect discovery document as a
//! fallback for providers that predate RFC 8414.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Timeout for each discovery request
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Protected resource metadata (RFC 9728)
///
/// Served by the resource server at
/// `/.well-known/oauth-protected-resource` and points at the
/// authorization server(s) that can issue tokens for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// The resource identifier
    #[serde(default)]
    pub resource: Option<String>,
    /// Issuer URLs of authorization servers for this resource
    #[serde(default)]
    pub authorization_servers: Vec<String>,
    /// Scopes the resource understands
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    /// Supported bearer token presentation methods
    #[serde(default)]
    pub bearer_methods_supported: Vec<String>,
}

impl ProtectedResourceMetadata {
    /// First advertised authorization server, if any
    pub fn primary_authorization_server(&self) -> Option<&str> {
        self.authorization_servers.first().map(|s| s.as_str())
    }

    /// All supported scopes joined into a single request string
    pub fn scope_string(&self) -> Option<String> {
        if self.scopes_supported.is_empty() {
            None
        } else {
            Some(self.scopes_supported.join(" "))
        }
    }
}

/// Authorization server metadata (RFC 8414)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthServerMetadata {
    /// Issuer identifier
    #[serde(default)]
    pub issuer: Option<String>,
    /// Authorization endpoint URL
    pub authorization_endpoint: String,
    /// Token endpoint URL
    pub token_endpoint: String,
    /// Dynamic client registration endpoint (RFC 7591), if offered
    #[serde(default)]
    pub registration_endpoint: Option<String>,
    /// Scopes the server supports
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    /// PKCE code challenge methods the server supports
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
    /// Grant types the server supports
    #[serde(default)]
    pub grant_types_supported: Vec<String>,
}

impl AuthServerMetadata {
    /// Whether the server advertises S256 PKCE support
    pub fn supports_pkce(&self) -> bool {
        self.code_challenge_methods_supported
            .iter()
            .any(|m| m == "S256")
    }
}

/// Client for OAuth discovery endpoints
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    http_client: reqwest::Client,
}

impl DiscoveryClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Fetch protected resource metadata from a resource origin
    pub async fn fetch_protected_resource(
        &self,
        origin: &str,
    ) -> Result<ProtectedResourceMetadata> {
        let url = format!(
            "{}/.well-known/oauth-protected-resource",
            origin.trim_end_matches('/')
        );
        debug!("Fetching protected resource metadata from {}", url);

        let response = self
            .http_client
            .get(&url)
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        if !response.status().is_success() {
            bail!(
                "Protected resource metadata request failed: HTTP {} - {}",
                response.status(),
                url
            );
        }

        response
            .json()
            .await
            .context("Invalid protected resource metadata")
    }

    /// Fetch authorization server metadata from an issuer URL
    ///
    /// Tries the RFC 8414 well-known path first, then falls back to the
    /// OpenID Connect discovery document.
    pub async fn fetch_authorization_server(&self, issuer: &str) -> Result<AuthServerMetadata> {
        let base = issuer.trim_end_matches('/');
        let candidates = [
            format!("{}/.well-known/oauth-authorization-server", base),
            format!("{}/.well-known/openid-configuration", base),
        ];

        for url in &candidates {
            debug!("Fetching authorization server metadata from {}", url);
            match self.try_fetch_metadata(url).await {
                Ok(metadata) => return Ok(metadata),
                Err(e) => {
                    debug!("Metadata not available at {}: {}", url, e);
                }
            }
        }

        bail!("No authorization server metadata found for issuer {}", issuer)
    }

    async fn try_fetch_metadata(&self, url: &str) -> Result<AuthServerMetadata> {
        let response = self
            .http_client
            .get(url)
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        response
            .json()
            .await
            .context("Invalid authorization server metadata")
    }
}

/// Extract the origin (scheme + host + port) from a server URL
pub fn origin_of(server_url: &str) -> Result<String> {
    let url = Url::parse(server_url).with_context(|| format!("Invalid URL: {}", server_url))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        bail!("URL has no usable origin: {}", server_url);
    }
    Ok(origin.ascii_serialization())
}
