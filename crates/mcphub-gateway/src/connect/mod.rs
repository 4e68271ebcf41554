//! Connection management
//!
//! The token-reuse path: given a tenant and a server name, either answer
//! from the status store, connect directly with a stored token
//! (refreshing it when expired), or report that an authorization flow is
//! needed. This layer never builds authorization URLs; callers route to
//! the flow service for that.

mod status;

pub use status::{StatusKey, StatusStore, STATUS_TTL_SECS};

use std::sync::Arc;

use mcphub_core::{
    ClientRegistration, ConnectionStatus, OrchestratorError, RegistrationRepository, ServerCatalog,
    ServerDefinition, TenantId, TokenRecord, TokenRepository, ToolDescriptor,
};
use mcphub_mcp::McpClient;
use tracing::{debug, info};

use crate::oauth::{origin_of, TokenClient};

/// Result of a connection attempt.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    /// The server is reachable and its tools were captured.
    Connected {
        tools: Vec<ToolDescriptor>,
        /// Whether this was answered from the status store without
        /// touching the network.
        reused: bool,
    },
    /// No stored token exists and the server requires OAuth; the caller
    /// must start an authorization flow.
    AuthorizationRequired,
}

/// Connects tenants to servers using stored tokens.
pub struct ConnectionService {
    tokens: Arc<dyn TokenRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    status: Arc<StatusStore>,
    catalog: Arc<dyn ServerCatalog>,
    mcp_client: Arc<McpClient>,
    token_client: TokenClient,
}

impl ConnectionService {
    pub fn new(
        http_client: reqwest::Client,
        tokens: Arc<dyn TokenRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        status: Arc<StatusStore>,
        catalog: Arc<dyn ServerCatalog>,
        mcp_client: Arc<McpClient>,
    ) -> Self {
        Self {
            tokens,
            registrations,
            status,
            catalog,
            mcp_client,
            token_client: TokenClient::new(http_client),
        }
    }

    /// Connect (or reconnect) a tenant to a server.
    ///
    /// A live CONNECTED entry answers immediately with no network I/O.
    /// Otherwise a stored token is used directly, refreshed first if
    /// expired. Only when the server requires OAuth and no token exists
    /// does this report [`ConnectOutcome::AuthorizationRequired`] instead
    /// of connecting. Connection failures are written to the status store
    /// before surfacing.
    pub async fn connect(
        &self,
        tenant: &TenantId,
        server_name: &str,
    ) -> Result<ConnectOutcome, OrchestratorError> {
        let current = self.status.get(tenant, server_name);
        if current.is_connected() {
            debug!(tenant = %tenant, server = %server_name, "Reusing live connection");
            return Ok(ConnectOutcome::Connected {
                tools: current.tools,
                reused: true,
            });
        }

        let server = self
            .catalog
            .get(server_name)
            .await
            .ok_or_else(|| OrchestratorError::UnknownServer(server_name.to_string()))?;
        let origin = origin_of(&server.url)?;

        match self.try_connect(tenant, &server, &origin).await {
            Ok(Some(tools)) => {
                self.status.set(
                    tenant,
                    server_name,
                    ConnectionStatus::connected(tools.clone()),
                );
                info!(
                    tenant = %tenant,
                    server = %server_name,
                    tool_count = tools.len(),
                    "Connected"
                );
                Ok(ConnectOutcome::Connected {
                    tools,
                    reused: false,
                })
            }
            Ok(None) => Ok(ConnectOutcome::AuthorizationRequired),
            Err(e) => {
                self.status
                    .set(tenant, server_name, ConnectionStatus::failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Probe the server with whatever credentials are on file.
    ///
    /// `Ok(None)` means an authorization flow is required first.
    async fn try_connect(
        &self,
        tenant: &TenantId,
        server: &ServerDefinition,
        origin: &str,
    ) -> Result<Option<Vec<ToolDescriptor>>, OrchestratorError> {
        let access_token = match self.tokens.get(tenant, origin).await? {
            Some(record) if record.is_expired() => {
                let registration = self
                    .registrations
                    .get(tenant, origin)
                    .await?
                    .ok_or(OrchestratorError::ClientNotRegistered)?;
                let refreshed = self
                    .refresh_record(&registration, &record, origin, &server.url)
                    .await?;
                Some(refreshed.access_token)
            }
            Some(record) => Some(record.access_token),
            None if server.requires_auth => return Ok(None),
            None => None,
        };

        let probe = self
            .mcp_client
            .probe(&server.url, access_token.as_deref())
            .await
            .map_err(|e| OrchestratorError::ConnectionFailed(e.to_string()))?;
        Ok(Some(probe.tools))
    }

    /// Run the refresh-token grant and persist the result.
    ///
    /// A provider that rotates refresh tokens sends a new one; a provider
    /// that does not gets the previous one carried forward so the record
    /// stays refreshable.
    async fn refresh_record(
        &self,
        registration: &ClientRegistration,
        previous: &TokenRecord,
        origin: &str,
        resource: &str,
    ) -> Result<TokenRecord, OrchestratorError> {
        let Some(refresh_token) = previous.refresh_token.as_deref() else {
            return Err(OrchestratorError::ConnectionFailed(
                "Access token expired and no refresh token is available".into(),
            ));
        };

        let token_endpoint = registration
            .token_endpoint()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/token", origin.trim_end_matches('/')));

        let response = self
            .token_client
            .refresh(
                &token_endpoint,
                &registration.client_id,
                registration.client_secret.as_deref(),
                refresh_token,
                Some(resource),
            )
            .await
            .map_err(|e| OrchestratorError::TokenExchangeFailed(e.to_string()))?;

        let mut record = response.into_record(previous.tenant_id.clone(), origin);
        if record.refresh_token.is_none() {
            record.refresh_token = previous.refresh_token.clone();
        }
        self.tokens.save(&record).await?;
        info!(tenant = %previous.tenant_id, origin = %origin, "Refreshed access token");
        Ok(record)
    }

    /// Mark a server disconnected and drop its cached tools. Stored
    /// tokens are untouched, so a later connect reuses them.
    pub fn disconnect(&self, tenant: &TenantId, server_name: &str) {
        self.status
            .set(tenant, server_name, ConnectionStatus::disconnected());
        info!(tenant = %tenant, server = %server_name, "Disconnected");
    }

    /// Disconnect every server this tenant sees as connected. Returns how
    /// many were disconnected.
    pub fn disconnect_all(&self, tenant: &TenantId) -> usize {
        let connected = self.status.connected_servers(tenant);
        let count = connected.len();
        for server in &connected {
            self.status
                .set(tenant, server, ConnectionStatus::disconnected());
        }
        info!(tenant = %tenant, count, "Disconnected all servers");
        count
    }

    /// Names of servers this tenant currently sees as connected.
    pub fn list_connected(&self, tenant: &TenantId) -> Vec<String> {
        self.status.connected_servers(tenant)
    }

    /// Current status for (tenant, server).
    pub fn status(&self, tenant: &TenantId, server_name: &str) -> ConnectionStatus {
        self.status.get(tenant, server_name)
    }

    /// Delete stored tokens so the next connect forces a fresh
    /// authorization flow. The client registration is kept; providers
    /// reuse it on the next round.
    pub async fn reauthorize(
        &self,
        tenant: &TenantId,
        server_name: &str,
    ) -> Result<(), OrchestratorError> {
        let server = self
            .catalog
            .get(server_name)
            .await
            .ok_or_else(|| OrchestratorError::UnknownServer(server_name.to_string()))?;
        let origin = origin_of(&server.url)?;

        self.tokens.delete(tenant, &origin).await?;
        self.status
            .set(tenant, server_name, ConnectionStatus::disconnected());
        info!(tenant = %tenant, server = %server_name, "Cleared stored tokens");
        Ok(())
    }
}
