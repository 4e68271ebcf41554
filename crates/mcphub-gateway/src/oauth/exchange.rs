//! Background token exchange
//!
//! The callback handler must answer immediately, so the code-for-token
//! exchange, token persistence, and first connection all run here,
//! decoupled from the HTTP request. Completion is observed only through
//! the status store. Jobs for different tenants run concurrently; a job
//! is never retried, since authorization codes are single-use.

use std::sync::Arc;

use mcphub_core::{
    ClientRegistration, ConnectionStatus, OrchestratorError, RegistrationRepository, ServerCatalog,
    TenantId, TokenRepository,
};
use mcphub_mcp::McpClient;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::discovery::{origin_of, DiscoveryClient};
use super::token::TokenClient;
use crate::connect::StatusStore;

/// One scheduled exchange, carrying everything consumed from the
/// correlation entry plus the provider's authorization code.
#[derive(Debug, Clone)]
pub struct ExchangeJob {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub server_name: String,
    pub code: String,
    pub pkce_verifier: String,
}

impl ExchangeJob {
    pub fn new(
        tenant_id: TenantId,
        server_name: impl Into<String>,
        code: impl Into<String>,
        pkce_verifier: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            server_name: server_name.into(),
            code: code.into(),
            pkce_verifier: pkce_verifier.into(),
        }
    }
}

/// Handle for scheduling exchange jobs.
#[derive(Clone)]
pub struct ExchangeQueue {
    tx: mpsc::UnboundedSender<ExchangeJob>,
}

impl ExchangeQueue {
    /// Schedule a job. Never fails; a closed queue is logged and the job
    /// dropped, and the flow surfaces as an eventual status-store timeout.
    pub fn enqueue(&self, job: ExchangeJob) {
        if let Err(e) = self.tx.send(job) {
            error!("Exchange queue is closed; dropping job: {}", e);
        }
    }
}

#[cfg(test)]
impl ExchangeQueue {
    /// Queue backed by a bare channel, for tests that assert on scheduled
    /// jobs without running a worker.
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<ExchangeJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Consumes [`ExchangeJob`]s and drives each one to a terminal status
/// write.
pub struct ExchangeWorker {
    registrations: Arc<dyn RegistrationRepository>,
    tokens: Arc<dyn TokenRepository>,
    status: Arc<StatusStore>,
    catalog: Arc<dyn ServerCatalog>,
    mcp_client: Arc<McpClient>,
    token_client: TokenClient,
    discovery: DiscoveryClient,
}

impl ExchangeWorker {
    pub fn new(
        http_client: reqwest::Client,
        registrations: Arc<dyn RegistrationRepository>,
        tokens: Arc<dyn TokenRepository>,
        status: Arc<StatusStore>,
        catalog: Arc<dyn ServerCatalog>,
        mcp_client: Arc<McpClient>,
    ) -> Self {
        Self {
            registrations,
            tokens,
            status,
            catalog,
            mcp_client,
            token_client: TokenClient::new(http_client.clone()),
            discovery: DiscoveryClient::new(http_client),
        }
    }

    /// Start the dispatcher task and return the queue feeding it. Each
    /// job runs in its own task so a slow provider cannot delay others.
    pub fn spawn(self) -> ExchangeQueue {
        let (tx, mut rx) = mpsc::unbounded_channel::<ExchangeJob>();
        let worker = Arc::new(self);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let worker = Arc::clone(&worker);
                tokio::spawn(async move { worker.run(job).await });
            }
            debug!("Exchange queue closed; dispatcher exiting");
        });
        ExchangeQueue { tx }
    }

    async fn run(&self, job: ExchangeJob) {
        info!(
            job_id = %job.id,
            tenant = %job.tenant_id,
            server = %job.server_name,
            "Starting token exchange"
        );
        match self.execute(&job).await {
            Ok(tool_count) => {
                info!(
                    job_id = %job.id,
                    server = %job.server_name,
                    tool_count,
                    "Connection established"
                );
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    server = %job.server_name,
                    "Token exchange failed: {}",
                    e
                );
                self.status.set(
                    &job.tenant_id,
                    &job.server_name,
                    ConnectionStatus::failed(e.to_string()),
                );
            }
        }
    }

    /// The exchange pipeline. Each step's failure is terminal for this
    /// job; state persisted by earlier steps stays put. Tokens are saved
    /// before the first connection attempt, so a probe failure leaves
    /// them available for a later reconnect.
    async fn execute(&self, job: &ExchangeJob) -> Result<usize, OrchestratorError> {
        let server = self
            .catalog
            .get(&job.server_name)
            .await
            .ok_or_else(|| OrchestratorError::UnknownServer(job.server_name.clone()))?;
        let origin = origin_of(&server.url)?;

        let registration = self
            .registrations
            .get(&job.tenant_id, &origin)
            .await?
            .ok_or(OrchestratorError::ClientNotRegistered)?;

        let token_endpoint = self.resolve_token_endpoint(&registration, &origin).await;

        let response = self
            .token_client
            .exchange_code(
                &token_endpoint,
                &registration.client_id,
                registration.client_secret.as_deref(),
                &job.code,
                &registration.redirect_uri,
                &job.pkce_verifier,
                Some(&server.url),
            )
            .await
            .map_err(|e| OrchestratorError::TokenExchangeFailed(e.to_string()))?;

        let record = response.into_record(job.tenant_id.clone(), &origin);
        self.tokens.save(&record).await?;
        debug!(tenant = %job.tenant_id, origin = %origin, "Stored OAuth tokens");

        let probe = self
            .mcp_client
            .probe(&server.url, Some(&record.access_token))
            .await
            .map_err(|e| OrchestratorError::ConnectionFailed(e.to_string()))?;

        let tool_count = probe.tools.len();
        self.status.set(
            &job.tenant_id,
            &job.server_name,
            ConnectionStatus::connected(probe.tools),
        );
        Ok(tool_count)
    }

    /// Pick the token endpoint: the one recorded at discovery time,
    /// else a fresh metadata walk, else the conventional `/token` path
    /// under the origin.
    async fn resolve_token_endpoint(
        &self,
        registration: &ClientRegistration,
        origin: &str,
    ) -> String {
        if let Some(endpoint) = registration.token_endpoint() {
            return endpoint.to_string();
        }

        match self.rediscover_token_endpoint(origin).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!(
                    origin = %origin,
                    "Token endpoint re-discovery failed ({}); assuming /token under the origin",
                    e
                );
                format!("{}/token", origin.trim_end_matches('/'))
            }
        }
    }

    async fn rediscover_token_endpoint(&self, origin: &str) -> anyhow::Result<String> {
        let resource = self.discovery.fetch_protected_resource(origin).await?;
        let issuer = resource
            .primary_authorization_server()
            .map(str::to_string)
            .unwrap_or_else(|| origin.to_string());
        let auth_server = self.discovery.fetch_authorization_server(&issuer).await?;
        Ok(auth_server.token_endpoint)
    }
}
