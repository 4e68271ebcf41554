//! MCP Hub Gateway
//!
//! The OAuth connection orchestrator. Connects tenants to remote MCP
//! servers that require OAuth 2.1 authorization:
//! - Protected-resource and authorization-server discovery
//! - Dynamic client registration (RFC 7591)
//! - Authorization-code flow with PKCE, correlated across the redirect
//! - Asynchronous token exchange feeding a per-tenant status store
//! - Token reuse and refresh for reconnection without a new redirect
//!
//! The HTTP surface here is deliberately small: the provider callback route
//! and a health endpoint. Initiation, connection, and status queries are
//! library calls made by the request-handling layer.

pub mod config;
pub mod connect;
pub mod oauth;
pub mod server;

pub use config::Settings;
pub use connect::{ConnectOutcome, ConnectionService, StatusKey, StatusStore, STATUS_TTL_SECS};
pub use oauth::{
    origin_of, AuthServerMetadata, AuthorizationRequest, CallbackParams, CorrelationStore,
    DiscoveryClient, DiscoveryEngine, ExchangeJob, ExchangeQueue, ExchangeWorker,
    OAuthFlowService, PendingAuthorization, PkceChallenge, ProtectedResourceMetadata,
    RegistrationClient, RegistrationRequest, RegistrationResponse, TokenClient, TokenResponse,
    CORRELATION_TTL_SECS,
};
pub use server::{build_router, AppState};
