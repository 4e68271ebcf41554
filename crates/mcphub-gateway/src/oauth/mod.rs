//! OAuth 2.1 authorization-code flow for MCP servers
//!
//! Layout mirrors the flow itself:
//! - `discovery` - RFC 9728 / RFC 8414 metadata resolution
//! - `registration` - RFC 7591 dynamic client registration
//! - `engine` - the pipeline combining the two, backed by the registration store
//! - `pkce` - PKCE and state token generation
//! - `correlation` - state-keyed pending authorizations, consumed once
//! - `flow` - initiate and callback handling
//! - `token` - code exchange and refresh against the token endpoint
//! - `exchange` - background worker driving exchange-then-connect

pub mod correlation;
pub mod discovery;
pub mod engine;
pub mod exchange;
pub mod flow;
pub mod pkce;
pub mod registration;
pub mod token;

pub use correlation::{CorrelationStore, PendingAuthorization, CORRELATION_TTL_SECS};
pub use discovery::{origin_of, AuthServerMetadata, DiscoveryClient, ProtectedResourceMetadata};
pub use engine::DiscoveryEngine;
pub use exchange::{ExchangeJob, ExchangeQueue, ExchangeWorker};
pub use flow::{AuthorizationRequest, CallbackParams, OAuthFlowService};
pub use pkce::{generate_state, PkceChallenge};
pub use registration::{RegistrationClient, RegistrationRequest, RegistrationResponse};
pub use token::{TokenClient, TokenResponse};
