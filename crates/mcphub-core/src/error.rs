//! Failure taxonomy for the connection orchestrator.

use std::fmt;

use thiserror::Error;

/// Steps of the discovery and registration pipeline, reported inside
/// [`OrchestratorError::DiscoveryFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStep {
    ProtectedResource,
    AuthorizationServerMetadata,
    ClientRegistration,
}

impl DiscoveryStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtectedResource => "protected_resource",
            Self::AuthorizationServerMetadata => "authorization_server_metadata",
            Self::ClientRegistration => "client_registration",
        }
    }
}

impl fmt::Display for DiscoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the connection orchestrator.
///
/// Initiation-time errors propagate to the caller; callback-time errors are
/// folded into a redirect; exchange-task errors are reported only as a
/// FAILED status entry.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A discovery or registration step failed. Nothing partial was
    /// persisted.
    #[error("OAuth discovery failed at {step}: {message}")]
    DiscoveryFailed {
        step: DiscoveryStep,
        message: String,
    },

    /// No client registration exists for this tenant and origin.
    #[error("OAuth client not registered. Please try connecting again.")]
    ClientNotRegistered,

    /// The state token was unknown, already consumed, or older than the
    /// correlation window.
    #[error("OAuth state is invalid or expired")]
    InvalidOrExpiredState,

    /// The token endpoint rejected the exchange.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The downstream server was unreachable or rejected the token.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The end user declined authorization at the provider.
    #[error("Provider denied authorization: {error}")]
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    /// The requested server is not present in the catalog.
    #[error("Unknown server: {0}")]
    UnknownServer(String),

    /// Storage or other infrastructure failure outside the OAuth taxonomy.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn discovery(step: DiscoveryStep, message: impl Into<String>) -> Self {
        Self::DiscoveryFailed {
            step,
            message: message.into(),
        }
    }
}
