//! # MCP Hub Core
//!
//! Domain entities and data-access traits for the OAuth connection
//! orchestrator.
//!
//! ## Modules
//!
//! - `domain` - Core entities (TenantId, ClientRegistration, TokenRecord,
//!   ConnectionStatus, ToolDescriptor)
//! - `error` - Orchestrator failure taxonomy
//! - `repository` - Persistence traits implemented by `mcphub-storage`
//! - `memory` - In-memory repository implementations for tests and
//!   ephemeral deployments
//! - `catalog` - Read-only lookup of connectable servers

pub mod catalog;
pub mod domain;
pub mod error;
pub mod memory;
pub mod repository;

// Re-export commonly used types
pub use catalog::{ServerCatalog, ServerDefinition, StaticServerCatalog};
pub use domain::*;
pub use error::{DiscoveryStep, OrchestratorError};
pub use repository::{RegistrationRepository, RepoResult, TokenRepository};
