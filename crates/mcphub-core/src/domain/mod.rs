//! Domain entities and value objects
//!
//! All domain-level types for the connection orchestrator:
//! - TenantId (the unit of isolation)
//! - ClientRegistration and TokenRecord (per tenant + resource origin)
//! - ConnectionState / ConnectionStatus (per tenant + server)
//! - ToolDescriptor (capability snapshots)

mod registration;
mod status;
mod tenant;
mod token;
mod tool;

pub use registration::{ClientRegistration, EndpointMetadata};
pub use status::{ConnectionState, ConnectionStatus};
pub use tenant::TenantId;
pub use token::TokenRecord;
pub use tool::{empty_schema, normalize_schema, ToolDescriptor};
