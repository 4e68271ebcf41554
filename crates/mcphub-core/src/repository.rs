//! Data access traits implemented by the storage layer.
//!
//! Both repositories are partitioned by tenant: every method takes the
//! tenant explicitly and implementations must key rows on
//! (tenant, resource origin) so cross-tenant reads are structurally
//! impossible.

use async_trait::async_trait;

use crate::domain::{ClientRegistration, TenantId, TokenRecord};

/// Convenience alias used by all repository methods.
pub type RepoResult<T> = anyhow::Result<T>;

/// Persistent storage of dynamic client registrations.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn get(&self, tenant: &TenantId, origin: &str)
        -> RepoResult<Option<ClientRegistration>>;

    /// Insert or overwrite the registration for its (tenant, origin).
    async fn save(&self, registration: &ClientRegistration) -> RepoResult<()>;

    async fn delete(&self, tenant: &TenantId, origin: &str) -> RepoResult<()>;

    async fn list_for_tenant(&self, tenant: &TenantId) -> RepoResult<Vec<ClientRegistration>>;
}

/// Persistent storage of OAuth tokens.
///
/// Records have no automatic expiry; deletion is always explicit
/// (revocation or reauthorization).
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn get(&self, tenant: &TenantId, origin: &str) -> RepoResult<Option<TokenRecord>>;

    /// Insert or overwrite the record for its (tenant, origin). Last write
    /// wins.
    async fn save(&self, record: &TokenRecord) -> RepoResult<()>;

    async fn delete(&self, tenant: &TenantId, origin: &str) -> RepoResult<()>;

    async fn list_for_tenant(&self, tenant: &TenantId) -> RepoResult<Vec<TokenRecord>>;
}
