//! In-memory repository implementations.
//!
//! Useful for tests and ephemeral deployments that do not want a
//! database on disk. Keys are the same (tenant, origin) composites the
//! durable implementations use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ClientRegistration, TenantId, TokenRecord};
use crate::repository::{RegistrationRepository, RepoResult, TokenRepository};

fn key(tenant: &TenantId, origin: &str) -> String {
    format!("{}:{}", tenant, origin)
}

/// [`RegistrationRepository`] backed by a hash map.
#[derive(Default)]
pub struct InMemoryRegistrationRepository {
    rows: RwLock<HashMap<String, ClientRegistration>>,
}

impl InMemoryRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRegistrationRepository {
    async fn get(
        &self,
        tenant: &TenantId,
        origin: &str,
    ) -> RepoResult<Option<ClientRegistration>> {
        Ok(self.rows.read().await.get(&key(tenant, origin)).cloned())
    }

    async fn save(&self, registration: &ClientRegistration) -> RepoResult<()> {
        self.rows
            .write()
            .await
            .insert(registration.key(), registration.clone());
        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, origin: &str) -> RepoResult<()> {
        self.rows.write().await.remove(&key(tenant, origin));
        Ok(())
    }

    async fn list_for_tenant(&self, tenant: &TenantId) -> RepoResult<Vec<ClientRegistration>> {
        let mut all: Vec<_> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| &r.tenant_id == tenant)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.resource_origin.cmp(&b.resource_origin));
        Ok(all)
    }
}

/// [`TokenRepository`] backed by a hash map.
#[derive(Default)]
pub struct InMemoryTokenRepository {
    rows: RwLock<HashMap<String, TokenRecord>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn get(&self, tenant: &TenantId, origin: &str) -> RepoResult<Option<TokenRecord>> {
        Ok(self.rows.read().await.get(&key(tenant, origin)).cloned())
    }

    async fn save(&self, record: &TokenRecord) -> RepoResult<()> {
        self.rows.write().await.insert(record.key(), record.clone());
        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, origin: &str) -> RepoResult<()> {
        self.rows.write().await.remove(&key(tenant, origin));
        Ok(())
    }

    async fn list_for_tenant(&self, tenant: &TenantId) -> RepoResult<Vec<TokenRecord>> {
        let mut all: Vec<_> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| &r.tenant_id == tenant)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.resource_origin.cmp(&b.resource_origin));
        Ok(all)
    }
}
