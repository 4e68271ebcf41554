//! SQLite implementation of RegistrationRepository with encryption.
//!
//! One row per (tenant, resource origin). Only the client secret is
//! encrypted; discovered endpoint metadata is stored as plaintext JSON so
//! it stays inspectable.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcphub_core::{ClientRegistration, EndpointMetadata, RegistrationRepository, TenantId};
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::crypto::FieldEncryptor;
use crate::Database;

/// Raw row data extracted from SQLite before decryption.
struct RawRegistrationRow {
    id: String,
    tenant_id: String,
    resource_origin: String,
    client_id: String,
    client_secret: Option<String>, // Encrypted
    redirect_uri: String,
    scope: Option<String>,
    metadata_json: Option<String>,
    created_at: String,
    updated_at: String,
}

/// SQLite-backed client registration repository with field-level encryption.
pub struct SqliteRegistrationRepository {
    db: Arc<Mutex<Database>>,
    encryptor: Arc<FieldEncryptor>,
}

impl SqliteRegistrationRepository {
    /// Create a new registration repository.
    pub fn new(db: Arc<Mutex<Database>>, encryptor: Arc<FieldEncryptor>) -> Self {
        Self { db, encryptor }
    }

    /// Encrypt a client secret for storage.
    fn encrypt_secret(&self, value: &str) -> Result<String> {
        self.encryptor
            .encrypt(value)
            .map_err(|e| anyhow::anyhow!("Failed to encrypt client secret: {}", e))
    }

    /// Decrypt a client secret from storage.
    fn decrypt_secret(&self, encrypted: &str) -> Result<String> {
        self.encryptor
            .decrypt(encrypted)
            .map_err(|e| anyhow::anyhow!("Failed to decrypt client secret: {}", e))
    }

    /// Parse a datetime string to DateTime<Utc>.
    fn parse_datetime(s: &str) -> DateTime<Utc> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return dt.with_timezone(&Utc);
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return dt.and_utc();
        }
        Utc::now()
    }

    /// Standard column list for SELECT queries.
    const SELECT_COLUMNS: &'static str =
        "id, tenant_id, resource_origin, client_id, client_secret, redirect_uri, scope, metadata_json, created_at, updated_at";

    /// Extract raw row data from a rusqlite Row.
    fn extract_row(row: &rusqlite::Row) -> rusqlite::Result<RawRegistrationRow> {
        Ok(RawRegistrationRow {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            resource_origin: row.get(2)?,
            client_id: row.get(3)?,
            client_secret: row.get(4)?,
            redirect_uri: row.get(5)?,
            scope: row.get(6)?,
            metadata_json: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    /// Build a ClientRegistration from extracted row data (needs &self for decryption).
    fn build_registration(&self, row: RawRegistrationRow) -> Result<ClientRegistration> {
        let client_secret = match row.client_secret {
            Some(encrypted) => Some(self.decrypt_secret(&encrypted)?),
            None => None,
        };

        // Parse metadata from JSON if present
        let metadata: Option<EndpointMetadata> = row.metadata_json.and_then(|json| {
            serde_json::from_str(&json)
                .map_err(|e| {
                    warn!("Failed to parse stored endpoint metadata: {}", e);
                    e
                })
                .ok()
        });

        Ok(ClientRegistration {
            id: row.id.parse().unwrap_or_else(|_| Uuid::new_v4()),
            tenant_id: TenantId::from(row.tenant_id),
            resource_origin: row.resource_origin,
            client_id: row.client_id,
            client_secret,
            redirect_uri: row.redirect_uri,
            scope: row.scope,
            metadata,
            created_at: Self::parse_datetime(&row.created_at),
            updated_at: Self::parse_datetime(&row.updated_at),
        })
    }
}

#[async_trait]
impl RegistrationRepository for SqliteRegistrationRepository {
    async fn get(
        &self,
        tenant: &TenantId,
        origin: &str,
    ) -> Result<Option<ClientRegistration>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM client_registrations WHERE tenant_id = ?1 AND resource_origin = ?2",
            Self::SELECT_COLUMNS
        ))?;

        let row = stmt
            .query_row(params![tenant.as_str(), origin], Self::extract_row)
            .optional()?;

        match row {
            Some(raw) => Ok(Some(self.build_registration(raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, registration: &ClientRegistration) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let encrypted_secret = match &registration.client_secret {
            Some(secret) => Some(self.encrypt_secret(secret)?),
            None => None,
        };

        // Serialize metadata to JSON if present
        let metadata_json: Option<String> = registration
            .metadata
            .as_ref()
            .and_then(|m| serde_json::to_string(m).ok());

        conn.execute(
            "INSERT INTO client_registrations (
                id, tenant_id, resource_origin, client_id, client_secret, redirect_uri, scope, metadata_json, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(tenant_id, resource_origin) DO UPDATE SET
                client_id = excluded.client_id,
                client_secret = excluded.client_secret,
                redirect_uri = excluded.redirect_uri,
                scope = excluded.scope,
                metadata_json = excluded.metadata_json,
                updated_at = excluded.updated_at",
            params![
                registration.id.to_string(),
                registration.tenant_id.as_str(),
                registration.resource_origin,
                registration.client_id,
                encrypted_secret,
                registration.redirect_uri,
                registration.scope,
                metadata_json,
                registration.created_at.to_rfc3339(),
                registration.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, origin: &str) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute(
            "DELETE FROM client_registrations WHERE tenant_id = ?1 AND resource_origin = ?2",
            params![tenant.as_str(), origin],
        )?;

        Ok(())
    }

    async fn list_for_tenant(&self, tenant: &TenantId) -> Result<Vec<ClientRegistration>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM client_registrations WHERE tenant_id = ?1 ORDER BY resource_origin",
            Self::SELECT_COLUMNS
        ))?;

        let rows: Vec<_> = stmt
            .query_map(params![tenant.as_str()], Self::extract_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|r| self.build_registration(r))
            .collect()
    }
}
