//! SQLite implementation of TokenRepository with encryption.
//!
//! One row per (tenant, resource origin), replaced wholesale on each save.
//! Both token values are encrypted; expiry and scope stay plaintext for
//! queryability.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcphub_core::{TenantId, TokenRecord, TokenRepository};
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::crypto::FieldEncryptor;
use crate::Database;

/// Raw row data extracted from SQLite before decryption.
struct RawTokenRow {
    tenant_id: String,
    resource_origin: String,
    access_token: String, // Encrypted
    refresh_token: Option<String>, // Encrypted
    token_type: String,
    expires_at: Option<String>,
    scope: Option<String>,
    created_at: String,
    updated_at: String,
}

/// SQLite-backed token repository with field-level encryption.
pub struct SqliteTokenRepository {
    db: Arc<Mutex<Database>>,
    encryptor: Arc<FieldEncryptor>,
}

impl SqliteTokenRepository {
    /// Create a new token repository.
    pub fn new(db: Arc<Mutex<Database>>, encryptor: Arc<FieldEncryptor>) -> Self {
        Self { db, encryptor }
    }

    /// Encrypt a token value for storage.
    fn encrypt_token(&self, value: &str) -> Result<String> {
        self.encryptor
            .encrypt(value)
            .map_err(|e| anyhow::anyhow!("Failed to encrypt token value: {}", e))
    }

    /// Decrypt a token value from storage.
    fn decrypt_token(&self, encrypted: &str) -> Result<String> {
        self.encryptor
            .decrypt(encrypted)
            .map_err(|e| anyhow::anyhow!("Failed to decrypt token value: {}", e))
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

    /// Parse an optional datetime string.
    fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
        s.map(|dt| Self::parse_datetime(&dt))
    }

    /// Standard column list for SELECT queries.
    const SELECT_COLUMNS: &'static str =
        "tenant_id, resource_origin, access_token, refresh_token, token_type, expires_at, scope, created_at, updated_at";

    /// Extract raw row data from a rusqlite Row.
    fn extract_row(row: &rusqlite::Row) -> rusqlite::Result<RawTokenRow> {
        Ok(RawTokenRow {
            tenant_id: row.get(0)?,
            resource_origin: row.get(1)?,
            access_token: row.get(2)?,
            refresh_token: row.get(3)?,
            token_type: row.get(4)?,
            expires_at: row.get(5)?,
            scope: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Build a TokenRecord from extracted row data (needs &self for decryption).
    fn build_record(&self, row: RawTokenRow) -> Result<TokenRecord> {
        let access_token = self.decrypt_token(&row.access_token)?;
        let refresh_token = match row.refresh_token {
            Some(encrypted) => Some(self.decrypt_token(&encrypted)?),
            None => None,
        };

        Ok(TokenRecord {
            tenant_id: TenantId::from(row.tenant_id),
            resource_origin: row.resource_origin,
            access_token,
            refresh_token,
            token_type: row.token_type,
            expires_at: Self::parse_optional_datetime(row.expires_at),
            scope: row.scope,
            created_at: Self::parse_datetime(&row.created_at),
            updated_at: Self::parse_datetime(&row.updated_at),
        })
    }
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    async fn get(&self, tenant: &TenantId, origin: &str) -> Result<Option<TokenRecord>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM oauth_tokens WHERE tenant_id = ?1 AND resource_origin = ?2",
            Self::SELECT_COLUMNS
        ))?;

        let row = stmt
            .query_row(params![tenant.as_str(), origin], Self::extract_row)
            .optional()?;

        match row {
            Some(raw) => Ok(Some(self.build_record(raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &TokenRecord) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let encrypted_access = self.encrypt_token(&record.access_token)?;
        let encrypted_refresh = match &record.refresh_token {
            Some(token) => Some(self.encrypt_token(token)?),
            None => None,
        };

        conn.execute(
            "INSERT INTO oauth_tokens (
                id, tenant_id, resource_origin, access_token, refresh_token, token_type, expires_at, scope, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(tenant_id, resource_origin) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_type = excluded.token_type,
                expires_at = excluded.expires_at,
                scope = excluded.scope,
                updated_at = excluded.updated_at",
            params![
                Uuid::new_v4().to_string(),
                record.tenant_id.as_str(),
                record.resource_origin,
                encrypted_access,
                encrypted_refresh,
                record.token_type,
                record.expires_at.map(|dt| dt.to_rfc3339()),
                record.scope,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, origin: &str) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute(
            "DELETE FROM oauth_tokens WHERE tenant_id = ?1 AND resource_origin = ?2",
            params![tenant.as_str(), origin],
        )?;

        Ok(())
    }

    async fn list_for_tenant(&self, tenant: &TenantId) -> Result<Vec<TokenRecord>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM oauth_tokens WHERE tenant_id = ?1 ORDER BY resource_origin",
            Self::SELECT_COLUMNS
        ))?;

        let rows: Vec<_> = stmt
            .query_map(params![tenant.as_str()], Self::extract_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|r| self.build_record(r)).collect()
    }
}
