//! MCP Hub Storage Layer
//!
//! SQLite database with field-level encryption for OAuth secrets.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    Application                       │
//! ├──────────────────────────────────────────────────────┤
//! │               Repository Traits                      │
//! │      (RegistrationRepository, TokenRepository)       │
//! ├──────────────────────────────────────────────────────┤
//! │            SQLite Implementations                    │
//! │ (SqliteRegistrationRepository, SqliteTokenRepository)│
//! ├──────────────────────────────────────────────────────┤
//! │         FieldEncryptor (AES-256-GCM)                 │
//! │      (Encrypts client secrets and tokens)            │
//! ├──────────────────────────────────────────────────────┤
//! │                   Database                           │
//! │                   (SQLite)                           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcphub_storage::{
//!     Database, FieldEncryptor, MasterKey,
//!     SqliteRegistrationRepository, SqliteTokenRepository,
//! };
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! // Master key from configuration (64 hex characters)
//! let master_key = MasterKey::from_hex(&key_hex)?;
//!
//! // Open database
//! let db = Database::open(&path)?;
//! let db = Arc::new(Mutex::new(db));
//!
//! // Create encryptor for sensitive fields
//! let encryptor = Arc::new(FieldEncryptor::new(&master_key)?);
//!
//! // Create repositories
//! let registration_repo = SqliteRegistrationRepository::new(db.clone(), encryptor.clone());
//! let token_repo = SqliteTokenRepository::new(db, encryptor);
//! ```

pub mod crypto;
mod database;
mod repositories;

pub use crypto::{FieldEncryptor, MasterKey, KEY_SIZE};
pub use database::Database;
pub use repositories::*;

/// Default database file name.
pub const DATABASE_FILE: &str = "mcphub.db";

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join("mcphub").join(DATABASE_FILE))
}
