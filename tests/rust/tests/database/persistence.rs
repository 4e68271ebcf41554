//! Restart persistence tests
//!
//! Rows written through the repositories must read back after the
//! database is closed and reopened, with the master key carried as hex
//! the way configuration carries it between process runs.

use std::sync::Arc;

use mcphub_core::{RegistrationRepository, TenantId, TokenRepository};
use mcphub_storage::{
    Database, FieldEncryptor, MasterKey, SqliteRegistrationRepository, SqliteTokenRepository,
};
use pretty_assertions::assert_eq;
use tests::db::TestDatabase;
use tests::fixtures;
use tests::provider::{CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN};
use tokio::sync::Mutex;

const ORIGIN: &str = "https://mcp.example.com";

fn encryptor_from_hex(key_hex: &str) -> Arc<FieldEncryptor> {
    let key = MasterKey::from_hex(key_hex).expect("Failed to parse master key");
    Arc::new(FieldEncryptor::new(&key).expect("Failed to build encryptor"))
}

#[tokio::test]
async fn test_tokens_survive_reopen_with_same_key() {
    let test_db = TestDatabase::new();
    let path = test_db.db_path().to_path_buf();
    let key_hex = MasterKey::generate().unwrap().to_hex();
    let tenant = TenantId::user("alice");

    {
        let db = Arc::new(Mutex::new(test_db.db));
        let repo = SqliteTokenRepository::new(db, encryptor_from_hex(&key_hex));
        repo.save(&fixtures::fresh_token(&tenant, ORIGIN, "persisted_access"))
            .await
            .unwrap();
        // Scope end closes the only connection
    }

    let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
    let repo = SqliteTokenRepository::new(db, encryptor_from_hex(&key_hex));

    let record = repo.get(&tenant, ORIGIN).await.unwrap().unwrap();
    assert_eq!(record.access_token, "persisted_access");
    assert_eq!(record.refresh_token.as_deref(), Some(REFRESH_TOKEN));
    assert!(!record.is_expired());
}

#[tokio::test]
async fn test_registration_survives_reopen() {
    let test_db = TestDatabase::new();
    let path = test_db.db_path().to_path_buf();
    let key_hex = MasterKey::generate().unwrap().to_hex();
    let tenant = TenantId::user("alice");

    {
        let db = Arc::new(Mutex::new(test_db.db));
        let repo = SqliteRegistrationRepository::new(db, encryptor_from_hex(&key_hex));
        repo.save(&fixtures::registration(&tenant, ORIGIN)).await.unwrap();
    }

    let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
    let repo = SqliteRegistrationRepository::new(db, encryptor_from_hex(&key_hex));

    let registration = repo.get(&tenant, ORIGIN).await.unwrap().unwrap();
    assert_eq!(registration.client_id, CLIENT_ID);
    assert_eq!(registration.client_secret.as_deref(), Some(CLIENT_SECRET));
    // Discovered endpoints round-trip through the metadata JSON column
    assert_eq!(
        registration.token_endpoint(),
        Some(format!("{}/token", ORIGIN).as_str())
    );
}

#[tokio::test]
async fn test_upsert_survives_reopen_without_duplicating_rows() {
    let test_db = TestDatabase::new();
    let path = test_db.db_path().to_path_buf();
    let key_hex = MasterKey::generate().unwrap().to_hex();
    let tenant = TenantId::user("alice");

    {
        let db = Arc::new(Mutex::new(test_db.db));
        let repo = SqliteTokenRepository::new(db, encryptor_from_hex(&key_hex));
        repo.save(&fixtures::fresh_token(&tenant, ORIGIN, "first_access"))
            .await
            .unwrap();
    }

    // A refresh after restart replaces the row under the same
    // (tenant, origin) key
    let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
    let repo = SqliteTokenRepository::new(Arc::clone(&db), encryptor_from_hex(&key_hex));
    repo.save(&fixtures::fresh_token(&tenant, ORIGIN, "rotated_access"))
        .await
        .unwrap();

    let record = repo.get(&tenant, ORIGIN).await.unwrap().unwrap();
    assert_eq!(record.access_token, "rotated_access");

    let rows: i64 = db
        .lock()
        .await
        .connection()
        .query_row("SELECT count(*) FROM oauth_tokens", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_reopen_with_wrong_key_cannot_decrypt() {
    let test_db = TestDatabase::new();
    let path = test_db.db_path().to_path_buf();
    let key_hex = MasterKey::generate().unwrap().to_hex();
    let tenant = TenantId::user("alice");

    {
        let db = Arc::new(Mutex::new(test_db.db));
        let tokens = SqliteTokenRepository::new(Arc::clone(&db), encryptor_from_hex(&key_hex));
        tokens
            .save(&fixtures::fresh_token(&tenant, ORIGIN, "secret_access"))
            .await
            .unwrap();
        let registrations = SqliteRegistrationRepository::new(db, encryptor_from_hex(&key_hex));
        registrations
            .save(&fixtures::registration(&tenant, ORIGIN))
            .await
            .unwrap();
    }

    let wrong_hex = MasterKey::generate().unwrap().to_hex();
    let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
    let tokens = SqliteTokenRepository::new(Arc::clone(&db), encryptor_from_hex(&wrong_hex));
    let registrations = SqliteRegistrationRepository::new(db, encryptor_from_hex(&wrong_hex));

    assert!(tokens.get(&tenant, ORIGIN).await.is_err());
    assert!(registrations.get(&tenant, ORIGIN).await.is_err());
}

#[tokio::test]
async fn test_database_file_holds_no_plaintext_secrets() {
    let test_db = TestDatabase::new();
    let path = test_db.db_path().to_path_buf();
    let key_hex = MasterKey::generate().unwrap().to_hex();
    let tenant = TenantId::user("alice");

    {
        let db = Arc::new(Mutex::new(test_db.db));
        let tokens = SqliteTokenRepository::new(Arc::clone(&db), encryptor_from_hex(&key_hex));
        tokens
            .save(&fixtures::fresh_token(&tenant, ORIGIN, "plaintext_access_token"))
            .await
            .unwrap();
        let registrations = SqliteRegistrationRepository::new(db, encryptor_from_hex(&key_hex));
        registrations
            .save(&fixtures::registration(&tenant, ORIGIN))
            .await
            .unwrap();
        // Closing the last connection checkpoints the WAL into the file
    }

    let mut bytes = std::fs::read(&path).unwrap();
    let wal = path.with_extension("db-wal");
    if wal.exists() {
        bytes.extend(std::fs::read(&wal).unwrap());
    }
    let contents = String::from_utf8_lossy(&bytes);

    assert!(!contents.contains("plaintext_access_token"));
    assert!(!contents.contains(REFRESH_TOKEN));
    assert!(!contents.contains(CLIENT_SECRET));
    // Non-secret columns stay inspectable on disk
    assert!(contents.contains("alice"));
    assert!(contents.contains(CLIENT_ID));
}
