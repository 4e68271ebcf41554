//! MCP Hub server
//!
//! Hosts the OAuth callback endpoint and the background token-exchange
//! worker. Everything else the orchestrator offers (initiation,
//! connection, status) is a library call on `mcphub-gateway` from the
//! embedding request layer.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use mcphub_core::{RegistrationRepository, ServerCatalog, StaticServerCatalog, TokenRepository};
use mcphub_gateway::{
    build_router, AppState, CorrelationStore, DiscoveryEngine, ExchangeWorker, OAuthFlowService,
    Settings, StatusStore,
};
use mcphub_mcp::McpClient;
use mcphub_storage::{
    default_database_path, Database, FieldEncryptor, MasterKey, SqliteRegistrationRepository,
    SqliteTokenRepository,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

fn get_logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mcphub")
        .join("logs")
}

/// Initialize tracing with console and file logging
///
/// - Console: colored, compact format
/// - File: daily rotation under the local data directory
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    let logs_dir = get_logs_dir();
    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
    }

    // Creates files like: mcphub.2026-01-22.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("mcphub")
        .filename_suffix("log")
        .build(&logs_dir)
        .expect("Failed to create log file appender");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG takes precedence, with sensible defaults for our crates.
    // Note: crate names use underscores in tracing (mcphub-core → mcphub_core)
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("mcphub_core=debug".parse().unwrap())
            .add_directive("mcphub_gateway=debug".parse().unwrap())
            .add_directive("mcphub_storage=debug".parse().unwrap())
            .add_directive("mcphub_mcp=debug".parse().unwrap())
            .add_directive("mcphub_server=debug".parse().unwrap())
    });

    // Console layer: colored, compact
    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    // File layer: no colors, include more detail
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

/// Load the field-encryption key from the environment, or generate an
/// ephemeral one for this process.
fn load_master_key() -> Result<MasterKey> {
    match std::env::var("MCPHUB_MASTER_KEY") {
        Ok(hex) => MasterKey::from_hex(&hex).context("Invalid MCPHUB_MASTER_KEY"),
        Err(_) => {
            let key = MasterKey::generate()?;
            warn!(
                "MCPHUB_MASTER_KEY is not set; generated an ephemeral key. Secrets stored now \
                 will be unreadable after a restart. Set MCPHUB_MASTER_KEY={} to keep them.",
                key.to_hex()
            );
            Ok(key)
        }
    }
}

fn load_catalog(settings: &Settings) -> Result<StaticServerCatalog> {
    match &settings.servers_file {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read servers file {}", path.display()))?;
            StaticServerCatalog::from_json(&json)
        }
        None => {
            warn!("MCPHUB_SERVERS_FILE is not set; starting with an empty server catalog");
            Ok(StaticServerCatalog::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive for the entire program - dropping it stops file logging
    let _log_guard = init_tracing();

    let settings = Settings::from_env()?;
    info!("Starting MCP Hub v{}", env!("CARGO_PKG_VERSION"));

    let db_path = settings
        .database_path
        .clone()
        .or_else(default_database_path)
        .context("No database path configured and no local data directory available")?;
    info!("Database: {}", db_path.display());
    let database = Arc::new(Mutex::new(Database::open(&db_path)?));

    let master_key = load_master_key()?;
    let encryptor = Arc::new(FieldEncryptor::new(&master_key)?);

    let registrations: Arc<dyn RegistrationRepository> = Arc::new(
        SqliteRegistrationRepository::new(Arc::clone(&database), Arc::clone(&encryptor)),
    );
    let tokens: Arc<dyn TokenRepository> =
        Arc::new(SqliteTokenRepository::new(database, encryptor));

    let catalog: Arc<dyn ServerCatalog> = Arc::new(load_catalog(&settings)?);
    let http_client = reqwest::Client::new();

    let status = Arc::new(StatusStore::new());
    let queue = ExchangeWorker::new(
        http_client.clone(),
        Arc::clone(&registrations),
        tokens,
        status,
        Arc::clone(&catalog),
        Arc::new(McpClient::new()?),
    )
    .spawn();

    let engine = DiscoveryEngine::new(http_client, registrations, settings.redirect_uri());
    let flow = Arc::new(OAuthFlowService::new(
        engine,
        catalog,
        Arc::new(CorrelationStore::new()),
        queue,
        settings.ui_url.clone(),
    ));

    let router = build_router(AppState { flow }, &settings.callback_path);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    info!(
        "Listening on {} (callback at {})",
        settings.bind_addr, settings.callback_path
    );
    info!("Redirect URI: {}", settings.redirect_uri());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
