//! Runtime configuration loaded from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Hub settings, sourced from `MCPHUB_*` environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,
    /// Public base URL, used to build the OAuth redirect URI.
    pub public_url: String,
    /// UI base URL that callback redirects point at.
    pub ui_url: String,
    /// Path of the provider callback route.
    pub callback_path: String,
    /// SQLite database file. Falls back to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// 64-hex AES-256 master key for field encryption.
    pub master_key_hex: Option<String>,
    /// JSON file with the server catalog (name -> definition).
    pub servers_file: Option<PathBuf>,
}

impl Settings {
    /// Read settings from the environment, applying defaults.
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("MCPHUB_BIND_ADDR", "127.0.0.1:8085")
            .parse()
            .context("Invalid MCPHUB_BIND_ADDR")?;

        Ok(Self {
            bind_addr,
            public_url: env_or("MCPHUB_PUBLIC_URL", "http://localhost:8085"),
            ui_url: env_or("MCPHUB_UI_URL", "http://localhost:3000/integrations"),
            callback_path: env_or("MCPHUB_CALLBACK_PATH", "/oauth/callback"),
            database_path: std::env::var("MCPHUB_DATABASE_PATH").ok().map(PathBuf::from),
            master_key_hex: std::env::var("MCPHUB_MASTER_KEY").ok(),
            servers_file: std::env::var("MCPHUB_SERVERS_FILE").ok().map(PathBuf::from),
        })
    }

    /// Redirect URI registered with providers and sent on every
    /// authorization request.
    pub fn redirect_uri(&self) -> String {
        format!(
            "{}{}",
            self.public_url.trim_end_matches('/'),
            self.callback_path
        )
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
