//! Read-only lookup of connectable MCP servers.
//!
//! Server CRUD lives outside the orchestrator; this is the boundary it
//! reads server definitions through.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// A connectable MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDefinition {
    pub name: String,
    pub url: String,
    /// Whether connecting requires the OAuth authorization-code flow.
    #[serde(default)]
    pub requires_auth: bool,
}

impl ServerDefinition {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            requires_auth: false,
        }
    }

    pub fn with_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

/// Lookup of server definitions by name.
#[async_trait]
pub trait ServerCatalog: Send + Sync {
    async fn get(&self, name: &str) -> Option<ServerDefinition>;
    async fn list(&self) -> Vec<ServerDefinition>;
}

/// In-memory catalog, loadable from a JSON array of definitions.
#[derive(Default)]
pub struct StaticServerCatalog {
    servers: RwLock<HashMap<String, ServerDefinition>>,
}

impl StaticServerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_servers(definitions: impl IntoIterator<Item = ServerDefinition>) -> Self {
        let servers = definitions
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();
        Self {
            servers: RwLock::new(servers),
        }
    }

    /// Parse a catalog from a JSON array of server definitions.
    pub fn from_json(json: &str) -> Result<Self> {
        let definitions: Vec<ServerDefinition> =
            serde_json::from_str(json).context("Invalid server catalog JSON")?;
        info!("Loaded {} server definition(s) from catalog", definitions.len());
        Ok(Self::with_servers(definitions))
    }

    pub async fn insert(&self, definition: ServerDefinition) {
        self.servers
            .write()
            .await
            .insert(definition.name.clone(), definition);
    }
}

#[async_trait]
impl ServerCatalog for StaticServerCatalog {
    async fn get(&self, name: &str) -> Option<ServerDefinition> {
        self.servers.read().await.get(name).cloned()
    }

    async fn list(&self) -> Vec<ServerDefinition> {
        let mut all: Vec<_> = self.servers.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
