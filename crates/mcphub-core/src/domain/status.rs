//! Connection status per (tenant, server).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ToolDescriptor;

/// Lifecycle state of one tenant's connection to one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONNECTED" => Some(Self::Connected),
            "DISCONNECTED" => Some(Self::Disconnected),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Snapshot answered by status queries.
///
/// A query for a tenant+server with no live entry answers the
/// [`ConnectionStatus::disconnected`] default rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub tools: Vec<ToolDescriptor>,
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn connected(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            state: ConnectionState::Connected,
            tools,
            connected_at: Some(Utc::now()),
            error: None,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            tools: Vec::new(),
            connected_at: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Failed,
            tools: Vec::new(),
            connected_at: None,
            error: Some(error.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
