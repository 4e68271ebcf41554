//! # MCP Hub MCP Library
//!
//! MCP protocol client for remote servers over Streamable HTTP.
//!
//! This crate provides the minimal client surface the hub needs: perform
//! the MCP handshake against a remote server with a Bearer token and fetch
//! its tool list. Tool calls are proxied elsewhere; the hub itself only
//! ever probes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mcphub_mcp::McpClient;
//!
//! let client = McpClient::new()?;
//! let probe = client
//!     .probe("https://mcp.example.com/mcp", Some("access_token_xyz"))
//!     .await?;
//!
//! for tool in &probe.tools {
//!     println!("{}: {:?}", tool.name, tool.description);
//! }
//! ```

pub mod client;

pub use client::{McpClient, ProbeResult, DEFAULT_MCP_TIMEOUT_SECS, PROTOCOL_VERSION};
