//! MCP client over Streamable HTTP.
//!
//! Speaks plain JSON-RPC 2.0: `initialize`, the `notifications/initialized`
//! notification, then `tools/list`. Servers may answer either with a JSON
//! body or a single-event SSE stream; both are handled. The session id
//! returned by `initialize` is propagated on every later request.

use std::time::Duration;

use anyhow::{Context, Result};
use mcphub_core::ToolDescriptor;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// MCP protocol revision sent in the handshake.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Default timeout for MCP requests, in seconds.
pub const DEFAULT_MCP_TIMEOUT_SECS: u64 = 30;

/// Header carrying the server-assigned session id.
const SESSION_HEADER: &str = "Mcp-Session-Id";

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Tool entry as returned by `tools/list`.
#[derive(Debug, Deserialize)]
struct RawTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    input_schema: Option<Value>,
}

/// Result of a successful probe: handshake metadata plus the tool list.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub server_name: Option<String>,
    pub protocol_version: Option<String>,
    pub tools: Vec<ToolDescriptor>,
}

/// MCP client for probing remote servers.
pub struct McpClient {
    http_client: reqwest::Client,
}

impl McpClient {
    /// Create a client with the default request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_MCP_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build MCP HTTP client")?;
        Ok(Self { http_client })
    }

    /// Connect to a server and fetch its tool list.
    ///
    /// Runs the full handshake: `initialize`, `notifications/initialized`,
    /// then `tools/list` (following pagination cursors). Servers that do not
    /// require authorization are probed with `access_token` set to `None`.
    pub async fn probe(&self, server_url: &str, access_token: Option<&str>) -> Result<ProbeResult> {
        info!("Probing MCP server at {}", server_url);

        // Handshake
        let (session_id, init_result) = self
            .send_request(
                server_url,
                access_token,
                None,
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "MCP Hub",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
                1,
            )
            .await
            .context("MCP initialize failed")?;

        let server_name = init_result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .map(String::from);
        let protocol_version = init_result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .map(String::from);

        debug!(
            server_name = ?server_name,
            protocol_version = ?protocol_version,
            session_id = ?session_id,
            "MCP initialize complete"
        );

        self.send_notification(
            server_url,
            access_token,
            session_id.as_deref(),
            "notifications/initialized",
        )
        .await
        .context("MCP initialized notification failed")?;

        // Tool listing, following pagination until the cursor runs out
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut request_id = 2;
        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let (_, result) = self
                .send_request(
                    server_url,
                    access_token,
                    session_id.as_deref(),
                    "tools/list",
                    params,
                    request_id,
                )
                .await
                .context("MCP tools/list failed")?;
            request_id += 1;

            let page: Vec<RawTool> = match result.get("tools") {
                Some(raw) => serde_json::from_value(raw.clone())
                    .context("Malformed tools array in tools/list result")?,
                None => Vec::new(),
            };
            tools.extend(
                page.into_iter()
                    .map(|t| ToolDescriptor::new(t.name, t.description, t.input_schema)),
            );

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(String::from);
            if cursor.is_none() {
                break;
            }
        }

        info!(
            "MCP probe complete: {} tool(s) from {}",
            tools.len(),
            server_url
        );

        Ok(ProbeResult {
            server_name,
            protocol_version,
            tools,
        })
    }

    /// Send a JSON-RPC request and return (session id, result).
    ///
    /// The session id is taken from the response headers when present,
    /// falling back to the one passed in.
    async fn send_request(
        &self,
        server_url: &str,
        access_token: Option<&str>,
        session_id: Option<&str>,
        method: &str,
        params: Value,
        id: i64,
    ) -> Result<(Option<String>, Value)> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self
            .http_client
            .post(server_url)
            .header("Accept", "application/json, text/event-stream")
            .json(&body);
        if let Some(token) = access_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(sid) = session_id {
            request = request.header(SESSION_HEADER, sid);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("MCP request {} failed: HTTP {} - {}", method, status, body);
        }

        let new_session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .or_else(|| session_id.map(String::from));

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let text = response.text().await?;

        let parsed = parse_jsonrpc_body(&content_type, &text)
            .with_context(|| format!("Unparseable response to {}", method))?;

        if let Some(error) = parsed.error {
            anyhow::bail!(
                "MCP request {} returned error {}: {}",
                method,
                error.code,
                error.message
            );
        }

        let result = parsed
            .result
            .ok_or_else(|| anyhow::anyhow!("MCP response to {} has no result", method))?;

        Ok((new_session_id, result))
    }

    /// Send a JSON-RPC notification (no id, reply body ignored).
    async fn send_notification(
        &self,
        server_url: &str,
        access_token: Option<&str>,
        session_id: Option<&str>,
        method: &str,
    ) -> Result<()> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
        });

        let mut request = self
            .http_client
            .post(server_url)
            .header("Accept", "application/json, text/event-stream")
            .json(&body);
        if let Some(token) = access_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(sid) = session_id {
            request = request.header(SESSION_HEADER, sid);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            // Some servers answer notifications with 4xx; the handshake is
            // already done at this point so log and carry on.
            warn!("MCP notification {} answered with HTTP {}", method, status);
        }

        Ok(())
    }
}

/// Parse a JSON-RPC body that may arrive as plain JSON or as SSE.
///
/// SSE responses carry the JSON payload in `data:` lines; the first line
/// that parses as a JSON-RPC envelope wins.
fn parse_jsonrpc_body(content_type: &str, body: &str) -> Result<JsonRpcResponse> {
    if content_type.contains("text/event-stream") {
        for line in body.lines() {
            if let Some(data) = line.strip_prefix("data:") {
                if let Ok(parsed) = serde_json::from_str::<JsonRpcResponse>(data.trim()) {
                    return Ok(parsed);
                }
            }
        }
        anyhow::bail!("No JSON-RPC payload found in event stream");
    }

    serde_json::from_str(body).context("Invalid JSON-RPC body")
}
