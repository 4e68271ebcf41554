//! Capability descriptors captured when a server connection is established.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One invocable operation exposed by a connected server.
///
/// Immutable snapshot taken at connection time; it goes stale if the remote
/// server changes capabilities before the next reconnect, bounded by the
/// status-entry TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub schema: Value,
}

impl ToolDescriptor {
    /// Build a descriptor, substituting the empty schema where the server
    /// omitted or malformed one. A tool is never rejected for a bad schema.
    pub fn new(name: impl Into<String>, description: Option<String>, schema: Option<Value>) -> Self {
        Self {
            name: name.into(),
            description: description.unwrap_or_default(),
            schema: normalize_schema(schema),
        }
    }
}

/// Minimal argument schema for tools that declare none.
pub fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Validity rule for tool schemas: a schema counts only if it is a JSON
/// object containing a `properties` member. Anything else collapses to
/// [`empty_schema`].
pub fn normalize_schema(schema: Option<Value>) -> Value {
    match schema {
        Some(Value::Object(map)) if map.contains_key("properties") => Value::Object(map),
        _ => empty_schema(),
    }
}
