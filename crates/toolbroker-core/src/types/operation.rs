//! Advertised operation metadata

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One operation as advertised by a tool server during discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Operation name, unique within its server
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the arguments. Opaque to the broker.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

impl OperationSpec {
    /// Create a spec with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({ "type": "object" }),
        }
    }

    /// Set the argument schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}
