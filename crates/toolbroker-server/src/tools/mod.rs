//! Leaf tools served over MCP
//!
//! Each tool owns a typed argument struct. The struct's `JsonSchema` derive is
//! what `tools/list` advertises, and deserializing into it is the only
//! argument validation: a failure there is a protocol-level
//! [`ToolError::InvalidArguments`]. Everything that goes wrong after the
//! arguments are accepted is reported back as text in the [`ToolOutput`].

mod files;
mod github;
mod web_search;

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{JsonObject, Tool as McpTool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

pub use files::{CountLines, ListDirectory, ReadFile};
pub use github::{
    AnalyzeDependencies, CreateIssueComment, GetPullRequest, GetRecentCommits, GetRepoStats, GitHubClient,
    GitHubError, ListIssues, SearchCode,
};
pub use web_search::WebSearch;

/// Failures that make a `tools/call` a JSON-RPC error instead of a result.
/// Both are reported as invalid params.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Text result of one tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    /// The tool ran but reports failure. Still shown to the caller as text.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// Pretty-printed JSON (two-space indent)
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::error(format!("Failed to encode result: {}", e)),
        }
    }
}

/// A tool that can be listed and called over MCP
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object
    fn input_schema(&self) -> Value;

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput>;

    /// The `tools/list` entry for this tool
    fn definition(&self) -> McpTool {
        let schema = match self.input_schema() {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        McpTool::new(self.name().to_string(), self.description().to_string(), Arc::new(schema))
    }
}

/// JSON Schema for an argument struct
pub fn schema_for<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// Deserialize `args` into the tool's argument struct
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Map<String, Value>) -> ToolResult<T> {
    serde_json::from_value(Value::Object(args)).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Reject `value` unless it lies in `min..=max`
pub fn check_range(tool: &str, field: &str, value: u32, min: u32, max: u32) -> ToolResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("{} must be between {} and {}, got {}", field, min, max, value),
        })
    }
}

/// Tools in registration order
#[derive(Default, Clone)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tool this crate ships, with clients configured from the environment
    pub fn standard() -> Self {
        let github = Arc::new(GitHubClient::from_env());

        Self::new()
            .with(GetRepoStats::new(github.clone()))
            .with(SearchCode::new(github.clone()))
            .with(GetRecentCommits::new(github.clone()))
            .with(AnalyzeDependencies::new(github.clone()))
            .with(ListIssues::new(github.clone()))
            .with(GetPullRequest::new(github.clone()))
            .with(CreateIssueComment::new(github))
            .with(ReadFile)
            .with(ListDirectory)
            .with(CountLines)
            .with(WebSearch::from_env())
    }

    /// Add a tool. A tool with the same name replaces the earlier one in place.
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(pos) => self.tools[pos] = tool,
            None => self.tools.push(tool),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn definitions(&self) -> Vec<McpTool> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up and run one tool
    pub async fn call(&self, name: &str, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.call(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        /// Text to echo
        message: String,
        #[serde(default = "default_times")]
        times: u32,
    }

    fn default_times() -> u32 {
        1
    }

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo a message"
        }

        fn input_schema(&self) -> Value {
            schema_for::<EchoArgs>()
        }

        async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
            let args: EchoArgs = parse_args(self.name(), args)?;
            check_range(self.name(), "times", args.times, 1, 3)?;
            Ok(ToolOutput::text(args.message.repeat(args.times as usize)))
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_toolset_dispatch() {
        let tools = ToolSet::new().with(Echo);
        let output = tools.call("echo", args(json!({"message": "ab", "times": 2}))).await.unwrap();
        assert_eq!(output, ToolOutput::text("abab"));
    }

    #[tokio::test]
    async fn test_toolset_unknown_tool() {
        let tools = ToolSet::new().with(Echo);
        let result = tools.call("missing", Map::new()).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(name)) if name == "missing"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let tools = ToolSet::new().with(Echo);

        let missing = tools.call("echo", Map::new()).await;
        assert!(matches!(missing, Err(ToolError::InvalidArguments { .. })));

        let out_of_range = tools.call("echo", args(json!({"message": "a", "times": 9}))).await;
        assert!(matches!(out_of_range, Err(ToolError::InvalidArguments { reason, .. }) if reason.contains("between 1 and 3")));
    }

    #[test]
    fn test_schema_lists_properties() {
        let schema = schema_for::<EchoArgs>();
        assert_eq!(schema["type"], json!("object"));
        assert!(schema["properties"]["message"].is_object());
        assert_eq!(schema["required"], json!(["message"]));
    }

    #[test]
    fn test_standard_toolset_order() {
        let tools = ToolSet::standard();
        assert_eq!(
            tools.names(),
            vec![
                "get_repo_stats",
                "search_code",
                "get_recent_commits",
                "analyze_dependencies",
                "list_issues",
                "get_pull_request",
                "create_issue_comment",
                "read_file",
                "list_directory",
                "count_lines",
                "web_search",
            ]
        );
        assert!(tools
            .definitions()
            .iter()
            .all(|d| d.input_schema.get("type") == Some(&json!("object"))));
    }

    #[test]
    fn test_with_replaces_same_name() {
        let tools = ToolSet::new().with(Echo).with(Echo);
        assert_eq!(tools.len(), 1);
    }
}
