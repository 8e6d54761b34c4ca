//! Web search via the Brave Search API (`SEARCH_API_KEY`)

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{check_range, parse_args, schema_for, Tool, ToolOutput, ToolResult};

const BRAVE_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Deserialize, JsonSchema)]
struct WebSearchArgs {
    /// Search query
    query: String,
    #[serde(default = "default_max_results")]
    max_results: u32,
}

fn default_max_results() -> u32 {
    5
}

#[derive(Debug, Default, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Serialize)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

#[derive(Debug, Serialize)]
struct MissingKey {
    error: &'static str,
    hint: &'static str,
}

pub struct WebSearch {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl WebSearch {
    pub fn new(api_key: Option<String>, endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("SEARCH_API_KEY").ok(), BRAVE_SEARCH_URL)
    }

    async fn search(&self, api_key: &str, query: &str, count: u32) -> Result<Vec<SearchHit>, reqwest::Error> {
        let response: BraveResponse = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query.to_string()), ("count", count.to_string())])
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .web
            .unwrap_or_default()
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.description,
            })
            .collect())
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information relevant to the current task"
    }

    fn input_schema(&self) -> Value {
        schema_for::<WebSearchArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: WebSearchArgs = parse_args(self.name(), args)?;
        check_range(self.name(), "max_results", args.max_results, 1, 10)?;

        let Some(api_key) = &self.api_key else {
            let missing = MissingKey {
                error: "SEARCH_API_KEY not configured",
                hint: "Set SEARCH_API_KEY environment variable with your search API key",
            };
            return Ok(ToolOutput::text(serde_json::to_string(&missing).unwrap_or_default()));
        };

        Ok(match self.search(api_key, &args.query, args.max_results).await {
            Ok(hits) => ToolOutput::json(&hits),
            Err(e) => ToolOutput::text(format!("Search failed: {}", e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use serde_json::json;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_key_returns_hint() {
        let tool = WebSearch::new(None, BRAVE_SEARCH_URL);
        let output = tool.call(args(json!({"query": "rust"}))).await.unwrap();

        assert!(!output.is_error);
        let value: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(value["error"], json!("SEARCH_API_KEY not configured"));
        assert!(value["hint"].as_str().unwrap().contains("SEARCH_API_KEY"));
    }

    #[tokio::test]
    async fn test_search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "mcp servers"))
            .and(query_param("count", "2"))
            .and(header("x-subscription-token", "key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "web": {"results": [
                    {"title": "MCP", "url": "https://modelcontextprotocol.io", "description": "Protocol"},
                    {"title": "Servers", "url": "https://example.com/servers", "description": "List"}
                ]}
            })))
            .mount(&server)
            .await;

        let tool = WebSearch::new(Some("key-123".to_string()), server.uri());
        let output = tool
            .call(args(json!({"query": "mcp servers", "max_results": 2})))
            .await
            .unwrap();
        let hits: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(hits.as_array().unwrap().len(), 2);
        assert_eq!(hits[0]["snippet"], json!("Protocol"));
    }

    #[tokio::test]
    async fn test_search_without_web_section_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "search"})))
            .mount(&server)
            .await;

        let tool = WebSearch::new(Some("key".to_string()), server.uri());
        let output = tool.call(args(json!({"query": "x"}))).await.unwrap();
        assert_eq!(output.text, "[]");
    }

    #[tokio::test]
    async fn test_search_failure_is_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let tool = WebSearch::new(Some("bad".to_string()), server.uri());
        let output = tool.call(args(json!({"query": "x"}))).await.unwrap();
        assert!(output.text.starts_with("Search failed:"));
    }

    #[tokio::test]
    async fn test_max_results_range() {
        let tool = WebSearch::new(None, BRAVE_SEARCH_URL);
        let result = tool.call(args(json!({"query": "x", "max_results": 11}))).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments { .. })));
    }
}
