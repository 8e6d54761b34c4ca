//! Repository tools over the GitHub REST API
//!
//! Configured from `GITHUB_TOKEN` (optional; unauthenticated requests are
//! rate limited) and `GITHUB_REPOSITORY` as `owner/repo`. API failures come
//! back as tool errors: the call succeeds at the protocol level and carries
//! `isError` with the API's message.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Method, RequestBuilder, Response, Url};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::{check_range, parse_args, schema_for, Tool, ToolOutput, ToolResult};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_REPOSITORY: &str = "owner/repo";
const USER_AGENT: &str = concat!("toolbroker-server/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Minimal GitHub REST client bound to one repository
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, repository: &str, token: Option<String>) -> Self {
        let (owner, repo) = repository.split_once('/').unwrap_or((repository, ""));
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    /// `GITHUB_TOKEN`, `GITHUB_REPOSITORY` (default `owner/repo`) and
    /// `GITHUB_API_URL` (default `https://api.github.com`)
    pub fn from_env() -> Self {
        let repository = std::env::var("GITHUB_REPOSITORY").unwrap_or_else(|_| DEFAULT_REPOSITORY.to_string());
        let api_base = std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(api_base, &repository, std::env::var("GITHUB_TOKEN").ok())
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_base, self.owner, self.repo, suffix)
    }

    /// Contents API URL for `file_path`, each segment percent-encoded
    fn contents_url(&self, file_path: &str) -> Option<Url> {
        let mut url = Url::parse(&self.repo_url("/contents")).ok()?;
        url.path_segments_mut()
            .ok()?
            .extend(file_path.split('/').filter(|segment| !segment.is_empty()));
        Some(url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");

        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, GitHubError> {
        let response = self.request(Method::GET, url).query(query).send().await?;
        read_json(response).await
    }

    async fn post<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T, GitHubError> {
        let response = self.request(Method::POST, url).json(body).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GitHubError> {
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
            .to_string();
        return Err(GitHubError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

fn api_failure(e: GitHubError) -> ToolOutput {
    ToolOutput::error(format!("GitHub API error: {}", e))
}

// ─── API payloads ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    full_name: String,
    description: Option<String>,
    stargazers_count: u64,
    forks_count: u64,
    open_issues_count: u64,
    watchers_count: u64,
    language: Option<String>,
    default_branch: String,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    path: String,
    html_url: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    html_url: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    labels: Vec<Label>,
    user: Option<User>,
    created_at: String,
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    state: String,
    merged: Option<bool>,
    user: Option<User>,
    additions: u64,
    deletions: u64,
    changed_files: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PullFile {
    filename: String,
    status: String,
    additions: u64,
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    html_url: String,
}

// ─── get_repo_stats ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct NoArgs {}

#[derive(Debug, Serialize)]
struct RepoStats {
    name: String,
    description: Option<String>,
    stars: u64,
    forks: u64,
    open_issues: u64,
    watchers: u64,
    language: Option<String>,
    default_branch: String,
    created_at: String,
    updated_at: String,
}

impl From<RepoResponse> for RepoStats {
    fn from(repo: RepoResponse) -> Self {
        Self {
            name: repo.full_name,
            description: repo.description,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            watchers: repo.watchers_count,
            language: repo.language,
            default_branch: repo.default_branch,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
        }
    }
}

pub struct GetRepoStats {
    client: Arc<GitHubClient>,
}

impl GetRepoStats {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetRepoStats {
    fn name(&self) -> &str {
        "get_repo_stats"
    }

    fn description(&self) -> &str {
        "Get repository statistics including stars, forks, open issues, and pull requests"
    }

    fn input_schema(&self) -> Value {
        schema_for::<NoArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let _: NoArgs = parse_args(self.name(), args)?;

        Ok(match self.client.get::<RepoResponse>(&self.client.repo_url(""), &[]).await {
            Ok(repo) => ToolOutput::json(&RepoStats::from(repo)),
            Err(e) => api_failure(e),
        })
    }
}

// ─── search_code ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchCodeArgs {
    /// Search query (code pattern, function name, etc.)
    query: String,
    /// Filter by file extension (e.g., 'ts', 'py')
    #[serde(default)]
    file_extension: Option<String>,
}

#[derive(Debug, Serialize)]
struct CodeMatch {
    file: String,
    url: String,
    score: f64,
}

pub struct SearchCode {
    client: Arc<GitHubClient>,
}

impl SearchCode {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }

    fn search_query(&self, query: &str, file_extension: Option<&str>) -> String {
        let mut q = format!("{} repo:{}", query, self.client.full_name());
        if let Some(ext) = file_extension.filter(|e| !e.is_empty()) {
            q.push_str(&format!(" extension:{}", ext));
        }
        q
    }
}

#[async_trait]
impl Tool for SearchCode {
    fn name(&self) -> &str {
        "search_code"
    }

    fn description(&self) -> &str {
        "Search for code patterns in the repository"
    }

    fn input_schema(&self) -> Value {
        schema_for::<SearchCodeArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: SearchCodeArgs = parse_args(self.name(), args)?;
        let q = self.search_query(&args.query, args.file_extension.as_deref());
        let url = format!("{}/search/code", self.client.api_base);

        let results: SearchResponse = match self.client.get(&url, &[("q", q), ("per_page", "10".to_string())]).await {
            Ok(results) => results,
            Err(e) => return Ok(api_failure(e)),
        };

        let matches: Vec<CodeMatch> = results
            .items
            .into_iter()
            .map(|item| CodeMatch {
                file: item.path,
                url: item.html_url,
                score: item.score,
            })
            .collect();

        Ok(ToolOutput::json(&json!({ "total": results.total_count, "matches": matches })))
    }
}

// ─── get_recent_commits ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct RecentCommitsArgs {
    /// Number of commits to retrieve
    #[serde(default = "default_commit_count")]
    count: u32,
    /// Branch name (defaults to default branch)
    #[serde(default)]
    branch: Option<String>,
}

fn default_commit_count() -> u32 {
    10
}

#[derive(Debug, Serialize)]
struct CommitSummary {
    sha: String,
    message: String,
    author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    url: String,
}

impl From<CommitResponse> for CommitSummary {
    fn from(c: CommitResponse) -> Self {
        let (author, date) = match c.commit.author {
            Some(a) => (a.name, a.date),
            None => (None, None),
        };
        Self {
            sha: c.sha.chars().take(7).collect(),
            message: c.commit.message.lines().next().unwrap_or_default().to_string(),
            author: author.unwrap_or_else(|| "unknown".to_string()),
            date,
            url: c.html_url,
        }
    }
}

pub struct GetRecentCommits {
    client: Arc<GitHubClient>,
}

impl GetRecentCommits {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetRecentCommits {
    fn name(&self) -> &str {
        "get_recent_commits"
    }

    fn description(&self) -> &str {
        "Get recent commit history with messages and authors"
    }

    fn input_schema(&self) -> Value {
        schema_for::<RecentCommitsArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: RecentCommitsArgs = parse_args(self.name(), args)?;
        check_range(self.name(), "count", args.count, 1, 50)?;

        let mut query = vec![("per_page", args.count.to_string())];
        if let Some(branch) = args.branch {
            query.push(("sha", branch));
        }

        Ok(match self.client.get::<Vec<CommitResponse>>(&self.client.repo_url("/commits"), &query).await {
            Ok(commits) => {
                let history: Vec<CommitSummary> = commits.into_iter().map(CommitSummary::from).collect();
                ToolOutput::json(&history)
            }
            Err(e) => api_failure(e),
        })
    }
}

// ─── analyze_dependencies ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct AnalyzeDependenciesArgs {
    /// Path to the dependency file (e.g., package.json, requirements.txt)
    #[serde(default = "default_dependency_file")]
    file_path: String,
}

fn default_dependency_file() -> String {
    "package.json".to_string()
}

#[derive(Debug, PartialEq, Serialize)]
struct DependencyAnalysis {
    file: String,
    dependencies: Vec<String>,
    #[serde(rename = "devDependencies", skip_serializing_if = "Option::is_none")]
    dev_dependencies: Option<Vec<String>>,
    total: usize,
}

/// Dependencies listed in `content`. `.json` files are read as a package
/// manifest; anything else as one requirement per non-comment line.
fn analyze_manifest(file_path: &str, content: &str) -> Option<DependencyAnalysis> {
    if file_path.ends_with(".json") {
        let manifest: Value = serde_json::from_str(content).ok()?;
        let keys = |field: &str| -> Vec<String> {
            manifest
                .get(field)
                .and_then(Value::as_object)
                .map(|deps| deps.keys().cloned().collect())
                .unwrap_or_default()
        };
        let dependencies = keys("dependencies");
        let dev_dependencies = keys("devDependencies");
        return Some(DependencyAnalysis {
            file: file_path.to_string(),
            total: dependencies.len() + dev_dependencies.len(),
            dependencies,
            dev_dependencies: Some(dev_dependencies),
        });
    }

    let dependencies: Vec<String> = content
        .split('\n')
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    Some(DependencyAnalysis {
        file: file_path.to_string(),
        total: dependencies.len(),
        dependencies,
        dev_dependencies: None,
    })
}

#[derive(Debug, PartialEq)]
enum Contents {
    File(String),
    Directory,
}

/// Decode a contents API response. `None` if it carries no decodable file.
fn decode_contents(payload: &Value) -> Option<Contents> {
    if payload.is_array() {
        return Some(Contents::Directory);
    }
    let encoded: String = payload
        .get("content")?
        .as_str()?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).ok()?;
    Some(Contents::File(String::from_utf8_lossy(&bytes).into_owned()))
}

pub struct AnalyzeDependencies {
    client: Arc<GitHubClient>,
}

impl AnalyzeDependencies {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for AnalyzeDependencies {
    fn name(&self) -> &str {
        "analyze_dependencies"
    }

    fn description(&self) -> &str {
        "Analyze project dependencies from package.json, requirements.txt, or similar files"
    }

    fn input_schema(&self) -> Value {
        schema_for::<AnalyzeDependenciesArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: AnalyzeDependenciesArgs = parse_args(self.name(), args)?;
        let not_found = || ToolOutput::text(format!("File not found: {}", args.file_path));

        let Some(url) = self.client.contents_url(&args.file_path) else {
            return Ok(not_found());
        };
        let payload: Value = match self.client.get(url.as_str(), &[]).await {
            Ok(payload) => payload,
            Err(_) => return Ok(not_found()),
        };

        Ok(match decode_contents(&payload) {
            Some(Contents::File(content)) => match analyze_manifest(&args.file_path, &content) {
                Some(analysis) => ToolOutput::json(&analysis),
                None => not_found(),
            },
            Some(Contents::Directory) => ToolOutput::text("File is a directory, not a file."),
            None => not_found(),
        })
    }
}

// ─── list_issues ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum IssueState {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueState {
    fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
            IssueState::All => "all",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListIssuesArgs {
    /// Filter by label name
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    state: IssueState,
    #[serde(default = "default_issue_limit")]
    limit: u32,
}

fn default_issue_limit() -> u32 {
    10
}

#[derive(Debug, Serialize)]
struct IssueSummary {
    number: u64,
    title: String,
    state: String,
    labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    created: String,
}

pub struct ListIssues {
    client: Arc<GitHubClient>,
}

impl ListIssues {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListIssues {
    fn name(&self) -> &str {
        "list_issues"
    }

    fn description(&self) -> &str {
        "List open issues with optional label filter"
    }

    fn input_schema(&self) -> Value {
        schema_for::<ListIssuesArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: ListIssuesArgs = parse_args(self.name(), args)?;
        check_range(self.name(), "limit", args.limit, 1, 100)?;

        let mut query = vec![
            ("state", args.state.as_str().to_string()),
            ("per_page", args.limit.to_string()),
        ];
        if let Some(label) = args.label {
            query.push(("labels", label));
        }

        let issues: Vec<IssueResponse> = match self.client.get(&self.client.repo_url("/issues"), &query).await {
            Ok(issues) => issues,
            Err(e) => return Ok(api_failure(e)),
        };

        // the issues endpoint also returns pull requests
        let issues: Vec<IssueSummary> = issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| IssueSummary {
                number: i.number,
                title: i.title,
                state: i.state,
                labels: i.labels.into_iter().map(|l| l.name).collect(),
                author: i.user.map(|u| u.login),
                created: i.created_at,
            })
            .collect();

        Ok(ToolOutput::json(&issues))
    }
}

// ─── get_pull_request ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct PullRequestArgs {
    /// Pull request number
    pr_number: u64,
}

#[derive(Debug, Serialize)]
struct PullRequestDetails {
    number: u64,
    title: String,
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    merged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    additions: u64,
    deletions: u64,
    changed_files: u64,
    files: Vec<PullFile>,
}

pub struct GetPullRequest {
    client: Arc<GitHubClient>,
}

impl GetPullRequest {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetPullRequest {
    fn name(&self) -> &str {
        "get_pull_request"
    }

    fn description(&self) -> &str {
        "Get details of a specific pull request including diff stats"
    }

    fn input_schema(&self) -> Value {
        schema_for::<PullRequestArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: PullRequestArgs = parse_args(self.name(), args)?;
        let pr_url = self.client.repo_url(&format!("/pulls/{}", args.pr_number));
        let files_url = format!("{}/files", pr_url);

        let (pr, files) = tokio::join!(
            self.client.get::<PullResponse>(&pr_url, &[]),
            self.client.get::<Vec<PullFile>>(&files_url, &[]),
        );

        let (pr, files) = match (pr, files) {
            (Ok(pr), Ok(files)) => (pr, files),
            (Err(e), _) | (_, Err(e)) => return Ok(api_failure(e)),
        };

        Ok(ToolOutput::json(&PullRequestDetails {
            number: pr.number,
            title: pr.title,
            state: pr.state,
            merged: pr.merged,
            author: pr.user.map(|u| u.login),
            additions: pr.additions,
            deletions: pr.deletions,
            changed_files: pr.changed_files,
            files,
        }))
    }
}

// ─── create_issue_comment ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct IssueCommentArgs {
    /// Issue or PR number
    issue_number: u64,
    /// Comment body (Markdown)
    body: String,
}

pub struct CreateIssueComment {
    client: Arc<GitHubClient>,
}

impl CreateIssueComment {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateIssueComment {
    fn name(&self) -> &str {
        "create_issue_comment"
    }

    fn description(&self) -> &str {
        "Add a comment to an issue or pull request"
    }

    fn input_schema(&self) -> Value {
        schema_for::<IssueCommentArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: IssueCommentArgs = parse_args(self.name(), args)?;
        let url = self.client.repo_url(&format!("/issues/{}/comments", args.issue_number));

        Ok(match self.client.post::<CommentResponse>(&url, &json!({ "body": args.body })).await {
            Ok(comment) => ToolOutput::text(format!("Comment created: {}", comment.html_url)),
            Err(e) => api_failure(e),
        })
    }
}
