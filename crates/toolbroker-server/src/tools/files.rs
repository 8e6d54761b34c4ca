//! Filesystem tools: read_file, list_directory, count_lines
//!
//! Paths are resolved against the server's working directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use walkdir::{DirEntry, WalkDir};

use super::{check_range, parse_args, schema_for, Tool, ToolOutput, ToolResult};

/// Deepest level `list_directory` descends to when recursive
const MAX_LIST_DEPTH: usize = 3;

// ─── read_file ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct ReadFileArgs {
    /// Relative path to the file
    file_path: String,
    /// Maximum lines to return
    #[serde(default = "default_max_lines")]
    max_lines: u32,
}

fn default_max_lines() -> u32 {
    200
}

#[derive(Debug, Serialize)]
struct FileContent {
    path: String,
    lines: usize,
    total_lines: usize,
    truncated: bool,
    content: String,
}

pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the repository"
    }

    fn input_schema(&self) -> Value {
        schema_for::<ReadFileArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: ReadFileArgs = parse_args(self.name(), args)?;
        check_range(self.name(), "max_lines", args.max_lines, 1, 1000)?;

        let bytes = match tokio::fs::read(&args.file_path).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(ToolOutput::text(format!("File not found: {}", args.file_path))),
        };

        let file = excerpt(&args.file_path, &String::from_utf8_lossy(&bytes), args.max_lines as usize);
        Ok(match serde_json::to_string(&file) {
            Ok(text) => ToolOutput::text(text),
            Err(e) => ToolOutput::error(format!("Failed to encode result: {}", e)),
        })
    }
}

/// First `max_lines` lines of `content`, split on `\n`
fn excerpt(path: &str, content: &str, max_lines: usize) -> FileContent {
    let lines: Vec<&str> = content.split('\n').collect();
    let truncated = lines.len() > max_lines;

    FileContent {
        path: path.to_string(),
        lines: lines.len().min(max_lines),
        total_lines: lines.len(),
        truncated,
        content: if truncated {
            lines[..max_lines].join("\n")
        } else {
            content.to_string()
        },
    }
}

// ─── list_directory ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct ListDirectoryArgs {
    /// Directory path
    #[serde(default = "default_list_dir")]
    dir_path: String,
    /// List recursively
    #[serde(default)]
    recursive: bool,
}

fn default_list_dir() -> String {
    ".".to_string()
}

pub struct ListDirectory;

#[async_trait]
impl Tool for ListDirectory {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and directories at a given path"
    }

    fn input_schema(&self) -> Value {
        schema_for::<ListDirectoryArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: ListDirectoryArgs = parse_args(self.name(), args)?;
        let dir = PathBuf::from(&args.dir_path);

        let listing = tokio::task::spawn_blocking(move || list_entries(&dir, args.recursive)).await;
        Ok(match listing {
            Ok(Some(entries)) => ToolOutput::text(entries.join("\n")),
            _ => ToolOutput::text(format!("Directory not found: {}", args.dir_path)),
        })
    }
}

/// Entries under `dir` in pre-order, directories suffixed with `/`.
/// `None` if `dir` is not a readable directory.
fn list_entries(dir: &Path, recursive: bool) -> Option<Vec<String>> {
    if !dir.is_dir() {
        return None;
    }

    let max_depth = if recursive { MAX_LIST_DEPTH + 1 } else { 1 };
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    let mut entries = Vec::new();
    for entry in walker.flatten() {
        let shown = display_path(entry.path());
        if entry.file_type().is_dir() {
            entries.push(format!("{}/", shown));
        } else {
            entries.push(shown);
        }
    }
    Some(entries)
}

// ─── count_lines ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct CountLinesArgs {
    /// Directory to analyze
    #[serde(default = "default_count_dir")]
    dir_path: String,
}

fn default_count_dir() -> String {
    "src".to_string()
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct ExtensionCount {
    files: usize,
    lines: usize,
}

pub struct CountLines;

#[async_trait]
impl Tool for CountLines {
    fn name(&self) -> &str {
        "count_lines"
    }

    fn description(&self) -> &str {
        "Count lines of code by file extension in a directory"
    }

    fn input_schema(&self) -> Value {
        schema_for::<CountLinesArgs>()
    }

    async fn call(&self, args: Map<String, Value>) -> ToolResult<ToolOutput> {
        let args: CountLinesArgs = parse_args(self.name(), args)?;
        let dir = PathBuf::from(args.dir_path);

        let counts = tokio::task::spawn_blocking(move || count_by_extension(&dir))
            .await
            .unwrap_or_default();
        Ok(ToolOutput::json(&counts))
    }
}

/// Files and lines per extension (`.rs`, `(no ext)`, ...). Unreadable
/// entries are skipped.
fn count_by_extension(dir: &Path) -> BTreeMap<String, ExtensionCount> {
    let mut counts: BTreeMap<String, ExtensionCount> = BTreeMap::new();

    let walker = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || e.file_name() == "node_modules"));

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };

        let ext = match entry.path().extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy()),
            None => "(no ext)".to_string(),
        };
        let count = counts.entry(ext).or_default();
        count.files += 1;
        count.lines += bytes.iter().filter(|&&b| b == b'\n').count() + 1;
    }

    counts
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// `./src/lib.rs` is shown as `src/lib.rs`
fn display_path(path: &Path) -> String {
    path.strip_prefix(".").unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_excerpt_truncates() {
        let file = excerpt("a.txt", "one\ntwo\nthree", 2);
        assert_eq!(file.lines, 2);
        assert_eq!(file.total_lines, 3);
        assert!(file.truncated);
        assert_eq!(file.content, "one\ntwo");

        let file = excerpt("a.txt", "one\ntwo\n", 200);
        assert_eq!(file.total_lines, 3);
        assert!(!file.truncated);
        assert_eq!(file.content, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\nline two").unwrap();
        let path = path.display().to_string();

        let output = ReadFile.call(args(json!({"file_path": path.clone()}))).await.unwrap();
        let value: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(value["path"], json!(path));
        assert_eq!(value["lines"], json!(2));
        assert_eq!(value["truncated"], json!(false));
        assert_eq!(value["content"], json!("# Notes\nline two"));
    }

    #[tokio::test]
    async fn test_read_file_missing_is_text() {
        let output = ReadFile.call(args(json!({"file_path": "does/not/exist.txt"}))).await.unwrap();
        assert_eq!(output, ToolOutput::text("File not found: does/not/exist.txt"));
    }

    #[tokio::test]
    async fn test_read_file_rejects_max_lines_out_of_range() {
        let result = ReadFile.call(args(json!({"file_path": "a", "max_lines": 0}))).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments { .. })));

        let result = ReadFile.call(args(json!({"file_path": "a", "max_lines": 5000}))).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments { .. })));
    }

    #[tokio::test]
    async fn test_read_file_requires_path() {
        let result = ReadFile.call(Map::new()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments { .. })));
    }

    #[test]
    fn test_list_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        fs::write(dir.path().join("src/nested/deep.rs"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let root = dir.path();
        let flat = list_entries(root, false).unwrap();
        assert_eq!(
            flat,
            vec![
                root.join("README.md").display().to_string(),
                format!("{}/", root.join("src").display()),
            ]
        );

        let all = list_entries(root, true).unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.contains(&root.join("src/nested/deep.rs").display().to_string()));
        assert!(!all.iter().any(|e| e.contains(".hidden")));
    }

    #[test]
    fn test_list_entries_depth_limit() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c/d/e")).unwrap();

        let all = list_entries(dir.path(), true).unwrap();
        // a, a/b, a/b/c, a/b/c/d
        assert_eq!(all.len(), 4);
        assert!(all[3].ends_with("d/"));
    }

    #[tokio::test]
    async fn test_list_directory_missing() {
        let output = ListDirectory.call(args(json!({"dir_path": "no/such/dir"}))).await.unwrap();
        assert_eq!(output.text, "Directory not found: no/such/dir");
    }

    #[test]
    fn test_count_by_extension() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("lib.rs"), "a\nb\nc").unwrap();
        fs::write(dir.path().join("Makefile"), "all:").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(dir.path().join(".git/config"), "x").unwrap();

        let counts = count_by_extension(dir.path());
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[".rs"], ExtensionCount { files: 2, lines: 5 });
        assert_eq!(counts["(no ext)"], ExtensionCount { files: 1, lines: 1 });
    }

    #[tokio::test]
    async fn test_count_lines_missing_dir_is_empty() {
        let output = CountLines.call(args(json!({"dir_path": "no/such/dir"}))).await.unwrap();
        assert_eq!(output.text, "{}");
    }

    #[test]
    fn test_display_path_strips_current_dir() {
        assert_eq!(display_path(Path::new("./src/lib.rs")), "src/lib.rs");
        assert_eq!(display_path(Path::new("src/lib.rs")), "src/lib.rs");
    }
}
