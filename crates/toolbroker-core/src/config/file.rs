//! File-based configuration loading (YAML or JSON)
//!
//! ```yaml
//! call_timeout_ms: 30000
//! connect_timeout_ms: 10000
//! servers:
//!   - name: repo-tools
//!     command: toolbroker-server
//!     env:
//!       GITHUB_TOKEN: ${GITHUB_TOKEN}
//!       GITHUB_REPOSITORY: ${GITHUB_REPOSITORY}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use super::descriptor::BrokerConfig;
use super::error::{ConfigError, ConfigResult};

impl BrokerConfig {
    /// Default config location (`~/.config/toolbroker/servers.yaml` on Linux)
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("toolbroker").join("servers.yaml")
    }

    /// Load and validate a config file. `.json` files are parsed as JSON,
    /// everything else as YAML. `${VAR}` references in env overrides are
    /// expanded from the process environment.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content, is_json(path)).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })?;

        config.expand_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str, json: bool) -> Result<Self, String> {
        if json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        }
    }

    fn expand_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for server in &mut self.servers {
            if let Some(env) = server.env.as_mut() {
                for value in env.values_mut() {
                    *value = expand_env_refs(value, &lookup);
                }
            }
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Replace every `${NAME}` in `input` with `lookup(NAME)`, or the empty
/// string when unset. An unterminated `${` is kept literally.
pub fn expand_env_refs<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&lookup(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollisionPolicy;
    use tempfile::tempdir;

    fn lookup(key: &str) -> Option<String> {
        match key {
            "GITHUB_TOKEN" => Some("ghp_test".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_env_refs() {
        assert_eq!(expand_env_refs("${GITHUB_TOKEN}", lookup), "ghp_test");
        assert_eq!(expand_env_refs("Bearer ${GITHUB_TOKEN}!", lookup), "Bearer ghp_test!");
        assert_eq!(expand_env_refs("${MISSING}", lookup), "");
        assert_eq!(expand_env_refs("plain", lookup), "plain");
        assert_eq!(expand_env_refs("broken ${OPEN", lookup), "broken ${OPEN");
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.yaml");
        fs::write(
            &path,
            r#"
call_timeout_ms: 5000
collision_policy: namespace
servers:
  - name: repo-tools
    command: node
    args: ["./mcp-server/dist/index.js"]
    env:
      GITHUB_REPOSITORY: octo/widgets
  - name: files
    command: toolbroker-server
"#,
        )
        .unwrap();

        let config = BrokerConfig::load(&path).unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].name, "repo-tools");
        assert_eq!(config.servers[0].args, vec!["./mcp-server/dist/index.js"]);
        assert_eq!(
            config.servers[0].env.as_ref().unwrap().get("GITHUB_REPOSITORY").unwrap(),
            "octo/widgets"
        );
        assert!(config.servers[1].env.is_none());
        assert_eq!(config.call_timeout_ms, Some(5000));
        assert_eq!(config.collision_policy, CollisionPolicy::Namespace);
    }

    #[test]
    fn test_load_json_with_mcp_servers_alias() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent.json");
        fs::write(
            &path,
            r#"{"mcpServers": [{"name": "repo-tools", "command": "node", "args": ["index.js"]}]}"#,
        )
        .unwrap();

        let config = BrokerConfig::load(&path).unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.collision_policy, CollisionPolicy::LastWriteWins);
        assert_eq!(config.call_timeout_ms, None);
    }

    #[test]
    fn test_load_rejects_duplicate_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.yaml");
        fs::write(
            &path,
            "servers:\n  - {name: a, command: x}\n  - {name: a, command: y}\n",
        )
        .unwrap();

        assert!(matches!(BrokerConfig::load(&path), Err(ConfigError::DuplicateServer(_))));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.yaml");
        fs::write(&path, "servers: [ {name: ").unwrap();

        assert!(matches!(BrokerConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = BrokerConfig::load(dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_default_path() {
        let path = BrokerConfig::default_path();
        assert!(path.ends_with("toolbroker/servers.yaml"));
    }
}
