//! Server Descriptors and the top-level broker configuration

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// How to launch one tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Unique server name, used as the Session Handle key
    pub name: String,
    /// Program to execute
    pub command: String,
    /// Program arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides, merged over the ambient environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    /// Working directory for the server process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl ServerDescriptor {
    /// Create a descriptor with no arguments and no overrides
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: None,
            cwd: None,
        }
    }

    /// Append command-line arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add one environment override
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the working directory of the server process
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// What to do when two servers advertise the same operation name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The server processed last owns the name
    #[default]
    LastWriteWins,
    /// The first owner keeps the name; the later operation is reported and skipped
    Reject,
    /// Register every operation as `server/operation`
    Namespace,
}

/// Top-level broker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Servers, connected in this order
    #[serde(default, alias = "mcpServers")]
    pub servers: Vec<ServerDescriptor>,

    /// Per-call timeout in milliseconds. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,

    /// Bound on starting one server and on listing its operations, in
    /// milliseconds. Falls back to `call_timeout_ms`, then to
    /// [`DEFAULT_CONNECT_TIMEOUT_MS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,

    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

/// Startup bound used when neither timeout is configured
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

impl BrokerConfig {
    /// Create a configuration with default timeouts and policy
    pub fn new(servers: Vec<ServerDescriptor>) -> Self {
        Self {
            servers,
            ..Default::default()
        }
    }

    /// Set the per-call timeout
    pub fn with_call_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.call_timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the startup and discovery timeout
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(timeout_ms);
        self
    }

    /// Effective bound for connecting to and discovering one server
    pub fn connect_timeout(&self) -> Duration {
        let ms = self
            .connect_timeout_ms
            .or(self.call_timeout_ms)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS);
        Duration::from_millis(ms)
    }

    /// Set the collision policy
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Check server names are present and unique and every server has a command
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err(ConfigError::Invalid("server name must not be empty".to_string()));
            }
            if server.command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "server '{}' has an empty command",
                    server.name
                )));
            }
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::DuplicateServer(server.name.clone()));
            }
        }
        if self.call_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("call_timeout_ms must be greater than 0".to_string()));
        }
        if self.connect_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("connect_timeout_ms must be greater than 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let descriptor = ServerDescriptor::new("repo-tools", "node")
            .with_args(["./mcp-server/dist/index.js"])
            .with_env("GITHUB_TOKEN", "ghp_test")
            .with_cwd("/srv/repo");

        assert_eq!(descriptor.args, vec!["./mcp-server/dist/index.js"]);
        assert_eq!(descriptor.env.unwrap().get("GITHUB_TOKEN").unwrap(), "ghp_test");
        assert_eq!(descriptor.cwd, Some(PathBuf::from("/srv/repo")));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let config = BrokerConfig::new(vec![
            ServerDescriptor::new("a", "node"),
            ServerDescriptor::new("a", "python"),
        ]);
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateServer(name)) if name == "a"));
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let config = BrokerConfig::new(vec![ServerDescriptor::new("a", " ")]);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = BrokerConfig::new(vec![]).with_call_timeout_ms(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connect_timeout_fallbacks() {
        let config = BrokerConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS));

        let config = config.with_call_timeout_ms(200);
        assert_eq!(config.connect_timeout(), Duration::from_millis(200));

        let config = config.with_connect_timeout_ms(5_000);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));

        assert!(BrokerConfig::default().with_connect_timeout_ms(0).validate().is_err());
    }

    #[test]
    fn test_validate_accepts_empty_server_list() {
        assert!(BrokerConfig::default().validate().is_ok());
    }
}
