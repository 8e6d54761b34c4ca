//! Broker configuration
//!
//! A configuration is an ordered list of Server Descriptors plus a few
//! dispatch settings. It can be built in code or loaded from a YAML/JSON file
//! (`~/.config/toolbroker/servers.yaml` by default).

mod descriptor;
mod error;
mod file;

pub use descriptor::{BrokerConfig, CollisionPolicy, ServerDescriptor, DEFAULT_CONNECT_TIMEOUT_MS};
pub use error::{ConfigError, ConfigResult};
pub use file::expand_env_refs;
