//! CLI argument parsing for toolbroker

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{eyre, Result};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "toolbroker")]
#[command(author, version, about = "Discover and call tools across MCP servers", long_about = None)]
pub struct Cli {
    /// Path to the servers config (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to every server and list the available operations
    List,

    /// Call one operation and print its text result
    Call {
        /// Operation name
        #[arg(required = true)]
        operation: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Run the example workflow: repository stats, then recent commits
    Demo,
}

/// Parse `--args`. Must be a JSON object.
pub fn parse_call_args(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).map_err(|e| eyre!("--args is not valid JSON: {}", e))?;
    if !value.is_object() {
        return Err(eyre!("--args must be a JSON object"));
    }
    Ok(value)
}
