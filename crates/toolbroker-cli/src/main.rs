//! toolbroker - discover and call tools across MCP servers
//!
//! Connects every configured server, runs one command, disconnects.

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use serde_json::json;

use toolbroker_core::{Broker, BrokerConfig, ConsoleLogger, ServerDescriptor, SharedLogger};

use cli::{parse_call_args, Cli, Command};

/// Server launched when no config file exists
const DEFAULT_SERVER: (&str, &str) = ("repo-tools", "toolbroker-server");

fn load_config(path: Option<&Path>) -> Result<BrokerConfig> {
    if let Some(path) = path {
        return BrokerConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()));
    }

    let path = BrokerConfig::default_path();
    if path.exists() {
        BrokerConfig::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
    } else {
        let (name, command) = DEFAULT_SERVER;
        Ok(BrokerConfig::new(vec![ServerDescriptor::new(name, command)]))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for command output
    let logger: SharedLogger = Arc::new(ConsoleLogger::new().stderr().verbose(cli.verbose));

    let config = load_config(cli.config.as_deref())?;
    let mut broker = Broker::stdio(config, logger).context("Invalid broker configuration")?;

    let report = broker.connect().await;
    for failure in &report.failures {
        eprintln!("warning: {}", failure.error);
    }

    let outcome = run(&broker, cli.command).await;

    for failure in broker.disconnect().await {
        eprintln!("warning: {}", failure.error);
    }
    outcome
}

async fn run(broker: &Broker, command: Command) -> Result<()> {
    match command {
        Command::List => {
            let width = broker.operations().iter().map(|r| r.name.len()).max().unwrap_or(0);
            for record in broker.operations() {
                println!("{:width$}  {}", record.name, record.description, width = width);
            }
        }
        Command::Call { operation, args } => {
            let args = parse_call_args(&args)?;
            let invocation = broker.call(&operation, args).await?;
            println!("{}", invocation.text);
        }
        Command::Demo => {
            println!("Available tools: {}", broker.list_operations().join(", "));

            println!("\nRepository Stats:");
            println!("{}", broker.invoke("get_repo_stats", json!({})).await?);

            println!("\nRecent Commits:");
            println!("{}", broker.invoke("get_recent_commits", json!({ "count": 5 })).await?);
        }
    }
    Ok(())
}
