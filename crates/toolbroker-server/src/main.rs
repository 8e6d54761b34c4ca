use std::sync::Arc;

use toolbroker_core::ConsoleLogger;
use toolbroker_server::{ServeError, ToolServer, ToolSet};

const SERVER_NAME: &str = "repo-tools";

#[tokio::main]
async fn main() -> Result<(), ServeError> {
    // stdout carries the protocol
    let verbose = std::env::var("TOOLBROKER_DEBUG").is_ok_and(|v| !v.is_empty());
    let logger = Arc::new(
        ConsoleLogger::with_prefix(format!("[{}]", SERVER_NAME))
            .stderr()
            .verbose(verbose),
    );

    ToolServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION"), ToolSet::standard(), logger)
        .serve_stdio()
        .await
}
