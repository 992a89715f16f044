//! Command implementations.

pub mod ask;
pub mod extract;
pub mod ingest;
pub mod providers;
pub mod stats;

pub use self::ask::{execute_ask, execute_chat};
pub use self::extract::execute_extract;
pub use self::ingest::execute_ingest;
pub use self::providers::execute_providers;
pub use self::stats::execute_stats;

use crate::cli::GraphArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use papergraph_graph::{GraphConfig, GraphStore};
use papergraph_llm::ProviderGateway;
use std::sync::Arc;
use tracing::debug;

/// Build the provider gateway; at least one provider must have a key.
pub fn build_gateway(config: &AppConfig) -> Result<Arc<ProviderGateway>> {
    let gateway = ProviderGateway::from_config(&config.llm());
    if gateway.is_empty() {
        let vars: Vec<&str> = config.providers.iter().map(|p| p.api_key_env.as_str()).collect();
        return Err(CliError::NoProviders(vars.join(", ")));
    }
    debug!("Provider chain:\n{}", gateway.describe());
    Ok(Arc::new(gateway))
}

/// Graph settings with the command-line backend override applied.
pub fn graph_config(config: &AppConfig, args: &GraphArgs) -> GraphConfig {
    let mut graph = config.graph.clone();
    if let Some(backend) = args.backend {
        graph.backend = backend;
    }
    graph
}

/// Connect to the configured graph backend.
pub async fn open_graph(config: &AppConfig, args: &GraphArgs) -> Result<Arc<dyn GraphStore>> {
    let graph = graph_config(config, args);
    graph.validate().map_err(CliError::Config)?;
    Ok(papergraph_graph::connect(&graph).await?)
}
