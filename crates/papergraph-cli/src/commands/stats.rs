//! Stats command implementation.

use crate::cli::GraphArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the stats command.
pub async fn execute_stats(
    args: GraphArgs,
    config: &AppConfig,
    formatter: &Formatter,
) -> Result<()> {
    let graph = super::open_graph(config, &args).await?;
    graph.ensure_schema().await?;
    let counts = graph.counts().await?;
    println!("{}", formatter.graph_counts(graph.backend(), &counts)?);
    Ok(())
}
