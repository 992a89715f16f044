//! Ingest command implementation.

use crate::cli::IngestArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::output::Formatter;
use papergraph_extractor::ExtractionStore;
use papergraph_ingest::{IngestOptions, Ingestor};

/// Execute the ingest command.
pub async fn execute_ingest(
    args: IngestArgs,
    config: &AppConfig,
    formatter: &Formatter,
) -> Result<()> {
    let path = args.input.unwrap_or_else(|| config.extraction.store_path.clone());
    let store = ExtractionStore::load(&path)?;
    if store.is_empty() && !args.clear {
        println!(
            "{}",
            formatter.warning(&format!(
                "No extraction results in {}; run `papergraph extract` first",
                path.display()
            ))
        );
        return Ok(());
    }

    let graph = super::open_graph(config, &args.graph).await?;
    let backend = graph.backend();
    let stats = Ingestor::new(graph)
        .ingest(
            &store,
            IngestOptions {
                clear_first: args.clear,
            },
        )
        .await?;

    println!("{}", formatter.ingest_stats(&stats)?);
    if stats.failures.is_empty() {
        println!(
            "{}",
            formatter.success(&format!(
                "Ingested {} results into the {} graph",
                stats.ingested, backend
            ))
        );
    } else {
        println!(
            "{}",
            formatter.warning(&format!(
                "{} results failed; re-run `papergraph ingest` to retry them",
                stats.failures.len()
            ))
        );
    }
    Ok(())
}
