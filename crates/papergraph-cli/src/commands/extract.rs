//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use papergraph_extractor::{load_records, ExtractOptions, ExtractionStore, Extractor};
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(
    args: ExtractArgs,
    config: &AppConfig,
    formatter: &Formatter,
) -> Result<()> {
    let mut extraction = config.extraction.clone();
    if let Some(input) = args.input {
        extraction.source_path = input;
    }
    if let Some(output) = args.output {
        extraction.store_path = output;
    }
    if let Some(concurrency) = args.concurrency {
        extraction.concurrency = concurrency;
    }
    extraction.validate().map_err(CliError::Config)?;

    let options = ExtractOptions {
        force_full: args.full,
        limit: args.limit,
    };

    let records = load_records(&extraction.source_path)?;
    let prior = ExtractionStore::load(&extraction.store_path)?;
    info!(
        "Loaded {} records from {} and {} prior results from {}",
        records.len(),
        extraction.source_path.display(),
        prior.len(),
        extraction.store_path.display()
    );

    let gateway = super::build_gateway(config)?;
    let store_path = extraction.store_path.clone();
    let extractor = Extractor::new(gateway, extraction);
    let (store, stats) = extractor.extract(&records, prior, options).await;

    store.save(&store_path)?;

    println!("{}", formatter.extraction_stats(&stats)?);
    println!(
        "{}",
        formatter.success(&format!("Saved {} results to {}", store.len(), store_path.display()))
    );
    Ok(())
}
