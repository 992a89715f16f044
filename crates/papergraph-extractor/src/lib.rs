//! Papergraph Extractor
//!
//! Incremental entity/relation extraction from research-tracker records.
//!
//! # Overview
//!
//! Each run diffs the source table against the cumulative extraction store
//! by natural key, asks the provider gateway to extract typed entities and
//! relations for every new record, and merges the results back into the
//! store. The store is the baseline of the next run.
//!
//! # Architecture
//!
//! ```text
//! xlsx/json → load_records → Extractor ⇄ ProviderGateway
//!                                ↓
//!                         ExtractionStore (JSON, rewritten in full)
//! ```
//!
//! # Key Features
//!
//! - **Incremental diff**: only records absent from the store are sent
//! - **Forced refresh and limits**: `ExtractOptions { force_full, limit }`
//! - **Failure isolation**: one bad record is skipped, never the batch
//! - **Endpoint resolution**: relations may point at entities seen earlier
//! - **Bounded concurrency** with request pacing
//!
//! # Example Usage
//!
//! ```no_run
//! use papergraph_extractor::{load_records, ExtractOptions, ExtractionStore, Extractor, ExtractorConfig};
//! use papergraph_llm::{LlmConfig, ProviderGateway};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractorConfig::default();
//! let gateway = Arc::new(ProviderGateway::from_config(&LlmConfig::default()));
//!
//! let records = load_records(&config.source_path)?;
//! let prior = ExtractionStore::load(&config.store_path)?;
//!
//! let extractor = Extractor::new(gateway, config.clone());
//! let (store, stats) = extractor.extract(&records, prior, ExtractOptions::incremental()).await;
//! store.save(&config.store_path)?;
//!
//! println!("{}", stats.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod parser;
mod prompt;
mod source;
mod store;
mod types;


pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use parser::EntityIndex;
pub use prompt::system_prompt;
pub use source::load_records;
pub use store::ExtractionStore;
pub use types::{ExtractOptions, ExtractionStats, SkippedRecord};
