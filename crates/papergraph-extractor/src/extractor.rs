//! Core Extractor implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_extraction;
use crate::prompt::PromptBuilder;
use crate::store::ExtractionStore;
use crate::types::{ExtractOptions, ExtractionStats, RawExtraction, SkippedRecord};
use futures::stream::{self, StreamExt};
use papergraph_domain::{ExtractionResult, SourceRecord};
use papergraph_llm::{ProviderGateway, Structured};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Turns source records into extraction results through the provider gateway
pub struct Extractor {
    gateway: Arc<ProviderGateway>,
    config: ExtractorConfig,
}

impl Extractor {
    /// Create a new Extractor
    pub fn new(gateway: Arc<ProviderGateway>, config: ExtractorConfig) -> Self {
        Self { gateway, config }
    }

    /// The configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run one extraction pass.
    ///
    /// Candidates are the records whose key is absent from `prior` (every
    /// record when `force_full`), truncated to `limit` in source order. A
    /// candidate whose extraction fails is reported in the stats and left
    /// out of the store, so the next incremental run picks it up again.
    /// Results are merged in source order whatever the concurrency.
    pub async fn extract(
        &self,
        records: &[SourceRecord],
        prior: ExtractionStore,
        options: ExtractOptions,
    ) -> (ExtractionStore, ExtractionStats) {
        let mut stats = ExtractionStats {
            total_records: records.len(),
            ..Default::default()
        };

        let mut selected = HashSet::new();
        let mut candidates = Vec::new();
        for record in records {
            let key = record.key();
            if !options.force_full && prior.contains(&key) {
                stats.already_extracted += 1;
                continue;
            }
            if !selected.insert(key.clone()) {
                debug!("Duplicate source key '{}', keeping the first row", key);
                continue;
            }
            candidates.push(record);
        }
        if let Some(limit) = options.limit {
            candidates.truncate(limit);
        }
        stats.candidates = candidates.len();

        if candidates.is_empty() {
            info!("Nothing new to extract: all {} records already processed", records.len());
            return (prior, stats);
        }

        info!(
            "Extracting {} records (skipping {} already extracted)",
            candidates.len(),
            stats.already_extracted
        );

        let total = candidates.len();
        let pacer = Pacer::new(self.config.request_delay());
        let pacer = &pacer;
        let responses: Vec<(&SourceRecord, Result<Structured<RawExtraction>, ExtractorError>)> =
            stream::iter(candidates.into_iter().enumerate())
                .map(|(i, record)| async move {
                    pacer.wait().await;
                    info!("[{}/{}] {}", i + 1, total, record.title.trim());
                    (record, self.request(record).await)
                })
                .buffered(self.config.concurrency.max(1))
                .collect()
                .await;

        let mut store = prior;
        let mut known = store.known_entities();

        for (record, response) in responses {
            let key = record.key();
            let parsed = response.and_then(|structured| {
                parse_extraction(&structured.value, &known)
                    .map(|parsed| (parsed, structured.provider))
                    .map_err(|reason| ExtractorError::Record {
                        key: key.to_string(),
                        reason,
                    })
            });

            match parsed {
                Ok((parsed, provider)) => {
                    stats.relations_dropped += parsed.dropped;
                    stats.malformed_items += parsed.malformed;

                    let result = ExtractionResult::new(
                        record.clone(),
                        parsed.entities,
                        parsed.relations,
                        provider,
                    );
                    if result.is_empty() {
                        stats.empty += 1;
                    }
                    debug!(
                        "{}: {} entities, {} relations via {}",
                        key,
                        result.entities.len(),
                        result.relations.len(),
                        result.provider
                    );

                    known.extend(&result.entities);
                    store.upsert(result);
                    stats.processed += 1;
                }
                Err(e) => {
                    warn!("Skipping '{}': {}", key, e);
                    stats.skipped.push(SkippedRecord {
                        key: key.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("{}", stats.summary());
        (store, stats)
    }

    /// One gateway call for one record
    async fn request(
        &self,
        record: &SourceRecord,
    ) -> Result<Structured<RawExtraction>, ExtractorError> {
        let request = PromptBuilder::new(record)
            .with_max_text_length(self.config.max_text_length)
            .with_temperature(self.config.temperature)
            .request();

        Ok(self.gateway.complete_structured::<RawExtraction>(&request).await?)
    }
}

/// Spaces the starts of successive provider calls by a fixed delay,
/// however many calls are in flight
struct Pacer {
    delay: Duration,
    next: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            next: Mutex::new(None),
        }
    }

    /// Reserve the next start slot and sleep until it
    async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next.lock().unwrap_or_else(|p| p.into_inner());
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.delay);
            slot
        };
        sleep_until(slot).await;
    }
}
