//! Options and statistics of an extraction run

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a run selects its candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Re-extract every record, replacing prior results
    pub force_full: bool,

    /// Process at most this many candidates, in source order
    pub limit: Option<usize>,
}

impl ExtractOptions {
    /// Incremental run over every new record
    pub fn incremental() -> Self {
        Self::default()
    }

    /// Re-extract everything
    pub fn full() -> Self {
        Self {
            force_full: true,
            limit: None,
        }
    }

    /// Cap the number of candidates
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A candidate that did not make it into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Natural key of the record
    pub key: String,
    /// Why it was skipped
    pub reason: String,
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Records read from the source
    pub total_records: usize,
    /// Records whose key was already in the prior store (0 on full runs)
    pub already_extracted: usize,
    /// Records selected for extraction after the diff and the limit
    pub candidates: usize,
    /// Candidates merged into the store
    pub processed: usize,
    /// Processed candidates for which the model found nothing
    pub empty: usize,
    /// Candidates left out because their extraction failed
    pub skipped: Vec<SkippedRecord>,
    /// Relations dropped because an endpoint could not be resolved
    pub relations_dropped: usize,
    /// Entities or relations the parser could not read
    pub malformed_items: usize,
}

impl ExtractionStats {
    /// Number of skipped candidates
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} records, {} already extracted, {} candidates: {} processed ({} empty), {} skipped, {} relations dropped",
            self.total_records,
            self.already_extracted,
            self.candidates,
            self.processed,
            self.empty,
            self.skipped.len(),
            self.relations_dropped,
        )
    }
}

/// Shape the model is asked to return; items are parsed one by one so a
/// single malformed entity does not cost the whole record.
///
/// At least one of the two keys must be present. Any other JSON fails to
/// decode, which the gateway treats as an invalid response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ExtractionFields")]
pub(crate) struct RawExtraction {
    pub entities: Vec<Value>,
    pub relations: Vec<Value>,
}

#[derive(Deserialize)]
struct ExtractionFields {
    entities: Option<Vec<Value>>,
    relations: Option<Vec<Value>>,
}

impl TryFrom<ExtractionFields> for RawExtraction {
    type Error = String;

    fn try_from(fields: ExtractionFields) -> Result<Self, Self::Error> {
        if fields.entities.is_none() && fields.relations.is_none() {
            return Err("expected an \"entities\" or \"relations\" key".to_string());
        }
        Ok(Self {
            entities: fields.entities.unwrap_or_default(),
            relations: fields.relations.unwrap_or_default(),
        })
    }
}
