//! Cumulative extraction store: the diff baseline, persisted as JSON

use crate::error::ExtractorError;
use crate::parser::EntityIndex;
use papergraph_domain::{ExtractionResult, NaturalKey};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Ordered collection of extraction results, unique per natural key.
///
/// Order is insertion order; replacing a result keeps its position.
#[derive(Debug, Clone, Default)]
pub struct ExtractionStore {
    results: Vec<ExtractionResult>,
    index: HashMap<NaturalKey, usize>,
}

impl ExtractionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from results; a later duplicate key replaces an earlier one
    pub fn from_results(results: impl IntoIterator<Item = ExtractionResult>) -> Self {
        let mut store = Self::new();
        for result in results {
            store.upsert(result);
        }
        store
    }

    /// Read a store file; a missing file is an empty store
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExtractorError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No extraction store at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ExtractorError::store_file(path, e))?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let results: Vec<ExtractionResult> = serde_json::from_str(&content)
            .map_err(|e| ExtractorError::store_file(path, format!("invalid store file: {}", e)))?;
        Ok(Self::from_results(results))
    }

    /// Rewrite the store file in full.
    ///
    /// Written to a sibling temporary file first and renamed into place, so
    /// an interrupted save leaves the previous baseline intact.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExtractorError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ExtractorError::store_file(path, e))?;
        }

        let json = serde_json::to_string_pretty(&self.results)
            .map_err(|e| ExtractorError::store_file(path, e))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, json).map_err(|e| ExtractorError::store_file(path, e))?;
        fs::rename(&tmp, path).map_err(|e| ExtractorError::store_file(path, e))?;

        debug!("Saved {} results to {}", self.results.len(), path.display());
        Ok(())
    }

    /// True when a result exists for the key
    pub fn contains(&self, key: &NaturalKey) -> bool {
        self.index.contains_key(key)
    }

    /// Insert a result, replacing any result with the same key.
    ///
    /// Returns true when an existing result was replaced.
    pub fn upsert(&mut self, result: ExtractionResult) -> bool {
        match self.index.get(&result.key) {
            Some(&position) => {
                self.results[position] = result;
                true
            }
            None => {
                self.index.insert(result.key.clone(), self.results.len());
                self.results.push(result);
                false
            }
        }
    }

    /// Result for a key
    pub fn get(&self, key: &NaturalKey) -> Option<&ExtractionResult> {
        self.index.get(key).map(|&position| &self.results[position])
    }

    /// Results in store order
    pub fn iter(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter()
    }

    /// Number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True when the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Every entity mentioned so far, for relation endpoint resolution
    pub fn known_entities(&self) -> EntityIndex {
        let mut index = EntityIndex::new();
        for result in &self.results {
            index.extend(&result.entities);
            for relation in &result.relations {
                index.extend([&relation.source, &relation.target]);
            }
        }
        index
    }
}

impl<'a> IntoIterator for &'a ExtractionStore {
    type Item = &'a ExtractionResult;
    type IntoIter = std::slice::Iter<'a, ExtractionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
