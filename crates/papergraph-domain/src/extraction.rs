//! Extraction results: what the model found in one source record

use crate::record::{NaturalKey, SourceRecord};
use crate::schema::{EntityType, RelationType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named entity mentioned by a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityMention {
    /// Entity name as written by the model (trimmed)
    pub name: String,

    /// Declared entity type
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl EntityMention {
    /// Create a mention
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
        }
    }
}

/// A directed relation between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMention {
    /// Source entity
    pub source: EntityMention,

    /// Target entity
    pub target: EntityMention,

    /// Relation kind
    pub relation: RelationType,

    /// One-line description of the relation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact: Option<String>,
}

/// Everything extracted from exactly one source record.
///
/// Every relation endpoint is one of `entities` or an entity resolved from
/// an earlier result; the parser drops relations that satisfy neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Natural key of the source record
    pub key: NaturalKey,

    /// The source record itself
    pub source: SourceRecord,

    /// Entities mentioned by the record
    pub entities: Vec<EntityMention>,

    /// Relations asserted by the record
    pub relations: Vec<RelationMention>,

    /// When the extraction ran
    pub extracted_at: DateTime<Utc>,

    /// Identifier of the provider that produced the result
    #[serde(default)]
    pub provider: String,
}

impl ExtractionResult {
    /// Create a result for a record, stamped with the current time
    pub fn new(
        source: SourceRecord,
        entities: Vec<EntityMention>,
        relations: Vec<RelationMention>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            key: source.key(),
            source,
            entities,
            relations,
            extracted_at: Utc::now(),
            provider: provider.into(),
        }
    }

    /// True when the model found nothing in the record
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }
}
