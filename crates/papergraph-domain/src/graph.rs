//! Graph-side keys and node shapes

use crate::extraction::{EntityMention, RelationMention};
use crate::record::{NaturalKey, SourceRecord};
use crate::schema::{EntityType, RelationType};
use serde::{Deserialize, Serialize};

/// Merge key of an Entity node: the same name under two types is two nodes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    /// Entity name
    pub name: String,

    /// Entity type
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl From<&EntityMention> for EntityKey {
    fn from(mention: &EntityMention) -> Self {
        Self {
            name: mention.name.trim().to_string(),
            entity_type: mention.entity_type.clone(),
        }
    }
}

/// Properties of a Paper node, merged by `key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperNode {
    /// Natural key of the source record
    pub key: String,
    /// Title
    pub title: String,
    /// ISO date, empty when unknown
    pub date: String,
    /// Category
    pub category: String,
    /// Impact notes
    pub impact: String,
    /// Enhancement notes
    pub enhancement: String,
    /// Link
    pub link: String,
}

impl From<&SourceRecord> for PaperNode {
    fn from(record: &SourceRecord) -> Self {
        Self {
            key: record.key().to_string(),
            title: record.title.trim().to_string(),
            date: record
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            category: record.category.clone(),
            impact: record.impact.clone().unwrap_or_default(),
            enhancement: record.enhancement.clone().unwrap_or_default(),
            link: record.link.clone(),
        }
    }
}

/// A RELATION edge as written by one paper.
///
/// Merged by `(source, target, relation)`; `paper_key` is added to the
/// edge's evidence set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
    /// Source entity
    pub source: EntityKey,
    /// Target entity
    pub target: EntityKey,
    /// Relation kind
    pub relation: RelationType,
    /// One-line description, if the model gave one
    pub fact: Option<String>,
    /// Natural key of the asserting paper
    pub paper_key: String,
}

impl RelationEdge {
    /// Edge asserted by the paper with the given key
    pub fn from_mention(mention: &RelationMention, paper_key: &NaturalKey) -> Self {
        Self {
            source: EntityKey::from(&mention.source),
            target: EntityKey::from(&mention.target),
            relation: mention.relation,
            fact: mention.fact.clone(),
            paper_key: paper_key.to_string(),
        }
    }
}

/// Node and edge counts of the managed part of a graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    /// Paper nodes
    pub papers: usize,
    /// Entity nodes
    pub entities: usize,
    /// MENTIONS edges
    pub mentions: usize,
    /// RELATION edges
    pub relations: usize,
}

impl GraphCounts {
    /// True when the managed graph holds nothing
    pub fn is_empty(&self) -> bool {
        self.papers == 0 && self.entities == 0 && self.mentions == 0 && self.relations == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_paper_node_from_record() {
        let mut record = SourceRecord::new("Paper A")
            .with_date(NaiveDate::from_ymd_opt(2026, 2, 16).unwrap())
            .with_link("https://example.org/a");
        record.impact = Some("High".to_string());

        let paper = PaperNode::from(&record);
        assert_eq!(paper.key, "Paper A::2026-02-16");
        assert_eq!(paper.date, "2026-02-16");
        assert_eq!(paper.impact, "High");
        assert_eq!(paper.enhancement, "");
    }

    #[test]
    fn test_relation_edge_from_mention() {
        let mention = RelationMention {
            source: EntityMention::new(" LoRA ", EntityType::Technique),
            target: EntityMention::new("Llama 3", EntityType::AiModel),
            relation: RelationType::Enhances,
            fact: None,
        };
        let edge = RelationEdge::from_mention(&mention, &NaturalKey::from_raw("Paper A"));
        assert_eq!(edge.source.name, "LoRA");
        assert_eq!(edge.relation, RelationType::Enhances);
        assert_eq!(edge.paper_key, "Paper A");
    }

    #[test]
    fn test_entity_key_distinguishes_types() {
        let a = EntityKey::from(&EntityMention::new("Gemini", EntityType::AiModel));
        let b = EntityKey::from(&EntityMention::new("Gemini", EntityType::Tool));
        assert_ne!(a, b);
    }
}
