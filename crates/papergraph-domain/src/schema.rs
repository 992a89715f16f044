//! Graph schema vocabulary: entity types and relation types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an extracted entity.
///
/// Known types are closed variants; anything the model invents is kept as
/// `Other` with the raw string so nothing is lost between runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    /// A named AI model (GPT-4o, Llama 3)
    AiModel,
    /// A technology or platform
    Technology,
    /// A method or technique
    Technique,
    /// A company, lab or institution
    Organization,
    /// An industry or application domain
    Industry,
    /// An abstract concept
    Concept,
    /// An evaluation metric or benchmark score
    Metric,
    /// A software tool or library
    Tool,
    /// A dataset or benchmark suite
    Dataset,
    /// Any other type, stored verbatim
    Other(String),
}

impl EntityType {
    /// All closed variants, in prompt order
    pub const KNOWN: [EntityType; 9] = [
        EntityType::AiModel,
        EntityType::Technology,
        EntityType::Technique,
        EntityType::Organization,
        EntityType::Industry,
        EntityType::Concept,
        EntityType::Metric,
        EntityType::Tool,
        EntityType::Dataset,
    ];

    /// Canonical string stored in the `type` property
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::AiModel => "AI_Model",
            EntityType::Technology => "Technology",
            EntityType::Technique => "Technique",
            EntityType::Organization => "Organization",
            EntityType::Industry => "Industry",
            EntityType::Concept => "Concept",
            EntityType::Metric => "Metric",
            EntityType::Tool => "Tool",
            EntityType::Dataset => "Dataset",
            EntityType::Other(raw) => raw,
        }
    }

    /// Extra node label for backends with dynamic labels.
    ///
    /// Only closed variants have one; `Other` never produces a label so a
    /// model-supplied string is never spliced into a query.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            EntityType::AiModel => Some("AI_Model"),
            EntityType::Technology => Some("Technology"),
            EntityType::Technique => Some("Technique"),
            EntityType::Organization => Some("Organization"),
            EntityType::Industry => Some("Industry"),
            EntityType::Concept => Some("Concept"),
            EntityType::Metric => Some("Metric"),
            EntityType::Tool => Some("Tool"),
            EntityType::Dataset => Some("Dataset"),
            EntityType::Other(_) => None,
        }
    }

    /// Parse leniently: case, spaces, dashes and underscores are ignored
    ///
    /// # Examples
    ///
    /// ```
    /// use papergraph_domain::EntityType;
    ///
    /// assert_eq!(EntityType::parse("ai model"), EntityType::AiModel);
    /// assert_eq!(EntityType::parse("Organisation"), EntityType::Organization);
    /// assert_eq!(EntityType::parse("Person"), EntityType::Other("Person".into()));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let folded: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match folded.as_str() {
            "aimodel" | "model" | "llm" => EntityType::AiModel,
            "technology" | "tech" => EntityType::Technology,
            "technique" | "method" => EntityType::Technique,
            "organization" | "organisation" | "org" | "company" => EntityType::Organization,
            "industry" | "domain" => EntityType::Industry,
            "concept" => EntityType::Concept,
            "metric" | "benchmark" => EntityType::Metric,
            "tool" | "library" | "framework" => EntityType::Tool,
            "dataset" => EntityType::Dataset,
            "" => EntityType::Concept,
            _ => EntityType::Other(raw.trim().to_string()),
        }
    }
}

impl From<String> for EntityType {
    fn from(raw: String) -> Self {
        EntityType::parse(&raw)
    }
}

impl From<EntityType> for String {
    fn from(entity_type: EntityType) -> Self {
        entity_type.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a directed Entity→Entity relation.
///
/// The vocabulary is closed; unrecognised labels collapse to `RelatedTo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationType {
    /// Source uses target
    Uses,
    /// Source utilizes target
    Utilizes,
    /// Source enables target
    Enables,
    /// Source enhances target
    Enhances,
    /// Source improves target
    Improves,
    /// Source is applicable in target
    ApplicableIn,
    /// Source was developed by target
    DevelopedBy,
    /// Source is based on target
    BasedOn,
    /// Source is part of target
    PartOf,
    /// Source competes with target
    CompetesWith,
    /// Source outperforms target
    Outperforms,
    /// Source was evaluated on target
    EvaluatedOn,
    /// Source integrates with target
    IntegratesWith,
    /// Generic association
    RelatedTo,
}

impl RelationType {
    /// All variants, in prompt order
    pub const ALL: [RelationType; 14] = [
        RelationType::Uses,
        RelationType::Utilizes,
        RelationType::Enables,
        RelationType::Enhances,
        RelationType::Improves,
        RelationType::ApplicableIn,
        RelationType::DevelopedBy,
        RelationType::BasedOn,
        RelationType::PartOf,
        RelationType::CompetesWith,
        RelationType::Outperforms,
        RelationType::EvaluatedOn,
        RelationType::IntegratesWith,
        RelationType::RelatedTo,
    ];

    /// SCREAMING_SNAKE_CASE label stored on the edge
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Uses => "USES",
            RelationType::Utilizes => "UTILIZES",
            RelationType::Enables => "ENABLES",
            RelationType::Enhances => "ENHANCES",
            RelationType::Improves => "IMPROVES",
            RelationType::ApplicableIn => "APPLICABLE_IN",
            RelationType::DevelopedBy => "DEVELOPED_BY",
            RelationType::BasedOn => "BASED_ON",
            RelationType::PartOf => "PART_OF",
            RelationType::CompetesWith => "COMPETES_WITH",
            RelationType::Outperforms => "OUTPERFORMS",
            RelationType::EvaluatedOn => "EVALUATED_ON",
            RelationType::IntegratesWith => "INTEGRATES_WITH",
            RelationType::RelatedTo => "RELATED_TO",
        }
    }

    /// Parse a label; `None` when it is outside the vocabulary
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().replace([' ', '-'], "_").to_uppercase();
        Self::ALL.into_iter().find(|r| r.as_str() == normalized)
    }
}

impl From<String> for RelationType {
    fn from(raw: String) -> Self {
        RelationType::parse(&raw).unwrap_or(RelationType::RelatedTo)
    }
}

impl From<RelationType> for String {
    fn from(relation: RelationType) -> Self {
        relation.as_str().to_string()
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_round_trips_through_string() {
        for known in EntityType::KNOWN {
            assert_eq!(EntityType::parse(known.as_str()), known);
        }
    }

    #[test]
    fn test_unknown_entity_type_is_preserved() {
        let parsed = EntityType::parse("  Research Lab ");
        assert_eq!(parsed, EntityType::Other("Research Lab".to_string()));
        assert_eq!(parsed.as_str(), "Research Lab");
        assert!(parsed.label().is_none());
    }

    #[test]
    fn test_entity_type_serde_as_plain_string() {
        let json = serde_json::to_string(&EntityType::AiModel).unwrap();
        assert_eq!(json, r#""AI_Model""#);
        let parsed: EntityType = serde_json::from_str(r#""technology""#).unwrap();
        assert_eq!(parsed, EntityType::Technology);
    }

    #[test]
    fn test_relation_type_parse_normalizes() {
        assert_eq!(RelationType::parse("applicable in"), Some(RelationType::ApplicableIn));
        assert_eq!(RelationType::parse("developed-by"), Some(RelationType::DevelopedBy));
        assert_eq!(RelationType::parse("INSPIRED_BY"), None);
    }

    #[test]
    fn test_unknown_relation_deserializes_to_related_to() {
        let parsed: RelationType = serde_json::from_str(r#""INSPIRED_BY""#).unwrap();
        assert_eq!(parsed, RelationType::RelatedTo);
    }
}
