//! Parse model output into entity and relation mentions

use crate::types::RawExtraction;
use papergraph_domain::{EntityKey, EntityMention, EntityType, RelationMention, RelationType};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Entities seen in earlier results, looked up by case-insensitive name.
///
/// The first entity registered under a name wins, so resolution does not
/// change as later results are added.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    by_name: HashMap<String, EntityMention>,
}

impl EntityIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every entity of a result
    pub fn extend<'a>(&mut self, entities: impl IntoIterator<Item = &'a EntityMention>) {
        for entity in entities {
            self.by_name
                .entry(fold(&entity.name))
                .or_insert_with(|| entity.clone());
        }
    }

    /// Look a name up
    pub fn resolve(&self, name: &str) -> Option<&EntityMention> {
        self.by_name.get(&fold(name))
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True when no entity is known
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Entities and relations read from one response
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParsedExtraction {
    pub entities: Vec<EntityMention>,
    pub relations: Vec<RelationMention>,
    /// Relations whose endpoints could not be resolved
    pub dropped: usize,
    /// Items that were not readable at all
    pub malformed: usize,
}

/// Turn a raw response into mentions.
///
/// Relation endpoints are resolved against the response's own entities
/// first, then against `known`. Fails only when the response had items and
/// none of them could be read.
pub(crate) fn parse_extraction(
    raw: &RawExtraction,
    known: &EntityIndex,
) -> Result<ParsedExtraction, String> {
    let mut parsed = ParsedExtraction::default();
    let mut seen = HashSet::new();

    for (idx, value) in raw.entities.iter().enumerate() {
        match parse_entity_json(value) {
            Ok(entity) => {
                if seen.insert((fold(&entity.name), entity.entity_type.clone())) {
                    parsed.entities.push(entity);
                }
            }
            Err(e) => {
                warn!("Failed to parse entity {}: {}", idx, e);
                parsed.malformed += 1;
            }
        }
    }

    let mut local = EntityIndex::new();
    local.extend(&parsed.entities);

    let mut seen_relations = HashSet::new();
    for (idx, value) in raw.relations.iter().enumerate() {
        let candidate = match parse_relation_json(value) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!("Failed to parse relation {}: {}", idx, e);
                parsed.malformed += 1;
                continue;
            }
        };

        let endpoint = |name: &str| local.resolve(name).or_else(|| known.resolve(name)).cloned();
        let (source, target) = match (endpoint(&candidate.source), endpoint(&candidate.target)) {
            (Some(source), Some(target)) => (source, target),
            _ => {
                debug!(
                    "Dropping relation {} -[{}]-> {}: unresolved endpoint",
                    candidate.source, candidate.relation, candidate.target
                );
                parsed.dropped += 1;
                continue;
            }
        };

        let (source_key, target_key) = (EntityKey::from(&source), EntityKey::from(&target));
        if source_key == target_key {
            debug!("Dropping self-relation on {}", source.name);
            parsed.dropped += 1;
            continue;
        }

        let relation = RelationType::parse(&candidate.relation).unwrap_or(RelationType::RelatedTo);
        let fact = match (candidate.fact, relation == RelationType::RelatedTo) {
            (Some(fact), _) => Some(fact),
            (None, true) if !candidate.relation.trim().is_empty() => {
                Some(candidate.relation.trim().to_string())
            }
            (None, _) => None,
        };

        if seen_relations.insert((source_key, target_key, relation)) {
            parsed.relations.push(RelationMention {
                source,
                target,
                relation,
                fact,
            });
        }
    }

    let total_items = raw.entities.len() + raw.relations.len();
    if total_items > 0 && parsed.malformed == total_items {
        return Err(format!("none of the {} returned items could be read", total_items));
    }

    Ok(parsed)
}

/// Relation as written by the model, before resolution
struct RelationCandidate {
    source: String,
    target: String,
    relation: String,
    fact: Option<String>,
}

/// Parse a single entity from JSON; a bare string is taken as a Concept
fn parse_entity_json(json: &Value) -> Result<EntityMention, String> {
    if let Some(name) = json.as_str() {
        return non_empty(name, "name").map(|name| EntityMention::new(name, EntityType::Concept));
    }

    let obj = json
        .as_object()
        .ok_or_else(|| "Entity is not a JSON object".to_string())?;

    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing or invalid 'name'".to_string())?;

    let entity_type = obj
        .get("type")
        .and_then(|v| v.as_str())
        .map(EntityType::parse)
        .unwrap_or(EntityType::Concept);

    Ok(EntityMention::new(non_empty(name, "name")?, entity_type))
}

/// Parse a single relation from JSON
fn parse_relation_json(json: &Value) -> Result<RelationCandidate, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Relation is not a JSON object".to_string())?;

    let field = |name: &str| -> Result<String, String> {
        let value = obj
            .get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("Missing or invalid '{}'", name))?;
        non_empty(value, name)
    };

    let source = field("source")?;
    let target = field("target")?;
    let relation = obj
        .get("relation")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let fact = obj
        .get("fact")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string);

    Ok(RelationCandidate {
        source,
        target,
        relation,
        fact,
    })
}

fn non_empty(value: &str, field: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err(format!("Empty '{}'", field))
    } else {
        Ok(value.to_string())
    }
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawExtraction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_entities_and_relations() {
        let raw = raw(json!({
            "entities": [
                {"name": "GPT-4o", "type": "AI_Model"},
                {"name": "OpenAI", "type": "organization"}
            ],
            "relations": [
                {"source": "GPT-4o", "target": "openai", "relation": "developed by", "fact": "OpenAI built GPT-4o"}
            ]
        }));

        let parsed = parse_extraction(&raw, &EntityIndex::new()).unwrap();
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.entities[1].entity_type, EntityType::Organization);
        assert_eq!(parsed.relations.len(), 1);

        let relation = &parsed.relations[0];
        assert_eq!(relation.relation, RelationType::DevelopedBy);
        assert_eq!(relation.target.name, "OpenAI");
        assert_eq!(relation.fact.as_deref(), Some("OpenAI built GPT-4o"));
    }

    #[test]
    fn test_unresolved_endpoint_is_dropped() {
        let raw = raw(json!({
            "entities": [{"name": "LoRA", "type": "Technique"}],
            "relations": [{"source": "LoRA", "target": "Nowhere", "relation": "USES"}]
        }));

        let parsed = parse_extraction(&raw, &EntityIndex::new()).unwrap();
        assert!(parsed.relations.is_empty());
        assert_eq!(parsed.dropped, 1);
    }

    #[test]
    fn test_endpoint_resolved_against_known_entities() {
        let mut known = EntityIndex::new();
        known.extend(&[EntityMention::new("Transformer", EntityType::Technology)]);

        let raw = raw(json!({
            "entities": [{"name": "Mamba", "type": "AI_Model"}],
            "relations": [{"source": "Mamba", "target": "transformer", "relation": "COMPETES_WITH"}]
        }));

        let parsed = parse_extraction(&raw, &known).unwrap();
        assert_eq!(parsed.relations.len(), 1);
        assert_eq!(parsed.relations[0].target.entity_type, EntityType::Technology);
        assert_eq!(parsed.relations[0].target.name, "Transformer");
    }

    #[test]
    fn test_unknown_relation_becomes_related_to_with_label_as_fact() {
        let raw = raw(json!({
            "entities": [{"name": "A", "type": "Concept"}, {"name": "B", "type": "Concept"}],
            "relations": [{"source": "A", "target": "B", "relation": "INSPIRED_BY"}]
        }));

        let parsed = parse_extraction(&raw, &EntityIndex::new()).unwrap();
        assert_eq!(parsed.relations[0].relation, RelationType::RelatedTo);
        assert_eq!(parsed.relations[0].fact.as_deref(), Some("INSPIRED_BY"));
    }

    #[test]
    fn test_duplicates_and_self_relations_are_collapsed() {
        let raw = raw(json!({
            "entities": [
                {"name": "RAG", "type": "Technique"},
                {"name": "rag ", "type": "technique"},
                {"name": "LLM", "type": "Concept"}
            ],
            "relations": [
                {"source": "RAG", "target": "LLM", "relation": "ENHANCES"},
                {"source": "rag", "target": "llm", "relation": "enhances"},
                {"source": "RAG", "target": "RAG", "relation": "USES"}
            ]
        }));

        let parsed = parse_extraction(&raw, &EntityIndex::new()).unwrap();
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.relations.len(), 1);
        assert_eq!(parsed.dropped, 1);
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let raw = raw(json!({
            "entities": [{"type": "Tool"}, "PyTorch", 42],
            "relations": [{"source": "PyTorch"}]
        }));

        let parsed = parse_extraction(&raw, &EntityIndex::new()).unwrap();
        assert_eq!(parsed.entities, vec![EntityMention::new("PyTorch", EntityType::Concept)]);
        assert_eq!(parsed.malformed, 3);
    }

    #[test]
    fn test_all_items_malformed_is_an_error() {
        let raw = raw(json!({"entities": [1, 2], "relations": [null]}));
        assert!(parse_extraction(&raw, &EntityIndex::new()).is_err());
    }

    #[test]
    fn test_empty_response_is_not_an_error() {
        let parsed = parse_extraction(&RawExtraction::default(), &EntityIndex::new()).unwrap();
        assert!(parsed.entities.is_empty());
    }
}
