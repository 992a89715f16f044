//! LLM prompt engineering for entity/relation extraction

use papergraph_domain::{EntityType, RelationType, SourceRecord};
use papergraph_llm::{ChatMessage, CompletionRequest};
use serde_json::{json, Map, Value};

/// Builds the extraction request for one source record
pub struct PromptBuilder<'a> {
    record: &'a SourceRecord,
    max_text_length: usize,
    temperature: f32,
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder for a record
    pub fn new(record: &'a SourceRecord) -> Self {
        Self {
            record,
            max_text_length: usize::MAX,
            temperature: 0.2,
        }
    }

    /// Cut descriptions longer than `max` characters
    pub fn with_max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    /// Sampling temperature of the request
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The user message: the record's fields as a JSON object
    pub fn build(&self) -> String {
        let record = self.record;
        let mut fields = Map::new();

        fields.insert("Title".into(), json!(record.title.trim()));
        if let Some(date) = record.date {
            fields.insert("Date".into(), json!(date.format("%Y-%m-%d").to_string()));
        }
        insert_non_empty(&mut fields, "Category", &record.category);
        insert_non_empty(
            &mut fields,
            "Description",
            &truncate_chars(&record.description, self.max_text_length),
        );
        if let Some(impact) = &record.impact {
            insert_non_empty(&mut fields, "Impact", impact);
        }
        if let Some(enhancement) = &record.enhancement {
            insert_non_empty(&mut fields, "Enhancement", enhancement);
        }
        insert_non_empty(&mut fields, "Link", &record.link);
        for (column, value) in &record.extra {
            if !fields.contains_key(column) {
                insert_non_empty(&mut fields, column, value);
            }
        }

        Value::Object(fields).to_string()
    }

    /// The complete chat request (system instructions + record), asking
    /// for a JSON object response
    pub fn request(&self) -> CompletionRequest {
        CompletionRequest::new(vec![
            ChatMessage::system(system_prompt()),
            ChatMessage::user(self.build()),
        ])
        .temperature(self.temperature)
        .json()
    }
}

/// System instructions listing the closed entity and relation vocabularies
pub fn system_prompt() -> String {
    let entity_types = EntityType::KNOWN
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join("|");
    let relation_types = RelationType::ALL
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}\n\nEntity types: {}\nRelation types: {}\n\n{}",
        EXTRACTION_INSTRUCTIONS, entity_types, relation_types, OUTPUT_FORMAT_REMINDER
    )
}

fn insert_non_empty(fields: &mut Map<String, Value>, key: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        fields.insert(key.to_string(), json!(value));
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"You are an expert knowledge-graph builder.
Given a JSON record about an AI research paper or product, extract:

1. entities: named things (models, organizations, techniques, industries, tools, concepts, metrics, datasets).
2. relations: directional relationships between two distinct entities you extracted.

Rules:
- Names must be proper nouns or short technical terms, not long phrases.
- source and target must exactly match an entity name you listed.
- Do not extract dates as entities.
- Use only the entity types and relation types listed below.
- Cover every field in the record."#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (JSON object only, no additional text):
{
  "entities": [
    {"name": "...", "type": "..."}
  ],
  "relations": [
    {"source": "...", "target": "...", "relation": "...", "fact": "one-line description"}
  ]
}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use papergraph_llm::{ResponseFormat, Role};

    fn record() -> SourceRecord {
        let mut record = SourceRecord::new(" Mixture of Depths ")
            .with_date(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap())
            .with_category("Efficiency")
            .with_description("Dynamic compute allocation in transformers.")
            .with_link("https://arxiv.org/abs/2404.02258");
        record.extra.insert("Lab".to_string(), "DeepMind".to_string());
        record
    }

    #[test]
    fn test_user_message_contains_record_fields() {
        let record = record();
        let message = PromptBuilder::new(&record).build();
        let value: Value = serde_json::from_str(&message).unwrap();

        assert_eq!(value["Title"], "Mixture of Depths");
        assert_eq!(value["Date"], "2024-04-02");
        assert_eq!(value["Category"], "Efficiency");
        assert_eq!(value["Lab"], "DeepMind");
        assert!(value.get("Impact").is_none());
    }

    #[test]
    fn test_description_is_truncated_on_char_boundary() {
        let record = SourceRecord::new("T").with_description("héllo wörld");
        let message = PromptBuilder::new(&record).with_max_text_length(4).build();
        let value: Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["Description"], "héll");
    }

    #[test]
    fn test_system_prompt_lists_vocabulary() {
        let prompt = system_prompt();
        assert!(prompt.contains("AI_Model|Technology"));
        assert!(prompt.contains("APPLICABLE_IN"));
        assert!(prompt.contains("RELATED_TO"));
    }

    #[test]
    fn test_request_asks_for_json() {
        let record = record();
        let request = PromptBuilder::new(&record).with_temperature(0.5).request();
        assert_eq!(request.response_format, ResponseFormat::JsonObject);
        assert_eq!(request.temperature, 0.5);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.last_user_message().unwrap().contains("Mixture of Depths"));
    }
}
