//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use papergraph_domain::GraphCounts;
use papergraph_extractor::ExtractionStats;
use papergraph_graph::QueryRows;
use papergraph_ingest::IngestStats;
use papergraph_llm::LlmConfig;
use papergraph_query::Answer;
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
    Table,
};

/// Longest cell shown in result tables
const MAX_CELL_WIDTH: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the result of an extraction run.
    pub fn extraction_stats(&self, stats: &ExtractionStats) -> Result<String> {
        if self.format == OutputFormat::Json {
            let skipped: Vec<Value> = stats
                .skipped
                .iter()
                .map(|s| json!({"key": s.key, "reason": s.reason}))
                .collect();
            return Ok(serde_json::to_string_pretty(&json!({
                "total_records": stats.total_records,
                "already_extracted": stats.already_extracted,
                "candidates": stats.candidates,
                "processed": stats.processed,
                "empty": stats.empty,
                "skipped": skipped,
                "relations_dropped": stats.relations_dropped,
                "malformed_items": stats.malformed_items,
            }))?);
        }

        let mut out = key_value_table(&[
            ("Records", stats.total_records.to_string()),
            ("Already extracted", stats.already_extracted.to_string()),
            ("Candidates", stats.candidates.to_string()),
            ("Processed", stats.processed.to_string()),
            ("Empty", stats.empty.to_string()),
            ("Skipped", stats.skipped_count().to_string()),
            ("Relations dropped", stats.relations_dropped.to_string()),
            ("Malformed items", stats.malformed_items.to_string()),
        ]);

        for skipped in &stats.skipped {
            out.push('\n');
            out.push_str(&self.warning(&format!("skipped {}: {}", skipped.key, skipped.reason)));
        }
        Ok(out)
    }

    /// Format the result of an ingestion run.
    pub fn ingest_stats(&self, stats: &IngestStats) -> Result<String> {
        if self.format == OutputFormat::Json {
            let failures: Vec<Value> = stats
                .failures
                .iter()
                .map(|f| json!({"key": f.key, "operation": f.operation, "message": f.message}))
                .collect();
            return Ok(serde_json::to_string_pretty(&json!({
                "records": stats.records,
                "ingested": stats.ingested,
                "skipped_empty": stats.skipped_empty,
                "failures": failures,
                "graph": stats.graph,
            }))?);
        }

        let mut out = key_value_table(&[
            ("Records", stats.records.to_string()),
            ("Ingested", stats.ingested.to_string()),
            ("Empty", stats.skipped_empty.to_string()),
            ("Failed", stats.failures.len().to_string()),
        ]);
        out.push('\n');
        out.push_str(&self.counts_table(&stats.graph));

        for failure in &stats.failures {
            out.push('\n');
            out.push_str(&self.error(&format!(
                "{} failed during {}: {}",
                failure.key, failure.operation, failure.message
            )));
        }
        Ok(out)
    }

    /// Format graph node and edge counts.
    pub fn graph_counts(&self, backend: &str, counts: &GraphCounts) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(&json!({
                "backend": backend,
                "counts": counts,
            }))?);
        }

        if counts.is_empty() {
            return Ok(self.warning(&format!("The {} graph is empty.", backend)));
        }
        Ok(self.counts_table(counts))
    }

    /// Format the provider chain with key availability.
    pub fn providers(&self, config: &LlmConfig) -> Result<String> {
        if self.format == OutputFormat::Json {
            let providers: Vec<Value> = config
                .providers
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "model": p.model,
                        "base_url": p.base_url,
                        "api_key_env": p.api_key_env,
                        "available": p.is_available(),
                    })
                })
                .collect();
            return Ok(serde_json::to_string_pretty(&providers)?);
        }

        let mut builder = Builder::default();
        builder.push_record(["#", "Provider", "Model", "Key", "Available"]);
        for (i, provider) in config.providers.iter().enumerate() {
            let available = if provider.is_available() {
                self.colorize("✔", "green")
            } else {
                self.colorize("✗", "red")
            };
            builder.push_record([
                (i + 1).to_string(),
                provider.id.clone(),
                provider.model.clone(),
                provider.api_key_env.clone(),
                available,
            ]);
        }
        Ok(styled(builder.build()))
    }

    /// Format an answer, including the query that produced it.
    pub fn answer(&self, answer: &Answer) -> Result<String> {
        match (self.format, answer) {
            (OutputFormat::Json, Answer::Answered { query, rows, summary }) => {
                Ok(serde_json::to_string_pretty(&json!({
                    "answered": true,
                    "query": query,
                    "rows": rows.to_json(),
                    "truncated": rows.truncated,
                    "summary": summary,
                }))?)
            }
            (OutputFormat::Json, Answer::CannotAnswer { reason }) => {
                Ok(serde_json::to_string_pretty(&json!({
                    "answered": false,
                    "reason": reason,
                }))?)
            }
            (OutputFormat::Table, Answer::Answered { query, rows, summary }) => {
                let truncated = if rows.truncated { ", truncated" } else { "" };
                Ok(format!(
                    "{}\n{}\n\n{}",
                    self.info(&format!("Query: {}", query)),
                    self.colorize(&format!("{} row(s){}", rows.len(), truncated), "cyan"),
                    summary
                ))
            }
            (OutputFormat::Table, Answer::CannotAnswer { reason }) => Ok(self.warning(&format!(
                "This question can't be answered from the graph ({})",
                reason
            ))),
        }
    }

    /// Format raw query rows as a table.
    pub fn rows(&self, rows: &QueryRows) -> String {
        if rows.is_empty() {
            return self.colorize("No rows.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(rows.columns.iter().cloned());
        for row in &rows.rows {
            builder.push_record(row.iter().map(cell_text));
        }
        styled(builder.build())
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn counts_table(&self, counts: &GraphCounts) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Papers", "Entities", "MENTIONS", "RELATION"]);
        builder.push_record([
            counts.papers.to_string(),
            counts.entities.to_string(),
            counts.mentions.to_string(),
            counts.relations.to_string(),
        ]);
        styled(builder.build())
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn key_value_table(pairs: &[(&str, String)]) -> String {
    let mut builder = Builder::default();
    for (key, value) in pairs {
        builder.push_record([key.to_string(), value.clone()]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn styled(mut table: Table) -> String {
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

fn cell_text(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{}…", cut)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papergraph_extractor::SkippedRecord;

    fn plain(format: OutputFormat) -> Formatter {
        Formatter::new(format, false)
    }

    #[test]
    fn test_colorize_disabled() {
        assert_eq!(plain(OutputFormat::Table).success("done"), "✓ done");
        assert_eq!(plain(OutputFormat::Table).warning("hm"), "⚠ hm");
    }

    #[test]
    fn test_extraction_stats_table_lists_skips() {
        let stats = ExtractionStats {
            total_records: 3,
            processed: 1,
            skipped: vec![SkippedRecord {
                key: "Paper C".to_string(),
                reason: "all providers failed".to_string(),
            }],
            ..Default::default()
        };
        let out = plain(OutputFormat::Table).extraction_stats(&stats).unwrap();
        assert!(out.contains("Processed"));
        assert!(out.contains("skipped Paper C: all providers failed"));
    }

    #[test]
    fn test_extraction_stats_json() {
        let stats = ExtractionStats {
            total_records: 2,
            ..Default::default()
        };
        let out = plain(OutputFormat::Json).extraction_stats(&stats).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["total_records"], 2);
        assert_eq!(value["skipped"], json!([]));
    }

    #[test]
    fn test_graph_counts() {
        let counts = GraphCounts {
            papers: 1,
            entities: 2,
            mentions: 2,
            relations: 1,
        };
        let table = plain(OutputFormat::Table).graph_counts("sqlite", &counts).unwrap();
        assert!(table.contains("Entities"));

        let json = plain(OutputFormat::Json).graph_counts("sqlite", &counts).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["counts"]["mentions"], 2);

        let empty = plain(OutputFormat::Table)
            .graph_counts("sqlite", &GraphCounts::default())
            .unwrap();
        assert!(empty.contains("empty"));
    }

    #[test]
    fn test_answer_formats() {
        let answered = Answer::Answered {
            query: "SELECT title FROM papers".to_string(),
            rows: QueryRows {
                columns: vec!["title".to_string()],
                rows: vec![vec![json!("Paper A")]],
                truncated: false,
            },
            summary: "Paper A is the only one.".to_string(),
        };
        let text = plain(OutputFormat::Table).answer(&answered).unwrap();
        assert!(text.contains("Query: SELECT title FROM papers"));
        assert!(text.ends_with("Paper A is the only one."));

        let declined = Answer::CannotAnswer {
            reason: "no providers".to_string(),
        };
        let json = plain(OutputFormat::Json).answer(&declined).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["answered"], false);
    }

    #[test]
    fn test_rows_table_truncates_long_cells() {
        let rows = QueryRows {
            columns: vec!["fact".to_string(), "n".to_string()],
            rows: vec![vec![json!("x".repeat(100)), json!(3)]],
            truncated: false,
        };
        let table = plain(OutputFormat::Table).rows(&rows);
        assert!(table.contains('…'));
        assert!(!table.contains(&"x".repeat(100)));
        assert!(table.contains('3'));
    }

    #[test]
    fn test_providers_table() {
        let table = plain(OutputFormat::Table).providers(&LlmConfig::default()).unwrap();
        assert!(table.contains("groq"));
        assert!(table.contains("gemini-2.0-flash"));
    }
}
