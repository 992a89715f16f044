//! Prompts for query generation and answer summarization

use crate::ChatTurn;
use papergraph_graph::{QueryLanguage, QueryRows};
use papergraph_llm::{ChatMessage, CompletionRequest};

/// Marker the model returns when the graph cannot answer a question
pub const CANNOT_ANSWER: &str = "CANNOT_ANSWER";

const CYPHER_EXAMPLES: &str = "\
User: latest news
MATCH (p:Paper) RETURN p.title, p.date, p.category, p.impact ORDER BY p.date DESC LIMIT 10

User: papers about GPT
MATCH (p:Paper)-[:MENTIONS]->(e:Entity) WHERE toLower(e.name) CONTAINS 'gpt' RETURN DISTINCT p.title, p.date, p.category, p.impact ORDER BY p.date DESC

User: list all AI models
MATCH (e:Entity) WHERE e.type = 'AI_Model' RETURN e.name ORDER BY e.name

User: how are knowledge graphs and RAG related
MATCH (a:Entity)-[r:RELATION]->(b:Entity) WHERE toLower(a.name) CONTAINS 'knowledge graph' AND toLower(b.name) CONTAINS 'rag' RETURN a.name, r.type, r.fact, b.name";

const SQL_EXAMPLES: &str = "\
User: latest news
SELECT title, date, category, impact FROM papers ORDER BY date DESC LIMIT 10

User: papers about GPT
SELECT DISTINCT p.title, p.date, p.category, p.impact FROM papers p JOIN mentions m ON m.paper_key = p.key JOIN entities e ON e.id = m.entity_id WHERE lower(e.name) LIKE '%gpt%' ORDER BY p.date DESC

User: list all AI models
SELECT name FROM entities WHERE type = 'AI_Model' ORDER BY name

User: how are knowledge graphs and RAG related
SELECT a.name, r.type, r.fact, b.name FROM relations r JOIN entities a ON a.id = r.source_id JOIN entities b ON b.id = r.target_id WHERE lower(a.name) LIKE '%knowledge graph%' AND lower(b.name) LIKE '%rag%'";

const ANSWER_PROMPT: &str = "\
You are a helpful AI research assistant. Given the user's question and knowledge-graph query results, \
provide a clear, well-structured answer. Use bullet points, group by category or date where helpful. \
Include paper titles, dates, and impact summaries when available. \
If the results are empty, say so and suggest rephrasing.";

/// Builds the query-generation and summarization requests
///
/// # Examples
///
/// ```
/// use papergraph_graph::QueryLanguage;
/// use papergraph_query::QueryPromptBuilder;
///
/// let request = QueryPromptBuilder::new("papers(key, title)", QueryLanguage::Sql)
///     .with_row_limit(10)
///     .query_request("latest papers");
///
/// assert_eq!(request.last_user_message(), Some("latest papers"));
/// ```
#[derive(Debug, Clone)]
pub struct QueryPromptBuilder<'a> {
    schema: &'a str,
    language: QueryLanguage,
    history: &'a [ChatTurn],
    row_limit: usize,
}

impl<'a> QueryPromptBuilder<'a> {
    /// Create a builder for a backend schema
    pub fn new(schema: &'a str, language: QueryLanguage) -> Self {
        Self {
            schema,
            language,
            history: &[],
            row_limit: 25,
        }
    }

    /// Earlier turns, oldest first
    pub fn with_history(mut self, history: &'a [ChatTurn]) -> Self {
        self.history = history;
        self
    }

    /// Row limit the model should apply unless asked otherwise
    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = row_limit;
        self
    }

    /// System prompt for query generation
    pub fn system_prompt(&self) -> String {
        let (examples, read_only) = match self.language {
            QueryLanguage::Cypher => (CYPHER_EXAMPLES, "no CREATE/MERGE/DELETE/SET/REMOVE/CALL"),
            QueryLanguage::Sql => (
                SQL_EXAMPLES,
                "a single SELECT, no INSERT/UPDATE/DELETE/DDL/PRAGMA",
            ),
        };

        format!(
            "You are a {language} query generator for a knowledge graph about AI research.\n\
             Output ONLY a valid {language} query. No markdown, no explanation.\n\n\
             {schema}\n\n\
             RULES:\n\
             1. Questions about latest, recent or new work query papers ordered by date, newest first.\n\
             2. Always include the paper date when returning papers.\n\
             3. Use case-insensitive substring matching for names.\n\
             4. Limit to {row_limit} rows unless the user asks for more.\n\
             5. Read-only: {read_only}.\n\
             6. Use only the structure listed above.\n\
             7. If the question cannot be answered from this graph, output {marker} and nothing else.\n\n\
             EXAMPLES:\n{examples}",
            language = self.language.name(),
            schema = self.schema.trim(),
            row_limit = self.row_limit,
            read_only = read_only,
            marker = CANNOT_ANSWER,
            examples = examples,
        )
    }

    /// Request that turns `question` into a query
    pub fn query_request(&self, question: &str) -> CompletionRequest {
        let mut messages = vec![ChatMessage::system(self.system_prompt())];
        for turn in self.history {
            messages.push(ChatMessage::user(turn.question.as_str()));
            messages.push(ChatMessage::assistant(turn.query.as_str()));
        }
        messages.push(ChatMessage::user(question));

        CompletionRequest::new(messages).temperature(0.0)
    }

    /// Request that summarizes the rows of `query` as an answer to `question`
    pub fn answer_request(question: &str, rows: &QueryRows) -> CompletionRequest {
        let json =
            serde_json::to_string_pretty(&rows.to_json()).unwrap_or_else(|_| "[]".to_string());
        let truncated = if rows.truncated { " (truncated)" } else { "" };
        let content = format!(
            "Question: {}\n\nQuery results ({} rows{}):\n{}",
            question,
            rows.len(),
            truncated,
            json
        );

        CompletionRequest::with_system(ANSWER_PROMPT, content).temperature(0.3)
    }
}
