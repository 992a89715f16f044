//! Read-only validation of generated queries

use papergraph_domain::EntityType;
use papergraph_graph::{QueryLanguage, NODE_LABELS, RELATIONSHIP_TYPES, SQL_TABLES};
use papergraph_llm::strip_code_fence;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static STRING_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*""#).unwrap());

static CYPHER_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)//.*$").unwrap());

static SQL_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)--.*$").unwrap());

static BLOCK_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

static CYPHER_WRITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(CREATE|MERGE|DELETE|DETACH|SET|REMOVE|DROP|FOREACH|LOAD|CALL)\b").unwrap()
});

static SQL_WRITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|REPLACE\s+INTO|UPSERT|CREATE|DROP|ALTER|ATTACH|DETACH|PRAGMA|VACUUM|REINDEX|ANALYZE)\b",
    )
    .unwrap()
});

/// `(alias:Label:Other` in a node pattern
static CYPHER_NODE_LABELS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(?:[A-Za-z_][A-Za-z0-9_]*)?\s*((?::\s*`?[A-Za-z_][A-Za-z0-9_]*`?\s*)+)").unwrap()
});

/// `[alias:TYPE|OTHER` in a relationship pattern
static CYPHER_REL_TYPES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*(?:[A-Za-z_][A-Za-z0-9_]*)?\s*:\s*([^\]\{\*]+)").unwrap()
});

/// Table after JOIN; group 2 marks a table-valued function call
static SQL_JOIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bJOIN\s+([A-Za-z_][A-Za-z0-9_]*)(\s*\()?").unwrap()
});

static SQL_FROM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bFROM\b").unwrap());

/// Keywords that end the table list of a FROM clause
static SQL_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:WHERE|GROUP|ORDER|LIMIT|HAVING|UNION|EXCEPT|INTERSECT|WINDOW|JOIN|ON|USING|NATURAL|LEFT|RIGHT|INNER|CROSS|FULL)\b",
    )
    .unwrap()
});

/// Leading table name of a FROM item; group 2 marks a table-valued function call
static SQL_FROM_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(\s*\()?").unwrap());

/// Common table expression names
static SQL_CTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bWITH(?:\s+RECURSIVE)?|,)\s*([A-Za-z_][A-Za-z0-9_]*)\s+AS\s*\(").unwrap()
});

/// Why a generated query was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Nothing left after stripping fences and comments
    Empty,

    /// More than one statement
    MultipleStatements,

    /// First keyword does not start a read query
    UnexpectedStart(String),

    /// A keyword that writes or administers the store
    WriteKeyword(String),

    /// Node label outside the schema
    UnknownLabel(String),

    /// Relationship type outside the schema
    UnknownRelationship(String),

    /// Table outside the schema
    UnknownTable(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Empty => write!(f, "query is empty"),
            RejectionReason::MultipleStatements => write!(f, "only a single statement is allowed"),
            RejectionReason::UnexpectedStart(word) => {
                write!(f, "a read query cannot start with '{}'", word)
            }
            RejectionReason::WriteKeyword(word) => {
                write!(f, "'{}' is not allowed in a read-only query", word.to_uppercase())
            }
            RejectionReason::UnknownLabel(label) => write!(f, "unknown node label '{}'", label),
            RejectionReason::UnknownRelationship(rel) => {
                write!(f, "unknown relationship type '{}'", rel)
            }
            RejectionReason::UnknownTable(table) => write!(f, "unknown table '{}'", table),
        }
    }
}

/// Check that a generated query is a single read-only statement over the
/// known schema.
///
/// Code fences and one trailing semicolon are removed; the cleaned query
/// is returned. String literals are ignored when looking for keywords, so
/// a search for `'set'` is not mistaken for a write.
///
/// # Examples
///
/// ```
/// use papergraph_graph::QueryLanguage;
/// use papergraph_query::{validate_query, RejectionReason};
///
/// let query = validate_query("MATCH (p:Paper) RETURN p.title LIMIT 5;", QueryLanguage::Cypher).unwrap();
/// assert_eq!(query, "MATCH (p:Paper) RETURN p.title LIMIT 5");
///
/// assert_eq!(
///     validate_query("MATCH (p:Paper) DETACH DELETE p", QueryLanguage::Cypher),
///     Err(RejectionReason::WriteKeyword("DETACH".to_string()))
/// );
/// ```
pub fn validate_query(query: &str, language: QueryLanguage) -> Result<String, RejectionReason> {
    let cleaned = strip_code_fence(query).trim();
    let cleaned = cleaned.strip_suffix(';').unwrap_or(cleaned).trim();

    let masked = STRING_LITERAL_RE.replace_all(cleaned, "''");
    let masked = BLOCK_COMMENT_RE.replace_all(&masked, " ");
    let masked = match language {
        QueryLanguage::Cypher => CYPHER_COMMENT_RE.replace_all(&masked, " "),
        QueryLanguage::Sql => SQL_COMMENT_RE.replace_all(&masked, " "),
    };
    let masked = masked.trim();

    if masked.is_empty() {
        return Err(RejectionReason::Empty);
    }
    if masked.contains(';') {
        return Err(RejectionReason::MultipleStatements);
    }

    let first = masked
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_uppercase();

    match language {
        QueryLanguage::Cypher => {
            if !matches!(first.as_str(), "MATCH" | "OPTIONAL" | "WITH" | "UNWIND" | "RETURN") {
                return Err(RejectionReason::UnexpectedStart(first));
            }
            if let Some(m) = CYPHER_WRITE_RE.captures(masked) {
                return Err(RejectionReason::WriteKeyword(m[1].to_string()));
            }
            check_cypher_schema(masked)?;
        }
        QueryLanguage::Sql => {
            if !matches!(first.as_str(), "SELECT" | "WITH") {
                return Err(RejectionReason::UnexpectedStart(first));
            }
            if let Some(m) = SQL_WRITE_RE.captures(masked) {
                return Err(RejectionReason::WriteKeyword(m[1].to_string()));
            }
            check_sql_schema(masked)?;
        }
    }

    Ok(cleaned.to_string())
}

fn check_cypher_schema(query: &str) -> Result<(), RejectionReason> {
    let labels: HashSet<&str> = NODE_LABELS
        .iter()
        .copied()
        .chain(EntityType::KNOWN.iter().filter_map(|t| t.label()))
        .collect();

    for caps in CYPHER_NODE_LABELS_RE.captures_iter(query) {
        for label in caps[1].split(':').map(|l| l.trim().trim_matches('`')) {
            if !label.is_empty() && !labels.contains(label) {
                return Err(RejectionReason::UnknownLabel(label.to_string()));
            }
        }
    }

    for caps in CYPHER_REL_TYPES_RE.captures_iter(query) {
        let rels = caps[1]
            .split('|')
            .map(|r| r.trim().trim_start_matches(':').trim().trim_matches('`'));
        for rel in rels {
            if !rel.is_empty() && !RELATIONSHIP_TYPES.contains(&rel) {
                return Err(RejectionReason::UnknownRelationship(rel.to_string()));
            }
        }
    }

    Ok(())
}

fn check_sql_schema(query: &str) -> Result<(), RejectionReason> {
    let ctes: HashSet<String> = SQL_CTE_RE
        .captures_iter(query)
        .map(|caps| caps[1].to_lowercase())
        .collect();

    let joined = SQL_JOIN_RE
        .captures_iter(query)
        .filter(|caps| caps.get(2).is_none())
        .map(|caps| caps[1].to_string());

    for table in sql_from_tables(query).into_iter().chain(joined) {
        let lowered = table.to_lowercase();
        if !SQL_TABLES.contains(&lowered.as_str()) && !ctes.contains(&lowered) {
            return Err(RejectionReason::UnknownTable(table));
        }
    }

    Ok(())
}

/// Every table named in the comma-separated list of each FROM clause.
///
/// Subqueries are blanked out so their own clauses do not cut the list short;
/// their tables are picked up by their own FROM. Table-valued functions are
/// skipped.
fn sql_from_tables(query: &str) -> Vec<String> {
    let mut tables = Vec::new();

    for from in SQL_FROM_RE.find_iter(query) {
        let mut top_level = String::new();
        let mut depth = 0usize;
        for ch in query[from.end()..].chars() {
            match ch {
                '(' => {
                    top_level.push(if depth == 0 { '(' } else { ' ' });
                    depth += 1;
                }
                ')' if depth == 0 => break,
                ')' => {
                    depth -= 1;
                    top_level.push(' ');
                }
                _ if depth > 0 => top_level.push(' '),
                _ => top_level.push(ch),
            }
        }

        let end = SQL_CLAUSE_RE
            .find(&top_level)
            .map_or(top_level.len(), |clause| clause.start());
        for item in top_level[..end].split(',') {
            if let Some(caps) = SQL_FROM_ITEM_RE.captures(item.trim()) {
                if caps.get(2).is_none() {
                    tables.push(caps[1].to_string());
                }
            }
        }
    }

    tables
}
