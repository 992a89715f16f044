//! Source records and their natural keys

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of a source record.
///
/// Built from the trimmed title plus the ISO publication date when one is
/// known (`"Title::2025-08-07"`), otherwise from the trimmed title alone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(String);

impl NaturalKey {
    /// Separator between the title and the date component
    pub const SEPARATOR: &'static str = "::";

    /// Derive the key for a title and optional publication date
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use papergraph_domain::NaturalKey;
    ///
    /// let date = NaiveDate::from_ymd_opt(2025, 8, 7);
    /// assert_eq!(NaturalKey::derive("  GPT-5 ", date).as_str(), "GPT-5::2025-08-07");
    /// assert_eq!(NaturalKey::derive("GPT-5", None).as_str(), "GPT-5");
    /// ```
    pub fn derive(title: &str, date: Option<NaiveDate>) -> Self {
        let title = title.trim();
        match date {
            Some(date) => Self(format!("{}{}{}", title, Self::SEPARATOR, date.format("%Y-%m-%d"))),
            None => Self(title.to_string()),
        }
    }

    /// Wrap an already-formed key (store deserialization, tests)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the source table.
///
/// Never mutated by the pipeline; extraction copies it into its result so
/// ingestion can set Paper properties without re-reading the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Paper or product title
    pub title: String,

    /// Publication (or log) date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Research category
    #[serde(default)]
    pub category: String,

    /// Free-text description / body
    #[serde(default)]
    pub description: String,

    /// Impact notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,

    /// Enhancement notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<String>,

    /// Link to the paper or announcement
    #[serde(default)]
    pub link: String,

    /// Columns that have no dedicated field, kept for the extraction prompt
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl SourceRecord {
    /// Create a record with only a title; remaining fields are empty
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: None,
            category: String::new(),
            description: String::new(),
            impact: None,
            enhancement: None,
            link: String::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Set the publication date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the link
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// The record's natural key
    pub fn key(&self) -> NaturalKey {
        NaturalKey::derive(&self.title, self.date)
    }

    /// Value written to `Entity.last_source`: the link, or the title when
    /// the record has no link
    pub fn source_ref(&self) -> &str {
        if self.link.trim().is_empty() {
            self.title.trim()
        } else {
            self.link.trim()
        }
    }
}
