//! Chat configuration

use serde::{Deserialize, Serialize};

/// Configuration for question answering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Earlier question/query turns sent as context
    pub history_turns: usize,

    /// Most rows fetched from the graph and handed to the summarizer
    pub max_rows: usize,

    /// Row limit the generated query is asked to use
    pub row_limit: usize,
}

impl ChatConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_rows == 0 {
            return Err("chat.max_rows must be greater than 0".to_string());
        }
        if self.row_limit == 0 {
            return Err("chat.row_limit must be greater than 0".to_string());
        }
        if self.row_limit > self.max_rows {
            return Err(format!(
                "chat.row_limit ({}) cannot exceed chat.max_rows ({})",
                self.row_limit, self.max_rows
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_turns: 2,
            max_rows: 50,
            row_limit: 25,
        }
    }
}
