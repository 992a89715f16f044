//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use papergraph_extractor::ExtractorConfig;
use papergraph_graph::GraphConfig;
use papergraph_llm::{LlmConfig, ProviderConfig, RetryPolicy};
use papergraph_query::ChatConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Full configuration file.
///
/// Every section is optional; anything missing falls back to its default.
/// API keys and the Neo4j password are read from the environment variables
/// named here and never stored in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Providers in fallback order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Backoff for rate-limited calls
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Extraction settings
    #[serde(default)]
    pub extraction: ExtractorConfig,

    /// Graph backend settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Question answering settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputSettings,
}

/// Output settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    #[default]
    Table,
    /// JSON format
    Json,
}

impl AppConfig {
    /// Directory holding the default config file and chat history.
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".papergraph"))
    }

    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Get the chat history file path.
    pub fn history_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("history.txt"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let config = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.llm().validate().map_err(CliError::Config)?;
        self.extraction.validate().map_err(CliError::Config)?;
        self.graph.validate().map_err(CliError::Config)?;
        self.chat.validate().map_err(CliError::Config)?;
        Ok(())
    }

    /// Provider chain and retry policy.
    pub fn llm(&self) -> LlmConfig {
        LlmConfig {
            providers: self.providers.clone(),
            retry: self.retry,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            retry: RetryPolicy::default(),
            extraction: ExtractorConfig::default(),
            graph: GraphConfig::default(),
            chat: ChatConfig::default(),
            output: OutputSettings::default(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    LlmConfig::default().providers
}

fn default_true() -> bool {
    true
}
