//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Default source table (`.xlsx` or `.json`)
    pub source_path: PathBuf,

    /// Cumulative extraction store (JSON)
    pub store_path: PathBuf,

    /// Maximum provider calls in flight
    pub concurrency: usize,

    /// Minimum gap between the starts of successive provider calls (milliseconds)
    pub request_delay_ms: u64,

    /// Sampling temperature for extraction calls
    pub temperature: f32,

    /// Longest description sent to the model (characters); longer text is cut
    pub max_text_length: usize,
}

impl ExtractorConfig {
    /// Pacing delay as a Duration
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("extraction.concurrency must be greater than 0".to_string());
        }
        if self.max_text_length == 0 {
            return Err("extraction.max_text_length must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "extraction.temperature must be within 0.0..=2.0, got {}",
                self.temperature
            ));
        }
        if self.source_path.as_os_str().is_empty() || self.store_path.as_os_str().is_empty() {
            return Err("extraction.source_path and extraction.store_path must be set".to_string());
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

impl Default for ExtractorConfig {
    /// Sequential extraction paced for free-tier rate limits
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/AI_Tracker.xlsx"),
            store_path: PathBuf::from("data/AI_Tracker_relations.json"),
            concurrency: 1,
            request_delay_ms: 5_000,
            temperature: 0.2,
            max_text_length: 8_000,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: parallel calls without pacing (paid tiers)
    pub fn aggressive() -> Self {
        Self {
            concurrency: 4,
            request_delay_ms: 0,
            ..Self::default()
        }
    }

    /// Unpaced sequential preset for tests and local mock runs
    pub fn unpaced() -> Self {
        Self {
            request_delay_ms: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::unpaced().validate().is_ok());
    }

    #[test]
    fn test_invalid_concurrency() {
        let config = ExtractorConfig {
            concurrency: 0,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_temperature() {
        let config = ExtractorConfig {
            temperature: 3.5,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::aggressive();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ExtractorConfig::from_toml("concurrency = 2\n").unwrap();
        assert_eq!(parsed.concurrency, 2);
        assert_eq!(parsed.request_delay_ms, 5_000);
        assert_eq!(parsed.store_path, PathBuf::from("data/AI_Tracker_relations.json"));
    }
}
