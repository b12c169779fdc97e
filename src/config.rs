// src/config.rs
//
// Configuration is explicit: the hosting application builds a
// `PipelineConfig` and hands it to the pipeline at construction time. No
// environment variables or globals are read anywhere in the library. The
// YAML file layer exists for the bundled runner binary.

use crate::scorer::{CategoryThresholds, ScoringWeights};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Everything the pipeline needs, passed in at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Chat-completions style endpoint of the text-generation service.
    pub service_endpoint: String,
    /// Bearer credential for the service. Never hardcoded by the library.
    pub credential: String,
    pub model: String,
    /// Hard per-request timeout for intelligence calls.
    pub request_timeout_ms: u64,
    /// When false, recoverable intelligence failures abort the affected
    /// route instead of degrading to fallback flags.
    pub fallback_enabled: bool,
    /// Bound on intelligence calls in flight across a batch.
    pub max_concurrent_requests: usize,
    pub weights: ScoringWeights,
    pub thresholds: CategoryThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            service_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            credential: String::new(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_ms: 8_000,
            fallback_enabled: true,
            max_concurrent_requests: 4,
            weights: ScoringWeights::default(),
            thresholds: CategoryThresholds::default(),
        }
    }
}

// ============================================================================
// YAML FILE LAYER (runner binary)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub credential: String,
    pub model: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub max_concurrent_requests: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    pub weights: ScoringWeights,
    pub thresholds: CategoryThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "saferoute=info".to_string(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    8_000
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
        let config: AppConfig =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path))?;
        Ok(config)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            service_endpoint: self.service.endpoint.clone(),
            credential: self.service.credential.clone(),
            model: self.service.model.clone(),
            request_timeout_ms: self.service.request_timeout_ms,
            fallback_enabled: self.service.fallback_enabled,
            max_concurrent_requests: self.pipeline.max_concurrent_requests,
            weights: self.scoring.weights.clone(),
            thresholds: self.scoring.thresholds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
service:
  endpoint: "https://api.example.com/v1/chat/completions"
  credential: "sk-test"
  model: "test-model"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.service.request_timeout_ms, 8_000);
        assert!(config.service.fallback_enabled);
        assert_eq!(config.pipeline.max_concurrent_requests, 4);
        assert_eq!(config.scoring.weights.crime_mention, 18);
        assert_eq!(config.scoring.thresholds.moderate_max, 70);
    }

    #[test]
    fn test_parse_overrides() {
        let yaml = r#"
service:
  endpoint: "https://api.example.com/v1/chat/completions"
  credential: "sk-test"
  model: "test-model"
  request_timeout_ms: 3000
  fallback_enabled: false
pipeline:
  max_concurrent_requests: 8
scoring:
  weights:
    crime_mention: 25
  thresholds:
    risky_max: 35
    moderate_max: 75
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.request_timeout_ms, 3000);
        assert!(!pipeline.fallback_enabled);
        assert_eq!(pipeline.max_concurrent_requests, 8);
        assert_eq!(pipeline.weights.crime_mention, 25);
        // Untouched weights keep their defaults.
        assert_eq!(pipeline.weights.night_travel, 15);
        assert_eq!(pipeline.thresholds.risky_max, 35);
    }
}
