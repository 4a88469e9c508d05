//! Runtime settings.
//! Reads oncotier.toml from the current directory or the path in the
//! ONCOTIER_CONFIG env var. Every field has a default so a missing file
//! yields a fully usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub sources: SourceSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_tokens_narrative")]
    pub max_tokens_narrative: u32,
    #[serde(default = "default_tokens_scoring")]
    pub max_tokens_scoring: u32,
    #[serde(default = "default_tokens_extraction")]
    pub max_tokens_extraction: u32,
    /// JSONL decision log path; None disables logging.
    #[serde(default)]
    pub decision_log: Option<String>,
}

fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.1 }
fn default_tokens_narrative() -> u32 { 1000 }
fn default_tokens_scoring() -> u32 { 500 }
fn default_tokens_extraction() -> u32 { 1500 }

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens_narrative: default_tokens_narrative(),
            max_tokens_scoring: default_tokens_scoring(),
            max_tokens_extraction: default_tokens_extraction(),
            decision_log: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default = "bool_true")]
    pub vicc_enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub cgi_cache_ttl_days: u64,
    #[serde(default = "default_cache_dir")]
    pub cgi_cache_dir: String,
    #[serde(default = "default_evidence_limit")]
    pub evidence_item_limit: usize,
    #[serde(default = "default_host_permits")]
    pub per_host_permits: usize,
}

fn bool_true() -> bool { true }
fn default_cache_ttl() -> u64 { 7 }
fn default_cache_dir() -> String { "data/cgi".to_string() }
fn default_evidence_limit() -> usize { 15 }
fn default_host_permits() -> usize { 4 }

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            vicc_enabled: bool_true(),
            cgi_cache_ttl_days: default_cache_ttl(),
            cgi_cache_dir: default_cache_dir(),
            evidence_item_limit: default_evidence_limit(),
            per_host_permits: default_host_permits(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_timeout")]
    pub timeout_sec: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_score_threshold")]
    pub literature_score_threshold: f64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_validation: usize,
}

fn default_timeout() -> u64 { 60 }
fn default_retries() -> u32 { 3 }
fn default_score_threshold() -> f64 { 0.6 }
fn default_max_concurrent() -> usize { 3 }

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout_sec: default_timeout(),
            retries: default_retries(),
            literature_score_threshold: default_score_threshold(),
            max_concurrent_validation: default_max_concurrent(),
        }
    }
}

impl Settings {
    /// Load configuration from oncotier.toml.
    /// Checks ONCOTIER_CONFIG first, then the current directory; a
    /// missing file falls back to defaults, a malformed one is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("ONCOTIER_CONFIG")
            .unwrap_or_else(|_| "oncotier.toml".to_string());

        if !Path::new(&path).exists() {
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Provider API keys come from the environment; an absent key
    /// disables that provider.
    pub fn openai_api_key() -> Option<String> {
        std::env::var("ONCOTIER_OPENAI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.is_empty())
    }

    pub fn anthropic_api_key() -> Option<String> {
        std::env::var("ONCOTIER_ANTHROPIC_API_KEY")
            .or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
            .ok()
            .filter(|k| !k.is_empty())
    }

    pub fn semantic_scholar_api_key() -> Option<String> {
        std::env::var("SEMANTIC_SCHOLAR_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.llm.model, "gpt-4o-mini");
        assert_eq!(s.pipeline.timeout_sec, 60);
        assert_eq!(s.pipeline.retries, 3);
        assert!(s.sources.vicc_enabled);
        assert_eq!(s.sources.cgi_cache_ttl_days, 7);
        assert!((s.pipeline.literature_score_threshold - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let s: Settings = toml::from_str(
            r#"
            [llm]
            model = "claude-sonnet-4-5"

            [pipeline]
            timeout_sec = 30
            "#,
        )
        .unwrap();
        assert_eq!(s.llm.model, "claude-sonnet-4-5");
        assert_eq!(s.llm.max_tokens_narrative, 1000);
        assert_eq!(s.pipeline.timeout_sec, 30);
        assert_eq!(s.pipeline.max_concurrent_validation, 3);
    }
}
