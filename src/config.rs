//! Pipeline configuration, loaded from the environment (see `spec.md` §6).
//!
//! Follows the teacher's env-driven setup in
//! `runtimes::runner::AppRunner::create_checkpointer`: read optional
//! environment variables via `dotenvy`/`std::env`, fall back to sane typed
//! defaults so the crate runs out of the box in tests.

use std::env;
use std::time::Duration;

/// Default per-call generation parameters and pipeline-wide tunables.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub model_id: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub retry_count: u32,
    pub base_backoff: Duration,
    pub timestamp_safety_cutoff_secs: u64,
    pub min_key_moments: usize,
    pub max_key_moments: usize,
    pub safety_tables_path: Option<String>,
    /// Selects the interrogative-marker and pronoun rows in the Safety
    /// Tables (`spec.md` §4.11 (c)); not an output-language switch — the core
    /// does not translate subtitles (`spec.md` §1 Non-goals).
    pub target_locale: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_id: "default-model".to_string(),
            max_output_tokens: 4096,
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            retry_count: 3,
            base_backoff: Duration::from_secs(1),
            timestamp_safety_cutoff_secs: 600,
            min_key_moments: 3,
            max_key_moments: 5,
            safety_tables_path: None,
            target_locale: "en".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from `.env` (if present) and the process
    /// environment, falling back to [`PipelineConfig::default`] for anything
    /// unset or unparseable.
    pub fn from_env() -> Self {
        // Missing .env is not an error; mirrors dotenvy usage elsewhere in
        // the corpus (best-effort load, never fails startup).
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            model_id: env::var("ARTICLE_PIPELINE_MODEL_ID").unwrap_or(defaults.model_id),
            max_output_tokens: env_parse("ARTICLE_PIPELINE_MAX_OUTPUT_TOKENS")
                .unwrap_or(defaults.max_output_tokens),
            temperature: env_parse("ARTICLE_PIPELINE_TEMPERATURE").unwrap_or(defaults.temperature),
            top_p: env_parse("ARTICLE_PIPELINE_TOP_P").unwrap_or(defaults.top_p),
            top_k: env_parse("ARTICLE_PIPELINE_TOP_K").unwrap_or(defaults.top_k),
            retry_count: env_parse("ARTICLE_PIPELINE_RETRY_COUNT").unwrap_or(defaults.retry_count),
            base_backoff: env_parse::<u64>("ARTICLE_PIPELINE_BASE_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_backoff),
            timestamp_safety_cutoff_secs: env_parse("ARTICLE_PIPELINE_TIMESTAMP_CUTOFF_SECS")
                .unwrap_or(defaults.timestamp_safety_cutoff_secs),
            min_key_moments: env_parse("ARTICLE_PIPELINE_MIN_KEY_MOMENTS")
                .unwrap_or(defaults.min_key_moments),
            max_key_moments: env_parse("ARTICLE_PIPELINE_MAX_KEY_MOMENTS")
                .unwrap_or(defaults.max_key_moments),
            safety_tables_path: env::var("ARTICLE_PIPELINE_SAFETY_TABLES_PATH").ok(),
            target_locale: env::var("ARTICLE_PIPELINE_TARGET_LOCALE").unwrap_or(defaults.target_locale),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parameters passed on every [`crate::llm::LlmAdaptor::generate`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl From<&PipelineConfig> for GenerationParams {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            top_k: cfg.top_k,
            max_output_tokens: cfg.max_output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.retry_count, 3);
        assert_eq!(cfg.base_backoff, Duration::from_secs(1));
        assert_eq!(cfg.timestamp_safety_cutoff_secs, 600);
        assert_eq!(cfg.min_key_moments, 3);
        assert_eq!(cfg.max_key_moments, 5);
        assert!((cfg.temperature - 0.7).abs() < f32::EPSILON);
    }
}
