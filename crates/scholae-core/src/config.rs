//! Engine configuration: file + environment, loaded through the `config` crate.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | SCHOLAE_CONFIG | config/scholae.toml | Path of the optional TOML file. |
//! | SCHOLAE__STORAGE_PATH | ./data/scholae_memory | Sled directory for the memory store. |
//! | SCHOLAE__CAPABILITY_TIMEOUT_MS | 10000 | Caller-visible timeout per capability call. |
//! | SCHOLAE__GRAPH__SEED_PATH | (unset) | JSON snapshot loaded into the in-memory graph. |
//! | SCHOLAE__TEXT_GENERATION__BACKEND | none | `none` or `openrouter`. |
//! | OPENROUTER_API_KEY / SCHOLAE_LLM_API_KEY | (unset) | Key for the OpenRouter generator. |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/scholae";

fn default_recall_limit() -> usize {
    100
}

fn default_strong_threshold() -> f64 {
    0.7
}

fn default_weak_threshold() -> f64 {
    0.2
}

fn default_report_weak_threshold() -> f64 {
    0.3
}

fn default_emerging_year() -> i32 {
    2023
}

fn default_max_view_concepts() -> usize {
    25
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_graph_backend() -> String {
    "in_memory".to_string()
}

fn default_text_backend() -> String {
    "none".to_string()
}

fn default_model() -> String {
    "openai/gpt-4.1-mini".to_string()
}

fn default_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    800
}

/// Thresholds used by the consolidation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Most-recent memories fetched per consolidation or report call.
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
    /// Strength above which a memory counts as strong.
    #[serde(default = "default_strong_threshold")]
    pub strong_threshold: f64,
    /// Strength below which consolidation flags a memory for review.
    #[serde(default = "default_weak_threshold")]
    pub weak_threshold: f64,
    /// Weak cutoff used by the health report.
    #[serde(default = "default_report_weak_threshold")]
    pub report_weak_threshold: f64,
    /// First publication year counted as "emerging" for gap detection.
    #[serde(default = "default_emerging_year")]
    pub emerging_year_threshold: i32,
    /// Write a `consolidation_summary` memory after each successful pass.
    #[serde(default)]
    pub persist_summary: bool,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            recall_limit: default_recall_limit(),
            strong_threshold: default_strong_threshold(),
            weak_threshold: default_weak_threshold(),
            report_weak_threshold: default_report_weak_threshold(),
            emerging_year_threshold: default_emerging_year(),
            persist_summary: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Cap on concepts placed in a personalized view (pairwise bridge lookups grow quadratically).
    #[serde(default = "default_max_view_concepts")]
    pub max_view_concepts: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_view_concepts: default_max_view_concepts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_backend")]
    pub backend: String,
    #[serde(default)]
    pub seed_path: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: default_graph_backend(),
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextGenerationConfig {
    /// `none` disables generation; `openrouter` uses the OpenAI-compatible chat API.
    #[serde(default = "default_text_backend")]
    pub backend: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TextGenerationConfig {
    fn default() -> Self {
        Self {
            backend: default_text_backend(),
            model: default_model(),
            api_base: default_api_base(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl TextGenerationConfig {
    pub fn enabled(&self) -> bool {
        !self.backend.trim().eq_ignore_ascii_case("none")
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholaeConfig {
    pub storage_path: String,
    pub capability_timeout_ms: u64,
    /// Records kept in the memory store's hot cache; 0 disables it.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub text_generation: TextGenerationConfig,
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
}

impl Default for ScholaeConfig {
    fn default() -> Self {
        Self {
            storage_path: "./data/scholae_memory".to_string(),
            capability_timeout_ms: 10_000,
            cache_capacity: default_cache_capacity(),
            graph: GraphConfig::default(),
            text_generation: TextGenerationConfig::default(),
            consolidation: ConsolidationConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl ScholaeConfig {
    /// Loads defaults, then `SCHOLAE_CONFIG` (or `config/scholae.toml`) when present,
    /// then `SCHOLAE__*` environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("SCHOLAE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("storage_path", "./data/scholae_memory")?
            .set_default("capability_timeout_ms", 10_000_i64)?;

        let with_ext = format!("{config_path}.toml");
        let path = if Path::new(config_path).exists() {
            Some(Path::new(config_path))
        } else if Path::new(&with_ext).exists() {
            Some(Path::new(&with_ext))
        } else {
            None
        };
        let builder = match path {
            Some(p) => builder.add_source(config::File::from(p)),
            None => builder,
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("SCHOLAE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        built.try_deserialize()
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_millis(self.capability_timeout_ms.max(1))
    }

    /// API key for the text generator: `SCHOLAE_LLM_API_KEY`, then `OPENROUTER_API_KEY`.
    pub fn llm_api_key(&self) -> Option<String> {
        env_opt_string("SCHOLAE_LLM_API_KEY").or_else(|| env_opt_string("OPENROUTER_API_KEY"))
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
