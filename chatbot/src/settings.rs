//! Application settings.
//!
//! Settings come from an optional JSON file (every field defaulted) and are
//! then overridden by CLI flags / environment variables (see `cli.rs`).

use crate::paths;
use crate::rag::segmenter::SegmentPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ============ Defaults ============

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How local answers are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Plain,
    Html,
}

/// Which hosted model API to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Groq,
    Ollama,
    /// Any OpenAI-compatible endpoint; requires `base_url`
    Custom,
}

impl LlmProvider {
    pub fn requires_api_key(self) -> bool {
        matches!(self, LlmProvider::Groq)
    }

    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            LlmProvider::Groq => Some(GROQ_BASE_URL),
            LlmProvider::Ollama => Some(OLLAMA_BASE_URL),
            LlmProvider::Custom => None,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Groq | LlmProvider::Custom => GROQ_DEFAULT_MODEL,
            LlmProvider::Ollama => OLLAMA_DEFAULT_MODEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Basic-auth user for `/documentos`; endpoints are disabled when unset
    #[serde(default)]
    pub doc_user: Option<String>,
    #[serde(default, skip_serializing)]
    pub doc_pass: Option<String>,
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DOCUMENTS_DIR)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_CACHE_DIR)
}

fn default_session_capacity() -> usize {
    DEFAULT_SESSION_CAPACITY
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            documents_dir: default_documents_dir(),
            cache_dir: default_cache_dir(),
            doc_user: None,
            doc_pass: None,
            session_capacity: default_session_capacity(),
        }
    }
}

/// Knobs for loading, segmenting and scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default)]
    pub segment_policy: SegmentPolicy,
    /// Passages shorter than this (after trimming) are dropped as noise
    #[serde(default = "default_min_passage_chars")]
    pub min_passage_chars: usize,
    #[serde(default = "default_min_keyword_len")]
    pub min_keyword_len: usize,
    /// Added to the built-in Spanish/English stop-word list
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_follow_up_top_k")]
    pub follow_up_top_k: usize,
    #[serde(default = "default_sweet_spot_min")]
    pub sweet_spot_min: usize,
    #[serde(default = "default_sweet_spot_max")]
    pub sweet_spot_max: usize,
    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

fn default_min_passage_chars() -> usize {
    20
}

fn default_min_keyword_len() -> usize {
    3
}

fn default_top_k() -> usize {
    3
}

fn default_follow_up_top_k() -> usize {
    6
}

fn default_sweet_spot_min() -> usize {
    100
}

fn default_sweet_spot_max() -> usize {
    500
}

fn default_max_excerpt_chars() -> usize {
    600
}

fn default_true() -> bool {
    true
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            segment_policy: SegmentPolicy::default(),
            min_passage_chars: default_min_passage_chars(),
            min_keyword_len: default_min_keyword_len(),
            extra_stop_words: Vec::new(),
            top_k: default_top_k(),
            follow_up_top_k: default_follow_up_top_k(),
            sweet_spot_min: default_sweet_spot_min(),
            sweet_spot_max: default_sweet_spot_max(),
            max_excerpt_chars: default_max_excerpt_chars(),
            cache_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Overrides the provider's default endpoint (up to and including `/v1`)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on the passage text sent as context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_context_chars() -> usize {
    6000
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            base_url: None,
            model: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl LlmSettings {
    pub fn effective_base_url(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .or_else(|| self.provider.default_base_url())
            .map(|url| url.trim_end_matches('/').to_string())
    }

    pub fn effective_model(&self) -> String {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
            .to_string()
    }

    /// Key with surrounding whitespace removed; blank keys count as unset
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Keyword → team hint appended to answers about that topic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicRoute {
    pub keywords: Vec<String>,
    pub team: String,
    #[serde(default)]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub topic_routes: Vec<TopicRoute>,
    #[serde(default)]
    pub response_format: ResponseFormat,
    /// Include internal error causes in responses and log at debug level
    #[serde(default)]
    pub debug: bool,
}

impl AppSettings {
    /// Reject combinations the server cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field: &'static str, reason: &str| {
            Err(SettingsError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };

        let r = &self.retrieval;
        if r.top_k == 0 {
            return invalid("retrieval.top_k", "must be at least 1");
        }
        if r.follow_up_top_k == 0 {
            return invalid("retrieval.follow_up_top_k", "must be at least 1");
        }
        if r.sweet_spot_min > r.sweet_spot_max {
            return invalid(
                "retrieval.sweet_spot_min",
                "must not exceed retrieval.sweet_spot_max",
            );
        }
        if r.min_keyword_len == 0 {
            return invalid("retrieval.min_keyword_len", "must be at least 1");
        }
        if r.max_excerpt_chars == 0 {
            return invalid("retrieval.max_excerpt_chars", "must be at least 1");
        }
        if let Err(reason) = r.segment_policy.check() {
            return invalid("retrieval.segment_policy", &reason);
        }

        if self.llm.timeout_secs == 0 {
            return invalid("llm.timeout_secs", "must be at least 1");
        }
        if self.llm.provider == LlmProvider::Custom && self.llm.effective_base_url().is_none() {
            return invalid("llm.base_url", "required when llm.provider is custom");
        }

        let s = &self.server;
        if s.session_capacity == 0 {
            return invalid("server.session_capacity", "must be at least 1");
        }

        for route in &self.topic_routes {
            if route.keywords.iter().all(|k| k.trim().is_empty()) {
                return invalid("topic_routes", "every route needs at least one keyword");
            }
        }

        Ok(())
    }
}

/// Load settings from `explicit_path`, or from the default config path.
///
/// An explicitly requested file must exist and parse. The default file is
/// optional: when it is missing or broken the built-in defaults are used.
pub async fn load_settings(explicit_path: Option<&Path>) -> Result<AppSettings, SettingsError> {
    if let Some(path) = explicit_path {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|source| SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let settings = serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Settings loaded");
        return Ok(settings);
    }

    let config_path = paths::get_default_config_path();
    let settings = match fs::read_to_string(&config_path).await {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(settings) => {
                tracing::info!(path = %config_path.display(), "Settings loaded");
                settings
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Failed to parse settings, using defaults"
                );
                AppSettings::default()
            }
        },
        Err(_) => {
            tracing::debug!(path = %config_path.display(), "No config file found, using defaults");
            AppSettings::default()
        }
    };

    Ok(settings)
}
