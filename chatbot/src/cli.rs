//! Command-line argument parsing and launch configuration.
//!
//! This module handles CLI argument parsing using clap, and applies
//! launch-time overrides to application settings. Every flag can also be set
//! through the environment variable named next to it.

use crate::settings::{AppSettings, LlmProvider, ResponseFormat};
use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for docs-chatbot
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "docs-chatbot", about = "Answer questions about a folder of manuals")]
pub struct CliArgs {
    /// Settings file (JSON); defaults to <config_dir>/docs-chatbot/config.json when present
    #[arg(long, value_name = "PATH", env = "CHATBOT_CONFIG")]
    pub config: Option<PathBuf>,
    /// Interface to bind
    #[arg(long, value_name = "HOST", env = "HOST")]
    pub host: Option<String>,
    /// Port to bind
    #[arg(long, value_name = "PORT", env = "PORT")]
    pub port: Option<u16>,
    /// Directory containing the PDF/DOCX/TXT/MD manuals
    #[arg(long, value_name = "DIR", env = "DOCUMENTS_DIR")]
    pub documents_dir: Option<PathBuf>,
    /// Directory for cached text extractions
    #[arg(long, value_name = "DIR", env = "PROCESSED_DATA_DIR")]
    pub cache_dir: Option<PathBuf>,
    /// Disable the extraction cache
    #[arg(
        long,
        value_name = "BOOL",
        env = "CHATBOT_NO_CACHE",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub no_cache: Option<bool>,
    /// Hosted model provider
    #[arg(long, value_enum, value_name = "PROVIDER", env = "LLM_PROVIDER")]
    pub llm_provider: Option<LlmProvider>,
    /// Model name (provider default when unset)
    #[arg(long, value_name = "MODEL", env = "LLM_MODEL")]
    pub llm_model: Option<String>,
    /// OpenAI-compatible base URL, up to and including /v1
    #[arg(long, value_name = "URL", env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,
    /// Groq API key; without it the chatbot answers from the documents only
    #[arg(long, value_name = "KEY", env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,
    /// Basic-auth user for /documentos
    #[arg(long, value_name = "USER", env = "DOC_USER")]
    pub doc_user: Option<String>,
    /// Basic-auth password for /documentos
    #[arg(long, value_name = "PASS", env = "DOC_PASS", hide_env_values = true)]
    pub doc_pass: Option<String>,
    /// Local answer rendering
    #[arg(long, value_enum, value_name = "FORMAT", env = "RESPONSE_FORMAT")]
    pub response_format: Option<ResponseFormat>,
    /// Verbose logging and internal error details in responses
    #[arg(
        long,
        value_name = "BOOL",
        env = "CHATBOT_DEBUG",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub debug: Option<bool>,
}

impl CliArgs {
    /// Apply launch overrides on top of the file/default settings
    pub fn apply_to_settings(&self, settings: &mut AppSettings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.documents_dir {
            settings.server.documents_dir = dir.clone();
        }
        if let Some(dir) = &self.cache_dir {
            settings.server.cache_dir = dir.clone();
        }
        if let Some(no_cache) = self.no_cache {
            settings.retrieval.cache_enabled = !no_cache;
        }
        if let Some(provider) = self.llm_provider {
            settings.llm.provider = provider;
        }
        if let Some(model) = &self.llm_model {
            settings.llm.model = Some(model.clone());
        }
        if let Some(url) = &self.llm_base_url {
            settings.llm.base_url = Some(url.clone());
        }
        if let Some(key) = &self.groq_api_key {
            settings.llm.api_key = Some(key.clone());
        }
        if let Some(user) = &self.doc_user {
            settings.server.doc_user = Some(user.clone());
        }
        if let Some(pass) = &self.doc_pass {
            settings.server.doc_pass = Some(pass.clone());
        }
        if let Some(format) = self.response_format {
            settings.response_format = format;
        }
        if let Some(debug) = self.debug {
            settings.debug = debug;
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.unwrap_or(false)
    }
}
