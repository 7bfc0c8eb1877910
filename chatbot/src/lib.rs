//! docs-chatbot: answers questions about a folder of manuals.
//!
//! Questions go through a local lexical retrieval pipeline (load → segment →
//! score) and are answered either directly from the best passages or by a
//! hosted OpenAI-compatible model given those passages as context.

pub mod app_state;
pub mod cli;
pub mod commands;
pub mod composer;
pub mod llm;
pub mod paths;
pub mod protocol;
pub mod rag;
pub mod server;
pub mod session;
pub mod settings;
pub mod system_prompt;

#[cfg(test)]
mod tests;

use app_state::AppState;
use cli::CliArgs;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber (`RUST_LOG` wins over the default level)
pub fn init_tracing(debug: bool) {
    let default_level = if debug {
        "docs_chatbot_lib=debug,docs_chatbot=debug,doc_extract=debug,tower_http=debug,info"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load settings, apply CLI overrides, and serve until Ctrl-C
pub async fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut settings = settings::load_settings(args.config.as_deref()).await?;
    args.apply_to_settings(&mut settings);
    settings.validate()?;

    let state = AppState::from_settings(settings)?;
    server::serve(state).await
}
