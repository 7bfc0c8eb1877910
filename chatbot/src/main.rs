use clap::Parser;
use docs_chatbot_lib::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = CliArgs::parse();
    docs_chatbot_lib::init_tracing(args.debug_enabled());

    if let Err(e) = docs_chatbot_lib::run(args).await {
        tracing::error!(error = %e, "docs-chatbot failed");
        return Err(e);
    }
    Ok(())
}
