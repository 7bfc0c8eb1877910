//! HTTP server implementation using Axum.

use crate::app_state::AppState;
use crate::commands::{
    chat_handler, get_document_handler, health_handler, index_handler, list_documents_handler,
    require_doc_auth,
};
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let documents = Router::new()
        .route("/documentos", get(list_documents_handler))
        .route("/documentos/", get(list_documents_handler))
        .route("/documentos/*path", get(get_document_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_doc_auth));

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .merge(documents)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", state.settings.server.host, state.settings.server.port);
    let documents_dir = state.settings.server.documents_dir.clone();
    let llm_enabled = state.composer.llm_enabled();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        documents_dir = %documents_dir.display(),
        llm_enabled,
        "Chatbot server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
