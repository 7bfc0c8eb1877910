use crate::app_state::AppState;
use crate::protocol::HealthStatus;
use axum::extract::State;
use axum::Json;

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        documents_dir: state.settings.server.documents_dir.display().to_string(),
        llm_enabled: state.composer.llm_enabled(),
    })
}
