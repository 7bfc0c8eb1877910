use crate::app_state::AppState;
use crate::composer::{ChatError, INVALID_REQUEST_MESSAGE};
use crate::protocol::{ChatEnvelope, ChatRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

/// `POST /api/chat`
///
/// Always answers with an envelope, including for bodies that are not a valid
/// `ChatRequest`. The composer runs in its own task so that even a panic while
/// answering becomes a `success: false` response.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatEnvelope> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(
                status = %rejection.status(),
                error = %rejection.body_text(),
                "Rejected chat request body"
            );
            let message = if state.settings.debug {
                format!("{} ({})", INVALID_REQUEST_MESSAGE, rejection.body_text())
            } else {
                INVALID_REQUEST_MESSAGE.to_string()
            };
            return Json(ChatEnvelope::err(message));
        }
    };

    let ctx = state.sessions.begin(request.session_id.as_deref());
    let session_id = ctx.session_id().to_string();
    let composer = state.composer.clone();
    let prompt = request.prompt;

    let task = tokio::spawn(async move {
        let mut ctx = ctx;
        let result = composer.answer(&prompt, &mut ctx).await;
        (result, ctx)
    });

    let result = match task.await {
        Ok((result, ctx)) => {
            if result.is_ok() {
                state.sessions.commit(ctx);
            }
            result
        }
        Err(join_error) => Err(ChatError::Internal(join_error.to_string())),
    };

    match result {
        Ok(answer) => {
            tracing::info!(
                session = %session_id,
                origin = answer.origin.as_str(),
                chars = answer.text.chars().count(),
                "Question answered"
            );
            Json(ChatEnvelope::ok(answer.text, session_id))
        }
        Err(ChatError::EmptyQuestion) => {
            Json(ChatEnvelope::err(ChatError::EmptyQuestion.user_message(state.settings.debug)))
        }
        Err(e) => {
            tracing::error!(session = %session_id, error = %e, "Failed to answer question");
            Json(ChatEnvelope::err(e.user_message(state.settings.debug)))
        }
    }
}
