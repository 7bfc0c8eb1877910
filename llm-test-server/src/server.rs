//! Stub chat-completions server (dev edition with failure modes)
//!
//! - Serves `POST /v1/chat/completions` in the OpenAI response shape
//! - Switchable modes: ok / slow / error / malformed / empty
//! - Small control API: `/api/status`, `/api/mode`, `/api/logs`

use axum::{
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

// -----------------------------------------------------------------------------
// Constants
// -----------------------------------------------------------------------------

pub const DEFAULT_HOST: &str = "127.0.0.1";
// Use a less common default port to reduce clashes with local services.
pub const DEFAULT_PORT: u16 = 43031;
/// Every generated answer starts with this marker
pub const STUB_ANSWER_PREFIX: &str = "[stub]";

const MAX_LOG_ENTRIES: usize = 500;
const ECHO_CHARS: usize = 200;

// -----------------------------------------------------------------------------
// CLI
// -----------------------------------------------------------------------------

/// How the stub answers chat-completion requests
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StubMode {
    /// 200 with a canned answer echoing the user message
    #[default]
    Ok,
    /// Same as `ok`, after sleeping `delay_ms`
    Slow,
    /// Respond with `error_status` and an OpenAI-style error body
    Error,
    /// 200 with a body that has no `choices`
    Malformed,
    /// 200 with an empty assistant message
    Empty,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "llm-test-server", about = "Stub OpenAI-compatible chat-completions server")]
pub struct CliArgs {
    /// Host interface to bind
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Port to bind (0 picks a free port)
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Initial response mode
    #[arg(long, value_enum, default_value_t = StubMode::Ok)]
    pub mode: StubMode,
    /// Delay applied in `slow` mode, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub delay_ms: u64,
    /// HTTP status returned in `error` mode
    #[arg(long, default_value_t = 500)]
    pub error_status: u16,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mode: StubMode::Ok,
            delay_ms: 30_000,
            error_status: 500,
        }
    }
}

// -----------------------------------------------------------------------------
// Core state & models
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
struct LogEntry {
    timestamp: String,
    level: String,
    message: String,
}

#[derive(Debug)]
struct SharedState {
    mode: RwLock<StubMode>,
    delay_ms: AtomicU64,
    error_status: AtomicU16,
    requests: AtomicU64,
    last_request: RwLock<Option<Value>>,
    last_authorization: RwLock<Option<String>>,
    logs: RwLock<Vec<LogEntry>>,
}

impl SharedState {
    fn new(args: &CliArgs) -> Self {
        Self {
            mode: RwLock::new(args.mode),
            delay_ms: AtomicU64::new(args.delay_ms),
            error_status: AtomicU16::new(args.error_status),
            requests: AtomicU64::new(0),
            last_request: RwLock::new(None),
            last_authorization: RwLock::new(None),
            logs: RwLock::new(Vec::new()),
        }
    }

    async fn log(&self, level: &str, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            message: message.into(),
        };
        let mut logs = self.logs.write().await;
        if logs.len() >= MAX_LOG_ENTRIES {
            logs.drain(0..100);
        }
        logs.push(entry);
    }
}

#[derive(Debug, Deserialize)]
struct ModeUpdate {
    mode: StubMode,
    #[serde(default)]
    delay_ms: Option<u64>,
    #[serde(default)]
    error_status: Option<u16>,
}

// -----------------------------------------------------------------------------
// Entry points
// -----------------------------------------------------------------------------

/// A running stub bound to a local address. The server stops when dropped.
#[derive(Debug)]
pub struct StubHandle {
    addr: SocketAddr,
    state: Arc<SharedState>,
    task: JoinHandle<()>,
}

impl StubHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL in the form the chatbot's LLM client expects (`.../v1`)
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of chat-completion requests received so far
    pub fn request_count(&self) -> u64 {
        self.state.requests.load(Ordering::Relaxed)
    }

    pub async fn set_mode(&self, mode: StubMode) {
        *self.state.mode.write().await = mode;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// JSON body of the most recent chat-completion request
    pub async fn last_request(&self) -> Option<Value> {
        self.state.last_request.read().await.clone()
    }

    /// `Authorization` header of the most recent chat-completion request
    pub async fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.read().await.clone()
    }
}

impl Drop for StubHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Bind and serve in a background task
pub async fn spawn_stub(args: CliArgs) -> std::io::Result<StubHandle> {
    let state = Arc::new(SharedState::new(&args));
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    let addr = listener.local_addr()?;

    tracing::info!(%addr, mode = ?args.mode, "llm-test-server listening");
    state
        .log("info", format!("listening on http://{} (mode={:?})", addr, args.mode))
        .await;

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "llm-test-server exited");
        }
    });

    Ok(StubHandle { addr, state, task })
}

/// Run until the process is stopped
pub async fn run_with_args(args: CliArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handle = spawn_stub(args).await?;
    println!(
        "[llm-test-server] point the chatbot at it with: --llm-provider custom --llm-base-url {}",
        handle.base_url()
    );
    tokio::signal::ctrl_c().await?;
    tracing::info!("llm-test-server shutting down");
    Ok(())
}

fn build_router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(completions_handler))
        .route("/chat/completions", post(completions_handler))
        .route("/api/status", get(status_handler))
        .route("/api/mode", post(mode_handler))
        .route("/api/logs", get(logs_handler))
        .with_state(state)
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

async fn completions_handler(
    AxumState(state): AxumState<Arc<SharedState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let count = state.requests.fetch_add(1, Ordering::Relaxed) + 1;
    let mode = *state.mode.read().await;
    let authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::debug!(count, ?mode, "chat completion requested");
    state
        .log("info", format!("request #{} (mode={:?})", count, mode))
        .await;

    let model = body["model"].as_str().unwrap_or("stub-model").to_string();
    let user_message = last_user_message(&body);
    *state.last_request.write().await = Some(body);
    *state.last_authorization.write().await = authorization;

    match mode {
        StubMode::Ok => {
            Json(completion_body(&model, &canned_answer(&user_message))).into_response()
        }
        StubMode::Slow => {
            let delay = state.delay_ms.load(Ordering::Relaxed);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Json(completion_body(&model, &canned_answer(&user_message))).into_response()
        }
        StubMode::Error => {
            let status = StatusCode::from_u16(state.error_status.load(Ordering::Relaxed))
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({
                    "error": {"message": "simulated provider failure", "type": "server_error"}
                })),
            )
                .into_response()
        }
        StubMode::Malformed => Json(json!({"unexpected": true})).into_response(),
        StubMode::Empty => Json(completion_body(&model, "")).into_response(),
    }
}

async fn status_handler(AxumState(state): AxumState<Arc<SharedState>>) -> Json<Value> {
    Json(json!({
        "mode": *state.mode.read().await,
        "delay_ms": state.delay_ms.load(Ordering::Relaxed),
        "error_status": state.error_status.load(Ordering::Relaxed),
        "requests": state.requests.load(Ordering::Relaxed),
        "last_request": state.last_request.read().await.clone(),
    }))
}

async fn mode_handler(
    AxumState(state): AxumState<Arc<SharedState>>,
    Json(update): Json<ModeUpdate>,
) -> Json<Value> {
    *state.mode.write().await = update.mode;
    if let Some(delay) = update.delay_ms {
        state.delay_ms.store(delay, Ordering::Relaxed);
    }
    if let Some(status) = update.error_status {
        state.error_status.store(status, Ordering::Relaxed);
    }
    state
        .log("info", format!("mode switched to {:?}", update.mode))
        .await;
    Json(json!({"status": "ok", "mode": update.mode}))
}

async fn logs_handler(AxumState(state): AxumState<Arc<SharedState>>) -> Json<Value> {
    let logs = state.logs.read().await.clone();
    Json(json!({"logs": logs}))
}

// -----------------------------------------------------------------------------
// Response helpers
// -----------------------------------------------------------------------------

fn last_user_message(body: &Value) -> String {
    body["messages"]
        .as_array()
        .and_then(|messages| messages.iter().rev().find(|m| m["role"] == "user"))
        .and_then(|m| m["content"].as_str())
        .unwrap_or("")
        .to_string()
}

fn canned_answer(user_message: &str) -> String {
    let echo: String = user_message.chars().take(ECHO_CHARS).collect();
    format!("{} {}", STUB_ANSWER_PREFIX, echo.trim())
}

fn completion_body(model: &str, content: &str) -> Value {
    json!({
        "id": format!("chatcmpl-stub-{}", Utc::now().timestamp_millis()),
        "object": "chat.completion",
        "created": Utc::now().timestamp(),
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral(mode: StubMode) -> CliArgs {
        CliArgs {
            port: 0,
            mode,
            ..CliArgs::default()
        }
    }

    fn chat_body() -> Value {
        json!({
            "model": "test-model",
            "messages": [
                {"role": "system", "content": "Responde solo con el contexto."},
                {"role": "user", "content": "Contexto: firma digital. Pregunta: ¿qué es?"}
            ]
        })
    }

    #[tokio::test]
    async fn ok_mode_returns_openai_shape() {
        let stub = spawn_stub(ephemeral(StubMode::Ok)).await.unwrap();
        let response = reqwest::Client::new()
            .post(format!("{}/chat/completions", stub.base_url()))
            .bearer_auth("secret")
            .json(&chat_body())
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        let body: Value = response.json().await.unwrap();
        let content = body["choices"][0]["message"]["content"].as_str().unwrap();
        assert!(content.starts_with(STUB_ANSWER_PREFIX));
        assert!(content.contains("firma digital"));
        assert_eq!(stub.request_count(), 1);
        assert_eq!(stub.last_authorization().await.as_deref(), Some("Bearer secret"));
        assert_eq!(stub.last_request().await.unwrap()["model"], "test-model");
    }

    #[tokio::test]
    async fn error_mode_uses_configured_status() {
        let mut args = ephemeral(StubMode::Error);
        args.error_status = 503;
        let stub = spawn_stub(args).await.unwrap();

        let response = reqwest::Client::new()
            .post(format!("{}/chat/completions", stub.base_url()))
            .json(&chat_body())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 503);
    }

    #[tokio::test]
    async fn mode_can_be_switched_at_runtime() {
        let stub = spawn_stub(ephemeral(StubMode::Ok)).await.unwrap();
        let client = reqwest::Client::new();

        let switched: Value = client
            .post(format!("http://{}/api/mode", stub.addr()))
            .json(&json!({"mode": "malformed"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(switched["mode"], "malformed");

        let body: Value = client
            .post(format!("{}/chat/completions", stub.base_url()))
            .json(&chat_body())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body.get("choices").is_none());

        let status: Value = client
            .get(format!("http://{}/api/status", stub.addr()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["requests"], 1);
    }

    #[test]
    fn canned_answer_truncates_echo() {
        let long = "a".repeat(ECHO_CHARS * 2);
        let answer = canned_answer(&long);
        assert_eq!(answer.len(), STUB_ANSWER_PREFIX.len() + 1 + ECHO_CHARS);
    }
}
