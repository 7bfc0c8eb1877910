//! End-to-end tests against the assembled router.
//!
//! Requests go through `tower::ServiceExt::oneshot`, documents live in a
//! temporary directory and the hosted model is replaced by `llm-test-server`.


use crate::app_state::AppState;
use crate::server::build_router;
use crate::settings::{AppSettings, LlmProvider};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

/// A router over its own scratch documents/cache directories
pub struct TestApp {
    pub router: Router,
    pub documents_dir: PathBuf,
    _root: TempDir,
}

impl TestApp {
    /// Settings with scratch directories and no model configured
    pub fn settings(root: &Path) -> AppSettings {
        let mut settings = AppSettings::default();
        settings.server.documents_dir = root.join("documents");
        settings.server.cache_dir = root.join("processed_data");
        settings
    }

    pub fn new() -> Self {
        Self::with(|_| {})
    }

    /// Build the app after letting the caller tweak the scratch settings
    pub fn with(configure: impl FnOnce(&mut AppSettings)) -> Self {
        let root = tempfile::tempdir().unwrap();
        let mut settings = Self::settings(root.path());
        configure(&mut settings);
        settings.validate().unwrap();
        let documents_dir = settings.server.documents_dir.clone();
        let state = AppState::from_settings(settings).unwrap();
        Self {
            router: build_router(state),
            documents_dir,
            _root: root,
        }
    }

    pub fn add_text(&self, name: &str, text: &str) {
        std::fs::create_dir_all(&self.documents_dir).unwrap();
        std::fs::write(self.documents_dir.join(name), text).unwrap();
    }

    pub fn add_bytes(&self, name: &str, bytes: &[u8]) {
        std::fs::create_dir_all(&self.documents_dir).unwrap();
        std::fs::write(self.documents_dir.join(name), bytes).unwrap();
    }

    pub fn add_docx(&self, name: &str, paragraphs: &[&str]) {
        std::fs::create_dir_all(&self.documents_dir).unwrap();
        write_docx(&self.documents_dir.join(name), paragraphs);
    }

    pub async fn chat(&self, body: Value) -> (StatusCode, Value) {
        self.chat_raw(body.to_string(), "application/json").await
    }

    /// POST an arbitrary body; the response must still be a JSON envelope
    pub async fn chat_raw(&self, body: impl Into<Body>, content_type: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Chat and return the answer text, asserting success
    pub async fn ask(&self, prompt: &str, session_id: Option<&str>) -> (String, String) {
        let mut body = serde_json::json!({ "prompt": prompt });
        if let Some(id) = session_id {
            body["session_id"] = Value::String(id.to_string());
        }
        let (status, envelope) = self.chat(body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope["success"], true, "unexpected envelope: {}", envelope);
        (
            envelope["response"].as_str().unwrap().to_string(),
            envelope["session_id"].as_str().unwrap().to_string(),
        )
    }

    pub async fn get(&self, uri: &str, authorization: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

/// Point the model settings at a stub server
pub fn use_stub(settings: &mut AppSettings, base_url: String) {
    settings.llm.provider = LlmProvider::Custom;
    settings.llm.base_url = Some(base_url);
    settings.llm.timeout_secs = 1;
}

/// Minimal DOCX: a zip holding `word/document.xml` with one `<w:p>` per paragraph
pub fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<w:document><w:body>{}</w:body></w:document>",
        body
    );

    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("word/document.xml", zip::write::FileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
