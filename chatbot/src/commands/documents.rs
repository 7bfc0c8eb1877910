//! Raw access to the manuals behind HTTP Basic Auth (`/documentos`).

use crate::app_state::AppState;
use crate::protocol::DocumentListing;
use crate::settings::ServerSettings;
use axum::extract::{Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use doc_extract::DocumentKind;

pub const DOCUMENTS_REALM: &str = "documentos";

/// Credentials required by the document endpoints
#[derive(Clone)]
pub struct DocCredentials {
    user: String,
    pass: String,
}

impl std::fmt::Debug for DocCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocCredentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

impl DocCredentials {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// `None` unless both user and password are configured and non-empty
    pub fn from_settings(server: &ServerSettings) -> Option<Self> {
        let user = server.doc_user.as_deref().filter(|u| !u.is_empty())?;
        let pass = server.doc_pass.as_deref().filter(|p| !p.is_empty())?;
        Some(Self::new(user, pass))
    }

    fn matches(&self, user: &str, pass: &str) -> bool {
        // Evaluate both comparisons so timing does not reveal which one failed
        let user_ok = constant_time_eq(self.user.as_bytes(), user.as_bytes());
        let pass_ok = constant_time_eq(self.pass.as_bytes(), pass.as_bytes());
        user_ok & pass_ok
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Decode an `Authorization: Basic ...` header value into (user, password)
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Middleware guarding every `/documentos` route
pub async fn require_doc_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(credentials) = &state.doc_credentials else {
        return (
            StatusCode::FORBIDDEN,
            "Document access is disabled: DOC_USER and DOC_PASS are not configured",
        )
            .into_response();
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_auth);

    match provided {
        Some((user, pass)) if credentials.matches(&user, &pass) => next.run(req).await,
        Some((user, _)) => {
            tracing::warn!(user = %user, path = %req.uri().path(), "Rejected document credentials");
            unauthorized()
        }
        None => unauthorized(),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            format!("Basic realm=\"{}\"", DOCUMENTS_REALM),
        )],
        "Authentication required",
    )
        .into_response()
}

/// `GET /documentos/`
pub async fn list_documents_handler(State(state): State<AppState>) -> Response {
    match state.composer.loader().list_document_files().await {
        Ok(documents) => Json(DocumentListing { documents }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list documents");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list documents").into_response()
        }
    }
}

/// `GET /documentos/*path`, where `path` is a name from the listing
pub async fn get_document_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let Some(path) = state.composer.loader().resolve_served_file(&name).await else {
        return (StatusCode::NOT_FOUND, "Document not found").into_response();
    };
    let content_type = DocumentKind::from_path(&path)
        .map(DocumentKind::content_type)
        .unwrap_or("application/octet-stream");
    let file_name = name.rsplit('/').next().unwrap_or(&name).replace('"', "");

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            tracing::info!(file = %name, bytes = bytes.len(), "Serving document");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"{}\"", file_name),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(file = %name, error = %e, "Failed to read document");
            (StatusCode::NOT_FOUND, "Document not found").into_response()
        }
    }
}
