//! Shared application state.
//!
//! Everything a handler needs, cheap to clone per request: immutable settings,
//! the composer (which owns the loader and the optional model client), the
//! session store and the document-endpoint credentials.

use crate::commands::documents::DocCredentials;
use crate::composer::Composer;
use crate::llm::{LlmClient, LlmError};
use crate::rag::{DocumentLoader, TextCache};
use crate::session::SessionStore;
use crate::settings::AppSettings;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub composer: Arc<Composer>,
    pub sessions: Arc<SessionStore>,
    pub doc_credentials: Option<DocCredentials>,
}

impl AppState {
    pub fn from_settings(settings: AppSettings) -> Result<Self, LlmError> {
        let cache = settings
            .retrieval
            .cache_enabled
            .then(|| TextCache::new(&settings.server.cache_dir));
        let loader = DocumentLoader::new(&settings.server.documents_dir, cache);
        let llm = LlmClient::from_settings(&settings.llm)?;
        let composer = Composer::new(&settings, loader, llm);
        let sessions = SessionStore::new(settings.server.session_capacity);
        let doc_credentials = DocCredentials::from_settings(&settings.server);

        if doc_credentials.is_none() {
            let server = &settings.server;
            let user_set = server.doc_user.as_deref().is_some_and(|u| !u.is_empty());
            let pass_set = server.doc_pass.as_deref().is_some_and(|p| !p.is_empty());
            if user_set != pass_set {
                tracing::warn!(
                    user_set,
                    pass_set,
                    "Only one of DOC_USER/DOC_PASS is set, /documentos endpoints are disabled"
                );
            } else {
                tracing::info!("DOC_USER/DOC_PASS not set, /documentos endpoints are disabled");
            }
        }

        Ok(Self {
            settings: Arc::new(settings),
            composer: Arc::new(composer),
            sessions: Arc::new(sessions),
            doc_credentials,
        })
    }
}
