//! Per-session conversation context.
//!
//! The only thing remembered between questions is the last topic (keyword
//! set + question), so "tell me more" can widen the previous search. Each
//! request works on a [`QueryContext`] snapshot; the handler commits it back
//! after the answer is composed, so the store's lock is never held across an
//! `.await`.

use crate::rag::KeywordSet;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Longest client-supplied session id accepted as-is
const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub last_keywords: Option<KeywordSet>,
    pub last_question: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The session state a single request reads and updates
#[derive(Debug, Clone)]
pub struct QueryContext {
    session_id: String,
    context: SessionContext,
    dirty: bool,
}

impl QueryContext {
    pub fn new(session_id: impl Into<String>, context: SessionContext) -> Self {
        Self {
            session_id: session_id.into(),
            context,
            dirty: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Keywords and question of the previous scored question, if any
    pub fn last_topic(&self) -> Option<(&KeywordSet, &str)> {
        let keywords = self.context.last_keywords.as_ref()?;
        let question = self.context.last_question.as_deref().unwrap_or("");
        Some((keywords, question))
    }

    pub fn remember(&mut self, keywords: &KeywordSet, question: &str) {
        self.context.last_keywords = Some(keywords.clone());
        self.context.last_question = Some(question.trim().to_string());
        self.context.updated_at = Some(Utc::now());
        self.dirty = true;
    }
}

/// Bounded map of session id → context; least recently used sessions are evicted
pub struct SessionStore {
    inner: Mutex<LruCache<String, SessionContext>>,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Start a request for `session_id`, or for a fresh session when it is
    /// missing, blank or oversized
    pub fn begin(&self, session_id: Option<&str>) -> QueryContext {
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_SESSION_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let snapshot = {
            let mut sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            sessions.get(&session_id).cloned().unwrap_or_default()
        };
        QueryContext::new(session_id, snapshot)
    }

    /// Store the request's context back; untouched contexts are not written
    pub fn commit(&self, query: QueryContext) {
        if !query.dirty {
            return;
        }
        let mut sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sessions.put(query.session_id, query.context);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
