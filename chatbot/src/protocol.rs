use serde::{Deserialize, Serialize};

// ============ HTTP API ============

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    /// Missing prompts are treated as empty questions, not as bad requests
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response envelope of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatEnvelope {
    pub fn ok(response: String, session_id: String) -> Self {
        Self {
            success: true,
            response: Some(response),
            error: None,
            session_id: Some(session_id),
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error),
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub documents_dir: String,
    pub llm_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListing {
    pub documents: Vec<String>,
}

// ============ Model API ============

/// One message of an OpenAI-compatible chat-completions request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}
