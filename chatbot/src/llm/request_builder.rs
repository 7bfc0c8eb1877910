//! Request body construction for OpenAI-compatible chat-completions calls.
//!
//! This module handles:
//! - Building the non-streaming request body
//! - Pulling the answer text out of the response body

use crate::protocol::ChatMessage;
use serde_json::{json, Value};

/// Build a chat request body
pub fn build_chat_request_body(
    model: &str,
    messages: &[ChatMessage],
    temperature: f32,
    max_tokens: u32,
) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
        "max_tokens": max_tokens,
        "stream": false,
    })
}

/// `choices[0].message.content`, if present and a string
pub fn extract_completion_text(body: &Value) -> Option<&str> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_chat_request_body() {
        let messages = vec![
            ChatMessage::system("Responde solo con el texto."),
            ChatMessage::user("¿Qué es la firma digital?"),
        ];
        let body = build_chat_request_body("llama-3.1-8b-instant", &messages, 0.2, 1024);

        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "¿Qué es la firma digital?");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_extract_completion_text() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "Respuesta"}}]});
        assert_eq!(extract_completion_text(&body), Some("Respuesta"));

        assert_eq!(extract_completion_text(&json!({"choices": []})), None);
        assert_eq!(
            extract_completion_text(&json!({"choices": [{"message": {"content": null}}]})),
            None
        );
        assert_eq!(extract_completion_text(&json!({"error": "x"})), None);
    }
}
