//! Browser chat page.

use crate::app_state::AppState;
use crate::settings::ResponseFormat;
use axum::extract::State;
use axum::response::Html;

pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let format = match state.settings.response_format {
        ResponseFormat::Plain => "plain",
        ResponseFormat::Html => "html",
    };
    Html(INDEX_HTML.replace("__RESPONSE_FORMAT__", format))
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="es">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Asistente de documentación</title>
  <style>
    body { font-family: Arial, sans-serif; max-width: 640px; margin: 0 auto; padding: 20px; }
    .chat-container { background: #f5f5f5; padding: 20px; border-radius: 10px; }
    #chat-messages { max-height: 70vh; overflow-y: auto; }
    .message { margin: 10px 0; padding: 10px; border-radius: 5px; }
    .user-message { background: #007bff; color: white; text-align: right; }
    .bot-message { background: white; white-space: pre-wrap; }
    .bot-message.html { white-space: normal; }
    .bot-message.error { color: #b00020; }
    form { display: flex; gap: 8px; }
    input { flex: 1; padding: 8px; }
    button { padding: 8px 15px; background: #007bff; color: white; border: none; border-radius: 5px; }
    button:disabled { opacity: 0.6; }
  </style>
</head>
<body>
  <div class="chat-container">
    <h2>🤖 Asistente de documentación</h2>
    <div id="chat-messages">
      <div class="message bot-message">¡Hola! Pregúntame sobre los manuales disponibles.</div>
    </div>
    <form id="chat-form">
      <input type="text" id="user-input" placeholder="Escribe tu pregunta..." autocomplete="off" />
      <button type="submit" id="send">Enviar</button>
    </form>
  </div>

  <script>
    const responseFormat = "__RESPONSE_FORMAT__";
    const chat = document.getElementById('chat-messages');
    const input = document.getElementById('user-input');
    const button = document.getElementById('send');
    let sessionId = sessionStorage.getItem('chatbot-session') || null;

    function addMessage(text, classes, asHtml) {
      const div = document.createElement('div');
      div.className = 'message ' + classes;
      if (asHtml) {
        div.innerHTML = text;
      } else {
        div.textContent = text;
      }
      chat.appendChild(div);
      chat.scrollTop = chat.scrollHeight;
    }

    async function sendMessage(event) {
      event.preventDefault();
      const message = input.value.trim();
      if (!message) return;

      addMessage(message, 'user-message', false);
      input.value = '';
      button.disabled = true;

      try {
        const res = await fetch('/api/chat', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ prompt: message, session_id: sessionId })
        });
        const data = await res.json();
        if (data.success) {
          sessionId = data.session_id;
          sessionStorage.setItem('chatbot-session', sessionId);
          const asHtml = responseFormat === 'html';
          addMessage(data.response, 'bot-message' + (asHtml ? ' html' : ''), asHtml);
        } else {
          addMessage('❌ Error: ' + data.error, 'bot-message error', false);
        }
      } catch (err) {
        addMessage('❌ Error: ' + err, 'bot-message error', false);
      } finally {
        button.disabled = false;
        input.focus();
      }
    }

    document.getElementById('chat-form').addEventListener('submit', sendMessage);
  </script>
</body>
</html>
"#;
