//! Response composition.
//!
//! This module handles:
//! - Routing a question (greeting, follow-up, keyword search)
//! - Local rendering of ranked passages (plain text or HTML)
//! - Asking the hosted model, with silent fallback to the local rendering
//! - Topic-route hints appended to answers

use crate::llm::LlmClient;
use crate::rag::keywords::{token_set, tokenize};
use crate::rag::{
    extract_keywords, is_follow_up, is_greeting, score_passages, DocumentLoader, KeywordFilter,
    KeywordSet, LoadError, ScoreOutcome, ScoredPassage, ScoringOptions, Segmenter,
};
use crate::session::QueryContext;
use crate::settings::{AppSettings, ResponseFormat, RetrievalSettings, TopicRoute};
use crate::system_prompt::{build_user_prompt, format_document_context, SYSTEM_PROMPT};

// ============ Canned Messages ============

pub const EMPTY_QUESTION_MESSAGE: &str = "Por favor, escribe una pregunta.";

pub const INVALID_REQUEST_MESSAGE: &str =
    "Solicitud inválida: envía un JSON con el campo \"prompt\" como texto.";

pub const CLARIFY_MESSAGE: &str = "¿Podrías ser más específico? Incluye alguna palabra clave \
sobre lo que buscas, por ejemplo el nombre del trámite o del módulo.";

pub const FOLLOW_UP_WITHOUT_TOPIC_MESSAGE: &str =
    "No tengo un tema anterior sobre el cual ampliar. ¿Sobre qué te gustaría saber más?";

pub const NO_DOCUMENTS_MESSAGE: &str = "No hay documentos cargados. Agrega archivos PDF o DOCX \
a la carpeta de documentos e inténtalo de nuevo.";

pub const NO_MATCHES_MESSAGE: &str = "No encontré información sobre eso en la documentación \
disponible. Intenta reformular la pregunta con otras palabras.";

pub const GENERIC_ERROR_MESSAGE: &str =
    "Ocurrió un error al procesar tu pregunta. Inténtalo nuevamente.";

const LOCAL_ANSWER_HEADER: &str = "Encontré esta información en la documentación:";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("empty question")]
    EmptyQuestion,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Text for the error envelope; internal causes are only shown in debug mode
    pub fn user_message(&self, debug: bool) -> String {
        match self {
            ChatError::EmptyQuestion => EMPTY_QUESTION_MESSAGE.to_string(),
            other if debug => format!("{} ({})", GENERIC_ERROR_MESSAGE, other),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Which path produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOrigin {
    Greeting,
    Clarify,
    NoDocuments,
    NoMatches,
    /// Passages rendered locally (no model configured)
    Local,
    /// Written by the hosted model
    Generated,
    /// Passages rendered locally after the model call failed
    Fallback,
}

impl AnswerOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOrigin::Greeting => "greeting",
            AnswerOrigin::Clarify => "clarify",
            AnswerOrigin::NoDocuments => "no_documents",
            AnswerOrigin::NoMatches => "no_matches",
            AnswerOrigin::Local => "local",
            AnswerOrigin::Generated => "generated",
            AnswerOrigin::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedAnswer {
    pub text: String,
    pub origin: AnswerOrigin,
}

impl ComposedAnswer {
    fn new(text: impl Into<String>, origin: AnswerOrigin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }
}

/// Topic route with its keywords pre-tokenized
#[derive(Debug, Clone)]
struct CompiledRoute {
    /// Each keyword as a token sequence; all tokens must appear in the question
    keywords: Vec<Vec<String>>,
    hint: String,
}

impl CompiledRoute {
    fn compile(route: &TopicRoute) -> Self {
        let hint = match route.contact.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(contact) => format!("Para más ayuda, contacte a: {} ({})", route.team, contact),
            None => format!("Para más ayuda, contacte a: {}", route.team),
        };
        Self {
            keywords: route
                .keywords
                .iter()
                .map(|k| tokenize(k).collect::<Vec<_>>())
                .filter(|tokens| !tokens.is_empty())
                .collect(),
            hint,
        }
    }
}

/// Turns questions into answers; shared by all requests
pub struct Composer {
    loader: DocumentLoader,
    segmenter: Segmenter,
    keyword_filter: KeywordFilter,
    retrieval: RetrievalSettings,
    response_format: ResponseFormat,
    routes: Vec<CompiledRoute>,
    llm: Option<LlmClient>,
    max_context_chars: usize,
}

impl Composer {
    pub fn new(settings: &AppSettings, loader: DocumentLoader, llm: Option<LlmClient>) -> Self {
        let retrieval = settings.retrieval.clone();
        Self {
            loader,
            segmenter: Segmenter::new(retrieval.segment_policy, retrieval.min_passage_chars),
            keyword_filter: KeywordFilter::new(
                retrieval.min_keyword_len,
                &retrieval.extra_stop_words,
            ),
            retrieval,
            response_format: settings.response_format,
            routes: settings.topic_routes.iter().map(CompiledRoute::compile).collect(),
            llm,
            max_context_chars: settings.llm.max_context_chars,
        }
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.is_some()
    }

    pub fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    /// Answer one question, reading and updating the session's last topic
    pub async fn answer(
        &self,
        question: &str,
        ctx: &mut QueryContext,
    ) -> Result<ComposedAnswer, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        if is_greeting(question) {
            let count = self.loader.count_documents().await?;
            return Ok(ComposedAnswer::new(greeting_message(count), AnswerOrigin::Greeting));
        }

        if is_follow_up(question) {
            let Some((keywords, previous)) = ctx
                .last_topic()
                .map(|(k, q)| (k.clone(), q.to_string()))
            else {
                return Ok(ComposedAnswer::new(
                    FOLLOW_UP_WITHOUT_TOPIC_MESSAGE,
                    AnswerOrigin::Clarify,
                ));
            };
            tracing::debug!(
                session = ctx.session_id(),
                topic = %previous,
                "Expanding previous topic"
            );
            let model_question = format!("{}\n\nAmplía la respuesta con más detalle.", previous);
            return self
                .retrieve(&model_question, &previous, &keywords, true, ctx)
                .await;
        }

        let keywords = extract_keywords(question, &self.keyword_filter);
        if keywords.is_empty() {
            return Ok(ComposedAnswer::new(CLARIFY_MESSAGE, AnswerOrigin::Clarify));
        }

        self.retrieve(question, question, &keywords, false, ctx).await
    }

    async fn retrieve(
        &self,
        model_question: &str,
        topic_question: &str,
        keywords: &KeywordSet,
        wide: bool,
        ctx: &mut QueryContext,
    ) -> Result<ComposedAnswer, ChatError> {
        let report = self.loader.load().await?;
        if report.is_empty() {
            return Ok(ComposedAnswer::new(NO_DOCUMENTS_MESSAGE, AnswerOrigin::NoDocuments));
        }

        let top_k = if wide {
            self.retrieval.follow_up_top_k
        } else {
            self.retrieval.top_k
        };
        let options = ScoringOptions::from_settings(&self.retrieval, top_k);
        let passages = report
            .documents
            .iter()
            .flat_map(|doc| self.segmenter.passages(&doc.name, &doc.text));

        let ranked = match score_passages(keywords, passages, &options) {
            ScoreOutcome::NeedsMoreDetail => {
                return Ok(ComposedAnswer::new(CLARIFY_MESSAGE, AnswerOrigin::Clarify))
            }
            ScoreOutcome::Ranked(ranked) => ranked,
        };

        tracing::debug!(
            keywords = ?keywords.as_slice(),
            matches = ranked.len(),
            best = ranked.first().map(|p| p.score).unwrap_or(0.0),
            "Passages scored"
        );

        if ranked.is_empty() {
            return Ok(ComposedAnswer::new(NO_MATCHES_MESSAGE, AnswerOrigin::NoMatches));
        }

        ctx.remember(keywords, topic_question);
        let hint = self.route_hint(topic_question);
        let excerpt_chars = if wide {
            self.retrieval.max_excerpt_chars.saturating_mul(2)
        } else {
            self.retrieval.max_excerpt_chars
        };

        let Some(llm) = &self.llm else {
            let text = render_local(&ranked, self.response_format, excerpt_chars);
            return Ok(ComposedAnswer::new(
                append_hint(text, hint, self.response_format),
                AnswerOrigin::Local,
            ));
        };

        let context = format_document_context(&ranked, self.max_context_chars);
        let prompt = build_user_prompt(model_question, &context);
        let (text, origin) = match llm.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(generated) => (
                render_generated(&generated, self.response_format),
                AnswerOrigin::Generated,
            ),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    model = llm.model(),
                    "LLM request failed, answering from documents"
                );
                (
                    render_local(&ranked, self.response_format, excerpt_chars),
                    AnswerOrigin::Fallback,
                )
            }
        };
        Ok(ComposedAnswer::new(append_hint(text, hint, self.response_format), origin))
    }

    /// Hint of the first route whose keyword appears in the question
    fn route_hint(&self, question: &str) -> Option<&str> {
        if self.routes.is_empty() {
            return None;
        }
        let tokens = token_set(question);
        self.routes
            .iter()
            .find(|route| {
                route
                    .keywords
                    .iter()
                    .any(|parts| parts.iter().all(|p| tokens.contains(p)))
            })
            .map(|route| route.hint.as_str())
    }
}

fn greeting_message(document_count: usize) -> String {
    let (noun, adjective) = if document_count == 1 {
        ("documento", "disponible")
    } else {
        ("documentos", "disponibles")
    };
    format!(
        "¡Hola! Soy el asistente de la documentación. Tengo {} {} {} para consultar. \
        ¿En qué te puedo ayudar?",
        document_count, noun, adjective
    )
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`
pub fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn html_paragraph_body(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

/// Render ranked passages with their source names
pub fn render_local(
    passages: &[ScoredPassage],
    format: ResponseFormat,
    excerpt_chars: usize,
) -> String {
    match format {
        ResponseFormat::Plain => {
            let mut out = String::from(LOCAL_ANSWER_HEADER);
            for passage in passages {
                out.push_str(&format!(
                    "\n\n📄 {}\n{}",
                    passage.source,
                    truncate_excerpt(&passage.text, excerpt_chars)
                ));
            }
            out
        }
        ResponseFormat::Html => {
            let mut out = format!("<p>{}</p>", LOCAL_ANSWER_HEADER);
            for passage in passages {
                out.push_str(&format!(
                    "<p><b>📄 {}</b><br>{}</p>",
                    escape_html(&passage.source),
                    html_paragraph_body(&truncate_excerpt(&passage.text, excerpt_chars))
                ));
            }
            out
        }
    }
}

fn render_generated(text: &str, format: ResponseFormat) -> String {
    match format {
        ResponseFormat::Plain => text.to_string(),
        ResponseFormat::Html => format!("<p>{}</p>", html_paragraph_body(text)),
    }
}

fn append_hint(mut text: String, hint: Option<&str>, format: ResponseFormat) -> String {
    if let Some(hint) = hint {
        match format {
            ResponseFormat::Plain => {
                text.push_str("\n\n");
                text.push_str(hint);
            }
            ResponseFormat::Html => {
                text.push_str(&format!("<p><i>{}</i></p>", escape_html(hint)));
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::DocumentLoader;
    use crate::session::{SessionContext, SessionStore};

    fn composer_for(dir: &std::path::Path, settings: &AppSettings) -> Composer {
        Composer::new(settings, DocumentLoader::new(dir, None), None)
    }

    fn write(dir: &std::path::Path, name: &str, text: &str) {
        std::fs::write(dir.join(name), text).unwrap();
    }

    fn ctx() -> QueryContext {
        QueryContext::new("test", SessionContext::default())
    }

    #[tokio::test]
    async fn test_empty_question_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer_for(dir.path(), &AppSettings::default());
        let err = composer.answer("   ", &mut ctx()).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyQuestion));
        assert_eq!(err.user_message(false), EMPTY_QUESTION_MESSAGE);
    }

    #[tokio::test]
    async fn test_greeting_counts_documents() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "Texto de ejemplo suficientemente largo.");
        let composer = composer_for(dir.path(), &AppSettings::default());

        let answer = composer.answer("Hola", &mut ctx()).await.unwrap();
        assert_eq!(answer.origin, AnswerOrigin::Greeting);
        assert!(answer.text.contains("1 documento disponible"));
    }

    #[tokio::test]
    async fn test_stop_word_question_asks_for_detail() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer_for(dir.path(), &AppSettings::default());
        let answer = composer.answer("¿qué es?", &mut ctx()).await.unwrap();
        assert_eq!(answer.origin, AnswerOrigin::Clarify);
        assert_eq!(answer.text, CLARIFY_MESSAGE);
    }

    #[tokio::test]
    async fn test_no_documents_and_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let composer = composer_for(dir.path(), &AppSettings::default());
        let answer = composer.answer("firma digital", &mut ctx()).await.unwrap();
        assert_eq!(answer.origin, AnswerOrigin::NoDocuments);

        write(dir.path(), "a.txt", "El expediente se crea desde el escritorio.");
        let answer = composer.answer("firma digital", &mut ctx()).await.unwrap();
        assert_eq!(answer.origin, AnswerOrigin::NoMatches);
        assert_eq!(answer.text, NO_MATCHES_MESSAGE);
    }

    #[tokio::test]
    async fn test_local_answer_and_follow_up() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "manual.txt",
            "La firma digital tiene validez legal.\n\nEl expediente se crea desde el escritorio.",
        );
        let composer = composer_for(dir.path(), &AppSettings::default());
        let store = SessionStore::new(8);

        let mut first = store.begin(Some("s1"));
        let answer = composer.answer("¿Qué es la firma digital?", &mut first).await.unwrap();
        assert_eq!(answer.origin, AnswerOrigin::Local);
        assert!(answer.text.contains("📄 manual.txt"));
        assert!(answer.text.contains("La firma digital tiene validez legal."));
        assert!(!answer.text.contains("expediente"));
        store.commit(first);

        let mut second = store.begin(Some("s1"));
        let more = composer.answer("dime más", &mut second).await.unwrap();
        assert_eq!(more.origin, AnswerOrigin::Local);
        assert!(more.text.contains("La firma digital tiene validez legal."));

        let mut other = store.begin(Some("s2"));
        let orphan = composer.answer("dime más", &mut other).await.unwrap();
        assert_eq!(orphan.text, FOLLOW_UP_WITHOUT_TOPIC_MESSAGE);
    }

    #[tokio::test]
    async fn test_topic_route_hint() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "La firma digital tiene validez legal.");
        let mut settings = AppSettings::default();
        settings.topic_routes = vec![TopicRoute {
            keywords: vec!["Firma Digital".to_string()],
            team: "Mesa de Ayuda".to_string(),
            contact: Some("interno 123".to_string()),
        }];
        let composer = composer_for(dir.path(), &settings);

        let answer = composer.answer("firma digital", &mut ctx()).await.unwrap();
        assert!(answer
            .text
            .ends_with("Para más ayuda, contacte a: Mesa de Ayuda (interno 123)"));

        let answer = composer.answer("validez legal", &mut ctx()).await.unwrap();
        assert!(!answer.text.contains("Mesa de Ayuda"));
    }

    #[test]
    fn test_render_local_html_escapes() {
        let passages = vec![ScoredPassage {
            source: "a<b>.txt".to_string(),
            text: "Usar <script> & \"comillas\"\nsegunda línea".to_string(),
            score: 1.0,
            matched: vec![],
        }];
        let html = render_local(&passages, ResponseFormat::Html, 600);
        assert!(html.contains("<b>📄 a&lt;b&gt;.txt</b>"));
        assert!(html.contains("Usar &lt;script&gt; &amp; &quot;comillas&quot;<br>segunda línea"));
    }

    #[test]
    fn test_truncate_excerpt_is_char_safe() {
        assert_eq!(truncate_excerpt("ñandú", 10), "ñandú");
        assert_eq!(truncate_excerpt("ñandú ñandú", 6), "ñandú...");
        assert_eq!(truncate_excerpt("áéíóú", 3), "áéí...");
    }

    #[test]
    fn test_debug_error_message() {
        let err = ChatError::Internal("boom".to_string());
        assert_eq!(err.user_message(false), GENERIC_ERROR_MESSAGE);
        assert!(err.user_message(true).contains("boom"));
    }
}
