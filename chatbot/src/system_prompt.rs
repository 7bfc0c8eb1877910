//! Prompt content sent to the hosted model.
//!
//! The model only ever sees the passages the scorer selected; the instruction
//! is to answer from them and to say so when the answer is not there.

use crate::rag::ScoredPassage;

// ============ Grounding Constants ============

pub const SYSTEM_PROMPT: &str = "\
Eres un asistente que responde preguntas sobre la documentación interna de la organización.
- Responde solamente usando el texto de los documentos proporcionados.
- Si la respuesta no está en ese texto, dilo claramente y no inventes información.
- Responde en el mismo idioma de la pregunta, de forma breve y directa.
- Cuando sea útil, menciona el nombre del documento de donde sale la información.";

/// Placeholder used when no passage fits the context budget
const NO_CONTEXT: &str = "No hay fragmentos de documentos disponibles.";

/// Format ranked passages as prompt context, keeping at most `max_chars` characters
/// of passage text. A passage that does not fit is cut, and later ones are dropped.
pub fn format_document_context(passages: &[ScoredPassage], max_chars: usize) -> String {
    let mut budget = max_chars;
    let mut sections = Vec::new();

    for passage in passages {
        if budget == 0 {
            break;
        }
        let len = passage.text.chars().count();
        let body = if len <= budget {
            budget -= len;
            passage.text.clone()
        } else {
            let cut: String = passage.text.chars().take(budget).collect();
            budget = 0;
            format!("{}...", cut)
        };
        sections.push(format!(
            "### {} (relevancia: {:.2})\n\n{}",
            passage.source, passage.score, body
        ));
    }

    if sections.is_empty() {
        return NO_CONTEXT.to_string();
    }
    sections.join("\n\n")
}

/// Build the user turn: the document context followed by the question
pub fn build_user_prompt(question: &str, context: &str) -> String {
    format!(
        "## Texto de los documentos\n\n\
        {}\n\n\
        ## Pregunta\n\n\
        {}\n\n\
        Responde solamente usando el texto anterior. Si la respuesta no está presente, dilo.",
        context,
        question.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(source: &str, text: &str, score: f32) -> ScoredPassage {
        ScoredPassage {
            source: source.to_string(),
            text: text.to_string(),
            score,
            matched: Vec::new(),
        }
    }

    #[test]
    fn test_format_document_context_includes_sources() {
        let passages = vec![
            scored("manual.docx", "La firma digital tiene validez legal.", 2.5),
            scored("guia.pdf", "El expediente se crea desde el escritorio.", 1.0),
        ];
        let context = format_document_context(&passages, 6000);
        assert!(context.contains("### manual.docx (relevancia: 2.50)"));
        assert!(context.contains("El expediente se crea desde el escritorio."));
    }

    #[test]
    fn test_format_document_context_respects_budget() {
        let passages = vec![
            scored("a.txt", &"a".repeat(80), 1.0),
            scored("b.txt", &"b".repeat(80), 1.0),
            scored("c.txt", &"c".repeat(80), 1.0),
        ];
        let context = format_document_context(&passages, 100);
        assert!(context.contains(&"a".repeat(80)));
        assert!(context.contains(&format!("{}...", "b".repeat(20))));
        assert!(!context.contains("c.txt"));
    }

    #[test]
    fn test_format_document_context_empty() {
        assert_eq!(format_document_context(&[], 100), NO_CONTEXT);
    }

    #[test]
    fn test_build_user_prompt() {
        let prompt = build_user_prompt("  ¿Qué es la firma digital?  ", "contexto");
        assert!(prompt.contains("contexto\n\n## Pregunta\n\n¿Qué es la firma digital?\n\n"));
        assert!(prompt.ends_with("Si la respuesta no está presente, dilo."));
    }
}
