//! Question keywords.
//!
//! Questions and passages go through the same tokenizer so that matching is
//! done on whole tokens: lowercase, accent-folded `\w+` runs. Keywords are the
//! question tokens that survive the length and stop-word filters.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref WORD_REGEX: Regex = Regex::new(r"\w+").unwrap();

    /// Spanish and English function words, already accent-folded
    static ref STOP_WORDS: HashSet<&'static str> = [
        // Spanish
        "que", "como", "cual", "cuales", "quien", "quienes", "donde", "cuando", "cuanto",
        "cuantos", "cuanta", "cuantas", "para", "por", "con", "sin", "sobre", "entre",
        "hasta", "desde", "hacia", "segun", "una", "uno", "unos", "unas", "los", "las",
        "del", "les", "mas", "menos", "pero", "porque", "pues", "este", "esta", "esto",
        "estos", "estas", "ese", "esa", "eso", "esos", "esas", "aquel", "aquella", "son",
        "ser", "estar", "estan", "hay", "tiene", "tienen", "tengo", "puedo",
        "puede", "pueden", "debo", "debe", "hacer", "hace", "sus", "mis", "tus", "nos",
        "muy", "tambien", "todo", "todos", "toda", "todas", "otro", "otra", "otros",
        "otras", "algo", "alguno", "alguna", "cada", "dime", "decir", "explica",
        "explicame", "quiero", "necesito", "saber", "podrias", "puedes", "favor",
        "gracias",
        // English
        "the", "and", "what", "how", "does", "did", "are", "was", "were", "for", "with", "this",
        "that", "these", "those", "can", "could", "you", "your", "about", "from",
        "which", "who", "whom", "when", "where", "why", "tell", "please", "into",
        "there", "their", "have", "has", "had", "will", "would", "should", "any",
        "some", "not", "but", "all", "know", "need", "want",
    ]
    .into_iter()
    .collect();

    static ref GREETING_WORDS: HashSet<&'static str> = [
        "hola", "buenas", "buenos", "buen", "dia", "dias", "tardes", "noches", "hello",
        "hi", "hey", "saludos", "que", "tal",
    ]
    .into_iter()
    .collect();

    /// Greetings must contain at least one of these (so "que tal" alone is not one)
    static ref GREETING_CORE_WORDS: HashSet<&'static str> = [
        "hola", "buenas", "buenos", "buen", "hello", "hi", "hey", "saludos",
    ]
    .into_iter()
    .collect();

    /// "Tell me more" phrasings, as normalized token sequences
    static ref FOLLOW_UP_PHRASES: HashSet<&'static str> = [
        "mas", "dime mas", "cuentame mas", "mas informacion", "mas info", "mas detalles",
        "continua", "continuar", "sigue", "amplia", "ampliar", "tell me more", "more",
        "more info", "go on",
    ]
    .into_iter()
    .collect();
}

/// Lowercase and fold Spanish/Latin accents (`á→a`, `ñ→n`, `ü→u`)
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Normalized word tokens of `text`, in order
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD_REGEX
        .find_iter(text)
        .map(|m| normalize_token(m.as_str()))
}

/// Distinct normalized tokens of `text`
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).collect()
}

/// Ordered, de-duplicated keywords of a question
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    tokens: Vec<String>,
}

impl KeywordSet {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }
}

/// Filters applied when turning a question into keywords
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    min_len: usize,
    extra_stop_words: HashSet<String>,
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(3, &[])
    }
}

impl KeywordFilter {
    pub fn new(min_len: usize, extra_stop_words: &[String]) -> Self {
        Self {
            min_len,
            extra_stop_words: extra_stop_words
                .iter()
                .map(|w| normalize_token(w.trim()))
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    fn keeps(&self, token: &str) -> bool {
        token.chars().count() >= self.min_len
            && !STOP_WORDS.contains(token)
            && !self.extra_stop_words.contains(token)
    }
}

/// Extract the keyword set of a question
pub fn extract_keywords(question: &str, filter: &KeywordFilter) -> KeywordSet {
    let mut seen = HashSet::new();
    let tokens = tokenize(question)
        .filter(|t| filter.keeps(t))
        .filter(|t| seen.insert(t.clone()))
        .collect();
    KeywordSet { tokens }
}

/// True when the question is only a greeting ("hola", "buenos días", "hey")
pub fn is_greeting(question: &str) -> bool {
    let tokens: Vec<String> = tokenize(question).collect();
    !tokens.is_empty()
        && tokens.iter().all(|t| GREETING_WORDS.contains(t.as_str()))
        && tokens.iter().any(|t| GREETING_CORE_WORDS.contains(t.as_str()))
}

/// True when the question asks to expand on the previous answer
pub fn is_follow_up(question: &str) -> bool {
    let phrase = tokenize(question).collect::<Vec<_>>().join(" ");
    !phrase.is_empty() && FOLLOW_UP_PHRASES.contains(phrase.as_str())
}
