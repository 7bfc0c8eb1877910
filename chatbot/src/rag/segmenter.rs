//! Passage segmentation.
//!
//! This module handles:
//! - Paragraph blocks (blank-line separated) with sentence/word splitting for long blocks
//! - Sentence grouping up to a soft target size
//! - Fixed-size windows cut at whitespace
//!
//! Passages borrow from the document text: every passage is an exact,
//! trimmed sub-slice of the source, passages never overlap and they come out
//! in source order. Iteration is lazy, one block at a time.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default upper bound for a paragraph passage
pub const DEFAULT_PARAGRAPH_MAX_CHARS: usize = 800;

/// Default soft target for sentence groups (hard limit is twice this)
pub const DEFAULT_SENTENCE_TARGET_CHARS: usize = 400;

/// Fixed windows are clamped to this range
pub const MIN_WINDOW_CHARS: usize = 200;
pub const MAX_WINDOW_CHARS: usize = 800;

/// Passages shorter than this are dropped as noise (page numbers, stray headers)
pub const DEFAULT_MIN_PASSAGE_CHARS: usize = 20;

lazy_static! {
    static ref BLANK_LINE_REGEX: Regex = Regex::new(r"\n\s*\n").unwrap();
}

/// How documents are cut into passages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentPolicy {
    Paragraphs {
        #[serde(default = "default_paragraph_max_chars")]
        max_chars: usize,
    },
    Sentences {
        #[serde(default = "default_sentence_target_chars")]
        target_chars: usize,
    },
    FixedWindow {
        #[serde(default = "default_window_chars")]
        chars: usize,
    },
}

fn default_paragraph_max_chars() -> usize {
    DEFAULT_PARAGRAPH_MAX_CHARS
}

fn default_sentence_target_chars() -> usize {
    DEFAULT_SENTENCE_TARGET_CHARS
}

fn default_window_chars() -> usize {
    MAX_WINDOW_CHARS / 2
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        SegmentPolicy::Paragraphs {
            max_chars: DEFAULT_PARAGRAPH_MAX_CHARS,
        }
    }
}

impl SegmentPolicy {
    pub fn check(&self) -> Result<(), String> {
        match *self {
            SegmentPolicy::Paragraphs { max_chars: 0 } => {
                Err("paragraph max_chars must be at least 1".to_string())
            }
            SegmentPolicy::Sentences { target_chars: 0 } => {
                Err("sentence target_chars must be at least 1".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A borrowed fragment of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Passage<'a> {
    /// Document name the passage came from
    pub source: &'a str,
    pub text: &'a str,
    /// Byte offset of `text` inside the document text
    pub offset: usize,
}

impl Passage<'_> {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segmenter {
    policy: SegmentPolicy,
    min_chars: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmentPolicy::default(), DEFAULT_MIN_PASSAGE_CHARS)
    }
}

impl Segmenter {
    pub fn new(policy: SegmentPolicy, min_chars: usize) -> Self {
        let policy = match policy {
            SegmentPolicy::FixedWindow { chars } => SegmentPolicy::FixedWindow {
                chars: chars.clamp(MIN_WINDOW_CHARS, MAX_WINDOW_CHARS),
            },
            other => other,
        };
        Self { policy, min_chars }
    }

    pub fn policy(&self) -> SegmentPolicy {
        self.policy
    }

    /// Lazily iterate the passages of one document
    pub fn passages<'a>(&self, source: &'a str, text: &'a str) -> PassageIter<'a> {
        PassageIter {
            source,
            text,
            cursor: 0,
            policy: self.policy,
            min_chars: self.min_chars,
            pending: VecDeque::new(),
        }
    }
}

/// Iterator over the passages of one document; cheap to clone
#[derive(Debug, Clone)]
pub struct PassageIter<'a> {
    source: &'a str,
    text: &'a str,
    cursor: usize,
    policy: SegmentPolicy,
    min_chars: usize,
    /// Spans of the current block not yet emitted
    pending: VecDeque<(usize, usize)>,
}

impl<'a> Iterator for PassageIter<'a> {
    type Item = Passage<'a>;

    fn next(&mut self) -> Option<Passage<'a>> {
        loop {
            if let Some((start, end)) = self.pending.pop_front() {
                if let Some(passage) = self.emit(start, end) {
                    return Some(passage);
                }
                continue;
            }

            if self.cursor >= self.text.len() {
                return None;
            }

            match self.policy {
                SegmentPolicy::FixedWindow { chars } => {
                    match next_window(self.text, self.cursor, self.text.len(), chars) {
                        Some(span) => {
                            self.cursor = span.1;
                            self.pending.push_back(span);
                        }
                        None => self.cursor = self.text.len(),
                    }
                }
                SegmentPolicy::Paragraphs { max_chars } => {
                    let (start, end) = self.next_block();
                    if char_count(self.text, start, end) <= max_chars {
                        self.pending.push_back((start, end));
                    } else {
                        let sentences = sentence_spans(self.text, start, end);
                        self.pending
                            .extend(pack_spans(self.text, &sentences, None, max_chars));
                    }
                }
                SegmentPolicy::Sentences { target_chars } => {
                    let (start, end) = self.next_block();
                    let sentences = sentence_spans(self.text, start, end);
                    self.pending.extend(pack_spans(
                        self.text,
                        &sentences,
                        Some(target_chars),
                        target_chars.saturating_mul(2),
                    ));
                }
            }
        }
    }
}

impl<'a> PassageIter<'a> {
    /// Return the next blank-line separated block and move the cursor past it
    fn next_block(&mut self) -> (usize, usize) {
        let start = self.cursor;
        match BLANK_LINE_REGEX.find_at(self.text, start) {
            Some(m) => {
                self.cursor = m.end();
                (start, m.start())
            }
            None => {
                self.cursor = self.text.len();
                (start, self.text.len())
            }
        }
    }

    fn emit(&self, start: usize, end: usize) -> Option<Passage<'a>> {
        let (start, end) = trim_span(self.text, start, end)?;
        if char_count(self.text, start, end) < self.min_chars {
            return None;
        }
        Some(Passage {
            source: self.source,
            text: &self.text[start..end],
            offset: start,
        })
    }
}

fn char_count(text: &str, start: usize, end: usize) -> usize {
    text[start..end].chars().count()
}

/// Shrink a span so it neither starts nor ends with whitespace
fn trim_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = slice.len() - slice.trim_start().len();
    Some((start + lead, start + lead + trimmed.len()))
}

/// Byte index reached after advancing `n` characters from `start` (capped at `end`)
fn advance_chars(text: &str, start: usize, end: usize, n: usize) -> usize {
    text[start..end]
        .char_indices()
        .nth(n)
        .map_or(end, |(i, _)| start + i)
}

/// Split a block at sentence ends (`.`, `!`, `?` followed by whitespace) and newlines
fn sentence_spans(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut sentence_start = start;
    let mut chars = text[start..end].char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '.' | '!' | '?' => chars.peek().map_or(true, |&(_, next)| next.is_whitespace()),
            '\n' => true,
            _ => false,
        };
        if boundary {
            let stop = start + i + c.len_utf8();
            if let Some(span) = trim_span(text, sentence_start, stop) {
                spans.push(span);
            }
            sentence_start = stop;
        }
    }

    if let Some(span) = trim_span(text, sentence_start, end) {
        spans.push(span);
    }
    spans
}

/// Merge consecutive units into spans of at most `hard` chars.
///
/// With a `soft` target a group is closed as soon as it reaches the target.
/// Units longer than `hard` are cut into windows at word boundaries.
fn pack_spans(
    text: &str,
    units: &[(usize, usize)],
    soft: Option<usize>,
    hard: usize,
) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for &(start, end) in units {
        if char_count(text, start, end) > hard {
            out.extend(current.take());
            out.extend(window_spans(text, start, end, hard));
            continue;
        }

        current = match current {
            Some((group_start, group_end)) if char_count(text, group_start, end) > hard => {
                out.push((group_start, group_end));
                Some((start, end))
            }
            Some((group_start, _)) => Some((group_start, end)),
            None => Some((start, end)),
        };

        if let (Some(target), Some((group_start, group_end))) = (soft, current) {
            if char_count(text, group_start, group_end) >= target {
                out.push((group_start, group_end));
                current = None;
            }
        }
    }

    out.extend(current);
    out
}

fn window_spans(text: &str, start: usize, end: usize, limit: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut pos = start;
    while let Some(span) = next_window(text, pos, end, limit) {
        spans.push(span);
        pos = span.1;
    }
    spans
}

/// Next window of at most `limit` chars, cut at the last whitespace when possible
fn next_window(text: &str, start: usize, end: usize, limit: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let start = start + (slice.len() - slice.trim_start().len());
    if start >= end {
        return None;
    }

    let hard_end = advance_chars(text, start, end, limit);
    if hard_end == end {
        return Some((start, end));
    }

    // The window already ends on a word boundary
    if text[hard_end..].starts_with(char::is_whitespace) {
        return Some((start, hard_end));
    }

    match text[start..hard_end].rfind(char::is_whitespace) {
        Some(ws) if ws > 0 => Some((start, start + ws)),
        _ => Some((start, hard_end)),
    }
}
