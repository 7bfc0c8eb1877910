//! Passage relevance scoring.
//!
//! The score of a passage is the number of distinct question keywords found
//! among its tokens, weighted by a length preference that favors passages of
//! a readable size.

use crate::rag::keywords::{token_set, KeywordSet};
use crate::rag::segmenter::Passage;
use crate::settings::RetrievalSettings;
use std::cmp::Ordering;

/// Passages shorter than this are mostly headings or fragments
pub const SHORT_PASSAGE_CHARS: usize = 50;

/// Passages longer than this tend to bury the answer
pub const LONG_PASSAGE_CHARS: usize = 1000;

pub const SWEET_SPOT_FACTOR: f32 = 1.25;
pub const SHORT_PASSAGE_FACTOR: f32 = 0.75;
pub const LONG_PASSAGE_FACTOR: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringOptions {
    pub top_k: usize,
    pub sweet_spot_min: usize,
    pub sweet_spot_max: usize,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            sweet_spot_min: 100,
            sweet_spot_max: 500,
        }
    }
}

impl ScoringOptions {
    pub fn from_settings(settings: &RetrievalSettings, top_k: usize) -> Self {
        Self {
            top_k,
            sweet_spot_min: settings.sweet_spot_min,
            sweet_spot_max: settings.sweet_spot_max,
        }
    }
}

/// An owned, ranked passage
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub source: String,
    pub text: String,
    pub score: f32,
    /// Keywords found in the passage, in keyword order
    pub matched: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// The question had no usable keywords; nothing was scored
    NeedsMoreDetail,
    /// Best passages first; empty when nothing matched
    Ranked(Vec<ScoredPassage>),
}

/// Multiplier applied to the match count based on passage length in chars
pub fn length_factor(char_len: usize, options: &ScoringOptions) -> f32 {
    if (options.sweet_spot_min..=options.sweet_spot_max).contains(&char_len) {
        SWEET_SPOT_FACTOR
    } else if char_len < SHORT_PASSAGE_CHARS {
        SHORT_PASSAGE_FACTOR
    } else if char_len > LONG_PASSAGE_CHARS {
        LONG_PASSAGE_FACTOR
    } else {
        1.0
    }
}

/// Score one passage; `None` when no keyword matches
pub fn score_passage(
    keywords: &KeywordSet,
    passage: &Passage<'_>,
    options: &ScoringOptions,
) -> Option<ScoredPassage> {
    let tokens = token_set(passage.text);
    let matched: Vec<String> = keywords
        .iter()
        .filter(|k| tokens.contains(*k))
        .map(str::to_string)
        .collect();

    if matched.is_empty() {
        return None;
    }

    let score = matched.len() as f32 * length_factor(passage.char_len(), options);
    Some(ScoredPassage {
        source: passage.source.to_string(),
        text: passage.text.to_string(),
        score,
        matched,
    })
}

/// Rank passages against the keyword set and keep the best `top_k`
pub fn score_passages<'a, I>(
    keywords: &KeywordSet,
    passages: I,
    options: &ScoringOptions,
) -> ScoreOutcome
where
    I: IntoIterator<Item = Passage<'a>>,
{
    if keywords.is_empty() {
        return ScoreOutcome::NeedsMoreDetail;
    }

    let mut ranked: Vec<ScoredPassage> = passages
        .into_iter()
        .filter_map(|p| score_passage(keywords, &p, options))
        .collect();

    // Stable: equal scores keep document and passage order
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(options.top_k);

    ScoreOutcome::Ranked(ranked)
}
