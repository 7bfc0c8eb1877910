//! Local lexical retrieval: load → segment → score.

pub mod cache_manager;
pub mod document_loader;
pub mod file_processor;
pub mod keywords;
pub mod scorer;
pub mod segmenter;

pub use cache_manager::TextCache;
pub use document_loader::{Document, DocumentLoader, LoadError, LoadReport, SkippedFile};
pub use keywords::{extract_keywords, is_follow_up, is_greeting, KeywordFilter, KeywordSet};
pub use scorer::{score_passages, ScoreOutcome, ScoredPassage, ScoringOptions};
pub use segmenter::{Passage, PassageIter, SegmentPolicy, Segmenter};
