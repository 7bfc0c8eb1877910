//! Extraction cache.
//!
//! This module handles:
//! - On-disk cache of extracted document text (`<hash>.txt`)
//! - File cache entries (`<hash>.json`) with the CRC32 and length of the source
//! - CRC-based freshness checks
//!
//! The cache is best-effort: anything unreadable is a miss, and write failures
//! are logged by the caller and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Metadata of one cached extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCacheEntry {
    /// Source name relative to the documents directory
    pub source_file: String,
    pub crc32: u32,
    pub source_len: u64,
    /// Length of the cached text; a mismatch means a torn write
    pub char_count: usize,
    pub extracted_at: DateTime<Utc>,
}

/// Check if a file needs re-extraction based on CRC and length
pub fn should_reextract_file(
    current_crc: u32,
    current_len: u64,
    cached: Option<&FileCacheEntry>,
) -> bool {
    match cached {
        Some(entry) if entry.crc32 == current_crc && entry.source_len == current_len => false,
        _ => true,
    }
}

pub fn compute_crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Hash a source name to create a unique, safe cache file stem
pub fn compute_path_hash(source_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

#[derive(Debug, Clone)]
pub struct TextCache {
    dir: PathBuf,
}

impl TextCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn paths_for(&self, source_name: &str) -> (PathBuf, PathBuf) {
        let stem = compute_path_hash(source_name);
        (
            self.dir.join(format!("{}.txt", stem)),
            self.dir.join(format!("{}.json", stem)),
        )
    }

    /// Cached text for `source_name`, if it was extracted from identical bytes
    pub async fn lookup(&self, source_name: &str, crc32: u32, source_len: u64) -> Option<String> {
        let (text_path, meta_path) = self.paths_for(source_name);

        let meta = fs::read_to_string(&meta_path).await.ok()?;
        let entry: FileCacheEntry = match serde_json::from_str(&meta) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(source = source_name, error = %e, "Corrupt cache metadata");
                return None;
            }
        };

        if entry.source_file != source_name
            || should_reextract_file(crc32, source_len, Some(&entry))
        {
            return None;
        }

        let text = fs::read_to_string(&text_path).await.ok()?;
        if text.chars().count() != entry.char_count {
            tracing::debug!(source = source_name, "Cached text length mismatch");
            return None;
        }
        Some(text)
    }

    /// Write the text first and the metadata last, so a crash between the two
    /// leaves metadata that no longer matches
    pub async fn store(
        &self,
        source_name: &str,
        crc32: u32,
        source_len: u64,
        text: &str,
    ) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let (text_path, meta_path) = self.paths_for(source_name);

        fs::write(&text_path, text).await?;

        let entry = FileCacheEntry {
            source_file: source_name.to_string(),
            crc32,
            source_len,
            char_count: text.chars().count(),
            extracted_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&entry)?;
        fs::write(&meta_path, json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_path_hash() {
        let hash1 = compute_path_hash("manual.pdf");
        let hash2 = compute_path_hash("manual.pdf");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 16);
        assert_ne!(hash1, compute_path_hash("sub/manual.pdf"));
    }

    #[test]
    fn test_should_reextract_file() {
        let cached = FileCacheEntry {
            source_file: "manual.txt".to_string(),
            crc32: 12345,
            source_len: 10,
            char_count: 10,
            extracted_at: Utc::now(),
        };

        assert!(!should_reextract_file(12345, 10, Some(&cached)));
        assert!(should_reextract_file(54321, 10, Some(&cached)));
        assert!(should_reextract_file(12345, 11, Some(&cached)));
        assert!(should_reextract_file(12345, 10, None));
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TextCache::new(dir.path().join("processed_data"));
        let bytes = b"contenido original";
        let crc = compute_crc32(bytes);

        assert_eq!(cache.lookup("a.txt", crc, bytes.len() as u64).await, None);

        cache
            .store("a.txt", crc, bytes.len() as u64, "texto extraído")
            .await
            .unwrap();
        assert_eq!(
            cache.lookup("a.txt", crc, bytes.len() as u64).await.as_deref(),
            Some("texto extraído")
        );

        // Different source bytes invalidate the entry
        assert_eq!(cache.lookup("a.txt", crc ^ 1, bytes.len() as u64).await, None);
        // Entries are per source name
        assert_eq!(cache.lookup("b.txt", crc, bytes.len() as u64).await, None);
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TextCache::new(dir.path());
        cache.store("a.txt", 1, 1, "texto").await.unwrap();

        let (_, meta_path) = cache.paths_for("a.txt");
        std::fs::write(&meta_path, "{ not json").unwrap();
        assert_eq!(cache.lookup("a.txt", 1, 1).await, None);
    }

    #[tokio::test]
    async fn test_torn_text_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TextCache::new(dir.path());
        cache.store("a.txt", 1, 1, "texto completo").await.unwrap();

        let (text_path, _) = cache.paths_for("a.txt");
        std::fs::write(&text_path, "tex").unwrap();
        assert_eq!(cache.lookup("a.txt", 1, 1).await, None);
    }
}
