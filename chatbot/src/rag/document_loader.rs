//! Document loading.
//!
//! The documents directory is re-read for every question so that manuals
//! dropped into the folder are picked up without a restart. Extraction runs
//! on the blocking pool and goes through the optional [`TextCache`].

use crate::rag::cache_manager::{compute_crc32, TextCache};
use crate::rag::file_processor::{extract_text_from_file, is_supported_document};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("permission denied: cannot read documents directory {0}")]
    PermissionDenied(PathBuf),
    #[error("failed to read documents directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded document, owned by the request that loaded it
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Path relative to the documents directory, `/`-separated
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of loading the documents directory
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadReport {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn total_chars(&self) -> usize {
        self.documents.iter().map(|d| d.text.chars().count()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    root: PathBuf,
    cache: Option<TextCache>,
}

impl DocumentLoader {
    pub fn new(root: impl Into<PathBuf>, cache: Option<TextCache>) -> Self {
        Self {
            root: root.into(),
            cache,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Supported files under the root, as sorted relative names
    pub async fn list_document_files(&self) -> Result<Vec<String>, LoadError> {
        let files = match collect_files_recursive(&self.root).await {
            Ok(files) => files,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(dir = %self.root.display(), "Documents directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(LoadError::PermissionDenied(self.root.clone()));
            }
            Err(source) => {
                return Err(LoadError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = files
            .iter()
            .filter_map(|path| relative_name(&self.root, path))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Number of supported files, without extracting them
    pub async fn count_documents(&self) -> Result<usize, LoadError> {
        Ok(self.list_document_files().await?.len())
    }

    /// Extract every supported file. Unreadable files are skipped, not fatal.
    pub async fn load(&self) -> Result<LoadReport, LoadError> {
        let names = self.list_document_files().await?;
        let mut report = LoadReport::default();

        for name in names {
            match self.load_one(&name).await {
                Ok(text) => report.documents.push(Document { name, text }),
                Err(reason) => {
                    tracing::warn!(file = %name, reason = %reason, "Skipping document");
                    report.skipped.push(SkippedFile { name, reason });
                }
            }
        }

        tracing::debug!(
            documents = report.documents.len(),
            skipped = report.skipped.len(),
            chars = report.total_chars(),
            "Documents loaded"
        );
        Ok(report)
    }

    async fn load_one(&self, name: &str) -> Result<String, String> {
        let path = self.root.join(name);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| format!("failed to read file: {}", e))?;
        let crc = compute_crc32(&bytes);
        let len = bytes.len() as u64;

        if let Some(cache) = &self.cache {
            if let Some(text) = cache.lookup(name, crc, len).await {
                tracing::debug!(file = name, "Extraction cache hit");
                return Ok(text);
            }
        }

        let extract_path = path.clone();
        let text =
            tokio::task::spawn_blocking(move || extract_text_from_file(&extract_path, &bytes))
            .await
            .map_err(|e| format!("extraction task failed: {}", e))?
            .map_err(|e| e.to_string())?;

        if text.trim().is_empty() {
            return Err("no extractable text".to_string());
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(name, crc, len, &text).await {
                tracing::warn!(
                    file = name,
                    cache_dir = %cache.dir().display(),
                    error = %e,
                    "Failed to write extraction cache"
                );
            }
        }

        Ok(text)
    }

    /// Path of a listed document that may be served as-is.
    ///
    /// `name` is a `/`-separated relative name as returned by
    /// [`list_document_files`](Self::list_document_files). Every component must
    /// be visible and not `..`, and the resolved path must stay under the root.
    pub async fn resolve_served_file(&self, name: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for part in name.split('/') {
            if part.is_empty() || part.starts_with('.') || part.contains('\\') {
                return None;
            }
            path.push(part);
        }
        if !is_supported_document(&path) {
            return None;
        }

        // Symlinks may point outside the documents directory
        let root = tokio::fs::canonicalize(&self.root).await.ok()?;
        let resolved = tokio::fs::canonicalize(&path).await.ok()?;
        if !resolved.starts_with(&root) {
            tracing::warn!(file = name, "Refusing to serve a file outside the documents dir");
            return None;
        }
        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => Some(resolved),
            _ => None,
        }
    }
}

/// Recursively collect supported files, skipping hidden entries.
/// Unreadable sub-directories are skipped; only the root's errors propagate.
async fn collect_files_recursive(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        // Skip hidden files and directories
        if file_name.is_empty() || file_name.starts_with('.') {
            continue;
        }

        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot stat entry");
                continue;
            }
        };

        if file_type.is_dir() {
            match Box::pin(collect_files_recursive(&path)).await {
                Ok(sub_files) => files.extend(sub_files),
                Err(e) => {
                    tracing::warn!(dir = %path.display(), error = %e, "Skipping directory");
                }
            }
        } else if is_supported_document(&path) {
            files.push(path);
        }
    }

    Ok(files)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{SegmentPolicy, Segmenter};

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DocumentLoader::new(dir.path().join("no-existe"), None);
        let report = loader.load().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(loader.count_documents().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lists_supported_files_sorted_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "Texto del documento b.").unwrap();
        std::fs::write(dir.path().join("a.md"), "# Documento a").unwrap();
        std::fs::write(dir.path().join("planilla.xlsx"), "x").unwrap();
        std::fs::write(dir.path().join(".oculto.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("c.txt"), "Texto c.").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("d.txt"), "x").unwrap();

        let loader = DocumentLoader::new(dir.path(), None);
        assert_eq!(
            loader.list_document_files().await.unwrap(),
            vec!["a.md", "b.txt", "sub/c.txt"]
        );
        assert_eq!(loader.count_documents().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bad_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bueno.txt"),
            "La firma digital tiene validez legal.",
        )
        .unwrap();
        std::fs::write(dir.path().join("roto.pdf"), b"%PDF-1.4 basura").unwrap();
        std::fs::write(dir.path().join("vacio.txt"), "   \n\n").unwrap();

        let loader = DocumentLoader::new(dir.path(), None);
        let report = loader.load().await.unwrap();

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].name, "bueno.txt");
        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skipped, vec!["roto.pdf", "vacio.txt"]);
        assert_eq!(report.skipped[1].reason, "no extractable text");
    }

    #[tokio::test]
    async fn test_cache_is_used_and_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("documents");
        std::fs::create_dir(&docs).unwrap();
        let source = docs.join("manual.txt");
        std::fs::write(&source, "Versión uno del manual.").unwrap();

        let cache = TextCache::new(dir.path().join("processed_data"));
        let loader = DocumentLoader::new(&docs, Some(cache.clone()));

        let first = loader.load().await.unwrap();
        assert_eq!(first.documents[0].text, "Versión uno del manual.");

        // Tamper with the cached text: a hit must serve it unchanged
        let bytes = std::fs::read(&source).unwrap();
        cache
            .store("manual.txt", compute_crc32(&bytes), bytes.len() as u64, "desde la caché")
            .await
            .unwrap();
        let second = loader.load().await.unwrap();
        assert_eq!(second.documents[0].text, "desde la caché");

        // Changing the source invalidates the entry
        std::fs::write(&source, "Versión dos del manual.").unwrap();
        let third = loader.load().await.unwrap();
        assert_eq!(third.documents[0].text, "Versión dos del manual.");
    }

    #[tokio::test]
    async fn test_unwritable_cache_does_not_fail_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Contenido suficiente para cargar.").unwrap();
        // A regular file where the cache directory should be
        let blocker = dir.path().join("cache-es-archivo");
        std::fs::write(&blocker, "x").unwrap();

        let loader = DocumentLoader::new(dir.path(), Some(TextCache::new(&blocker)));
        let report = loader.load().await.unwrap();
        assert_eq!(report.documents.len(), 1);
    }

    #[tokio::test]
    async fn test_load_twice_is_stable_and_leaves_sources_alone() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("documents");
        std::fs::create_dir(&docs).unwrap();
        std::fs::write(
            docs.join("guia.txt"),
            "La firma digital tiene validez legal.\n\nEl token se retira en la mesa de entradas.",
        )
        .unwrap();
        crate::tests::write_docx(
            &docs.join("manual.docx"),
            &[
                "El expediente electrónico se crea desde el escritorio.",
                "Cada pase queda registrado con fecha y usuario.",
            ],
        );

        let snapshot = |name: &str| {
            let path = docs.join(name);
            let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
            (std::fs::read(&path).unwrap(), modified)
        };
        let before = [snapshot("guia.txt"), snapshot("manual.docx")];

        let cache = TextCache::new(dir.path().join("processed_data"));
        let loader = DocumentLoader::new(&docs, Some(cache));
        let segmenter = Segmenter::new(SegmentPolicy::default(), 20);
        let passages = |report: &LoadReport| -> Vec<(String, String, usize)> {
            report
                .documents
                .iter()
                .flat_map(|doc| segmenter.passages(&doc.name, &doc.text))
                .map(|p| (p.source.to_string(), p.text.to_string(), p.offset))
                .collect()
        };

        // The first load fills the cache, the second one reads from it
        let first = loader.load().await.unwrap();
        let second = loader.load().await.unwrap();

        assert_eq!(first.documents.len(), 2);
        assert_eq!(passages(&first).len(), 4);
        assert_eq!(passages(&first), passages(&second));
        assert_eq!(before, [snapshot("guia.txt"), snapshot("manual.docx")]);
        assert_eq!(
            loader.list_document_files().await.unwrap(),
            vec!["guia.txt", "manual.docx"]
        );
    }

    #[tokio::test]
    async fn test_resolve_served_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("manual.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("secreto.env"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("c.txt"), "Texto c.").unwrap();
        std::fs::write(dir.path().join("sub").join(".oculto.txt"), "x").unwrap();
        let loader = DocumentLoader::new(dir.path(), None);

        assert!(loader.resolve_served_file("manual.pdf").await.is_some());
        assert!(loader.resolve_served_file("sub/c.txt").await.is_some());
        assert!(loader.resolve_served_file("../manual.pdf").await.is_none());
        assert!(loader.resolve_served_file("sub/../manual.pdf").await.is_none());
        assert!(loader.resolve_served_file("sub/.oculto.txt").await.is_none());
        assert!(loader.resolve_served_file("sub//c.txt").await.is_none());
        assert!(loader.resolve_served_file("sub\\c.txt").await.is_none());
        assert!(loader.resolve_served_file("secreto.env").await.is_none());
        assert!(loader.resolve_served_file("falta.pdf").await.is_none());
        assert!(loader.resolve_served_file("").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_rejects_symlink_out_of_root() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("documents");
        std::fs::create_dir(&docs).unwrap();
        std::fs::write(dir.path().join("fuera.txt"), "fuera del directorio").unwrap();
        std::os::unix::fs::symlink(dir.path().join("fuera.txt"), docs.join("enlace.txt"))
            .unwrap();

        let loader = DocumentLoader::new(&docs, None);
        assert!(loader.resolve_served_file("enlace.txt").await.is_none());
    }
}
