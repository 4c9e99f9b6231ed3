//! Document retriever for the RAG pattern.
//!
//! Loads `.txt` / `.md` documents from a file or a directory tree, splits
//! them into paragraph-aligned chunks, and ranks chunks by how often the
//! query's terms occur in them.

use async_trait::async_trait;
use fincrew_core::error::RetrievalError;
use fincrew_core::retriever::Retriever;
use std::path::{Path, PathBuf};
use tracing::debug;

const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

/// One chunk of a loaded document.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub source: String,
    pub text: String,
    lowered: String,
}

/// Keyword retriever over a fixed set of documents.
#[derive(Debug, Clone)]
pub struct DocumentRetriever {
    chunks: Vec<Chunk>,
}

impl DocumentRetriever {
    /// Load every document under `path`.
    ///
    /// Fails with [`RetrievalError::Unavailable`] if the path does not
    /// exist or holds no readable text.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, RetrievalError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RetrievalError::Unavailable(format!("{} does not exist", path.display())));
        }

        let mut files = Vec::new();
        collect_documents(path, &mut files)?;
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| RetrievalError::Unavailable(format!("failed to read {}: {e}", file.display())))?;
            documents.push((file.display().to_string(), text));
        }

        let retriever = Self::from_documents(documents, chunk_size);
        if retriever.is_empty() {
            return Err(RetrievalError::Unavailable(format!("no documents found in {}", path.display())));
        }
        debug!(path = %path.display(), chunks = retriever.len(), "Document retriever ready");
        Ok(retriever)
    }

    /// Build from in-memory `(source, text)` pairs.
    pub fn from_documents<I, S, T>(documents: I, chunk_size: usize) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        for (source, text) in documents {
            let source = source.into();
            for piece in chunk_text(text.as_ref(), chunk_size) {
                chunks.push(Chunk {
                    source: source.clone(),
                    lowered: piece.to_lowercase(),
                    text: piece,
                });
            }
        }
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks ranked by relevance to `query`, best first. Chunks that share
    /// no term with the query are left out; ties keep document order.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<&Chunk> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f32, &Chunk)> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let occurrences: usize = terms.iter().map(|t| chunk.lowered.matches(t.as_str()).count()).sum();
                if occurrences == 0 {
                    return None;
                }
                // Longer chunks need proportionally more hits
                let score = occurrences as f32 / (chunk.text.len() as f32 / 100.0).max(1.0);
                Some((score, chunk))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(top_k).map(|(_, chunk)| chunk).collect()
    }
}

#[async_trait]
impl Retriever for DocumentRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
        Ok(self.search(query, top_k).into_iter().map(|c| c.text.clone()).collect())
    }
}

fn collect_documents(path: &Path, files: &mut Vec<PathBuf>) -> Result<(), RetrievalError> {
    if path.is_file() {
        if is_document(path) {
            files.push(path.to_path_buf());
        }
        return Ok(());
    }

    let entries = std::fs::read_dir(path)
        .map_err(|e| RetrievalError::Unavailable(format!("failed to list {}: {e}", path.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| RetrievalError::Unavailable(e.to_string()))?;
        collect_documents(&entry.path(), files)?;
    }
    Ok(())
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Split text into chunks of at most `chunk_size` characters, breaking on
/// blank lines where possible.
fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let paragraph_len = paragraph.chars().count();

        if paragraph_len > chunk_size {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = paragraph.chars().collect();
            chunks.extend(chars.chunks(chunk_size).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let joined_len = current.chars().count() + 2 + paragraph_len;
        if !current.is_empty() && joined_len > chunk_size {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}
