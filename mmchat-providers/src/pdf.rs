//! PDF ingestion: text extraction, fixed-size chunking and a small on-disk
//! chunk index the pdf chain draws context from

use async_trait::async_trait;
use mmchat_core::services::PdfIndexer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

use crate::base::{ProviderError, ProviderResult};

const INDEX_FILE: &str = "chunks.json";

/// A piece of an ingested document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// SHA-256 of the source PDF bytes, hex encoded
    pub document: String,
    /// Position of the chunk within its document
    pub position: usize,
    pub text: String,
}

/// Chunk store persisted as a single JSON file under `index_path`
#[derive(Debug)]
pub struct PdfIndex {
    dir: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
    chunks: RwLock<Vec<Chunk>>,
}

impl PdfIndex {
    /// Open (or start) the index stored in `dir`
    pub fn open<P: AsRef<Path>>(
        dir: P,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> ProviderResult<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(ProviderError::ConfigError(format!(
                "invalid chunking: size {} overlap {}",
                chunk_size, chunk_overlap
            )));
        }

        let dir = dir.as_ref().to_path_buf();
        let index_path = dir.join(INDEX_FILE);
        let chunks = if index_path.exists() {
            let content = std::fs::read_to_string(&index_path)?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };

        Ok(Self {
            dir,
            chunk_size,
            chunk_overlap,
            chunks: RwLock::new(chunks),
        })
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add the extracted text of one document. Returns the number of new
    /// chunks; a document already indexed adds none.
    pub fn add_document(&self, source: &[u8], text: &str) -> ProviderResult<usize> {
        let document = hex_digest(source);
        let mut chunks = self
            .chunks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if chunks.iter().any(|c| c.document == document) {
            debug!("Document {} already indexed", &document[..12]);
            return Ok(0);
        }

        let pieces = chunk_text(text, self.chunk_size, self.chunk_overlap);
        let added = pieces.len();
        chunks.extend(pieces.into_iter().enumerate().map(|(position, text)| Chunk {
            document: document.clone(),
            position,
            text,
        }));

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(INDEX_FILE), serde_json::to_string(&*chunks)?)?;
        info!("Indexed document {} as {} chunks", &document[..12], added);
        Ok(added)
    }

    /// Up to `k` chunks sharing the most terms with `query`, best first
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<Chunk> {
        let terms = terms_of(query);
        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let chunks = self.read();
        let mut scored: Vec<(usize, &Chunk)> = chunks
            .iter()
            .map(|chunk| {
                let chunk_terms = terms_of(&chunk.text);
                (terms.intersection(&chunk_terms).count(), chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        // stable: ties keep ingestion order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(k).map(|(_, c)| c.clone()).collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Chunk>> {
        self.chunks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PdfIndexer for PdfIndex {
    async fn ingest(&self, files: &[Vec<u8>]) -> mmchat_core::Result<()> {
        for file in files {
            let bytes = file.clone();
            let text = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes)
            })
            .await
            .map_err(|e| ProviderError::DocumentError(e.to_string()))?
            .map_err(|e| ProviderError::DocumentError(format!("failed to extract text: {}", e)))?;

            self.add_document(file, &text)?;
        }
        Ok(())
    }
}

/// Split `text` into windows of `size` characters, consecutive windows
/// sharing `overlap` characters. Whitespace runs collapse to one space.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let normalized: Vec<char> = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect();
    if normalized.is_empty() || size == 0 {
        return Vec::new();
    }

    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(normalized.len());
        chunks.push(normalized[start..end].iter().collect());
        if end == normalized.len() {
            break;
        }
        start += step;
    }
    chunks
}

fn terms_of(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
