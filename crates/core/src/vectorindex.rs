//! Exact nearest-neighbour index over document embeddings, persisted to SQLite.

use crate::embeddings::embed_with;
use crate::models::Document;
use providers::{EmbeddingProvider, ProviderError};
use std::cmp::Ordering;
use std::path::Path;
use std::time::Duration;
use storage::models::{IndexMeta, StoredEntry};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_K: usize = 4;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no valid index at {0}")]
    NotFound(String),
    #[error("index was built with model {found:?} but {expected:?} is configured")]
    ModelMismatch { expected: String, found: String },
    #[error("embedding dimension {found} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("provider returned an empty embedding for document at row {0}")]
    EmptyEmbedding(usize),
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),
    #[error("storage: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorEntry {
    pub embedding: Vec<f32>,
    pub document: Document,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

/// Read-only search surface shared by request handlers.
pub trait EmbeddingIndex: Send + Sync {
    /// At most `k` hits, best first; equal scores keep insertion order.
    fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit>;
    fn len(&self) -> usize;
    fn model(&self) -> &str;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model: String,
    dimension: usize,
    entries: Vec<VectorEntry>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            dimension: 0,
            entries: Vec::new(),
        }
    }

    /// Wraps precomputed entries; every embedding must share one non-zero dimension.
    pub fn from_entries(
        model: impl Into<String>,
        entries: Vec<VectorEntry>,
    ) -> Result<Self, IndexError> {
        let mut dimension = 0;
        for entry in &entries {
            if entry.embedding.is_empty() {
                return Err(IndexError::EmptyEmbedding(entry.document.metadata.row_index));
            }
            if dimension == 0 {
                dimension = entry.embedding.len();
            } else if entry.embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    found: entry.embedding.len(),
                });
            }
        }
        Ok(Self {
            model: model.into(),
            dimension,
            entries,
        })
    }

    /// Embeds every document's content in batches of `batch_size`.
    pub async fn build(
        documents: Vec<Document>,
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let batch_size = batch_size.max(1);
        let mut entries = Vec::with_capacity(documents.len());
        for batch in documents.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let vectors = embed_with(provider, &texts, timeout).await?;
            for (document, embedding) in batch.iter().zip(vectors) {
                entries.push(VectorEntry {
                    embedding,
                    document: document.clone(),
                });
            }
            debug!(embedded = entries.len(), total = documents.len(), "embedding batch done");
        }
        let index = Self::from_entries(provider.model(), entries)?;
        info!(
            documents = index.len(),
            dimension = index.dimension,
            model = %index.model,
            "built vector index"
        );
        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.iter().map(|e| &e.document)
    }

    /// Writes the index to the SQLite file at `path`, replacing any previous one.
    pub async fn persist(&self, path: &Path) -> Result<(), IndexError> {
        let pool = storage::connect(&path.to_string_lossy()).await?;
        storage::migrate(&pool).await?;
        let meta = IndexMeta {
            model: self.model.clone(),
            dimension: self.dimension as i64,
            entry_count: self.entries.len() as i64,
            created_at: chrono::Utc::now().timestamp(),
        };
        let stored: Vec<StoredEntry> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, e)| StoredEntry {
                position: position as i64,
                row_index: e.document.metadata.row_index as i64,
                content: e.document.content.clone(),
                embedding: e.embedding.clone(),
            })
            .collect();
        storage::save_index(&pool, &meta, &stored).await?;
        pool.close().await;
        info!(path = %path.display(), entries = stored.len(), "persisted vector index");
        Ok(())
    }

    /// Reloads an index persisted with [`VectorIndex::persist`].
    ///
    /// Refuses an index recorded under a different embedding model than `expected_model`.
    pub async fn load(path: &Path, expected_model: &str) -> Result<Self, IndexError> {
        let shown = path.display().to_string();
        if !path.is_file() {
            return Err(IndexError::NotFound(shown));
        }
        let pool = storage::open_existing(&path.to_string_lossy())
            .await
            .map_err(|e| IndexError::NotFound(format!("{shown}: {e}")))?;
        let loaded = storage::load_index(&pool).await;
        pool.close().await;
        let (meta, stored) = match loaded {
            Ok(Some(found)) => found,
            Ok(None) => return Err(IndexError::NotFound(shown)),
            Err(e) => return Err(IndexError::NotFound(format!("{shown}: {e}"))),
        };

        if meta.model != expected_model {
            return Err(IndexError::ModelMismatch {
                expected: expected_model.to_string(),
                found: meta.model,
            });
        }

        let entries = stored
            .into_iter()
            .map(|s| VectorEntry {
                embedding: s.embedding,
                document: Document::new(s.content, s.row_index.max(0) as usize),
            })
            .collect();
        let index = Self::from_entries(meta.model, entries)?;
        if !index.is_empty() && index.dimension as i64 != meta.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: meta.dimension.max(0) as usize,
                found: index.dimension,
            });
        }
        info!(path = %shown, entries = index.len(), "loaded vector index");
        Ok(index)
    }
}

impl EmbeddingIndex for VectorIndex {
    fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }
        if query.len() != self.dimension {
            warn!(
                query = query.len(),
                index = self.dimension,
                "query embedding dimension differs from index"
            );
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let score = cosine_similarity(query, &e.embedding);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(i, score)| SearchHit {
                document: self.entries[i].document.clone(),
                score,
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(row: usize, embedding: Vec<f32>) -> VectorEntry {
        VectorEntry {
            embedding,
            document: Document::new(format!("row {row}"), row),
        }
    }

    fn sample() -> VectorIndex {
        VectorIndex::from_entries(
            "test-model",
            vec![
                entry(0, vec![1.0, 0.0]),
                entry(1, vec![0.0, 1.0]),
                entry(2, vec![1.0, 0.0]),
                entry(3, vec![0.7, 0.7]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn search_orders_by_similarity_and_breaks_ties_by_insertion() {
        let index = sample();
        let hits = index.search(&[1.0, 0.0], 3);
        let rows: Vec<usize> = hits.iter().map(|h| h.document.metadata.row_index).collect();
        assert_eq!(rows, vec![0, 2, 3]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(index.search(&[1.0, 0.0], 3), hits);
    }

    #[test]
    fn search_never_exceeds_k_or_errors_when_empty() {
        let index = sample();
        assert_eq!(index.search(&[0.0, 1.0], 10).len(), 4);
        assert_eq!(index.search(&[0.0, 1.0], 1).len(), 1);
        assert!(index.search(&[0.0, 1.0], 0).is_empty());
        assert!(VectorIndex::new("m").search(&[1.0, 0.0], DEFAULT_K).is_empty());
        assert!(index.search(&[1.0, 0.0, 0.0], 2).is_empty());
    }

    #[test]
    fn from_entries_rejects_inconsistent_vectors() {
        assert!(matches!(
            VectorIndex::from_entries("m", vec![entry(0, vec![1.0]), entry(1, vec![1.0, 2.0])]),
            Err(IndexError::DimensionMismatch { expected: 1, found: 2 })
        ));
        assert!(matches!(
            VectorIndex::from_entries("m", vec![entry(5, vec![])]),
            Err(IndexError::EmptyEmbedding(5))
        ));
    }

    #[tokio::test]
    async fn persist_and_load_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("index").join("roster.db");
        let index = sample();
        index.persist(&path).await.unwrap();

        let loaded = VectorIndex::load(&path, "test-model").await.unwrap();
        assert_eq!(loaded, index);
        let query = [0.6, 0.8];
        assert_eq!(loaded.search(&query, 3), index.search(&query, 3));
    }

    #[tokio::test]
    async fn load_refuses_missing_or_foreign_model_index() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("roster.db");
        assert!(matches!(
            VectorIndex::load(&path, "test-model").await,
            Err(IndexError::NotFound(_))
        ));

        std::fs::write(&path, b"not sqlite").unwrap();
        assert!(matches!(
            VectorIndex::load(&path, "test-model").await,
            Err(IndexError::NotFound(_))
        ));

        std::fs::remove_file(&path).unwrap();
        sample().persist(&path).await.unwrap();
        assert!(matches!(
            VectorIndex::load(&path, "other-model").await,
            Err(IndexError::ModelMismatch { .. })
        ));
    }
}
