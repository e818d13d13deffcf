use crate::table::TableError;
use crate::vectorindex::IndexError;
use providers::ProviderError;
use thiserror::Error;

/// Per-request failures surfaced to the serving layer.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("vector index is not loaded")]
    IndexNotReady,
    #[error("vector index not found: {0}")]
    IndexNotFound(String),
    #[error("load failure: {0}")]
    LoadFailure(String),
    #[error("embedding failed: {0}")]
    EmbeddingFailure(#[source] ProviderError),
    #[error("generation failed: {0}")]
    GenerationFailure(#[source] ProviderError),
}

impl QueryError {
    /// True when the caller sent a bad request rather than the system failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, QueryError::InvalidInput(_))
    }
}

impl From<IndexError> for QueryError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotFound(path) => QueryError::IndexNotFound(path),
            IndexError::Embedding(e) => QueryError::EmbeddingFailure(e),
            other => QueryError::LoadFailure(other.to_string()),
        }
    }
}

impl From<TableError> for QueryError {
    fn from(err: TableError) -> Self {
        QueryError::LoadFailure(err.to_string())
    }
}
