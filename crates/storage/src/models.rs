use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IndexMeta {
    pub model: String,
    pub dimension: i64,
    pub entry_count: i64,
    pub created_at: i64,
}

/// One persisted vector plus the document it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub position: i64,
    pub row_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}
