use crate::models::{IndexMeta, StoredEntry};
use anyhow::{bail, Context};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

// Four binds per row keeps each statement well under SQLite's variable limit.
const INSERT_BATCH: usize = 200;

/// Replaces whatever index is stored in `pool` with `meta` and `entries`.
pub async fn save_index(
    pool: &SqlitePool,
    meta: &IndexMeta,
    entries: &[StoredEntry],
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM index_entries")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM index_meta")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO index_meta (id, model, dimension, entry_count, created_at) VALUES (1, ?1, ?2, ?3, ?4)",
    )
    .bind(meta.model.as_str())
    .bind(meta.dimension)
    .bind(meta.entry_count)
    .bind(meta.created_at)
    .execute(&mut *tx)
    .await?;

    for batch in entries.chunks(INSERT_BATCH) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO index_entries (position, row_index, content, embedding) ");
        qb.push_values(batch, |mut b, entry| {
            b.push_bind(entry.position)
                .push_bind(entry.row_index)
                .push_bind(entry.content.as_str())
                .push_bind(encode_embedding(&entry.embedding));
        });
        qb.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Reads the stored index back in insertion order. `None` when no index was ever saved.
pub async fn load_index(
    pool: &SqlitePool,
) -> anyhow::Result<Option<(IndexMeta, Vec<StoredEntry>)>> {
    let meta = sqlx::query_as::<_, IndexMeta>(
        "SELECT model, dimension, entry_count, created_at FROM index_meta WHERE id = 1",
    )
    .fetch_optional(pool)
    .await
    .context("read index_meta")?;
    let Some(meta) = meta else {
        return Ok(None);
    };

    let rows = sqlx::query(
        "SELECT position, row_index, content, embedding FROM index_entries ORDER BY position",
    )
    .fetch_all(pool)
    .await
    .context("read index_entries")?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let blob: Vec<u8> = row.try_get("embedding")?;
        entries.push(StoredEntry {
            position: row.try_get("position")?,
            row_index: row.try_get("row_index")?,
            content: row.try_get("content")?,
            embedding: decode_embedding(&blob)?,
        });
    }

    if entries.len() as i64 != meta.entry_count {
        bail!(
            "index_meta records {} entries but {} are stored",
            meta.entry_count,
            entries.len()
        );
    }
    Ok(Some((meta, entries)))
}

pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub fn decode_embedding(bytes: &[u8]) -> anyhow::Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        bail!("embedding blob length {} is not a multiple of 4", bytes.len());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
