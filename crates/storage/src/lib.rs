//! Storage layer: SQLite persistence for the vector index.
//!
//! Holds DB pool setup, the migration runner and index save/load helpers.

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub mod index;
pub mod models;

pub use index::{load_index, save_index};

/// Opens (creating if needed) the database at `database_url`.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    if !database_url.starts_with("sqlite:") {
        let path = std::path::PathBuf::from(database_url);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create database directory {}", parent.display()))?;
        }
    }
    open(database_url, true).await
}

/// Opens an existing database; fails when the file is absent.
pub async fn open_existing(database_url: &str) -> anyhow::Result<SqlitePool> {
    open(database_url, false).await
}

async fn open(database_url: &str, create: bool) -> anyhow::Result<SqlitePool> {
    let opts = if database_url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database_url)?
    } else {
        SqliteConnectOptions::new().filename(database_url)
    }
    .create_if_missing(create);

    let mut pool_opts = SqlitePoolOptions::new();
    if database_url.contains("memory") {
        pool_opts = pool_opts.max_connections(1);
    } else {
        pool_opts = pool_opts.max_connections(5);
    }
    let pool = pool_opts.connect_with(opts).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Applies SQLx migrations located in crates/storage/migrations.
    // Safe to run multiple times (idempotent).
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
