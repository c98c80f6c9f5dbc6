//! Schema migrations. Safe to run repeatedly.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Opens the configured database and applies the schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates the `analyses` table and its indexes on an open pool.
///
/// `findings_json` holds the serialized findings of a `Completed` record;
/// `failure_message` holds the diagnostic of a `Failed` one. Which column
/// is meaningful is selected by `status`.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            source_name TEXT NOT NULL,
            source_location TEXT NOT NULL,
            artifact_kind TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Processing',
            accessibility_score INTEGER NOT NULL DEFAULT 0,
            ats_score INTEGER,
            error_count INTEGER NOT NULL DEFAULT 0,
            findings_json TEXT,
            failure_message TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_analyses_owner_created ON analyses(owner, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
