use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database and schema. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create tables and indexes on an open pool if they do not exist.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // `seq` fixes insertion order; record IDs are not unique on purpose,
    // the history keeps whatever it is given.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grading_records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            image_reference TEXT NOT NULL,
            total_questions INTEGER NOT NULL,
            passed INTEGER NOT NULL,
            percentage REAL NOT NULL,
            threshold REAL NOT NULL,
            record_json TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_grading_records_id ON grading_records(id)")
        .execute(pool)
        .await?;

    Ok(())
}
