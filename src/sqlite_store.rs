//! SQLite-backed [`HistoryStore`] implementation.
//!
//! Each record is stored whole as JSON in `record_json`, alongside a few
//! summary columns for ad-hoc inspection with the `sqlite3` shell. The
//! autoincrement `seq` column fixes insertion order, and SQLite serializes
//! concurrent writers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use sheet_grader_core::history::HistoryStore;
use sheet_grader_core::models::GradingRecord;

use crate::config::Config;
use crate::{db, migrate};

pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect using `[db].path` and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode(json: &str) -> Result<GradingRecord> {
    serde_json::from_str(json).context("Corrupt grading record in history database")
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, record: &GradingRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO grading_records (id, created_at, image_reference, total_questions,
                                         passed, percentage, threshold, record_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(record.timestamp.to_rfc3339())
        .bind(&record.image_reference)
        .bind(record.summary.total_questions as i64)
        .bind(record.summary.passed as i64)
        .bind(record.summary.percentage)
        .bind(record.summary.threshold)
        .bind(&json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<GradingRecord>> {
        let rows = sqlx::query("SELECT record_json FROM grading_records ORDER BY seq DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| decode(&row.get::<String, _>("record_json")))
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Option<GradingRecord>> {
        let row = sqlx::query(
            "SELECT record_json FROM grading_records WHERE id = ? ORDER BY seq DESC LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| decode(&r.get::<String, _>("record_json")))
            .transpose()
    }

    async fn clear(&self) -> Result<usize> {
        let result = sqlx::query("DELETE FROM grading_records")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}
