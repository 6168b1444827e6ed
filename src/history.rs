//! History commands: `grader history list|show|clear`.

use anyhow::{bail, Result};

use sheet_grader_core::history::HistoryStore;

use crate::config::Config;
use crate::grade::print_record;
use crate::sqlite_store::SqliteHistoryStore;

pub async fn run_history_list(config: &Config, limit: Option<usize>, json: bool) -> Result<()> {
    let store = SqliteHistoryStore::open(config).await?;
    let mut records = store.list().await?;
    store.close().await;

    if let Some(limit) = limit {
        records.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No grading history yet.");
        return Ok(());
    }

    for r in &records {
        println!(
            "{}  {}  {:>6.1}%  {}/{}  threshold {:.2}  {}",
            r.id,
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.summary.percentage,
            r.summary.passed,
            r.summary.total_questions,
            r.summary.threshold,
            r.image_reference
        );
    }

    Ok(())
}

pub async fn run_history_show(config: &Config, id: &str, json: bool) -> Result<()> {
    let store = SqliteHistoryStore::open(config).await?;
    let record = store.get(id).await;
    store.close().await;

    let Some(record) = record? else {
        bail!("grading record not found: {}", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }
    Ok(())
}

pub async fn run_history_clear(config: &Config) -> Result<()> {
    let store = SqliteHistoryStore::open(config).await?;
    let cleared = store.clear().await;
    store.close().await;
    println!("Cleared {} grading records.", cleared?);
    Ok(())
}
