//! Grading service: extraction → engine → history.
//!
//! [`grade_sheet`] is the single logical entry point used by both the CLI
//! (`grader grade`) and the HTTP server (`POST /api/grade`). It:
//!
//! 1. checks the engine preconditions (threshold, answer key) before doing
//!    any extraction work;
//! 2. obtains extracted answers, either supplied by the caller or from the
//!    configured [`AnswerExtractor`];
//! 3. grades with [`sheet_grader_core::grade`];
//! 4. appends the record to history.
//!
//! A history failure is logged and does not lose the record: it is still
//! returned to the caller.

use anyhow::{Context, Result};
use std::path::Path;

use sheet_grader_core::engine::check_preconditions;
use sheet_grader_core::history::HistoryStore;
use sheet_grader_core::key::parse_answer_key;
use sheet_grader_core::models::GradingRecord;

use crate::config::Config;
use crate::extract::{create_extractor, AnswerExtractor};
use crate::sqlite_store::SqliteHistoryStore;

/// Inputs for one grading run.
#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub image_reference: String,
    pub answer_key: Vec<String>,
    pub threshold: f64,
    /// Pre-extracted answers; when `None` the extractor is consulted.
    pub extracted_answers: Option<Vec<String>>,
}

/// Grade one sheet and record it in history.
///
/// # Errors
///
/// Precondition failures surface as [`sheet_grader_core::GradingError`]
/// (use `downcast_ref` to inspect them); extraction failures surface as the
/// extractor's error. History failures are never returned.
pub async fn grade_sheet(
    extractor: &dyn AnswerExtractor,
    history: &dyn HistoryStore,
    request: GradeRequest,
) -> Result<GradingRecord> {
    let (key, threshold) = check_preconditions(request.answer_key, request.threshold)?;

    let extracted = match request.extracted_answers {
        Some(answers) => answers,
        None => extractor
            .extract(&request.image_reference)
            .await
            .with_context(|| format!("{} extraction failed", extractor.name()))?,
    };

    let record = sheet_grader_core::grade(&request.image_reference, &key, &extracted, threshold);

    tracing::info!(
        record_id = %record.id,
        image = %record.image_reference,
        passed = record.summary.passed,
        total = record.summary.total_questions,
        "graded answer sheet"
    );

    if let Err(e) = history.append(&record).await {
        tracing::warn!(record_id = %record.id, error = %e, "failed to save grading record to history");
    }

    Ok(record)
}

/// Load an answer key file: a JSON list, `{"answers": [...]}`, or plain
/// text with one answer per line.
pub fn load_answer_key_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answer key file: {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in answer key file: {}", path.display()))?;
        let key = parse_answer_key(&value)?;
        Ok(key.into())
    } else {
        // One line per question. Only trailing blank lines are dropped.
        let mut answers: Vec<String> = content
            .lines()
            .map(|l| l.trim().to_string())
            .collect();
        while answers.last().is_some_and(|l| l.is_empty()) {
            answers.pop();
        }
        Ok(answers)
    }
}

/// Options for the `grader grade` command.
pub struct GradeOptions<'a> {
    pub image: &'a str,
    pub answer_key: Vec<String>,
    pub threshold: Option<f64>,
    pub answers: Option<Vec<String>>,
    pub output: Option<&'a Path>,
    pub json: bool,
}

/// Run the `grader grade` command.
pub async fn run_grade(config: &Config, opts: GradeOptions<'_>) -> Result<()> {
    let extractor = create_extractor(&config.extractor)?;
    let history = SqliteHistoryStore::open(config).await?;

    let request = GradeRequest {
        image_reference: opts.image.to_string(),
        answer_key: opts.answer_key,
        threshold: opts
            .threshold
            .unwrap_or(config.grading.default_threshold),
        extracted_answers: opts.answers,
    };

    let result = grade_sheet(extractor.as_ref(), &history, request).await;
    history.close().await;
    let record = result?;

    if let Some(path) = opts.output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&record)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Saved results to {}", path.display());
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Human-readable report of a grading record.
pub fn print_record(record: &GradingRecord) {
    println!("Record:    {}", record.id);
    println!("Image:     {}", record.image_reference);
    println!("Graded at: {}", record.timestamp.to_rfc3339());
    println!();

    for q in record.questions() {
        let status = if q.passed { "PASS" } else { "FAIL" };
        println!("Q{}: {} ({:.1}%)", q.question_index, status, q.similarity * 100.0);
        println!("    Expected: {}", truncate(&q.expected, 60));
        println!("    Student:  {}", truncate(&q.student, 60));
    }

    println!();
    println!(
        "Score: {:.1}%  ({}/{} passed, threshold {:.2})",
        record.summary.percentage,
        record.summary.passed,
        record.summary.total_questions,
        record.summary.threshold
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use sheet_grader_core::history::memory::InMemoryHistoryStore;
    use sheet_grader_core::GradingError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedExtractor {
        answers: Vec<String>,
        calls: AtomicUsize,
    }

    impl FixedExtractor {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AnswerExtractor for FixedExtractor {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn extract(&self, _image_reference: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answers.clone())
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistoryStore for BrokenHistory {
        async fn append(&self, _record: &GradingRecord) -> Result<()> {
            bail!("disk full")
        }
        async fn list(&self) -> Result<Vec<GradingRecord>> {
            bail!("disk full")
        }
        async fn get(&self, _id: &str) -> Result<Option<GradingRecord>> {
            bail!("disk full")
        }
        async fn clear(&self) -> Result<usize> {
            bail!("disk full")
        }
    }

    fn request(key: &[&str], threshold: f64) -> GradeRequest {
        GradeRequest {
            image_reference: "sheet.jpg".into(),
            answer_key: key.iter().map(|s| s.to_string()).collect(),
            threshold,
            extracted_answers: None,
        }
    }

    #[tokio::test]
    async fn test_grade_appends_to_history() {
        let extractor = FixedExtractor::new(&["paris", "Newtown", ""]);
        let history = InMemoryHistoryStore::new();

        let record = grade_sheet(&extractor, &history, request(&["Paris", "Newton", "H2O"], 0.8))
            .await
            .unwrap();

        assert_eq!(record.summary.total_questions, 3);
        assert_eq!(record.summary.passed, 2);
        assert_eq!(history.list().await.unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_supplied_answers_skip_extractor() {
        let extractor = FixedExtractor::new(&["wrong"]);
        let history = InMemoryHistoryStore::new();
        let mut req = request(&["Paris"], 0.9);
        req.extracted_answers = Some(vec!["PARIS".into()]);

        let record = grade_sheet(&extractor, &history, req).await.unwrap();
        assert_eq!(record.summary.passed, 1);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preconditions_checked_before_extraction() {
        let extractor = FixedExtractor::new(&["a"]);
        let history = InMemoryHistoryStore::new();

        let err = grade_sheet(&extractor, &history, request(&["a"], 1.2))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GradingError>(),
            Some(GradingError::InvalidThreshold(_))
        ));

        let err = grade_sheet(&extractor, &history, request(&[], 0.5))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GradingError>(),
            Some(GradingError::InvalidKey(_))
        ));

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_failure_still_returns_record() {
        let extractor = FixedExtractor::new(&["Paris"]);
        let record = grade_sheet(&extractor, &BrokenHistory, request(&["Paris"], 0.5))
            .await
            .unwrap();
        assert_eq!(record.summary.passed, 1);
    }

    #[test]
    fn test_load_answer_key_files() {
        let tmp = TempDir::new().unwrap();

        let list = tmp.path().join("key.json");
        std::fs::write(&list, r#"["Paris", "Newton"]"#).unwrap();
        assert_eq!(load_answer_key_file(&list).unwrap(), vec!["Paris", "Newton"]);

        let obj = tmp.path().join("obj.json");
        std::fs::write(&obj, r#"{"answers": ["H2O"]}"#).unwrap();
        assert_eq!(load_answer_key_file(&obj).unwrap(), vec!["H2O"]);

        let txt = tmp.path().join("key.txt");
        std::fs::write(&txt, "Paris\n  Newton  \n\n\n").unwrap();
        assert_eq!(load_answer_key_file(&txt).unwrap(), vec!["Paris", "Newton"]);

        let bad = tmp.path().join("bad.json");
        std::fs::write(&bad, r#"[1, 2]"#).unwrap();
        assert!(load_answer_key_file(&bad).is_err());
    }

    #[test]
    fn test_text_key_blank_line_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let txt = tmp.path().join("key.txt");
        std::fs::write(&txt, "Paris\n\nH2O\n").unwrap();

        let answers = load_answer_key_file(&txt).unwrap();
        assert_eq!(answers, vec!["Paris", "", "H2O"]);

        let err = check_preconditions(answers, 0.8).unwrap_err();
        match err {
            GradingError::InvalidKey(msg) => assert!(msg.contains("question 2"), "{}", msg),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
