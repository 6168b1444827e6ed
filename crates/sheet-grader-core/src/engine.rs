//! The grading engine.
//!
//! [`grade`] evaluates every question of an answer key against the answers
//! extracted from a scanned sheet and returns a complete
//! [`GradingRecord`]. It is a pure, synchronous computation with no I/O
//! or logging. Callers are responsible for persisting the
//! record.
//!
//! # Alignment
//!
//! Extracted answers are matched to questions by position. The key defines
//! the number of graded questions:
//!
//! - fewer extracted answers than questions → the missing ones score `0.0`;
//! - more extracted answers than questions → the extras are ignored.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::GradingError;
use crate::evaluate::evaluate;
use crate::key::{json_kind, AnswerKey};
use crate::models::{GradingRecord, QuestionResult, Summary};
use crate::threshold::Threshold;

/// Validate the raw inputs of a grading run.
///
/// The threshold is checked first, then the key. Callers that perform
/// expensive work before grading (such as answer extraction) can run this
/// up front so bad requests fail fast.
pub fn check_preconditions(
    answer_key: Vec<String>,
    threshold: f64,
) -> Result<(AnswerKey, Threshold), GradingError> {
    let threshold = Threshold::new(threshold)?;
    let key = AnswerKey::new(answer_key)?;
    Ok((key, threshold))
}

/// Validate raw inputs and grade in one step.
///
/// Either every precondition holds and a complete record is returned, or
/// nothing is evaluated and the failing precondition is reported.
pub fn try_grade(
    image_reference: &str,
    answer_key: Vec<String>,
    extracted_answers: &[String],
    threshold: f64,
) -> Result<GradingRecord, GradingError> {
    let (key, threshold) = check_preconditions(answer_key, threshold)?;
    Ok(grade(image_reference, &key, extracted_answers, threshold))
}

/// Grade extracted answers against a key, stamping the record with the
/// current time.
pub fn grade(
    image_reference: &str,
    answer_key: &AnswerKey,
    extracted_answers: &[String],
    threshold: Threshold,
) -> GradingRecord {
    grade_at(
        image_reference,
        answer_key,
        extracted_answers,
        threshold,
        Utc::now(),
    )
}

/// Like [`grade`], with an explicit timestamp.
pub fn grade_at(
    image_reference: &str,
    answer_key: &AnswerKey,
    extracted_answers: &[String],
    threshold: Threshold,
    timestamp: DateTime<Utc>,
) -> GradingRecord {
    let results: BTreeMap<usize, QuestionResult> = answer_key
        .iter()
        .map(|(question, expected)| {
            let actual = extracted_answers.get(question - 1).map(String::as_str);
            (question, evaluate(question, expected, actual, threshold))
        })
        .collect();

    let summary = summarize(answer_key.len(), results.values(), threshold);

    GradingRecord {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp,
        image_reference: image_reference.to_string(),
        answer_key: answer_key.clone(),
        summary,
        results,
    }
}

/// Aggregate per-question verdicts into a [`Summary`].
pub fn summarize<'a>(
    total_questions: usize,
    results: impl IntoIterator<Item = &'a QuestionResult>,
    threshold: Threshold,
) -> Summary {
    let passed = results.into_iter().filter(|r| r.passed).count();
    let percentage = if total_questions == 0 {
        0.0
    } else {
        100.0 * passed as f64 / total_questions as f64
    };
    Summary {
        total_questions,
        passed,
        percentage,
        threshold: threshold.value(),
    }
}

/// Interpret loosely-typed JSON as an ordered list of extracted answers.
///
/// Accepts an array whose entries are strings or `null`; `null` means no
/// answer was recognized for that position and becomes an empty string.
///
/// # Errors
///
/// [`GradingError::MalformedInput`] for anything that is not such an array.
pub fn parse_extracted_answers(value: &Value) -> Result<Vec<String>, GradingError> {
    let items = value.as_array().ok_or_else(|| {
        GradingError::MalformedInput(format!(
            "extracted answers must be a list of strings, got {}",
            json_kind(value)
        ))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            other => Err(GradingError::MalformedInput(format!(
                "extracted answer {} must be a string, got {}",
                i + 1,
                json_kind(other)
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn key(items: &[&str]) -> AnswerKey {
        AnswerKey::new(strings(items)).unwrap()
    }

    fn t(v: f64) -> Threshold {
        Threshold::new(v).unwrap()
    }

    #[test]
    fn test_paris_newton_h2o() {
        let k = key(&["Paris", "Newton", "H2O"]);
        let record = grade("sheet-001.jpg", &k, &strings(&["paris", "Newtown", ""]), t(0.8));

        assert_eq!(record.summary.total_questions, 3);
        assert_eq!(record.image_reference, "sheet-001.jpg");

        let q1 = &record.results[&1];
        assert_eq!(q1.similarity, 1.0);
        assert!(q1.passed);

        let q2 = &record.results[&2];
        assert!(q2.similarity < 1.0);
        assert_eq!(q2.passed, q2.similarity >= 0.8);
        assert!(q2.passed, "one edit out of six should clear 0.8");

        let q3 = &record.results[&3];
        assert_eq!(q3.similarity, 0.0);
        assert!(!q3.passed);

        assert_eq!(record.summary.passed, 2);
        assert!((record.summary.percentage - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(record.summary.threshold, 0.8);
    }

    #[test]
    fn test_missing_answers_score_zero() {
        let k = key(&["a", "b", "c", "d"]);
        let record = grade("img", &k, &strings(&["a"]), t(0.5));
        assert_eq!(record.summary.total_questions, 4);
        assert_eq!(record.results.len(), 4);
        for q in 2..=4 {
            assert_eq!(record.results[&q].student, "");
            assert_eq!(record.results[&q].similarity, 0.0);
            assert!(!record.results[&q].passed);
        }
        assert_eq!(record.summary.passed, 1);
    }

    #[test]
    fn test_extra_answers_ignored() {
        let k = key(&["one", "two"]);
        let record = grade("img", &k, &strings(&["one", "two", "three", "four"]), t(0.9));
        assert_eq!(record.summary.total_questions, 2);
        let indices: Vec<usize> = record.results.keys().copied().collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(record.summary.percentage, 100.0);
    }

    #[test]
    fn test_empty_extraction_is_valid() {
        let k = key(&["x", "y"]);
        let record = grade("img", &k, &[], t(0.1));
        assert_eq!(record.summary.passed, 0);
        assert_eq!(record.summary.percentage, 0.0);
        assert!(record.questions().all(|q| q.similarity == 0.0 && !q.passed));
    }

    #[test]
    fn test_zero_threshold_passes_everything() {
        let k = key(&["x", "y"]);
        let record = grade("img", &k, &strings(&["completely different"]), t(0.0));
        assert_eq!(record.summary.passed, 2);
    }

    #[test]
    fn test_passed_invariant_across_thresholds() {
        let k = key(&["Photosynthesis", "Mitochondria", "Stomata", "Glucose"]);
        let extracted = strings(&["photosinthesis", "mitocondria", "stoma", "sugar", "extra"]);
        for th in [0.0, 0.3, 0.5, 0.75, 0.9, 1.0] {
            let record = grade("img", &k, &extracted, t(th));
            for q in record.questions() {
                assert_eq!(q.passed, q.similarity >= th, "q{} at {}", q.question_index, th);
                assert!((0.0..=1.0).contains(&q.similarity));
            }
            assert_eq!(record.summary.total_questions, k.len());
        }
    }

    #[test]
    fn test_deterministic_apart_from_identity() {
        let k = key(&["Paris", "Newton"]);
        let extracted = strings(&["Pari", "newton"]);
        let ts = Utc::now();
        let a = grade_at("img", &k, &extracted, t(0.7), ts);
        let b = grade_at("img", &k, &extracted, t(0.7), ts);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.results, b.results);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_preconditions_threshold_first() {
        let err = check_preconditions(vec![], 1.5).unwrap_err();
        assert!(matches!(err, GradingError::InvalidThreshold(_)));
        let err = check_preconditions(vec![], 0.5).unwrap_err();
        assert!(matches!(err, GradingError::InvalidKey(_)));
        let (k, th) = check_preconditions(strings(&["a"]), 0.5).unwrap();
        assert_eq!(k.len(), 1);
        assert_eq!(th.value(), 0.5);
    }

    #[test]
    fn test_parse_extracted_answers() {
        let parsed = parse_extracted_answers(&json!(["a", null, "c"])).unwrap();
        assert_eq!(parsed, strings(&["a", "", "c"]));
        assert!(parse_extracted_answers(&json!([])).unwrap().is_empty());

        let err = parse_extracted_answers(&json!("a, b")).unwrap_err();
        assert!(matches!(err, GradingError::MalformedInput(_)));
        let err = parse_extracted_answers(&json!(["a", 2])).unwrap_err();
        match err {
            GradingError::MalformedInput(msg) => assert!(msg.contains("answer 2"), "{}", msg),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_try_grade_rejects_before_scoring() {
        let err = try_grade("img", strings(&["Paris", ""]), &strings(&["Paris"]), 0.5).unwrap_err();
        assert!(matches!(err, GradingError::InvalidKey(_)));
        let err = try_grade("img", strings(&["Paris"]), &[], -0.1).unwrap_err();
        assert!(matches!(err, GradingError::InvalidThreshold(_)));
        let record = try_grade("img", strings(&["Paris"]), &strings(&["paris"]), 1.0).unwrap();
        assert_eq!(record.summary.passed, 1);
    }

    #[test]
    fn test_fractional_scores_survive_json() {
        let mut mismatches = Vec::new();
        for n in 1..=60usize {
            let expected = "a".repeat(n);
            let k = key(&[expected.as_str()]);
            for edits in 0..=n {
                let student = format!("{}{}", "b".repeat(edits), "a".repeat(n - edits));
                let threshold = t(edits as f64 / n as f64);
                let record = grade("img", &k, &[student], threshold);

                let text = serde_json::to_string(&record).unwrap();
                let back: GradingRecord = serde_json::from_str(&text).unwrap();
                if back != record {
                    mismatches.push((n, edits, record.results[&1].similarity));
                }
            }
        }
        assert!(mismatches.is_empty(), "changed after reload: {:?}", mismatches);
    }

    #[test]
    fn test_summarize_empty_total() {
        let s = summarize(0, std::iter::empty(), t(0.5));
        assert_eq!(s.percentage, 0.0);
    }
}
