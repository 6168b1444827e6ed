//! Grading record types.
//!
//! These are the values produced by [`crate::engine::grade`] and handed to
//! history stores and presentation layers. Field names and value ranges are
//! a serialization contract: `similarity` and `threshold` are in `[0, 1]`,
//! `percentage` is in `[0, 100]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::key::AnswerKey;

/// Verdict for a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    /// 1-based question number.
    pub question_index: usize,
    pub expected: String,
    /// Extracted student answer; empty when nothing was recognized.
    pub student: String,
    pub similarity: f64,
    pub passed: bool,
}

/// Aggregate statistics for a grading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Always equal to the answer key length.
    pub total_questions: usize,
    pub passed: usize,
    /// `100 * passed / total_questions`.
    pub percentage: f64,
    /// Echo of the threshold used for the run.
    pub threshold: f64,
}

/// Immutable snapshot of one grading run and the unit of history.
///
/// `results` serializes as a JSON object keyed by question number
/// (`{"1": {...}, "2": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Opaque reference to the scanned sheet; never opened by the engine.
    pub image_reference: String,
    pub answer_key: AnswerKey,
    pub summary: Summary,
    pub results: BTreeMap<usize, QuestionResult>,
}

impl GradingRecord {
    /// Results in question order.
    pub fn questions(&self) -> impl Iterator<Item = &QuestionResult> {
        self.results.values()
    }
}
