//! Per-question evaluation.

use crate::models::QuestionResult;
use crate::similarity;
use crate::threshold::Threshold;

/// Score one question and apply the threshold.
///
/// A missing answer (`None`) is graded as an empty string: it scores `0.0`
/// and is an ordinary result, never an error.
pub fn evaluate(
    question_index: usize,
    expected: &str,
    actual: Option<&str>,
    threshold: Threshold,
) -> QuestionResult {
    let student = actual.unwrap_or_default();
    let similarity = similarity::score(expected, student);
    QuestionResult {
        question_index,
        expected: expected.to_string(),
        student: student.to_string(),
        similarity,
        passed: threshold.admits(similarity),
    }
}
