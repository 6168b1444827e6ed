//! Answer key validation.
//!
//! An [`AnswerKey`] is the ordered list of instructor-supplied answers for a
//! single grading run. Questions are numbered from 1. A key can only be
//! constructed through validation, so every `AnswerKey` in the system is
//! non-empty and contains no blank entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GradingError;

/// Ordered, immutable list of expected answers.
///
/// Serializes as a plain JSON array of strings. Deserialization runs the
/// same validation as [`AnswerKey::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AnswerKey {
    answers: Vec<String>,
}

impl AnswerKey {
    /// Validate and wrap an ordered list of expected answers.
    ///
    /// # Errors
    ///
    /// [`GradingError::InvalidKey`] if the list is empty or any entry is
    /// empty or whitespace-only.
    pub fn new(answers: Vec<String>) -> Result<Self, GradingError> {
        if answers.is_empty() {
            return Err(GradingError::InvalidKey(
                "answer key must contain at least one answer".to_string(),
            ));
        }
        if let Some(pos) = answers.iter().position(|a| a.trim().is_empty()) {
            return Err(GradingError::InvalidKey(format!(
                "answer for question {} is empty",
                pos + 1
            )));
        }
        Ok(Self { answers })
    }

    /// Number of questions in the key.
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Whether the key has no questions. Never true for a validated key.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Expected answer for a 1-based question number.
    pub fn get(&self, question: usize) -> Option<&str> {
        question
            .checked_sub(1)
            .and_then(|i| self.answers.get(i))
            .map(String::as_str)
    }

    /// Iterate `(question_number, expected)` pairs, numbering from 1.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.answers
            .iter()
            .enumerate()
            .map(|(i, a)| (i + 1, a.as_str()))
    }
}

impl TryFrom<Vec<String>> for AnswerKey {
    type Error = GradingError;

    fn try_from(answers: Vec<String>) -> Result<Self, Self::Error> {
        AnswerKey::new(answers)
    }
}

impl From<AnswerKey> for Vec<String> {
    fn from(key: AnswerKey) -> Self {
        key.answers
    }
}

/// Parse an answer key from loosely-typed JSON.
///
/// Accepts either a bare array of strings or an object with an `answers`
/// array, matching the answer-key files instructors already keep.
pub fn parse_answer_key(value: &Value) -> Result<AnswerKey, GradingError> {
    let list = match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("answers")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                GradingError::InvalidKey("expected an `answers` array".to_string())
            })?,
        other => {
            return Err(GradingError::InvalidKey(format!(
                "expected a list of answers, got {}",
                json_kind(other)
            )))
        }
    };

    let answers = list
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(GradingError::InvalidKey(format!(
                "answer for question {} must be a string, got {}",
                i + 1,
                json_kind(other)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    AnswerKey::new(answers)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
