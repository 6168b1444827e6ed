//! # Sheet Grader Core
//!
//! Pure grading logic for sheet-grader: answer keys, similarity scoring,
//! per-question evaluation, the grading engine, record models, and the
//! history store abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or logging. Grading
//! is a synchronous computation over its inputs; persistence and answer
//! extraction live in the application crate.
//!
//! ## Data Flow
//!
//! ```text
//! extracted answers ─┐
//! answer key ────────┼──▶ engine::grade ──▶ evaluate (×N) ──▶ GradingRecord
//! threshold ─────────┘                        │
//!                                             └─ similarity::score
//! ```

pub mod engine;
pub mod error;
pub mod evaluate;
pub mod history;
pub mod key;
pub mod models;
pub mod similarity;
pub mod threshold;

pub use engine::{check_preconditions, grade, grade_at, parse_extracted_answers, try_grade};
pub use error::GradingError;
pub use key::AnswerKey;
pub use models::{GradingRecord, QuestionResult, Summary};
pub use threshold::Threshold;
