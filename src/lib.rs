//! # Sheet Grader
//!
//! Grades scanned answer sheets against an instructor's answer key using
//! fuzzy text similarity, and keeps a history of every grading run.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Extractor  │──▶│ Grading core │──▶│   History    │
//! │ sidecar/HTTP│   │  (pure)      │   │   SQLite     │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!                      ┌──────────────────────┤
//!                      ▼                      ▼
//!                 ┌──────────┐          ┌──────────┐
//!                 │   CLI    │          │   HTTP   │
//!                 │ (grader) │          │  (Axum)  │
//!                 └──────────┘          └──────────┘
//! ```
//!
//! The scoring engine lives in the `sheet-grader-core` crate; its main
//! types are re-exported here.
//!
//! ## Quick Start
//!
//! ```bash
//! grader init
//! grader grade uploads/sheet.jpg --key Paris --key Newton --key H2O --threshold 0.8
//! grader history list
//! grader serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Database schema (idempotent) |
//! | [`sqlite_store`] | SQLite-backed grading history |
//! | [`extract`] | Answer extraction collaborators |
//! | [`grade`] | Grading service and `grader grade` |
//! | [`history`] | `grader history` commands |
//! | [`server`] | HTTP API (Axum) with CORS |

pub mod config;
pub mod db;
pub mod extract;
pub mod grade;
pub mod history;
pub mod migrate;
pub mod server;
pub mod sqlite_store;

pub use sheet_grader_core::{AnswerKey, GradingError, GradingRecord, Threshold};
