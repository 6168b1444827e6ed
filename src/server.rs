//! HTTP server.
//!
//! Exposes grading and history over a JSON API for the web front end and
//! other clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/api/version` | Application name and version |
//! | `POST`   | `/api/grade` | Grade one answer sheet |
//! | `GET`    | `/api/results` | Grading history, most recent first (`?limit=N`) |
//! | `GET`    | `/api/results/{id}` | One grading record |
//! | `DELETE` | `/api/results` | Clear grading history |
//!
//! # Grading request
//!
//! ```json
//! {
//!   "image_reference": "uploads/sheet-001.jpg",
//!   "answer_key": ["Paris", "Newton", "H2O"],
//!   "threshold": 0.8,
//!   "extracted_answers": ["paris", "Newtown", null]
//! }
//! ```
//!
//! `threshold` defaults to `[grading].default_threshold`. When
//! `extracted_answers` is omitted the configured extractor reads the image.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_threshold", "message": "..." } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request`, `invalid_key`, `invalid_threshold`, `malformed_input` | 400 |
//! | `not_found` | 404 |
//! | `extraction_failed` | 502 |
//! | `internal` | 500 |

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sheet_grader_core::history::HistoryStore;
use sheet_grader_core::key::parse_answer_key;
use sheet_grader_core::models::GradingRecord;
use sheet_grader_core::{parse_extracted_answers, GradingError, Threshold};

use crate::config::Config;
use crate::extract::{create_extractor, AnswerExtractor, ImageNotFound};
use crate::grade::{grade_sheet, GradeRequest};
use crate::sqlite_store::SqliteHistoryStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    history: Arc<dyn HistoryStore>,
    extractor: Arc<dyn AnswerExtractor>,
}

/// Start the server with the SQLite history and the configured extractor.
///
/// Binds to `[server].bind` and runs until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let history: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::open(config).await?);
    let extractor: Arc<dyn AnswerExtractor> = Arc::from(create_extractor(&config.extractor)?);
    run_server_with(config, history, extractor).await
}

/// Start the server with explicit history and extraction collaborators.
pub async fn run_server_with(
    config: &Config,
    history: Arc<dyn HistoryStore>,
    extractor: Arc<dyn AnswerExtractor>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()), history, extractor);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("grading server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(
    config: Arc<Config>,
    history: Arc<dyn HistoryStore>,
    extractor: Arc<dyn AnswerExtractor>,
) -> Router {
    let state = AppState {
        config,
        history,
        extractor,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/version", get(handle_version))
        .route("/api/grade", post(handle_grade))
        .route(
            "/api/results",
            get(handle_list_results).delete(handle_clear_results),
        )
        .route("/api/results/{id}", get(handle_get_result))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<GradingError> for AppError {
    fn from(err: GradingError) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, err.code(), err.to_string())
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        format!("{:#}", err),
    )
}

/// Map a grading failure to a response. Engine preconditions are client
/// errors; a missing image is 404; anything else came from the extractor.
fn classify_grade_error(err: anyhow::Error) -> AppError {
    if let Some(g) = err.downcast_ref::<GradingError>() {
        return g.clone().into();
    }

    let message = format!("{:#}", err);
    if err.downcast_ref::<ImageNotFound>().is_some() {
        return not_found(message);
    }

    tracing::warn!(error = %message, "answer extraction failed");
    AppError::new(StatusCode::BAD_GATEWAY, "extraction_failed", message)
}

// ============ GET /health, /api/version ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct VersionResponse {
    app: String,
    version: String,
}

async fn handle_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        app: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/grade ============

#[derive(Deserialize)]
struct GradeBody {
    #[serde(alias = "image_path")]
    image_reference: String,
    answer_key: serde_json::Value,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    extracted_answers: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct RecordResponse {
    success: bool,
    record: GradingRecord,
}

async fn handle_grade(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<RecordResponse>, AppError> {
    let Json(value) = body.map_err(|e| bad_request(e.body_text()))?;
    let body: GradeBody = serde_json::from_value(value)
        .map_err(|e| bad_request(format!("invalid grading request: {}", e)))?;

    let threshold = body
        .threshold
        .unwrap_or(state.config.grading.default_threshold);
    Threshold::new(threshold)?;
    let answer_key = parse_answer_key(&body.answer_key)?;
    let extracted_answers = body
        .extracted_answers
        .as_ref()
        .map(parse_extracted_answers)
        .transpose()?;

    let request = GradeRequest {
        image_reference: body.image_reference,
        answer_key: answer_key.into(),
        threshold,
        extracted_answers,
    };

    let record = grade_sheet(state.extractor.as_ref(), state.history.as_ref(), request)
        .await
        .map_err(classify_grade_error)?;

    Ok(Json(RecordResponse {
        success: true,
        record,
    }))
}

// ============ /api/results ============

#[derive(Deserialize)]
struct ResultsQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ResultsResponse {
    success: bool,
    results: Vec<GradingRecord>,
}

async fn handle_list_results(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<ResultsResponse>, AppError> {
    let mut results = state.history.list().await.map_err(internal)?;
    if let Some(limit) = query.limit {
        results.truncate(limit);
    }
    Ok(Json(ResultsResponse {
        success: true,
        results,
    }))
}

async fn handle_get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, AppError> {
    let record = state
        .history
        .get(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("grading record not found: {}", id)))?;
    Ok(Json(RecordResponse {
        success: true,
        record,
    }))
}

#[derive(Serialize)]
struct ClearResponse {
    success: bool,
    cleared: usize,
}

async fn handle_clear_results(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, AppError> {
    let cleared = state.history.clear().await.map_err(internal)?;
    tracing::info!(cleared, "grading history cleared");
    Ok(Json(ClearResponse {
        success: true,
        cleared,
    }))
}
