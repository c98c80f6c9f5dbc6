//! HTTP API for submitting analyses and reading results.
//!
//! Every `/api/analysis` route runs as the owner named by the `x-owner-id`
//! header, which an upstream auth layer is expected to set.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/analysis/upload?filename=` | Analyze an uploaded document (raw body) |
//! | `POST` | `/api/analysis/website` | Analyze a website, body `{ "url": "..." }` |
//! | `GET`  | `/api/analysis/history` | Caller's analyses, newest first |
//! | `GET`  | `/api/analysis/report/{id}` | Full completed record |
//! | `DELETE` | `/api/analysis/record/{id}` | Delete a record and its artifact |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_ready", "message": "Analysis status is Failed. Report not ready." } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `not_found` (404),
//! `timeout` (408), `not_ready` (409), `analysis_failed` (500), `internal` (500).

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use access_scan_core::models::{AnalysisRecord, AnalysisSummary};

use crate::commands::build_analyzer;
use crate::config::Config;
use crate::pipeline::{AnalysisError, Analyzer, WEBSITE_TIMEOUT_MESSAGE};
use crate::upload::{ArtifactStorage, UploadError};

/// Header carrying the authenticated owner identity.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
    storage: ArtifactStorage,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>, storage: ArtifactStorage) -> Self {
        Self { analyzer, storage }
    }
}

/// Starts the HTTP server with the SQLite store and headless browser.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let analyzer = build_analyzer(config).await?;
    let state = AppState::new(Arc::new(analyzer), ArtifactStorage::new(&config.storage));

    // Leave headroom over the file cap for the request framing.
    let body_limit = config.storage.max_upload_bytes() as usize + 1024 * 1024;
    let app = router(state).layer(DefaultBodyLimit::max(body_limit));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router. Exposed separately so callers can mount it under a
/// different server or test it in-process.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/analysis/upload", post(handle_upload))
        .route("/api/analysis/website", post(handle_website))
        .route("/api/analysis/history", get(handle_history))
        .route("/api/analysis/report/{id}", get(handle_report))
        .route("/api/analysis/record/{id}", delete(handle_delete))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Owner identity ============

/// The caller, taken from the [`OWNER_HEADER`] header.
pub struct Owner(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Owner(v.to_string()))
            .ok_or_else(|| AppError {
                status: StatusCode::UNAUTHORIZED,
                code: "unauthorized",
                message: format!("missing {} header", OWNER_HEADER),
            })
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(e) => bad_request(e.to_string()),
            AnalysisError::NotFound => AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message: err.to_string(),
            },
            AnalysisError::NotReady(_) => AppError {
                status: StatusCode::CONFLICT,
                code: "not_ready",
                message: err.to_string(),
            },
            AnalysisError::Navigation(ref e) if e.is_timeout() => AppError {
                status: StatusCode::REQUEST_TIMEOUT,
                code: "timeout",
                message: WEBSITE_TIMEOUT_MESSAGE.to_string(),
            },
            AnalysisError::Extraction(_) | AnalysisError::Navigation(_) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "analysis_failed",
                message: err.to_string(),
            },
            AnalysisError::Persistence(ref e) => {
                error!("Storage failure: {:#}", e);
                internal("storage error")
            }
            AnalysisError::Interrupted(ref e) => {
                error!("Analysis task failed: {}", e);
                internal("analysis interrupted")
            }
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Invalid(e) => bad_request(e.to_string()),
            UploadError::Io(e) => {
                error!("Upload write failed: {}", e);
                internal("failed to store upload")
            }
        }
    }
}

// ============ Submissions ============

#[derive(Deserialize)]
struct UploadParams {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Deserialize)]
struct WebsiteRequest {
    #[serde(default)]
    url: Option<String>,
}

/// Acknowledgment for a finished submission.
#[derive(Serialize)]
struct SubmitResponse {
    message: &'static str,
    analysis_id: String,
}

/// Handler for `POST /api/analysis/upload?filename=<name>`.
async fn handle_upload(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let filename = params.filename.unwrap_or_default();
    let artifact = state.storage.store(&filename, &body).await?;
    let record = state.analyzer.analyze_document(&owner, artifact).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: "Analysis completed successfully!",
            analysis_id: record.id,
        }),
    ))
}

/// Handler for `POST /api/analysis/website`.
async fn handle_website(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<WebsiteRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let url = req.url.unwrap_or_default();
    let record = state.analyzer.analyze_website(&owner, &url).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: "Website analysis completed successfully!",
            analysis_id: record.id,
        }),
    ))
}

// ============ Reads and deletes ============

async fn handle_history(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<AnalysisSummary>>, AppError> {
    Ok(Json(state.analyzer.history(&owner).await?))
}

async fn handle_report(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<AnalysisRecord>, AppError> {
    Ok(Json(state.analyzer.report(&id, &owner).await?))
}

#[derive(Serialize)]
struct DeleteResponse {
    message: &'static str,
}

async fn handle_delete(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state
        .analyzer
        .delete(&id, &owner)
        .await
        .map_err(|e| match e {
            AnalysisError::NotFound => AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message: "Record not found or not authorized to delete.".to_string(),
            },
            other => other.into(),
        })?;
    Ok(Json(DeleteResponse {
        message: "Analysis record deleted successfully.",
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
