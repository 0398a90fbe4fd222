//! HTTP API.
//!
//! Exposes the prediction service and the history store as a small JSON API.
//! Prediction and persistence are separate calls: `/predict` never writes,
//! and `/save_prediction` stores whatever rating the caller sends.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/predict` | `{ "review": string }` → `{ "predicted_rating": int }` |
//! | `POST` | `/save_prediction` | `{ "review": string, "rating": int }` → `{ "message", "timestamp" }` |
//! | `GET`  | `/history` | `{ "history": [ { id, review, rating, timestamp } ] }` |
//! | `GET`  | `/health` | Health check (returns version and backend) |
//!
//! `/save_prediction/` and `/history/` are accepted as aliases.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "missing field `review`" } }
//! ```
//!
//! Error codes: `bad_request` (400), `prediction_failed` (500),
//! `storage_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front-end
//! can call the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::history::{HistoryStore, SqliteHistoryStore};
use crate::models::HistoryRecord;
use crate::predict::{PredictError, PredictionService};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup; read-only afterwards.
    pub service: Arc<PredictionService>,
    pub history: Arc<dyn HistoryStore>,
    /// Reported by `/health`.
    pub backend: &'static str,
}

/// Starts the HTTP server.
///
/// Loads the model artifacts, opens (and if needed creates) the history
/// database, then binds to `[server].bind`. Any failure before the listener
/// is bound aborts startup; the server never runs without a model.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(PredictionService::from_config(config)?);
    info!(
        mapping = service.mapping().as_str(),
        ratings = ?service.possible_ratings(),
        "prediction service ready"
    );

    let history = Arc::new(SqliteHistoryStore::open(config).await?);
    info!(db = %config.db.path.display(), "history store ready");

    let state = AppState {
        service,
        history,
        backend: config.model.backend.as_str(),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("Rating server listening on http://{}", listener.local_addr()?);

    serve(listener, state).await
}

/// Serve `state` on an already-bound listener until the process stops.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Build the router with all routes and layers.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/predict", post(handle_predict))
        .route("/save_prediction", post(handle_save_prediction))
        .route("/save_prediction/", post(handle_save_prediction))
        .route("/history", get(handle_history))
        .route("/history/", get(handle_history))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
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

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for a failed prediction.
fn prediction_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "prediction_failed".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for a failed read or write of the history store.
fn storage_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "storage_error".to_string(),
        message: message.into(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        prediction_failed(err.to_string())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    backend: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.backend.to_string(),
    })
}

// ============ POST /predict ============

#[derive(Deserialize)]
struct PredictRequest {
    review: String,
}

#[derive(Serialize)]
struct PredictResponse {
    predicted_rating: i64,
}

/// Handler for `POST /predict`.
///
/// Inference is CPU-bound, so it runs on the blocking pool.
async fn handle_predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let Json(request) = body?;

    let service = state.service.clone();
    let prediction = tokio::task::spawn_blocking(move || service.predict(&request.review))
        .await
        .map_err(|e| {
            error!(error = %e, "prediction task failed");
            prediction_failed("prediction task failed")
        })??;

    Ok(Json(PredictResponse {
        predicted_rating: prediction.rating,
    }))
}

// ============ POST /save_prediction ============

#[derive(Deserialize)]
struct SaveRequest {
    review: String,
    rating: i64,
}

#[derive(Serialize)]
struct SaveResponse {
    message: String,
    timestamp: String,
}

/// Handler for `POST /save_prediction`.
async fn handle_save_prediction(
    State(state): State<AppState>,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, AppError> {
    let Json(request) = body?;

    let saved = state
        .history
        .append(&request.review, request.rating)
        .await
        .map_err(|e| {
            error!(error = %format!("{:#}", e), "failed to save prediction");
            storage_error(format!("failed to save prediction: {}", e))
        })?;

    info!(id = saved.id, rating = request.rating, "prediction saved");

    Ok(Json(SaveResponse {
        message: "Review saved successfully".to_string(),
        timestamp: saved.timestamp,
    }))
}

// ============ GET /history ============

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<HistoryRecord>,
}

/// Handler for `GET /history`.
async fn handle_history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, AppError> {
    let history = state.history.list_all().await.map_err(|e| {
        error!(error = %format!("{:#}", e), "failed to read history");
        storage_error(format!("failed to read history: {}", e))
    })?;

    Ok(Json(HistoryResponse { history }))
}
