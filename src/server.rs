//! HTTP service exposing embedding and similarity endpoints.
//!
//! Routes:
//! - `GET /health` returns `{"status": "ok"}` without touching the model.
//! - `POST /embedding` with `{"text": ...}` returns `{"embedding": [...]}`.
//! - `POST /similarity` with `{"text1": ..., "text2": ...}` returns `{"similarity": ...}`.
//!
//! Errors are JSON bodies of the form `{"error": message}`.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::config::SbertConfig;
use crate::embedding::{cosine_similarity, EmbeddingProvider, LazyModel};

pub const TEXT_REQUIRED: &str = "text is required";
pub const TEXT_PAIR_REQUIRED: &str = "text1 and text2 are required";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required text field is absent or empty.
    #[error("{0}")]
    MissingInput(&'static str),
    /// The body is not JSON or has fields of the wrong type.
    #[error("{0}")]
    BadRequest(String),
    /// Model loading, inference or similarity math failed.
    #[error("{0}")]
    Computation(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingInput(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarityRequest {
    #[serde(default)]
    pub text1: Option<String>,
    #[serde(default)]
    pub text2: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarityResponse {
    pub similarity: f32,
}

#[derive(Clone)]
struct AppState {
    model: Arc<LazyModel>,
}

/// Build the service router around a (possibly not yet loaded) model handle.
pub fn router(model: Arc<LazyModel>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/embedding", post(embedding))
        .route("/similarity", post(similarity))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { model })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn embedding(
    State(state): State<AppState>,
    payload: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    let Json(request) = payload?;
    let text = non_empty(request.text).ok_or(ApiError::MissingInput(TEXT_REQUIRED))?;

    let embedding = with_model(state.model, move |provider| provider.embed(&text)).await?;
    Ok(Json(EmbeddingResponse { embedding }))
}

async fn similarity(
    State(state): State<AppState>,
    payload: Result<Json<SimilarityRequest>, JsonRejection>,
) -> Result<Json<SimilarityResponse>, ApiError> {
    let Json(request) = payload?;
    let (Some(text1), Some(text2)) = (non_empty(request.text1), non_empty(request.text2)) else {
        return Err(ApiError::MissingInput(TEXT_PAIR_REQUIRED));
    };

    let similarity = with_model(state.model, move |provider| {
        let embeddings = provider.embed_batch(&[text1.as_str(), text2.as_str()])?;
        let [a, b] = embeddings.as_slice() else {
            anyhow::bail!("expected 2 embeddings, got {}", embeddings.len());
        };
        cosine_similarity(a, b)
    })
    .await?;
    Ok(Json(SimilarityResponse { similarity }))
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}

/// Run `f` against the model on the blocking pool, loading the model first if needed.
async fn with_model<T, F>(model: Arc<LazyModel>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn EmbeddingProvider) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let provider = model.get()?;
        f(provider.as_ref())
    })
    .await
    .map_err(|e| ApiError::Computation(e.to_string()))?
    .map_err(|e| ApiError::Computation(format!("{e:#}")))
}

/// Start the HTTP service and run until ctrl-c.
pub async fn serve(config: SbertConfig, preload: bool) -> Result<()> {
    let bind_addr = config.bind_addr();
    let model = Arc::new(LazyModel::from_config(config.embedding.clone()));

    if preload {
        let handle = Arc::clone(&model);
        tokio::task::spawn_blocking(move || handle.get().map(|_| ()))
            .await?
            .context("failed to preload embedding model")?;
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, model = %config.embedding.model, "SBERT service listening");

    axum::serve(listener, router(model))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            tracing::info!("shutting down SBERT service");
        })
        .await?;

    Ok(())
}
