use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyser::{self, EvAnalysis};
use crate::config::AnalyserConfig;
use crate::error::AnalysisError;
use crate::hand::HandRecord;
use crate::store::{self, HandStore, PlayerStats, StoreError};

#[derive(Clone)]
struct AppState {
    store: Arc<dyn HandStore>,
    config: Arc<AnalyserConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyseRequest {
    seed: Option<u64>,
    samples: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecisionResult {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<EvAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Cancelled(String),
    #[error("{0}")]
    Internal(String),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Cancelled { .. } => ApiError::Cancelled(err.to_string()),
            other => ApiError::Unprocessable(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::InvalidId(_) => ApiError::Unprocessable(err.to_string()),
            StoreError::Analysis(inner) => inner.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("analysis task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub async fn serve(addr: SocketAddr, store: Arc<dyn HandStore>, config: AnalyserConfig) -> Result<()> {
    let app = router(store, config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(store: Arc<dyn HandStore>, config: AnalyserConfig) -> Router {
    build_router(AppState {
        store,
        config: Arc::new(config),
    })
}

fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/hands", post(create_hand).get(list_hands))
        .route("/hands/:id", get(fetch_hand))
        .route("/hands/:id/analyse", post(analyse_hand))
        .route("/hands/:id/actions/:index/analysis", post(analyse_decision))
        .route("/stats", get(stats));

    Router::new()
        .route("/healthz", get(health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn create_hand(
    State(state): State<AppState>,
    Json(mut hand): Json<HandRecord>,
) -> Result<(StatusCode, Json<HandRecord>), ApiError> {
    hand.validate()?;
    if hand.id.trim().is_empty() {
        hand.id = Uuid::new_v4().to_string();
    }
    state.store.save(&hand)?;
    info!(hand = %hand.id, actions = hand.betting_actions.len(), "hand stored");
    Ok((StatusCode::CREATED, Json(hand)))
}

async fn list_hands(State(state): State<AppState>) -> Result<Json<Vec<HandRecord>>, ApiError> {
    Ok(Json(state.store.list()?))
}

async fn fetch_hand(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HandRecord>, ApiError> {
    Ok(Json(state.store.load(&id)?))
}

/// Analyses every hero decision of a hand in parallel and stores the results.
async fn analyse_hand(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DecisionResult>>, ApiError> {
    let mut hand = state.store.load(&id)?;
    let shared = Arc::new(hand.clone());
    let tasks = hand.hero_decisions().into_iter().map(|index| {
        let hand = shared.clone();
        let config = state.config.clone();
        tokio::task::spawn_blocking(move || (index, analyser::analyse(&hand, index, &config)))
    });

    let mut results = Vec::new();
    for joined in join_all(tasks).await {
        let (index, outcome) = joined?;
        match outcome {
            Ok(analysis) => {
                store::attach_analysis(&mut hand, index, analysis.clone())?;
                results.push(DecisionResult {
                    index,
                    analysis: Some(analysis),
                    error: None,
                });
            }
            Err(err) => {
                store::clear_analysis(&mut hand, index);
                results.push(DecisionResult {
                    index,
                    analysis: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }
    state.store.save(&hand)?;
    Ok(Json(results))
}

async fn analyse_decision(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    body: Option<Json<AnalyseRequest>>,
) -> Result<Json<EvAnalysis>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let mut config = (*state.config).clone();
    if let Some(seed) = request.seed {
        config.seed = seed;
    }
    if let Some(samples) = request.samples {
        config.samples = samples;
    }
    let store = state.store.clone();
    let analysis =
        tokio::task::spawn_blocking(move || store::persist_analysis(store.as_ref(), &id, index, &config))
            .await??;
    Ok(Json(analysis))
}

async fn stats(State(state): State<AppState>) -> Result<Json<PlayerStats>, ApiError> {
    let hands = state.store.list()?;
    Ok(Json(store::player_stats(&hands)))
}
