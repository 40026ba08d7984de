use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{
        RankedCandidate, RecommendationContext, RecommendationSource, SlotKey, TitleId, TitleKind,
    },
    services::SlotSnapshot,
};

use super::AppState;

/// Without a `collection_id` the user's library is the seed source
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub kind: TitleKind,
    #[serde(default)]
    pub collection_id: Option<Uuid>,
    #[serde(default)]
    pub excluded_ids: HashSet<TitleId>,
    #[serde(default)]
    pub collection_name: Option<String>,
}

impl From<RecommendationRequest> for RecommendationContext {
    fn from(request: RecommendationRequest) -> Self {
        let context = match request.collection_id {
            Some(id) => RecommendationContext::collection(request.kind, id),
            None => RecommendationContext::library(request.kind),
        }
        .with_excluded(request.excluded_ids);

        match request.collection_name {
            Some(name) => context.with_collection_name(name),
            None => context,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Published,
    /// A newer request for the same slot replaced this one
    Superseded,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub generation: u64,
    pub status: RunStatus,
    pub results: Vec<RankedCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub kind: TitleKind,
    pub collection_id: Option<Uuid>,
}

impl From<StatusQuery> for SlotKey {
    fn from(query: StatusQuery) -> Self {
        let source = match query.collection_id {
            Some(collection_id) => RecommendationSource::Collection { collection_id },
            None => RecommendationSource::Library,
        };
        SlotKey {
            kind: query.kind,
            source,
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Starts a recompute for the request's slot and waits for its outcome
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let handle = state.engine.recompute(request.into())?;
    let generation = handle.generation();

    tracing::debug!(%request_id, ?generation, slot = ?handle.slot(), "Waiting for run");

    let response = match handle.wait().await {
        Some(results) => RecommendationResponse {
            generation,
            status: RunStatus::Published,
            results,
        },
        None => RecommendationResponse {
            generation,
            status: RunStatus::Superseded,
            results: Vec::new(),
        },
    };

    Ok(Json(response))
}

/// Current snapshot of one slot
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<SlotSnapshot> {
    Json(state.engine.snapshot(query.into()))
}
