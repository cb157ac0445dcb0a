use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::candidate::{CandidateRecord, PipelineStage};
use crate::models::profile::normalize_handle;
use crate::scout::formatting::CandidateCard;
use crate::scout::models::SearchRequest;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

/// POST /api/v1/scout
pub async fn handle_scout(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<CandidateCard>>, AppError> {
    let timeout = state.config.scout.search_timeout;
    let ranked = tokio::time::timeout(timeout, state.pipeline.run_search(req))
        .await
        .map_err(|_| AppError::Timeout(timeout.as_secs()))??;

    Ok(Json(ranked.iter().map(CandidateCard::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<CandidateRecord>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    Ok(Json(state.candidates.list(limit).await?))
}

/// GET /api/v1/candidates/:handle
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<CandidateRecord>, AppError> {
    let handle = normalize_handle(&handle);
    state
        .candidates
        .find_by_handle(&handle)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Candidate @{handle} not found")))
}

#[derive(Debug, Deserialize)]
pub struct StageUpdate {
    pub pipeline_stage: Option<String>,
}

/// PATCH /api/v1/candidates/:handle/stage
pub async fn handle_update_stage(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Json(req): Json<StageUpdate>,
) -> Result<Json<CandidateRecord>, AppError> {
    let stage = req
        .pipeline_stage
        .as_deref()
        .map(str::parse::<PipelineStage>)
        .transpose()
        .map_err(AppError::Validation)?;

    let handle = normalize_handle(&handle);
    let updated = state
        .ranking
        .set_stage(&handle, stage)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate @{handle} not found")))?;

    info!("Stage update for @{handle} applied");
    Ok(Json(updated))
}
