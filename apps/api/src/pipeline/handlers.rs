//! Axum route handlers for the Pipeline API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::model::Pipeline;
use crate::pipeline::service::{list_applications, load_pipeline, save_round, ApplicationListItem};
use crate::pipeline::settings::{PipelineSettings, RoundUpdate};
use crate::pipeline::view::{summarize, PipelineSummary};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DeriveRequest {
    pub pipeline: Value,
}

#[derive(Debug, Serialize)]
pub struct DeriveResponse {
    pub pipeline: Pipeline,
    pub summary: PipelineSummary,
}

#[derive(Debug, Serialize)]
pub struct PipelineResponse {
    pub application_id: Uuid,
    pub pipeline: Pipeline,
    pub summary: PipelineSummary,
}

#[derive(Debug, Serialize)]
pub struct SaveRoundResponse {
    pub application_id: Uuid,
    pub pipeline: Pipeline,
    pub summary: PipelineSummary,
    pub auto_advanced: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/pipeline/settings
pub async fn handle_get_settings(State(state): State<AppState>) -> Json<PipelineSettings> {
    Json(state.settings.as_ref().clone())
}

/// POST /api/v1/pipeline/derive
///
/// Derives the timeline for a pipeline document without touching storage.
pub async fn handle_derive(
    State(state): State<AppState>,
    Json(request): Json<DeriveRequest>,
) -> Result<Json<DeriveResponse>, AppError> {
    let pipeline = state.settings.parse_pipeline(&request.pipeline)?;
    let summary = summarize(state.settings.ordered_rounds(), &pipeline);
    Ok(Json(DeriveResponse { pipeline, summary }))
}

/// GET /api/v1/applications/:id/pipeline
pub async fn handle_get_pipeline(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> Result<Json<PipelineResponse>, AppError> {
    let pipeline = load_pipeline(state.store.as_ref(), &state.settings, application_id).await?;
    let summary = summarize(state.settings.ordered_rounds(), &pipeline);
    Ok(Json(PipelineResponse {
        application_id,
        pipeline,
        summary,
    }))
}

/// PUT /api/v1/applications/:id/pipeline/:round
///
/// Merges the update into one round. A pass schedules the next untouched
/// round in the same write.
pub async fn handle_save_round(
    State(state): State<AppState>,
    Path((application_id, round)): Path<(Uuid, String)>,
    Json(update): Json<RoundUpdate>,
) -> Result<Json<SaveRoundResponse>, AppError> {
    let patch = state.settings.validate_update(&round, update)?;
    if patch.is_empty() {
        return Err(AppError::Validation(
            "round update must set at least one field".to_string(),
        ));
    }

    let today = Utc::now().date_naive();
    let outcome = save_round(
        state.store.as_ref(),
        &state.settings,
        application_id,
        &round,
        patch,
        today,
    )
    .await?;

    let summary = summarize(state.settings.ordered_rounds(), &outcome.pipeline);
    Ok(Json(SaveRoundResponse {
        application_id,
        pipeline: outcome.pipeline,
        summary,
        auto_advanced: outcome.auto_advanced,
    }))
}

/// GET /api/v1/applications?user_id=
///
/// Applications ordered by pipeline progress, most recently applied first within a stage.
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ApplicationListItem>>, AppError> {
    let items = list_applications(state.store.as_ref(), &state.settings, params.user_id).await?;
    Ok(Json(items))
}
