//! AI agent route handlers
//!
//! Each call blocks until the agent answers. Agent failures surface as
//! `AGENT_*` errors and are not retried.

use crate::error::ApiResult;
use crate::models::{
    ChartResponse, ChartSuggestion, EnhanceSectionRequest, ExpandBulletsRequest, ExpandedText,
    GenerateChartRequest, GenerateContentRequest, Proposal, Section, SectionSuggestions,
    SuccessResponse, UpdateChartRequest,
};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;
use uuid::Uuid;

/// Replace a proposal's sections with an AI draft of its RFP
pub async fn generate_draft(
    State(state): State<SharedState>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Proposal>>> {
    debug!("Generating draft for proposal: {}", proposal_id);

    let proposal = state.manager.generate_draft(proposal_id).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("Drafted {} sections.", proposal.sections.len()),
        proposal,
    )))
}

pub async fn generate_proposal_chart(
    State(state): State<SharedState>,
    Path(proposal_id): Path<Uuid>,
    Json(payload): Json<GenerateChartRequest>,
) -> ApiResult<Json<SuccessResponse<ChartResponse>>> {
    debug!("Generating {} chart for proposal {}", payload.chart_type, proposal_id);

    let chart = state
        .manager
        .generate_proposal_chart(proposal_id, payload)
        .await?;

    Ok(Json(SuccessResponse::with_data("Chart generated.", chart)))
}

pub async fn enhance_section(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EnhanceSectionRequest>,
) -> ApiResult<Json<SuccessResponse<Section>>> {
    debug!("Enhancing section: {}", id);

    let section = state.manager.enhance_section(id, payload).await?;

    Ok(Json(SuccessResponse::with_data("Section enhanced.", section)))
}

pub async fn generate_section_content(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateContentRequest>,
) -> ApiResult<Json<SuccessResponse<Section>>> {
    debug!("Generating content for section: {}", id);

    let section = state.manager.generate_section_content(id, payload).await?;

    Ok(Json(SuccessResponse::with_data("Section content generated.", section)))
}

pub async fn generate_section_chart(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateChartRequest>,
) -> ApiResult<Json<SuccessResponse<Section>>> {
    debug!("Generating {} chart for section {}", payload.chart_type, id);

    let section = state.manager.generate_section_chart(id, payload).await?;

    Ok(Json(SuccessResponse::with_data("Chart generated.", section)))
}

pub async fn update_section_chart(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateChartRequest>,
) -> ApiResult<Json<SuccessResponse<Section>>> {
    debug!("Updating chart of section: {}", id);

    let section = state.manager.update_section_chart(id, payload).await?;

    Ok(Json(SuccessResponse::with_data("Chart updated.", section)))
}

pub async fn suggest_chart_type(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<ChartSuggestion>>> {
    debug!("Suggesting chart type for section: {}", id);

    let suggestion = state.manager.suggest_chart_type(id).await?;

    Ok(Json(SuccessResponse::with_data("Chart suggestion ready.", suggestion)))
}

pub async fn suggest_improvements(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<SectionSuggestions>>> {
    debug!("Suggesting improvements for section: {}", id);

    let suggestions = state.manager.suggest_improvements(id).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("{} suggestions.", suggestions.suggestions.len()),
        suggestions,
    )))
}

/// Expand bullet points into a paragraph; nothing is stored
pub async fn expand_bullets(
    State(state): State<SharedState>,
    Path(proposal_id): Path<Uuid>,
    Json(payload): Json<ExpandBulletsRequest>,
) -> ApiResult<Json<SuccessResponse<ExpandedText>>> {
    debug!(
        "Expanding {} bullet points for proposal {}",
        payload.bullet_points.len(),
        proposal_id
    );

    let expanded = state.manager.expand_bullets(proposal_id, payload).await?;

    Ok(Json(SuccessResponse::with_data("Bullet points expanded.", expanded)))
}
