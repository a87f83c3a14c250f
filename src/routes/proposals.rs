//! Proposal route handlers

use crate::error::ApiResult;
use crate::models::{
    CreateProposalRequest, CreateSectionRequest, ListProposalsQuery, MessageResponse, Proposal,
    ProposalSummary, ReorderSectionsRequest, Section, SuccessResponse, UpdateProposalRequest,
};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use tracing::debug;
use uuid::Uuid;

/// Create a new proposal
pub async fn create_proposal(
    State(state): State<SharedState>,
    Json(payload): Json<CreateProposalRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Proposal>>)> {
    debug!("Creating proposal: {}", payload.details.title);

    let proposal = state.manager.create_proposal(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Proposal created successfully.", proposal)),
    ))
}

/// List proposals, newest first
pub async fn list_proposals(
    State(state): State<SharedState>,
    Query(query): Query<ListProposalsQuery>,
) -> ApiResult<Json<SuccessResponse<Vec<ProposalSummary>>>> {
    debug!("Listing proposals: {:?}", query);

    let proposals = state.manager.list_proposals(&query).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} proposals.", proposals.len()),
        proposals,
    )))
}

/// Get a proposal with its ordered sections
pub async fn get_proposal(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Proposal>>> {
    debug!("Getting proposal: {}", id);

    let proposal = state.manager.get_proposal(id).await?;

    Ok(Json(SuccessResponse::with_data("Proposal retrieved.", proposal)))
}

/// Partially update a proposal
pub async fn update_proposal(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProposalRequest>,
) -> ApiResult<Json<SuccessResponse<Proposal>>> {
    debug!("Updating proposal: {}", id);

    let proposal = state.manager.update_proposal(id, payload).await?;

    Ok(Json(SuccessResponse::with_data("Proposal updated successfully.", proposal)))
}

/// Delete a proposal and its sections
pub async fn delete_proposal(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    debug!("Deleting proposal: {}", id);

    state.manager.delete_proposal(id).await?;

    Ok(Json(MessageResponse::new(format!("Proposal {} deleted.", id))))
}

/// Unstyled HTML rendering of the proposal
pub async fn preview_proposal(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Html<String>> {
    debug!("Rendering preview for proposal: {}", id);

    Ok(Html(state.manager.preview_proposal(id).await?))
}

/// Append a section to a proposal
pub async fn create_section(
    State(state): State<SharedState>,
    Path(proposal_id): Path<Uuid>,
    Json(payload): Json<CreateSectionRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Section>>)> {
    debug!("Creating section '{}' in proposal {}", payload.title, proposal_id);

    let section = state.manager.create_section(proposal_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Section created successfully.", section)),
    ))
}

/// Apply a new order to all sections of a proposal
pub async fn reorder_sections(
    State(state): State<SharedState>,
    Path(proposal_id): Path<Uuid>,
    Json(payload): Json<ReorderSectionsRequest>,
) -> ApiResult<Json<SuccessResponse<Vec<Section>>>> {
    debug!(
        "Reordering {} sections of proposal {}",
        payload.section_ids.len(),
        proposal_id
    );

    let sections = state.manager.reorder_sections(proposal_id, payload).await?;

    Ok(Json(SuccessResponse::with_data("Sections reordered.", sections)))
}
