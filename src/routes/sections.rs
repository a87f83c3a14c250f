//! Section route handlers

use crate::error::ApiResult;
use crate::models::{MessageResponse, Section, SectionVersion, SuccessResponse, UpdateSectionRequest};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;
use uuid::Uuid;

/// Partially update a section, optionally enhancing it with the content agent
pub async fn update_section(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSectionRequest>,
) -> ApiResult<Json<SuccessResponse<Section>>> {
    debug!("Updating section {} (enhance: {})", id, payload.enhance.is_some());

    let section = state.manager.update_section(id, payload).await?;

    Ok(Json(SuccessResponse::with_data("Section updated successfully.", section)))
}

pub async fn delete_section(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    debug!("Deleting section: {}", id);

    state.manager.delete_section(id).await?;

    Ok(Json(MessageResponse::new(format!("Section {} deleted.", id))))
}

/// Content history of a section, newest first
pub async fn list_section_versions(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Vec<SectionVersion>>>> {
    debug!("Listing versions of section: {}", id);

    let versions = state.manager.list_section_versions(id).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} versions.", versions.len()),
        versions,
    )))
}

pub async fn revert_section(
    State(state): State<SharedState>,
    Path((id, version_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SuccessResponse<Section>>> {
    debug!("Reverting section {} to version {}", id, version_id);

    let section = state.manager.revert_section(id, version_id).await?;

    Ok(Json(SuccessResponse::with_data("Section reverted.", section)))
}

/// Attach a library image to a section. Attaching twice is a no-op.
pub async fn attach_image(
    State(state): State<SharedState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SuccessResponse<Section>>> {
    debug!("Attaching image {} to section {}", image_id, id);

    let section = state.manager.attach_image(id, image_id).await?;

    Ok(Json(SuccessResponse::with_data("Image attached.", section)))
}

pub async fn detach_image(
    State(state): State<SharedState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SuccessResponse<Section>>> {
    debug!("Detaching image {} from section {}", image_id, id);

    let section = state.manager.detach_image(id, image_id).await?;

    Ok(Json(SuccessResponse::with_data("Image detached.", section)))
}
