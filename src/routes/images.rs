//! Image library route handlers

use crate::error::ApiResult;
use crate::models::{AddImageRequest, Image, MessageResponse, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use uuid::Uuid;

/// List a user's images, newest first
pub async fn list_user_images(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Vec<Image>>>> {
    debug!("Listing images of user: {}", user_id);

    let images = state.manager.list_user_images(user_id).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} images.", images.len()),
        images,
    )))
}

/// Add an image URL to a user's library
pub async fn add_user_image(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AddImageRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Image>>)> {
    debug!("Adding image to library of user: {}", user_id);

    let image = state.manager.add_user_image(user_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Image added.", image)),
    ))
}

pub async fn delete_user_image(
    State(state): State<SharedState>,
    Path((user_id, image_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    debug!("Deleting image {} of user {}", image_id, user_id);

    state.manager.delete_user_image(user_id, image_id).await?;

    Ok(Json(MessageResponse::new(format!("Image {} deleted.", image_id))))
}
