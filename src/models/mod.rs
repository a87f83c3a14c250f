//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains the domain entities and all request/response structures used by the API.

pub mod image;
pub mod proposal;
pub mod section;

// Re-export commonly used types
pub use image::*;
pub use proposal::*;
pub use section::*;

use crate::error::{validation_error, AppError};
use serde::de::IgnoredAny;
use serde::Serialize;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Message-only response (no data)
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Styling lives entirely in the frontend. Payloads still sent by older
/// clients carry `custom_css`; it is refused rather than dropped silently.
pub(crate) fn reject_custom_css(field: &Option<IgnoredAny>) -> Result<(), AppError> {
    if field.is_some() {
        return Err(validation_error(
            "custom_css is no longer supported: proposal styling is handled by the client",
        ));
    }
    Ok(())
}
