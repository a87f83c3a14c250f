//! Image library models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A URL reference in a user's image library. No bytes are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Request to add an image to a user's library
#[derive(Debug, Deserialize, Validate)]
pub struct AddImageRequest {
    #[validate(
        length(max = 2048, message = "Image URL is too long"),
        custom(function = "validate_http_url")
    )]
    pub url: String,
}

fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => {
            let mut err = ValidationError::new("invalid_image_url");
            err.message = Some("Image URL must be an absolute http(s) URL".into());
            Err(err)
        }
    }
}
