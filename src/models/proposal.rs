//! Proposal models and DTOs

use crate::error::AppError;
use crate::models::{reject_custom_css, Section};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// How the client is billed for the proposed work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentType {
    #[serde(rename = "one-time")]
    OneTime,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "recurring")]
    Recurring,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::OneTime => "one-time",
            PaymentType::Monthly => "monthly",
            PaymentType::Recurring => "recurring",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-time" => Ok(PaymentType::OneTime),
            "monthly" => Ok(PaymentType::Monthly),
            "recurring" => Ok(PaymentType::Recurring),
            other => Err(format!("unknown payment type '{}'", other)),
        }
    }
}

/// Everything a user can edit on a proposal. Also the create payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_schedule"))]
pub struct ProposalDetails {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Client name must be between 1 and 255 characters"))]
    pub client_name: String,
    #[serde(default)]
    pub rfp_text: String,
    #[validate(range(min = 0.0, message = "Total amount cannot be negative"))]
    pub total_amount: Option<f64>,
    pub payment_type: Option<PaymentType>,
    #[validate(range(min = 0, message = "Number of deliverables cannot be negative"))]
    pub num_deliverables: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(max = 255, message = "Company name is too long"))]
    pub company_name: Option<String>,
    #[validate(url(message = "Company logo URL must be a valid URL"))]
    pub company_logo_url: Option<String>,
    #[validate(length(max = 255, message = "Company contact is too long"))]
    pub company_contact: Option<String>,
}

impl ProposalDetails {
    /// Merge the provided fields of `patch` over the current values. An
    /// explicit `null` clears an optional field.
    pub fn apply(&mut self, patch: ProposalPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(client_name) = patch.client_name {
            self.client_name = client_name;
        }
        if let Some(rfp_text) = patch.rfp_text {
            self.rfp_text = rfp_text;
        }
        if let Some(total_amount) = patch.total_amount {
            self.total_amount = total_amount;
        }
        if let Some(payment_type) = patch.payment_type {
            self.payment_type = payment_type;
        }
        if let Some(num_deliverables) = patch.num_deliverables {
            self.num_deliverables = num_deliverables;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(company_name) = patch.company_name {
            self.company_name = company_name;
        }
        if let Some(company_logo_url) = patch.company_logo_url {
            self.company_logo_url = company_logo_url;
        }
        if let Some(company_contact) = patch.company_contact {
            self.company_contact = company_contact;
        }
    }
}

fn validate_schedule(details: &ProposalDetails) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (details.start_date, details.end_date) {
        if end < start {
            let mut err = ValidationError::new("invalid_schedule");
            err.message = Some("End date cannot be before start date".into());
            return Err(err);
        }
    }
    Ok(())
}

/// Wraps a present field in `Some`, so `null` becomes `Some(None)` and an
/// absent field stays `None` through `#[serde(default)]`
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of a proposal. Absent fields keep their value, `null`
/// clears an optional one. Optional fields are validated after merging.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPatch {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Client name must be between 1 and 255 characters"))]
    pub client_name: Option<String>,
    pub rfp_text: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub total_amount: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub payment_type: Option<Option<PaymentType>>,
    #[serde(default, deserialize_with = "nullable")]
    pub num_deliverables: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub company_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub company_logo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub company_contact: Option<Option<String>>,
}

/// A proposal with its sections in position order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: ProposalDetails,
    /// Bumped on every field update and every structural change to the sections
    pub version: i32,
    pub sections: Vec<Section>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry, without section bodies
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSummary {
    pub id: Uuid,
    pub title: String,
    pub client_name: String,
    pub section_count: i64,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new proposal
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProposalRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub details: ProposalDetails,
    #[serde(default, rename = "custom_css", alias = "customCss")]
    pub custom_css: Option<IgnoredAny>,
}

impl CreateProposalRequest {
    pub fn into_details(self) -> Result<ProposalDetails, AppError> {
        reject_custom_css(&self.custom_css)?;
        self.validate()?;
        Ok(self.details)
    }
}

/// Request to update a proposal
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProposalRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub changes: ProposalPatch,
    pub expected_version: Option<i32>,
    #[serde(default, rename = "custom_css", alias = "customCss")]
    pub custom_css: Option<IgnoredAny>,
}

impl UpdateProposalRequest {
    pub fn into_parts(self) -> Result<(ProposalPatch, Option<i32>), AppError> {
        reject_custom_css(&self.custom_css)?;
        self.validate()?;
        Ok((self.changes, self.expected_version))
    }
}

/// Pagination for the proposal listing
#[derive(Debug, Default, Deserialize)]
pub struct ListProposalsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListProposalsQuery {
    pub const MAX_LIMIT: i64 = 100;

    /// Returns `(skip, limit)` with negative skips zeroed and the limit clamped
    pub fn bounds(&self) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(Self::MAX_LIMIT).clamp(1, Self::MAX_LIMIT);
        (skip, limit)
    }
}
