//! Proposal storage
//!
//! `ProposalRepository` is the persistence seam of the service. Two
//! implementations exist: PostgreSQL for deployments and an in-memory store for
//! local development and tests. Both keep section positions contiguous and
//! enforce optimistic versions the same way.

mod memory;
mod postgres;
mod queries;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::{conflict_error, not_found_error, AppError};
use crate::models::{
    Image, Proposal, ProposalDetails, ProposalSummary, Section, SectionContent, SectionVersion,
};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait ProposalRepository: Send + Sync {
    async fn create_proposal(&self, details: &ProposalDetails) -> Result<Proposal, AppError>;

    /// Proposal with its sections sorted by position
    async fn get_proposal(&self, id: Uuid) -> Result<Proposal, AppError>;

    async fn list_proposals(&self, skip: i64, limit: i64) -> Result<Vec<ProposalSummary>, AppError>;

    /// Replace the proposal's details wholesale and bump its version
    async fn update_proposal(
        &self,
        id: Uuid,
        details: &ProposalDetails,
        expected_version: Option<i32>,
    ) -> Result<Proposal, AppError>;

    /// Deletes the proposal, its sections and their attachments. Images survive.
    async fn delete_proposal(&self, id: Uuid) -> Result<(), AppError>;

    /// Append a section at the end of the proposal's order
    async fn create_section(
        &self,
        proposal_id: Uuid,
        content: &SectionContent,
    ) -> Result<Section, AppError>;

    async fn get_section(&self, id: Uuid) -> Result<Section, AppError>;

    /// Store new content; snapshots the previous text into the history when it changes
    async fn update_section(
        &self,
        id: Uuid,
        content: &SectionContent,
        expected_version: Option<i32>,
    ) -> Result<Section, AppError>;

    /// Remove a section and close the gap in its siblings' positions
    async fn delete_section(&self, id: Uuid) -> Result<(), AppError>;

    /// Apply a full new order; `order` must be a permutation of the current ids
    async fn reorder_sections(
        &self,
        proposal_id: Uuid,
        order: &[Uuid],
        expected_version: Option<i32>,
    ) -> Result<Vec<Section>, AppError>;

    /// Atomically swap every section of the proposal for `sections`, in order
    async fn replace_sections(
        &self,
        proposal_id: Uuid,
        sections: &[SectionContent],
    ) -> Result<Vec<Section>, AppError>;

    /// Newest first
    async fn list_section_versions(&self, section_id: Uuid) -> Result<Vec<SectionVersion>, AppError>;

    async fn revert_section(&self, section_id: Uuid, version_id: Uuid) -> Result<Section, AppError>;

    async fn add_image(&self, owner_id: Uuid, url: &str) -> Result<Image, AppError>;

    /// Newest first
    async fn list_user_images(&self, owner_id: Uuid) -> Result<Vec<Image>, AppError>;

    /// Removes the image and its attachment records; sections are untouched
    async fn delete_image(&self, owner_id: Uuid, image_id: Uuid) -> Result<(), AppError>;

    /// Idempotent: attaching twice keeps a single attachment
    async fn attach_image(&self, section_id: Uuid, image_id: Uuid) -> Result<Section, AppError>;

    async fn detach_image(&self, section_id: Uuid, image_id: Uuid) -> Result<Section, AppError>;
}

/// Fail with a conflict when the caller's version is stale
pub(crate) fn check_version(
    entity: &str,
    id: Uuid,
    current: i32,
    expected: Option<i32>,
) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => Err(conflict_error(format!(
            "{} {} is at version {}, request expected version {}",
            entity, id, current, expected
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn proposal_not_found(id: Uuid) -> AppError {
    not_found_error(format!("Proposal {} not found", id))
}

pub(crate) fn section_not_found(id: Uuid) -> AppError {
    not_found_error(format!("Section {} not found", id))
}

pub(crate) fn image_not_found(id: Uuid) -> AppError {
    not_found_error(format!("Image {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_version() {
        let id = Uuid::new_v4();
        assert!(check_version("Proposal", id, 3, None).is_ok());
        assert!(check_version("Proposal", id, 3, Some(3)).is_ok());
        assert!(matches!(
            check_version("Proposal", id, 3, Some(2)),
            Err(AppError::Conflict(_))
        ));
    }
}
