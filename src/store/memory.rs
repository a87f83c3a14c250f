//! In-memory repository
//!
//! Whole-store `RwLock`: every mutation holds the write guard for its full
//! duration, which makes each operation atomic.

use crate::error::AppError;
use crate::models::{
    Image, Proposal, ProposalDetails, ProposalSummary, Section, SectionContent, SectionVersion,
};
use crate::ordering;
use crate::store::{
    check_version, image_not_found, proposal_not_found, section_not_found, ProposalRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct ProposalRecord {
    details: ProposalDetails,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct SectionRecord {
    proposal_id: Uuid,
    position: i32,
    content: SectionContent,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    proposals: HashMap<Uuid, ProposalRecord>,
    sections: HashMap<Uuid, SectionRecord>,
    /// Append-only history
    versions: Vec<SectionVersion>,
    images: HashMap<Uuid, Image>,
    /// `(section_id, image_id)` in attachment order
    attachments: Vec<(Uuid, Uuid)>,
}

impl State {
    fn section_ids(&self, proposal_id: Uuid) -> Vec<Uuid> {
        let mut ids: Vec<(i32, Uuid)> = self
            .sections
            .iter()
            .filter(|(_, s)| s.proposal_id == proposal_id)
            .map(|(id, s)| (s.position, *id))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn section(&self, id: Uuid) -> Result<Section, AppError> {
        let record = self.sections.get(&id).ok_or_else(|| section_not_found(id))?;
        let images = self
            .attachments
            .iter()
            .filter(|(section_id, _)| *section_id == id)
            .filter_map(|(_, image_id)| self.images.get(image_id).cloned())
            .collect();

        Ok(Section {
            id,
            proposal_id: record.proposal_id,
            position: record.position,
            content: record.content.clone(),
            images,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn sections_of(&self, proposal_id: Uuid) -> Result<Vec<Section>, AppError> {
        let sections: Vec<Section> = self
            .section_ids(proposal_id)
            .into_iter()
            .map(|id| self.section(id))
            .collect::<Result<_, _>>()?;
        debug_assert!(ordering::is_contiguous(sections.iter().map(|s| s.position)));
        Ok(sections)
    }

    fn proposal(&self, id: Uuid) -> Result<Proposal, AppError> {
        let record = self.proposals.get(&id).ok_or_else(|| proposal_not_found(id))?;
        Ok(Proposal {
            id,
            details: record.details.clone(),
            version: record.version,
            sections: self.sections_of(id)?,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn proposal_mut(&mut self, id: Uuid) -> Result<&mut ProposalRecord, AppError> {
        self.proposals.get_mut(&id).ok_or_else(|| proposal_not_found(id))
    }

    /// Record a structural change to a proposal's sections
    fn bump_proposal(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        let proposal = self.proposal_mut(id)?;
        proposal.version += 1;
        proposal.updated_at = now;
        Ok(())
    }

    fn apply_positions(&mut self, positions: Vec<(Uuid, i32)>) {
        for (id, position) in positions {
            if let Some(section) = self.sections.get_mut(&id) {
                section.position = position;
            }
        }
    }

    fn snapshot(&mut self, section_id: Uuid, now: DateTime<Utc>) {
        if let Some(section) = self.sections.get(&section_id) {
            self.versions.push(SectionVersion {
                id: Uuid::new_v4(),
                section_id,
                title: section.content.title.clone(),
                content_html: section.content.content_html.clone(),
                created_at: now,
            });
        }
    }

    fn remove_section(&mut self, id: Uuid) {
        self.sections.remove(&id);
        self.versions.retain(|v| v.section_id != id);
        self.attachments.retain(|(section_id, _)| *section_id != id);
    }

    fn insert_section(&mut self, proposal_id: Uuid, position: i32, content: &SectionContent, now: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.sections.insert(
            id,
            SectionRecord {
                proposal_id,
                position,
                content: content.clone(),
                version: 1,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }
}

/// Thread-safe in-memory repository
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProposalRepository for MemoryStore {
    async fn create_proposal(&self, details: &ProposalDetails) -> Result<Proposal, AppError> {
        let mut state = self.state.write().await;
        let id = Uuid::new_v4();
        let now = Utc::now();
        state.proposals.insert(
            id,
            ProposalRecord {
                details: details.clone(),
                version: 1,
                created_at: now,
                updated_at: now,
            },
        );
        state.proposal(id)
    }

    async fn get_proposal(&self, id: Uuid) -> Result<Proposal, AppError> {
        self.state.read().await.proposal(id)
    }

    async fn list_proposals(&self, skip: i64, limit: i64) -> Result<Vec<ProposalSummary>, AppError> {
        let state = self.state.read().await;
        let mut summaries: Vec<ProposalSummary> = state
            .proposals
            .iter()
            .map(|(id, record)| ProposalSummary {
                id: *id,
                title: record.details.title.clone(),
                client_name: record.details.client_name.clone(),
                section_count: state
                    .sections
                    .values()
                    .filter(|s| s.proposal_id == *id)
                    .count() as i64,
                version: record.version,
                created_at: record.created_at,
                updated_at: record.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(summaries
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn update_proposal(
        &self,
        id: Uuid,
        details: &ProposalDetails,
        expected_version: Option<i32>,
    ) -> Result<Proposal, AppError> {
        let mut state = self.state.write().await;
        let proposal = state.proposal_mut(id)?;
        check_version("Proposal", id, proposal.version, expected_version)?;

        proposal.details = details.clone();
        proposal.version += 1;
        proposal.updated_at = Utc::now();
        state.proposal(id)
    }

    async fn delete_proposal(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if state.proposals.remove(&id).is_none() {
            return Err(proposal_not_found(id));
        }
        for section_id in state.section_ids(id) {
            state.remove_section(section_id);
        }
        debug!("Deleted proposal {} from memory store", id);
        Ok(())
    }

    async fn create_section(
        &self,
        proposal_id: Uuid,
        content: &SectionContent,
    ) -> Result<Section, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        state.bump_proposal(proposal_id, now)?;

        let position = ordering::append_position(state.section_ids(proposal_id).len())?;
        let id = state.insert_section(proposal_id, position, content, now);
        state.section(id)
    }

    async fn get_section(&self, id: Uuid) -> Result<Section, AppError> {
        self.state.read().await.section(id)
    }

    async fn update_section(
        &self,
        id: Uuid,
        content: &SectionContent,
        expected_version: Option<i32>,
    ) -> Result<Section, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let record = state.sections.get(&id).ok_or_else(|| section_not_found(id))?;
        check_version("Section", id, record.version, expected_version)?;

        if record.content.text_differs(content) {
            state.snapshot(id, now);
        }
        if let Some(record) = state.sections.get_mut(&id) {
            record.content = content.clone();
            record.version += 1;
            record.updated_at = now;
        }
        state.section(id)
    }

    async fn delete_section(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let proposal_id = state
            .sections
            .get(&id)
            .map(|s| s.proposal_id)
            .ok_or_else(|| section_not_found(id))?;

        state.remove_section(id);
        let remaining: Vec<(Uuid, i32)> = state
            .sections
            .iter()
            .filter(|(_, s)| s.proposal_id == proposal_id)
            .map(|(id, s)| (*id, s.position))
            .collect();
        state.apply_positions(ordering::renumber(remaining));
        state.bump_proposal(proposal_id, Utc::now())?;
        Ok(())
    }

    async fn reorder_sections(
        &self,
        proposal_id: Uuid,
        order: &[Uuid],
        expected_version: Option<i32>,
    ) -> Result<Vec<Section>, AppError> {
        let mut state = self.state.write().await;
        let proposal = state.proposal_mut(proposal_id)?;
        check_version("Proposal", proposal_id, proposal.version, expected_version)?;

        ordering::validate_permutation(&state.section_ids(proposal_id), order)?;
        state.apply_positions(ordering::positions_from_order(order));
        state.bump_proposal(proposal_id, Utc::now())?;
        state.sections_of(proposal_id)
    }

    async fn replace_sections(
        &self,
        proposal_id: Uuid,
        sections: &[SectionContent],
    ) -> Result<Vec<Section>, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        state.bump_proposal(proposal_id, now)?;

        for section_id in state.section_ids(proposal_id) {
            state.remove_section(section_id);
        }
        for (index, content) in sections.iter().enumerate() {
            let position = ordering::append_position(index)?;
            state.insert_section(proposal_id, position, content, now);
        }
        state.sections_of(proposal_id)
    }

    async fn list_section_versions(&self, section_id: Uuid) -> Result<Vec<SectionVersion>, AppError> {
        let state = self.state.read().await;
        if !state.sections.contains_key(&section_id) {
            return Err(section_not_found(section_id));
        }
        Ok(state
            .versions
            .iter()
            .rev()
            .filter(|v| v.section_id == section_id)
            .cloned()
            .collect())
    }

    async fn revert_section(&self, section_id: Uuid, version_id: Uuid) -> Result<Section, AppError> {
        let mut state = self.state.write().await;
        if !state.sections.contains_key(&section_id) {
            return Err(section_not_found(section_id));
        }
        let target = state
            .versions
            .iter()
            .find(|v| v.id == version_id && v.section_id == section_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Version {} not found for section {}",
                    version_id, section_id
                ))
            })?;

        let now = Utc::now();
        state.snapshot(section_id, now);
        if let Some(record) = state.sections.get_mut(&section_id) {
            record.content.title = target.title;
            record.content.content_html = target.content_html;
            record.version += 1;
            record.updated_at = now;
        }
        state.section(section_id)
    }

    async fn add_image(&self, owner_id: Uuid, url: &str) -> Result<Image, AppError> {
        let mut state = self.state.write().await;
        let image = Image {
            id: Uuid::new_v4(),
            owner_id,
            url: url.to_string(),
            created_at: Utc::now(),
        };
        state.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn list_user_images(&self, owner_id: Uuid) -> Result<Vec<Image>, AppError> {
        let state = self.state.read().await;
        let mut images: Vec<Image> = state
            .images
            .values()
            .filter(|image| image.owner_id == owner_id)
            .cloned()
            .collect();
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(images)
    }

    async fn delete_image(&self, owner_id: Uuid, image_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        match state.images.get(&image_id) {
            Some(image) if image.owner_id == owner_id => {}
            _ => return Err(image_not_found(image_id)),
        }
        state.images.remove(&image_id);
        state.attachments.retain(|(_, attached)| *attached != image_id);
        Ok(())
    }

    async fn attach_image(&self, section_id: Uuid, image_id: Uuid) -> Result<Section, AppError> {
        let mut state = self.state.write().await;
        if !state.sections.contains_key(&section_id) {
            return Err(section_not_found(section_id));
        }
        if !state.images.contains_key(&image_id) {
            return Err(image_not_found(image_id));
        }
        if !state.attachments.contains(&(section_id, image_id)) {
            state.attachments.push((section_id, image_id));
        }
        state.section(section_id)
    }

    async fn detach_image(&self, section_id: Uuid, image_id: Uuid) -> Result<Section, AppError> {
        let mut state = self.state.write().await;
        if !state.sections.contains_key(&section_id) {
            return Err(section_not_found(section_id));
        }
        let before = state.attachments.len();
        state
            .attachments
            .retain(|attachment| *attachment != (section_id, image_id));
        if state.attachments.len() == before {
            return Err(AppError::NotFound(format!(
                "Image {} is not attached to section {}",
                image_id, section_id
            )));
        }
        state.section(section_id)
    }
}
