//! Proposal resource manager
//!
//! Validates requests, delegates persistence to a [`ProposalRepository`] and
//! content generation to the AI agents. Agent output is only stored once the
//! agent has answered; an agent failure leaves stored data untouched.

use crate::agent::{ChartAgent, ContentAgent, EnhanceRequest};
use crate::error::{validation_error, AppError};
use crate::models::{
    AddImageRequest, ChartResponse, ChartSuggestion, CreateProposalRequest, CreateSectionRequest,
    EnhanceSectionRequest, ExpandBulletsRequest, ExpandedText, GenerateChartRequest,
    GenerateContentRequest, Image, ListProposalsQuery, Proposal, ProposalSummary,
    ReorderSectionsRequest, Section, SectionContent, SectionSuggestions, SectionVersion,
    UpdateChartRequest, UpdateProposalRequest, UpdateSectionRequest,
};
use crate::preview;
use crate::store::{check_version, ProposalRepository};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_INSTRUCTIONS: &str = "Improve clarity, flow and persuasiveness.";
const DEFAULT_TONE: &str = "professional";

pub struct ProposalManager {
    store: Arc<dyn ProposalRepository>,
    content: Arc<dyn ContentAgent>,
    charts: Arc<dyn ChartAgent>,
}

impl ProposalManager {
    pub fn new(
        store: Arc<dyn ProposalRepository>,
        content: Arc<dyn ContentAgent>,
        charts: Arc<dyn ChartAgent>,
    ) -> Self {
        Self {
            store,
            content,
            charts,
        }
    }

    // ==================== Proposals ====================

    pub async fn create_proposal(&self, request: CreateProposalRequest) -> Result<Proposal, AppError> {
        let details = request.into_details()?;
        let proposal = self.store.create_proposal(&details).await?;
        info!("Created proposal {} for {}", proposal.id, proposal.details.client_name);
        Ok(proposal)
    }

    pub async fn get_proposal(&self, id: Uuid) -> Result<Proposal, AppError> {
        self.store.get_proposal(id).await
    }

    pub async fn list_proposals(&self, query: &ListProposalsQuery) -> Result<Vec<ProposalSummary>, AppError> {
        let (skip, limit) = query.bounds();
        self.store.list_proposals(skip, limit).await
    }

    /// Merge the provided fields over the stored details. The merged result is
    /// validated as a whole so cross-field rules still hold.
    ///
    /// The write is pinned to the version the merge was read from, so a
    /// concurrent change surfaces as a conflict instead of being overwritten.
    pub async fn update_proposal(
        &self,
        id: Uuid,
        request: UpdateProposalRequest,
    ) -> Result<Proposal, AppError> {
        let (patch, expected_version) = request.into_parts()?;
        let current = self.store.get_proposal(id).await?;
        check_version("Proposal", id, current.version, expected_version)?;

        let mut details = current.details;
        details.apply(patch);
        details.validate()?;

        let proposal = self
            .store
            .update_proposal(id, &details, Some(current.version))
            .await?;
        info!("Updated proposal {} (version {})", id, proposal.version);
        Ok(proposal)
    }

    pub async fn delete_proposal(&self, id: Uuid) -> Result<(), AppError> {
        self.store.delete_proposal(id).await?;
        info!("Deleted proposal {}", id);
        Ok(())
    }

    pub async fn preview_proposal(&self, id: Uuid) -> Result<String, AppError> {
        let proposal = self.store.get_proposal(id).await?;
        Ok(preview::render(&proposal))
    }

    // ==================== Sections ====================

    pub async fn create_section(
        &self,
        proposal_id: Uuid,
        request: CreateSectionRequest,
    ) -> Result<Section, AppError> {
        let content = request.into_content()?;
        let section = self.store.create_section(proposal_id, &content).await?;
        info!(
            "Created section {} at position {} in proposal {}",
            section.id, section.position, proposal_id
        );
        Ok(section)
    }

    /// Merge fields and, when asked, have the content agent rewrite the merged
    /// content before anything is stored. Like proposal updates, the write is
    /// pinned to the version that was merged.
    pub async fn update_section(
        &self,
        id: Uuid,
        request: UpdateSectionRequest,
    ) -> Result<Section, AppError> {
        request.validate()?;
        let current = self.store.get_section(id).await?;
        check_version("Section", id, current.version, request.expected_version)?;
        let mut content = request.merge_into(&current.content);

        if let Some(options) = &request.enhance {
            debug!("Enhancing section {} as part of update", id);
            content.content_html = self.content.enhance(&enhance_request(&content, options)).await?;
        }

        let section = self
            .store
            .update_section(id, &content, Some(current.version))
            .await?;
        info!("Updated section {} (version {})", id, section.version);
        Ok(section)
    }

    pub async fn reorder_sections(
        &self,
        proposal_id: Uuid,
        request: ReorderSectionsRequest,
    ) -> Result<Vec<Section>, AppError> {
        let sections = self
            .store
            .reorder_sections(proposal_id, &request.section_ids, request.expected_version)
            .await?;
        info!("Reordered {} sections of proposal {}", sections.len(), proposal_id);
        Ok(sections)
    }

    pub async fn delete_section(&self, id: Uuid) -> Result<(), AppError> {
        self.store.delete_section(id).await?;
        info!("Deleted section {}", id);
        Ok(())
    }

    pub async fn list_section_versions(&self, id: Uuid) -> Result<Vec<SectionVersion>, AppError> {
        self.store.list_section_versions(id).await
    }

    pub async fn revert_section(&self, id: Uuid, version_id: Uuid) -> Result<Section, AppError> {
        let section = self.store.revert_section(id, version_id).await?;
        info!("Reverted section {} to version {}", id, version_id);
        Ok(section)
    }

    // ==================== Images ====================

    pub async fn list_user_images(&self, user_id: Uuid) -> Result<Vec<Image>, AppError> {
        self.store.list_user_images(user_id).await
    }

    pub async fn add_user_image(&self, user_id: Uuid, request: AddImageRequest) -> Result<Image, AppError> {
        request.validate()?;
        let image = self.store.add_image(user_id, &request.url).await?;
        info!("Added image {} to library of user {}", image.id, user_id);
        Ok(image)
    }

    pub async fn delete_user_image(&self, user_id: Uuid, image_id: Uuid) -> Result<(), AppError> {
        self.store.delete_image(user_id, image_id).await?;
        info!("Deleted image {} of user {}", image_id, user_id);
        Ok(())
    }

    pub async fn attach_image(&self, section_id: Uuid, image_id: Uuid) -> Result<Section, AppError> {
        self.store.attach_image(section_id, image_id).await
    }

    pub async fn detach_image(&self, section_id: Uuid, image_id: Uuid) -> Result<Section, AppError> {
        self.store.detach_image(section_id, image_id).await
    }

    // ==================== AI ====================
    //
    // Operations that store agent output pin the section version the agent
    // worked from, so an edit made while the agent was busy is not overwritten.

    pub async fn enhance_section(
        &self,
        id: Uuid,
        request: EnhanceSectionRequest,
    ) -> Result<Section, AppError> {
        request.validate()?;
        let current = self.store.get_section(id).await?;
        if current.content.content_html.trim().is_empty() {
            return Err(validation_error("Section has no content to enhance"));
        }

        let mut content = current.content.clone();
        content.content_html = self.content.enhance(&enhance_request(&content, &request)).await?;
        self.store_agent_output(&current, content).await
    }

    pub async fn generate_section_content(
        &self,
        id: Uuid,
        request: GenerateContentRequest,
    ) -> Result<Section, AppError> {
        request.validate()?;
        let current = self.store.get_section(id).await?;

        let mut content = current.content.clone();
        content.content_html = self
            .content
            .generate_from_keywords(&content.title, &request.keywords)
            .await?;
        self.store_agent_output(&current, content).await
    }

    pub async fn generate_section_chart(
        &self,
        id: Uuid,
        request: GenerateChartRequest,
    ) -> Result<Section, AppError> {
        request.validate()?;
        let current = self.store.get_section(id).await?;

        let chart = self
            .charts
            .generate_chart(request.chart_type, &request.description)
            .await?;
        let mut content = current.content.clone();
        content.mermaid_chart = Some(chart);
        content.chart_type = Some(request.chart_type);
        self.store_agent_output(&current, content).await
    }

    pub async fn update_section_chart(
        &self,
        id: Uuid,
        request: UpdateChartRequest,
    ) -> Result<Section, AppError> {
        request.validate()?;
        let current = self.store.get_section(id).await?;
        let existing = current
            .content
            .mermaid_chart
            .as_deref()
            .ok_or_else(|| validation_error("Section has no chart to update"))?;

        let chart = self.charts.update_chart(&request.prompt, existing).await?;
        let mut content = current.content.clone();
        content.mermaid_chart = Some(chart);
        self.store_agent_output(&current, content).await
    }

    pub async fn suggest_chart_type(&self, id: Uuid) -> Result<ChartSuggestion, AppError> {
        let section = self.store.get_section(id).await?;
        if section.content.content_html.trim().is_empty() {
            return Ok(ChartSuggestion {
                section_id: id,
                suggestion: None,
            });
        }

        let text = format!("{}\n\n{}", section.content.title, section.content.content_html);
        let suggestion = self.charts.suggest_chart_type(&text).await?;
        Ok(ChartSuggestion {
            section_id: id,
            suggestion,
        })
    }

    /// Suggestions are returned, not stored
    pub async fn suggest_improvements(&self, id: Uuid) -> Result<SectionSuggestions, AppError> {
        let section = self.store.get_section(id).await?;
        if section.content.content_html.trim().is_empty() {
            return Ok(SectionSuggestions {
                section_id: id,
                suggestions: Vec::new(),
            });
        }

        let text = format!("{}\n\n{}", section.content.title, section.content.content_html);
        let suggestions = self.content.suggest_improvements(&text).await?;
        Ok(SectionSuggestions {
            section_id: id,
            suggestions,
        })
    }

    /// Expand bullet points in the context of a proposal; the paragraph is
    /// returned for the client to place
    pub async fn expand_bullets(
        &self,
        proposal_id: Uuid,
        request: ExpandBulletsRequest,
    ) -> Result<ExpandedText, AppError> {
        request.validate()?;
        let bullets: Vec<String> = request
            .bullet_points
            .iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if bullets.is_empty() {
            return Err(validation_error("Bullet points cannot be blank"));
        }

        let proposal = self.store.get_proposal(proposal_id).await?;
        let context = format!(
            "'{}' for {}",
            proposal.details.title, proposal.details.client_name
        );
        let expanded_text = self.content.expand_bullets(&context, &bullets).await?;
        Ok(ExpandedText { expanded_text })
    }

    /// Chart for the proposal as a whole; returned, not stored
    pub async fn generate_proposal_chart(
        &self,
        proposal_id: Uuid,
        request: GenerateChartRequest,
    ) -> Result<ChartResponse, AppError> {
        request.validate()?;
        let proposal = self.store.get_proposal(proposal_id).await?;

        let description = format!(
            "{}\n\nProposal: {} for {}",
            request.description, proposal.details.title, proposal.details.client_name
        );
        let mermaid_chart = self
            .charts
            .generate_chart(request.chart_type, &description)
            .await?;
        Ok(ChartResponse {
            chart_type: request.chart_type,
            mermaid_chart,
        })
    }

    /// Replace every section of the proposal with an AI draft
    pub async fn generate_draft(&self, proposal_id: Uuid) -> Result<Proposal, AppError> {
        let proposal = self.store.get_proposal(proposal_id).await?;
        if proposal.details.rfp_text.trim().is_empty() {
            return Err(validation_error("Proposal has no RFP text to draft from"));
        }
        if !proposal.sections.is_empty() {
            warn!(
                "Draft for proposal {} replaces {} existing sections",
                proposal_id,
                proposal.sections.len()
            );
        }

        let drafts = self.content.draft_sections(&proposal).await?;
        let contents: Vec<SectionContent> = drafts
            .into_iter()
            .map(|draft| SectionContent::new(draft.title, draft.content_html))
            .collect();

        self.store.replace_sections(proposal_id, &contents).await?;
        info!("Drafted {} sections for proposal {}", contents.len(), proposal_id);
        self.store.get_proposal(proposal_id).await
    }

    async fn store_agent_output(
        &self,
        current: &Section,
        content: SectionContent,
    ) -> Result<Section, AppError> {
        let section = self
            .store
            .update_section(current.id, &content, Some(current.version))
            .await?;
        info!("Stored agent output for section {} (version {})", section.id, section.version);
        Ok(section)
    }
}

fn enhance_request(content: &SectionContent, options: &EnhanceSectionRequest) -> EnhanceRequest {
    EnhanceRequest {
        title: content.title.clone(),
        content: content.content_html.clone(),
        instructions: options
            .instructions
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        tone: options
            .tone
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TONE.to_string()),
        focus_points: options.focus_points.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::DisabledAgent;
    use crate::store::MemoryStore;
    use crate::testing::{manager_with, sample_details, SlowAgent, StubAgent};
    use std::time::Duration;
    use crate::models::ChartType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn create_request() -> CreateProposalRequest {
        CreateProposalRequest {
            details: sample_details(),
            custom_css: None,
        }
    }

    fn section_request(title: &str, body: &str) -> CreateSectionRequest {
        serde_json::from_value(json!({ "title": title, "contentHtml": body })).unwrap()
    }

    async fn proposal_with_sections(manager: &ProposalManager, titles: &[&str]) -> (Uuid, Vec<Uuid>) {
        let proposal = manager.create_proposal(create_request()).await.unwrap();
        let mut ids = Vec::new();
        for title in titles {
            let section = manager
                .create_section(proposal.id, section_request(title, "Initial text"))
                .await
                .unwrap();
            ids.push(section.id);
        }
        (proposal.id, ids)
    }

    fn order(proposal: &Proposal) -> Vec<(String, i32)> {
        proposal
            .sections
            .iter()
            .map(|s| (s.content.title.clone(), s.position))
            .collect()
    }

    #[tokio::test]
    async fn test_create_proposal_starts_empty() {
        let manager = manager_with(StubAgent::default());
        let proposal = manager.create_proposal(create_request()).await.unwrap();

        assert!(proposal.sections.is_empty());
        assert_eq!(proposal.version, 1);
        assert_eq!(manager.get_proposal(proposal.id).await.unwrap().id, proposal.id);
    }

    #[tokio::test]
    async fn test_get_missing_proposal_is_not_found() {
        let manager = manager_with(StubAgent::default());
        assert!(matches!(
            manager.get_proposal(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager
                .create_section(Uuid::new_v4(), section_request("Intro", ""))
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reorder_scenario() {
        let manager = manager_with(StubAgent::default());
        let (proposal_id, ids) = proposal_with_sections(&manager, &["A", "B", "C"]).await;

        let request = ReorderSectionsRequest {
            section_ids: vec![ids[2], ids[0], ids[1]],
            expected_version: None,
        };
        manager.reorder_sections(proposal_id, request).await.unwrap();

        let proposal = manager.get_proposal(proposal_id).await.unwrap();
        assert_eq!(
            order(&proposal),
            vec![("C".into(), 0), ("A".into(), 1), ("B".into(), 2)]
        );
    }

    #[tokio::test]
    async fn test_reorder_requires_exact_permutation() {
        let manager = manager_with(StubAgent::default());
        let (proposal_id, ids) = proposal_with_sections(&manager, &["A", "B", "C"]).await;
        let (_, foreign) = proposal_with_sections(&manager, &["X"]).await;

        for section_ids in [
            vec![ids[0], ids[1]],
            vec![ids[0], ids[1], ids[2], foreign[0]],
            vec![ids[0], ids[0], ids[1]],
            vec![ids[0], ids[1], foreign[0]],
        ] {
            let result = manager
                .reorder_sections(
                    proposal_id,
                    ReorderSectionsRequest {
                        section_ids,
                        expected_version: None,
                    },
                )
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_stale_expected_version_conflicts_without_changes() {
        let manager = manager_with(StubAgent::default());
        let (proposal_id, ids) = proposal_with_sections(&manager, &["A", "B"]).await;
        let before = manager.get_proposal(proposal_id).await.unwrap();

        let result = manager
            .reorder_sections(
                proposal_id,
                ReorderSectionsRequest {
                    section_ids: vec![ids[1], ids[0]],
                    expected_version: Some(before.version - 1),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let update: UpdateProposalRequest =
            serde_json::from_value(json!({ "title": "New", "expectedVersion": 1 })).unwrap();
        assert!(matches!(
            manager.update_proposal(proposal_id, update).await,
            Err(AppError::Conflict(_))
        ));

        let after = manager.get_proposal(proposal_id).await.unwrap();
        assert_eq!(order(&after), order(&before));
        assert_eq!(after.details.title, before.details.title);
    }

    #[tokio::test]
    async fn test_update_proposal_merges_and_rejects_custom_css() {
        let manager = manager_with(StubAgent::default());
        let proposal = manager.create_proposal(create_request()).await.unwrap();

        let update: UpdateProposalRequest =
            serde_json::from_value(json!({ "clientName": "Initech", "expectedVersion": 1 })).unwrap();
        let updated = manager.update_proposal(proposal.id, update).await.unwrap();
        assert_eq!(updated.details.client_name, "Initech");
        assert_eq!(updated.details.title, proposal.details.title);
        assert_eq!(updated.version, 2);

        let update: UpdateProposalRequest =
            serde_json::from_value(json!({ "custom_css": "body { color: red }" })).unwrap();
        assert!(matches!(
            manager.update_proposal(proposal.id, update).await,
            Err(AppError::Validation(_))
        ));

        let stored = serde_json::to_value(manager.get_proposal(proposal.id).await.unwrap()).unwrap();
        assert!(stored.get("custom_css").is_none());
        assert!(stored.get("customCss").is_none());
    }

    #[tokio::test]
    async fn test_update_proposal_validates_merged_schedule() {
        let manager = manager_with(StubAgent::default());
        let proposal = manager.create_proposal(create_request()).await.unwrap();

        let update: UpdateProposalRequest =
            serde_json::from_value(json!({ "startDate": "2027-01-01", "endDate": "2026-01-01" }))
                .unwrap();
        assert!(matches!(
            manager.update_proposal(proposal.id, update).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_section_keeps_positions_contiguous() {
        let manager = manager_with(StubAgent::default());
        let (proposal_id, ids) = proposal_with_sections(&manager, &["A", "B", "C"]).await;

        manager.delete_section(ids[0]).await.unwrap();

        let proposal = manager.get_proposal(proposal_id).await.unwrap();
        assert_eq!(order(&proposal), vec![("B".into(), 0), ("C".into(), 1)]);
    }

    #[tokio::test]
    async fn test_attach_image_is_idempotent() {
        let manager = manager_with(StubAgent::default());
        let (_, ids) = proposal_with_sections(&manager, &["Team"]).await;
        let user = Uuid::new_v4();
        let image = manager
            .add_user_image(user, AddImageRequest { url: "https://img.example.com/t.png".into() })
            .await
            .unwrap();

        manager.attach_image(ids[0], image.id).await.unwrap();
        let section = manager.attach_image(ids[0], image.id).await.unwrap();
        assert_eq!(section.images, vec![image.clone()]);

        assert!(matches!(
            manager.attach_image(ids[0], Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager.attach_image(Uuid::new_v4(), image.id).await,
            Err(AppError::NotFound(_))
        ));

        let section = manager.detach_image(ids[0], image.id).await.unwrap();
        assert!(section.images.is_empty());
        assert!(matches!(
            manager.detach_image(ids[0], image.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_user_images_is_scoped_and_newest_first() {
        let manager = manager_with(StubAgent::default());
        let user = Uuid::new_v4();
        let first = manager
            .add_user_image(user, AddImageRequest { url: "https://img.example.com/1.png".into() })
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = manager
            .add_user_image(user, AddImageRequest { url: "https://img.example.com/2.png".into() })
            .await
            .unwrap();
        manager
            .add_user_image(Uuid::new_v4(), AddImageRequest { url: "https://img.example.com/3.png".into() })
            .await
            .unwrap();

        let images = manager.list_user_images(user).await.unwrap();
        assert_eq!(images, vec![second, first]);

        assert!(matches!(
            manager
                .add_user_image(user, AddImageRequest { url: "not a url".into() })
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_section_with_enhancement_stores_agent_output() {
        let manager = manager_with(StubAgent::default());
        let (_, ids) = proposal_with_sections(&manager, &["Scope"]).await;

        let request: UpdateSectionRequest = serde_json::from_value(json!({
            "contentHtml": "We build things",
            "enhance": { "tone": "confident", "focusPoints": ["speed"] }
        }))
        .unwrap();
        let section = manager.update_section(ids[0], request).await.unwrap();

        assert_eq!(section.content.content_html, "Enhanced (confident): We build things");
        let versions = manager.list_section_versions(ids[0]).await.unwrap();
        assert_eq!(versions[0].content_html, "Initial text");
    }

    #[tokio::test]
    async fn test_agent_failure_leaves_section_untouched() {
        let manager = manager_with(DisabledAgent);
        let (_, ids) = proposal_with_sections(&manager, &["Scope"]).await;

        let request: UpdateSectionRequest = serde_json::from_value(json!({
            "title": "Renamed",
            "contentHtml": "Changed",
            "enhance": {}
        }))
        .unwrap();
        assert!(matches!(
            manager.update_section(ids[0], request).await,
            Err(AppError::Agent(_))
        ));

        let section = manager.store.get_section(ids[0]).await.unwrap();
        assert_eq!(section.content.title, "Scope");
        assert_eq!(section.content.content_html, "Initial text");
        assert_eq!(section.version, 1);
    }

    #[tokio::test]
    async fn test_edit_during_enhancement_is_not_overwritten() {
        let manager = ProposalManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SlowAgent::new(Duration::from_millis(100))),
            Arc::new(StubAgent::default()),
        );
        let (_, ids) = proposal_with_sections(&manager, &["Scope"]).await;

        let enhance: UpdateSectionRequest =
            serde_json::from_value(json!({ "contentHtml": "Second draft", "enhance": {} })).unwrap();
        let rename: UpdateSectionRequest =
            serde_json::from_value(json!({ "title": "Scope of work" })).unwrap();

        let (enhanced, renamed) = tokio::join!(manager.update_section(ids[0], enhance), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            manager.update_section(ids[0], rename).await
        });

        assert!(matches!(enhanced, Err(AppError::Conflict(_))));
        assert_eq!(renamed.unwrap().version, 2);

        let section = manager.store.get_section(ids[0]).await.unwrap();
        assert_eq!(section.content.title, "Scope of work");
        assert_eq!(section.content.content_html, "Initial text");
        assert_eq!(section.version, 2);
    }

    #[tokio::test]
    async fn test_update_section_rejects_stale_version_before_calling_agent() {
        let manager = manager_with(DisabledAgent);
        let (_, ids) = proposal_with_sections(&manager, &["Scope"]).await;

        let request: UpdateSectionRequest = serde_json::from_value(json!({
            "contentHtml": "Changed",
            "expectedVersion": 7,
            "enhance": {}
        }))
        .unwrap();
        assert!(matches!(
            manager.update_section(ids[0], request).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_proposal_null_clears_optional_fields() {
        let manager = manager_with(StubAgent::default());
        let proposal = manager.create_proposal(create_request()).await.unwrap();

        let update: UpdateProposalRequest =
            serde_json::from_value(json!({ "endDate": null, "companyContact": null })).unwrap();
        let updated = manager.update_proposal(proposal.id, update).await.unwrap();

        assert_eq!(updated.details.end_date, None);
        assert_eq!(updated.details.company_contact, None);
        assert_eq!(updated.details.start_date, proposal.details.start_date);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_suggest_improvements() {
        let manager = manager_with(StubAgent::default());
        let (_, ids) = proposal_with_sections(&manager, &["Scope"]).await;

        let suggestions = manager.suggest_improvements(ids[0]).await.unwrap();
        assert_eq!(suggestions.section_id, ids[0]);
        assert_eq!(suggestions.suggestions.len(), 2);
    }

    #[tokio::test]
    async fn test_suggest_improvements_skips_agent_for_empty_sections() {
        let manager = manager_with(DisabledAgent);
        let proposal = manager.create_proposal(create_request()).await.unwrap();
        let section = manager
            .create_section(proposal.id, section_request("Empty", "  "))
            .await
            .unwrap();

        let suggestions = manager.suggest_improvements(section.id).await.unwrap();
        assert!(suggestions.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_expand_bullets() {
        let manager = manager_with(StubAgent::default());
        let proposal = manager.create_proposal(create_request()).await.unwrap();

        let request: ExpandBulletsRequest =
            serde_json::from_value(json!({ "bulletPoints": [" Fast checkout ", "", "Mobile first"] }))
                .unwrap();
        let expanded = manager.expand_bullets(proposal.id, request).await.unwrap();
        assert_eq!(
            expanded.expanded_text,
            "For 'Website relaunch' for Acme Corp: Fast checkout; Mobile first."
        );

        let blank: ExpandBulletsRequest =
            serde_json::from_value(json!({ "bulletPoints": ["  "] })).unwrap();
        assert!(matches!(
            manager.expand_bullets(proposal.id, blank).await,
            Err(AppError::Validation(_))
        ));

        let request: ExpandBulletsRequest =
            serde_json::from_value(json!({ "bulletPoints": ["Anything"] })).unwrap();
        assert!(matches!(
            manager.expand_bullets(Uuid::new_v4(), request).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_revert_section_restores_previous_text() {
        let manager = manager_with(StubAgent::default());
        let (_, ids) = proposal_with_sections(&manager, &["Scope"]).await;

        let request: UpdateSectionRequest =
            serde_json::from_value(json!({ "contentHtml": "Second draft" })).unwrap();
        manager.update_section(ids[0], request).await.unwrap();

        let versions = manager.list_section_versions(ids[0]).await.unwrap();
        let reverted = manager.revert_section(ids[0], versions[0].id).await.unwrap();
        assert_eq!(reverted.content.content_html, "Initial text");
        assert_eq!(manager.list_section_versions(ids[0]).await.unwrap().len(), 2);

        assert!(matches!(
            manager.revert_section(ids[0], Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_chart_generation_and_update() {
        let manager = manager_with(StubAgent::default());
        let (proposal_id, ids) = proposal_with_sections(&manager, &["Timeline"]).await;

        let request = GenerateChartRequest {
            chart_type: ChartType::Gantt,
            description: "Three phases".into(),
        };
        let section = manager.generate_section_chart(ids[0], request).await.unwrap();
        assert_eq!(section.content.chart_type, Some(ChartType::Gantt));
        assert_eq!(section.content.mermaid_chart.as_deref(), Some("gantt\n  title Three phases"));

        let section = manager
            .update_section_chart(ids[0], UpdateChartRequest { prompt: "add QA".into() })
            .await
            .unwrap();
        assert_eq!(
            section.content.mermaid_chart.as_deref(),
            Some("gantt\n  title Three phases\n%% add QA")
        );

        let chart = manager
            .generate_proposal_chart(
                proposal_id,
                GenerateChartRequest {
                    chart_type: ChartType::Pie,
                    description: "Budget split".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(chart.chart_type, ChartType::Pie);
        let proposal = manager.get_proposal(proposal_id).await.unwrap();
        assert_eq!(proposal.sections[0].content.chart_type, Some(ChartType::Gantt));
    }

    #[tokio::test]
    async fn test_update_chart_requires_existing_chart() {
        let manager = manager_with(StubAgent::default());
        let (_, ids) = proposal_with_sections(&manager, &["Timeline"]).await;

        assert!(matches!(
            manager
                .update_section_chart(ids[0], UpdateChartRequest { prompt: "add QA".into() })
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_draft_replaces_sections() {
        let manager = manager_with(StubAgent::default());
        let (proposal_id, _) = proposal_with_sections(&manager, &["Old"]).await;

        let proposal = manager.generate_draft(proposal_id).await.unwrap();
        assert_eq!(
            order(&proposal),
            vec![("Executive Summary".into(), 0), ("Pricing".into(), 1)]
        );
    }

    #[tokio::test]
    async fn test_generate_draft_needs_rfp_text() {
        let manager = manager_with(StubAgent::default());
        let mut request = create_request();
        request.details.rfp_text = String::new();
        let proposal = manager.create_proposal(request).await.unwrap();

        assert!(matches!(
            manager.generate_draft(proposal.id).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_suggest_chart_type_skips_agent_for_empty_sections() {
        let manager = manager_with(DisabledAgent);
        let proposal = manager.create_proposal(create_request()).await.unwrap();
        let section = manager
            .create_section(proposal.id, section_request("Empty", ""))
            .await
            .unwrap();

        let suggestion = manager.suggest_chart_type(section.id).await.unwrap();
        assert_eq!(suggestion.suggestion, None);
    }

    #[tokio::test]
    async fn test_delete_proposal_cascades() {
        let manager = ProposalManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StubAgent::default()),
            Arc::new(StubAgent::default()),
        );
        let (proposal_id, ids) = proposal_with_sections(&manager, &["A"]).await;

        manager.delete_proposal(proposal_id).await.unwrap();
        assert!(matches!(
            manager.list_section_versions(ids[0]).await,
            Err(AppError::NotFound(_))
        ));
        assert!(manager
            .list_proposals(&ListProposalsQuery::default())
            .await
            .unwrap()
            .is_empty());
    }
}
