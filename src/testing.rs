//! Shared fixtures for unit tests

use crate::agent::{AgentError, ChartAgent, ContentAgent, DraftSection, EnhanceRequest};
use crate::models::{ChartType, PaymentType, Proposal, ProposalDetails};
use crate::service::ProposalManager;
use crate::store::MemoryStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

pub fn sample_details() -> ProposalDetails {
    ProposalDetails {
        title: "Website relaunch".to_string(),
        client_name: "Acme Corp".to_string(),
        rfp_text: "Acme needs a faster storefront with a new checkout.".to_string(),
        total_amount: Some(48_000.0),
        payment_type: Some(PaymentType::OneTime),
        num_deliverables: Some(3),
        start_date: NaiveDate::from_ymd_opt(2026, 11, 2),
        end_date: NaiveDate::from_ymd_opt(2027, 2, 26),
        company_name: Some("Studio North".to_string()),
        company_logo_url: Some("https://studionorth.example.com/logo.png".to_string()),
        company_contact: Some("hello@studionorth.example.com".to_string()),
    }
}

/// Deterministic agent that echoes its input
#[derive(Default)]
pub struct StubAgent;

#[async_trait]
impl ContentAgent for StubAgent {
    async fn enhance(&self, request: &EnhanceRequest) -> Result<String, AgentError> {
        Ok(format!("Enhanced ({}): {}", request.tone, request.content))
    }

    async fn generate_from_keywords(&self, title: &str, keywords: &str) -> Result<String, AgentError> {
        Ok(format!("{} about {}", title, keywords))
    }

    async fn draft_sections(&self, _proposal: &Proposal) -> Result<Vec<DraftSection>, AgentError> {
        Ok(vec![
            DraftSection {
                title: "Executive Summary".to_string(),
                content_html: "We will relaunch the storefront.".to_string(),
            },
            DraftSection {
                title: "Pricing".to_string(),
                content_html: "| Item | Cost |\n|---|---|\n| Build | 48000 |".to_string(),
            },
        ])
    }

    async fn suggest_improvements(&self, _text: &str) -> Result<Vec<String>, AgentError> {
        Ok(vec![
            "Lead with the client's goal".to_string(),
            "Quantify the savings".to_string(),
        ])
    }

    async fn expand_bullets(&self, context: &str, bullets: &[String]) -> Result<String, AgentError> {
        Ok(format!("For {}: {}.", context, bullets.join("; ")))
    }
}

/// Content agent that answers like [`StubAgent`] after a delay
pub struct SlowAgent {
    delay: Duration,
}

impl SlowAgent {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ContentAgent for SlowAgent {
    async fn enhance(&self, request: &EnhanceRequest) -> Result<String, AgentError> {
        tokio::time::sleep(self.delay).await;
        StubAgent.enhance(request).await
    }

    async fn generate_from_keywords(&self, title: &str, keywords: &str) -> Result<String, AgentError> {
        tokio::time::sleep(self.delay).await;
        StubAgent.generate_from_keywords(title, keywords).await
    }

    async fn draft_sections(&self, proposal: &Proposal) -> Result<Vec<DraftSection>, AgentError> {
        tokio::time::sleep(self.delay).await;
        StubAgent.draft_sections(proposal).await
    }

    async fn suggest_improvements(&self, text: &str) -> Result<Vec<String>, AgentError> {
        tokio::time::sleep(self.delay).await;
        StubAgent.suggest_improvements(text).await
    }

    async fn expand_bullets(&self, context: &str, bullets: &[String]) -> Result<String, AgentError> {
        tokio::time::sleep(self.delay).await;
        StubAgent.expand_bullets(context, bullets).await
    }
}

#[async_trait]
impl ChartAgent for StubAgent {
    async fn generate_chart(&self, chart_type: ChartType, description: &str) -> Result<String, AgentError> {
        Ok(format!("{}\n  title {}", chart_type.as_str(), description))
    }

    async fn update_chart(&self, prompt: &str, current_chart: &str) -> Result<String, AgentError> {
        Ok(format!("{}\n%% {}", current_chart, prompt))
    }

    async fn suggest_chart_type(&self, _content: &str) -> Result<Option<ChartType>, AgentError> {
        Ok(Some(ChartType::Flowchart))
    }
}

/// Manager over a fresh in-memory store, with `agent` for both content and charts
pub fn manager_with<A>(agent: A) -> ProposalManager
where
    A: ContentAgent + ChartAgent + 'static,
{
    let agent = Arc::new(agent);
    ProposalManager::new(Arc::new(MemoryStore::new()), agent.clone(), agent)
}
