//! AI agent collaborators
//!
//! Content enhancement, draft writing and chart generation are delegated to
//! external language models. The service only sees the traits below; calls
//! block until the agent answers or fails, and failures are never retried.

mod groq;
pub mod mermaid;
mod prompts;

pub use groq::GroqAgent;

use crate::models::{ChartType, Proposal};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Failure of an AI agent call
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("AI agent is not configured (set GROQ_API_KEY)")]
    NotConfigured,

    #[error("AI agent request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI agent returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI agent rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("AI agent returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Input for rewriting an existing section
#[derive(Debug, Clone)]
pub struct EnhanceRequest {
    pub title: String,
    pub content: String,
    pub instructions: String,
    pub tone: String,
    pub focus_points: Vec<String>,
}

/// A section proposed by the drafting agent
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSection {
    pub title: String,
    #[serde(alias = "content", alias = "content_html")]
    pub content_html: String,
}

/// Writes and rewrites proposal text
#[async_trait]
pub trait ContentAgent: Send + Sync {
    /// Rewrite a section following the instructions; returns the new content
    async fn enhance(&self, request: &EnhanceRequest) -> Result<String, AgentError>;

    /// Write section content from a handful of keywords
    async fn generate_from_keywords(&self, title: &str, keywords: &str)
        -> Result<String, AgentError>;

    /// Draft a full set of sections for a proposal from its RFP and metadata
    async fn draft_sections(&self, proposal: &Proposal) -> Result<Vec<DraftSection>, AgentError>;

    /// A few short, actionable suggestions for improving a piece of proposal text
    async fn suggest_improvements(&self, text: &str) -> Result<Vec<String>, AgentError>;

    /// Turn bullet points into a cohesive paragraph
    async fn expand_bullets(&self, context: &str, bullets: &[String]) -> Result<String, AgentError>;
}

/// Produces Mermaid diagrams
#[async_trait]
pub trait ChartAgent: Send + Sync {
    async fn generate_chart(
        &self,
        chart_type: ChartType,
        description: &str,
    ) -> Result<String, AgentError>;

    async fn update_chart(&self, prompt: &str, current_chart: &str) -> Result<String, AgentError>;

    /// `None` when the content does not call for a chart
    async fn suggest_chart_type(&self, content: &str) -> Result<Option<ChartType>, AgentError>;
}

/// Stand-in used when no API key is configured; every call fails
pub struct DisabledAgent;

#[async_trait]
impl ContentAgent for DisabledAgent {
    async fn enhance(&self, _request: &EnhanceRequest) -> Result<String, AgentError> {
        Err(AgentError::NotConfigured)
    }

    async fn generate_from_keywords(
        &self,
        _title: &str,
        _keywords: &str,
    ) -> Result<String, AgentError> {
        Err(AgentError::NotConfigured)
    }

    async fn draft_sections(&self, _proposal: &Proposal) -> Result<Vec<DraftSection>, AgentError> {
        Err(AgentError::NotConfigured)
    }

    async fn suggest_improvements(&self, _text: &str) -> Result<Vec<String>, AgentError> {
        Err(AgentError::NotConfigured)
    }

    async fn expand_bullets(&self, _context: &str, _bullets: &[String]) -> Result<String, AgentError> {
        Err(AgentError::NotConfigured)
    }
}

#[async_trait]
impl ChartAgent for DisabledAgent {
    async fn generate_chart(
        &self,
        _chart_type: ChartType,
        _description: &str,
    ) -> Result<String, AgentError> {
        Err(AgentError::NotConfigured)
    }

    async fn update_chart(&self, _prompt: &str, _current_chart: &str) -> Result<String, AgentError> {
        Err(AgentError::NotConfigured)
    }

    async fn suggest_chart_type(&self, _content: &str) -> Result<Option<ChartType>, AgentError> {
        Err(AgentError::NotConfigured)
    }
}

/// Interpret a one-word chart suggestion from the model
pub fn parse_chart_suggestion(reply: &str) -> Option<ChartType> {
    let word: String = reply
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == ' ')
        .collect();
    let word = word.trim().replace(' ', "_");
    match word.as_str() {
        "" | "none" => None,
        "graph" | "flow" => Some(ChartType::Flowchart),
        "journey" => Some(ChartType::UserJourney),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_suggestion() {
        assert_eq!(parse_chart_suggestion("gantt"), Some(ChartType::Gantt));
        assert_eq!(parse_chart_suggestion("  Flowchart.\n"), Some(ChartType::Flowchart));
        assert_eq!(parse_chart_suggestion("user journey"), Some(ChartType::UserJourney));
        assert_eq!(parse_chart_suggestion("None"), None);
        assert_eq!(parse_chart_suggestion("a bar chart would be nice"), None);
    }

    #[tokio::test]
    async fn test_disabled_agent_fails_every_call() {
        let agent = DisabledAgent;
        assert!(matches!(
            agent.generate_from_keywords("Scope", "cloud migration").await,
            Err(AgentError::NotConfigured)
        ));
        assert!(matches!(
            agent.suggest_chart_type("timeline").await,
            Err(AgentError::NotConfigured)
        ));
    }
}
