//! Groq chat-completions client
//!
//! Groq exposes an OpenAI-compatible API, so this speaks the plain
//! `/chat/completions` JSON protocol over a shared `reqwest::Client`.

use crate::agent::{
    mermaid, parse_chart_suggestion, prompts, AgentError, ChartAgent, ContentAgent, DraftSection,
    EnhanceRequest,
};
use crate::config::AgentConfig;
use crate::models::{ChartType, Proposal};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid json fence regex"));

/// Longest section excerpt sent along with a suggestion request
const SUGGESTION_EXCERPT_CHARS: usize = 2000;

const MAX_SUGGESTIONS: usize = 5;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Sampling settings for one kind of call
struct Sampling {
    temperature: f32,
    max_tokens: u32,
}

const WRITING: Sampling = Sampling { temperature: 0.7, max_tokens: 2048 };
const DRAFTING: Sampling = Sampling { temperature: 0.7, max_tokens: 6144 };
const DIAGRAM: Sampling = Sampling { temperature: 0.5, max_tokens: 1024 };
const CLASSIFY: Sampling = Sampling { temperature: 0.2, max_tokens: 16 };
const SUGGESTING: Sampling = Sampling { temperature: 0.7, max_tokens: 512 };
const EXPANDING: Sampling = Sampling { temperature: 0.6, max_tokens: 1024 };

/// Content and chart agent backed by Groq
pub struct GroqAgent {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    diagram_model: String,
}

impl GroqAgent {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let api_key = config.api_key.clone().ok_or(AgentError::NotConfigured)?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            diagram_model: config.diagram_model.clone(),
        })
    }

    async fn complete(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        sampling: &Sampling,
    ) -> Result<String, AgentError> {
        let body = ChatRequest {
            model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };

        debug!(model = %model, prompt_len = prompt.len(), "Calling Groq chat completions");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            error!(status_code = status.as_u16(), error_body = %body, "Groq API returned error status");

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(AgentError::RateLimited(body));
            }
            return Err(AgentError::Status { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AgentError::InvalidResponse("empty completion".to_string()));
        }

        info!(model = %model, reply_len = content.len(), "Groq completion received");
        Ok(content)
    }
}

#[async_trait]
impl ContentAgent for GroqAgent {
    async fn enhance(&self, request: &EnhanceRequest) -> Result<String, AgentError> {
        let prompt = prompts::enhance(request);
        self.complete(&self.model, prompts::WRITER_SYSTEM, &prompt, &WRITING).await
    }

    async fn generate_from_keywords(
        &self,
        title: &str,
        keywords: &str,
    ) -> Result<String, AgentError> {
        let prompt = prompts::from_keywords(title, keywords);
        self.complete(&self.model, prompts::WRITER_SYSTEM, &prompt, &WRITING).await
    }

    async fn draft_sections(&self, proposal: &Proposal) -> Result<Vec<DraftSection>, AgentError> {
        let prompt = prompts::draft(proposal);
        let reply = self
            .complete(&self.model, prompts::WRITER_SYSTEM, &prompt, &DRAFTING)
            .await?;
        parse_draft(&reply)
    }

    async fn suggest_improvements(&self, text: &str) -> Result<Vec<String>, AgentError> {
        let excerpt: String = text.chars().take(SUGGESTION_EXCERPT_CHARS).collect();
        let prompt = prompts::suggestions(&excerpt);
        let reply = self
            .complete(&self.model, prompts::WRITER_SYSTEM, &prompt, &SUGGESTING)
            .await?;
        parse_suggestions(&reply)
    }

    async fn expand_bullets(&self, context: &str, bullets: &[String]) -> Result<String, AgentError> {
        let prompt = prompts::expand_bullets(context, bullets);
        self.complete(&self.model, prompts::WRITER_SYSTEM, &prompt, &EXPANDING).await
    }
}

#[async_trait]
impl ChartAgent for GroqAgent {
    async fn generate_chart(
        &self,
        chart_type: ChartType,
        description: &str,
    ) -> Result<String, AgentError> {
        let prompt = prompts::chart(chart_type, description);
        let reply = self
            .complete(&self.diagram_model, prompts::DIAGRAM_SYSTEM, &prompt, &DIAGRAM)
            .await?;
        mermaid::extract_chart(&reply)
    }

    async fn update_chart(&self, prompt: &str, current_chart: &str) -> Result<String, AgentError> {
        let prompt = prompts::update_chart(prompt, current_chart);
        let reply = self
            .complete(&self.diagram_model, prompts::DIAGRAM_SYSTEM, &prompt, &DIAGRAM)
            .await?;
        mermaid::extract_chart(&reply)
    }

    async fn suggest_chart_type(&self, content: &str) -> Result<Option<ChartType>, AgentError> {
        let excerpt: String = content.chars().take(SUGGESTION_EXCERPT_CHARS).collect();
        let prompt = prompts::suggest_chart(&excerpt);
        let reply = self
            .complete(&self.model, prompts::WRITER_SYSTEM, &prompt, &CLASSIFY)
            .await?;
        Ok(parse_chart_suggestion(&reply))
    }
}

/// Body of the first ```json block, or the whole reply when there is none
fn json_body(reply: &str) -> &str {
    FENCED_JSON
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply)
        .trim()
}

/// Parse the drafting agent's JSON array, fenced or bare
fn parse_draft(reply: &str) -> Result<Vec<DraftSection>, AgentError> {
    let sections: Vec<DraftSection> = serde_json::from_str(json_body(reply))
        .map_err(|e| AgentError::InvalidResponse(format!("draft is not a JSON section list: {}", e)))?;

    let sections: Vec<DraftSection> = sections
        .into_iter()
        .filter(|section| !section.title.trim().is_empty())
        .collect();

    if sections.is_empty() {
        return Err(AgentError::InvalidResponse("draft contains no sections".to_string()));
    }
    Ok(sections)
}

/// Parse a JSON array of suggestions; falls back to one suggestion per
/// bulleted or numbered line when the model ignored the format
fn parse_suggestions(reply: &str) -> Result<Vec<String>, AgentError> {
    let suggestions = match serde_json::from_str::<Vec<String>>(json_body(reply)) {
        Ok(list) => list,
        Err(_) => reply
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.starts_with("```") && !line.ends_with(':'))
            .map(|line| {
                line.trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '-' | '*' | '.' | ')'))
                    .trim()
                    .to_string()
            })
            .collect(),
    };

    let suggestions: Vec<String> = suggestions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect();

    if suggestions.is_empty() {
        return Err(AgentError::InvalidResponse("no suggestions in reply".to_string()));
    }
    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_requires_api_key() {
        let config = AgentConfig::default();
        assert!(matches!(GroqAgent::new(&config), Err(AgentError::NotConfigured)));

        let config = AgentConfig {
            api_key: Some("gsk_test".to_string()),
            base_url: "http://localhost:9000/v1/".to_string(),
            ..AgentConfig::default()
        };
        let agent = GroqAgent::new(&config).unwrap();
        assert_eq!(agent.endpoint, "http://localhost:9000/v1/chat/completions");
    }

    #[test]
    fn test_parse_fenced_draft() {
        let reply = "Sure!\n```json\n[\n  {\"title\": \"Executive Summary\", \"contentHtml\": \"We help.\"},\n  {\"title\": \"Pricing\", \"content\": \"| Item | Cost |\"}\n]\n```";
        let sections = parse_draft(reply).unwrap();
        assert_eq!(
            sections,
            vec![
                DraftSection {
                    title: "Executive Summary".to_string(),
                    content_html: "We help.".to_string()
                },
                DraftSection {
                    title: "Pricing".to_string(),
                    content_html: "| Item | Cost |".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_bare_draft_and_failures() {
        let sections = parse_draft(r#"[{"title": "Scope", "contentHtml": "All of it"}]"#).unwrap();
        assert_eq!(sections.len(), 1);

        assert!(matches!(parse_draft("no json here"), Err(AgentError::InvalidResponse(_))));
        assert!(matches!(parse_draft("```json\n[]\n```"), Err(AgentError::InvalidResponse(_))));
        assert!(matches!(
            parse_draft(r#"[{"title": "  ", "contentHtml": "x"}]"#),
            Err(AgentError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_suggestions() {
        let reply = "```json\n[\"Lead with the client's goal\", \"Quantify the savings\", \" \"]\n```";
        assert_eq!(
            parse_suggestions(reply).unwrap(),
            vec!["Lead with the client's goal", "Quantify the savings"]
        );

        let reply = "Here you go:\n1. Shorten the intro\n2) Add a timeline\n- Name the team";
        assert_eq!(
            parse_suggestions(reply).unwrap(),
            vec!["Shorten the intro", "Add a timeline", "Name the team"]
        );

        assert!(matches!(parse_suggestions("```json\n[]\n```"), Err(AgentError::InvalidResponse(_))));
    }
}
