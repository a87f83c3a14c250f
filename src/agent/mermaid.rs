//! Mermaid code extraction and clean-up for chart agent replies

use crate::agent::AgentError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static FENCED_MERMAID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```mermaid\s*(.*?)```").expect("valid mermaid fence regex"));
static BROKEN_ARROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|>+").expect("valid arrow regex"));
static LONG_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{3,}").expect("valid dash regex"));
static GRAPH_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^graph\s+\w+").expect("valid graph header regex"));

/// Top-level keywords a diagram may start with (compared lowercase)
const DIAGRAM_KEYWORDS: [&str; 8] = [
    "graph", "flowchart", "gantt", "pie", "sequence", "mindmap", "journey", "c4",
];

/// Pull the diagram out of a model reply and normalise it.
///
/// The reply must contain a fenced `mermaid` block with a non-empty body.
pub fn extract_chart(reply: &str) -> Result<String, AgentError> {
    let body = FENCED_MERMAID
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| {
            AgentError::InvalidResponse("reply contains no ```mermaid block".to_string())
        })?;

    if body.is_empty() {
        return Err(AgentError::InvalidResponse("mermaid block is empty".to_string()));
    }

    Ok(sanitize(body))
}

/// Repair the syntax mistakes models commonly make
pub fn sanitize(code: &str) -> String {
    let code = BROKEN_ARROW.replace_all(code, "|");
    let mut code = LONG_DASHES.replace_all(&code, "--").into_owned();

    if code.starts_with("graph") && (code.contains("gantt") || code.contains("section ")) {
        warn!("Mixed graph/gantt syntax in generated chart, switching header to gantt");
        code = GRAPH_HEADER.replace(&code, "gantt").into_owned();
    }

    if !starts_with_keyword(&code) {
        code = format!("graph TD\n{}", code);
    }

    code
}

fn starts_with_keyword(code: &str) -> bool {
    let lower = code.trim_start().to_ascii_lowercase();
    DIAGRAM_KEYWORDS.iter().any(|keyword| lower.starts_with(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extracts_fenced_block() {
        let reply = "Here you go:\n```mermaid\ngraph TD\n    A[Start] --> B[End]\n```\nEnjoy!";
        assert_eq!(extract_chart(reply).unwrap(), "graph TD\n    A[Start] --> B[End]");
    }

    #[test]
    fn test_rejects_missing_or_empty_block() {
        assert!(matches!(
            extract_chart("graph TD\n A --> B"),
            Err(AgentError::InvalidResponse(_))
        ));
        assert!(matches!(
            extract_chart("```mermaid\n   \n```"),
            Err(AgentError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_sanitize_repairs_arrows_and_dashes() {
        assert_eq!(sanitize("graph LR\n A -->|> B\n C ---> D"), "graph LR\n A -->| B\n C --> D");
    }

    #[test]
    fn test_sanitize_fixes_mixed_gantt_header() {
        let code = "graph TD\n dateFormat YYYY-MM-DD\n section Build\n Backend :a1, 2026-01-05, 30d";
        assert!(sanitize(code).starts_with("gantt\n dateFormat"));
    }

    #[test]
    fn test_sanitize_prefixes_unknown_diagrams() {
        assert_eq!(sanitize("A --> B"), "graph TD\nA --> B");
        assert_eq!(sanitize("sequenceDiagram\n A->>B: hi"), "sequenceDiagram\n A->>B: hi");
        assert_eq!(sanitize("C4Context\n title System"), "C4Context\n title System");
    }
}
