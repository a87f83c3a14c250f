//! Prompt templates for the proposal agents

use crate::agent::EnhanceRequest;
use crate::models::{ChartType, Proposal};

pub const WRITER_SYSTEM: &str = "You are an expert business proposal writer. \
You write clear, persuasive, professional copy and follow formatting rules exactly.";

pub const DIAGRAM_SYSTEM: &str = "You are an expert in Mermaid.js. \
You only ever answer with valid Mermaid code inside a ```mermaid fenced block.";

pub fn enhance(request: &EnhanceRequest) -> String {
    let focus = if request.focus_points.is_empty() {
        "None specified.".to_string()
    } else {
        request.focus_points.join(", ")
    };
    let title = if request.title.trim().is_empty() {
        "Untitled"
    } else {
        request.title.as_str()
    };

    format!(
        "Enhance and refine the following section of a business proposal.\n\n\
         Current section title: {title}\n\
         Current section content:\n```\n{content}\n```\n\n\
         Enhancement instructions: {instructions}\n\
         Desired tone: {tone}\n\
         Key focus points: {focus}\n\n\
         Guidelines:\n\
         - Improve clarity, conciseness and persuasiveness.\n\
         - Keep the core message and factual accuracy of the original.\n\
         - Incorporate the focus points naturally.\n\
         - Between 150 and 300 words.\n\
         - Do not repeat the section title and do not use Markdown headings.\n\n\
         Return ONLY the enhanced content.",
        title = title,
        content = request.content,
        instructions = request.instructions,
        tone = request.tone,
        focus = focus,
    )
}

pub fn from_keywords(title: &str, keywords: &str) -> String {
    format!(
        "Write the section '{title}' of a business proposal based on these keywords: {keywords}.\n\
         Write 150 to 300 words of professional, persuasive prose.\n\
         Return ONLY the section content, without the title.",
        title = title,
        keywords = keywords,
    )
}

pub fn draft(proposal: &Proposal) -> String {
    let details = &proposal.details;
    let budget = details
        .total_amount
        .map(|amount| format!("{:.2}", amount))
        .unwrap_or_else(|| "not specified".to_string());
    let payment = details
        .payment_type
        .map(|p| p.to_string())
        .unwrap_or_else(|| "not specified".to_string());
    let schedule = match (details.start_date, details.end_date) {
        (Some(start), Some(end)) => format!("{} to {}", start, end),
        (Some(start), None) => format!("starting {}", start),
        _ => "not specified".to_string(),
    };

    format!(
        "Draft a complete business proposal titled '{title}' for the client {client}.\n\n\
         Proposing company: {company}\n\
         Budget: {budget} ({payment})\n\
         Number of deliverables: {deliverables}\n\
         Schedule: {schedule}\n\n\
         Request for proposal:\n```\n{rfp}\n```\n\n\
         Produce between 5 and 8 sections (for example Executive Summary, Scope of Work, \
         Approach, Timeline, Pricing, About Us). Write each section's content in Markdown.\n\
         Return ONLY a JSON array inside a ```json block, where every element has the keys \
         \"title\" and \"contentHtml\".",
        title = details.title,
        client = details.client_name,
        company = details.company_name.as_deref().unwrap_or("not specified"),
        budget = budget,
        payment = payment,
        deliverables = details
            .num_deliverables
            .map(|n| n.to_string())
            .unwrap_or_else(|| "not specified".to_string()),
        schedule = schedule,
        rfp = details.rfp_text,
    )
}

pub fn chart(chart_type: ChartType, description: &str) -> String {
    let rules = match chart_type {
        ChartType::Flowchart => {
            "Generate a `graph TD` flowchart. Use `-->` for connections, never `|>`. \
             Avoid special characters in node ids."
        }
        ChartType::Gantt => {
            "Generate a simple Gantt chart. Start with `gantt` and `dateFormat YYYY-MM-DD`, \
             group tasks with `section`, and write every task as `Task name :id, yyyy-mm-dd, 10d`."
        }
        ChartType::Sequence => "Generate a `sequenceDiagram` showing the interactions.",
        ChartType::Mindmap => "Generate a `mindmap` with a single root node.",
        ChartType::Pie => {
            "Generate a `pie` chart with a title and `\"Label\" : value` lines only."
        }
        ChartType::UserJourney => "Generate a `journey` diagram with a title and sections.",
        ChartType::C4 => "Generate a `C4Context` diagram of the system.",
    };

    format!(
        "{rules}\n\nDescription:\n{description}\n\n\
         Return ONLY the Mermaid code inside a ```mermaid block.",
        rules = rules,
        description = description,
    )
}

pub fn update_chart(prompt: &str, current_chart: &str) -> String {
    format!(
        "Modify the following Mermaid diagram.\n\n\
         Current diagram:\n```mermaid\n{current}\n```\n\n\
         Requested change: {prompt}\n\n\
         Keep the diagram type unless the change asks otherwise. \
         Return ONLY the full updated Mermaid code inside a ```mermaid block.",
        current = current_chart,
        prompt = prompt,
    )
}

pub fn suggest_chart(content: &str) -> String {
    let options: Vec<&str> = ChartType::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "Which diagram would best illustrate the following proposal section?\n\n\
         ```\n{content}\n```\n\n\
         Answer with exactly one word from this list: {options}, none.",
        content = content,
        options = options.join(", "),
    )
}

pub fn suggestions(text: &str) -> String {
    format!(
        "Given the following text from a business proposal, provide three concise, \
         actionable suggestions for improving it.\n\n\
         ```\n{text}\n```\n\n\
         Return ONLY a JSON array of strings inside a ```json block.",
        text = text,
    )
}

pub fn expand_bullets(context: &str, bullets: &[String]) -> String {
    let list: Vec<String> = bullets.iter().map(|b| format!("- {}", b)).collect();
    format!(
        "Expand the following bullet points into a cohesive, professional paragraph \
         for the proposal {context}.\n\n\
         Bullet points:\n{bullets}\n\n\
         Keep every point, add no new facts, and return ONLY the paragraph.",
        context = context,
        bullets = list.join("\n"),
    )
}
