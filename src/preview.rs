//! HTML preview of a proposal
//!
//! Produces unstyled semantic HTML; theming is applied by the client. Section
//! bodies are Markdown (raw HTML passes through), everything else is escaped.

use crate::models::{ImagePlacement, Proposal, Section};
use pulldown_cmark::{html, Options, Parser};
use pulldown_cmark_escape::escape_html;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_html(&mut out, text).map(|()| out).unwrap_or_default()
}

fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

fn placement_class(placement: Option<ImagePlacement>) -> &'static str {
    placement.unwrap_or(ImagePlacement::FullWidth).as_str()
}

fn render_section(out: &mut String, section: &Section) {
    out.push_str(&format!(
        "<section id=\"section-{}\" data-position=\"{}\">\n",
        section.id, section.position
    ));
    out.push_str(&format!("<h2>{}</h2>\n", escape(&section.content.title)));

    if !section.images.is_empty() {
        out.push_str(&format!(
            "<div class=\"images {}\">\n",
            placement_class(section.content.image_placement)
        ));
        for image in &section.images {
            out.push_str(&format!("<img src=\"{}\" alt=\"\">\n", escape(&image.url)));
        }
        out.push_str("</div>\n");
    }

    out.push_str(&markdown_to_html(&section.content.content_html));

    if let Some(chart) = &section.content.mermaid_chart {
        out.push_str(&format!("<pre class=\"mermaid\">{}</pre>\n", escape(chart)));
    }
    out.push_str("</section>\n");
}

/// Render the proposal as a standalone HTML document, sections in position order
pub fn render(proposal: &Proposal) -> String {
    let details = &proposal.details;
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(&details.title)));
    out.push_str("</head>\n<body>\n<header>\n");

    if let Some(logo) = &details.company_logo_url {
        out.push_str(&format!("<img class=\"logo\" src=\"{}\" alt=\"\">\n", escape(logo)));
    }
    out.push_str(&format!("<h1>{}</h1>\n", escape(&details.title)));
    out.push_str(&format!(
        "<p class=\"client\">Prepared for {}</p>\n",
        escape(&details.client_name)
    ));
    if let Some(company) = &details.company_name {
        out.push_str(&format!("<p class=\"company\">Prepared by {}</p>\n", escape(company)));
    }
    if let Some(contact) = &details.company_contact {
        out.push_str(&format!("<p class=\"contact\">{}</p>\n", escape(contact)));
    }
    out.push_str("</header>\n<main>\n");

    let mut sections: Vec<&Section> = proposal.sections.iter().collect();
    sections.sort_by_key(|s| s.position);
    for section in sections {
        render_section(&mut out, section);
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}
