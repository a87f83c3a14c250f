//! Section models and DTOs

use crate::error::AppError;
use crate::models::Image;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Where attached images are laid out relative to the section text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImagePlacement {
    FullWidth,
    InlineLeft,
    InlineRight,
}

impl ImagePlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePlacement::FullWidth => "full-width",
            ImagePlacement::InlineLeft => "inline-left",
            ImagePlacement::InlineRight => "inline-right",
        }
    }
}

impl FromStr for ImagePlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-width" => Ok(ImagePlacement::FullWidth),
            "inline-left" => Ok(ImagePlacement::InlineLeft),
            "inline-right" => Ok(ImagePlacement::InlineRight),
            other => Err(format!("unknown image placement '{}'", other)),
        }
    }
}

/// Mermaid diagram families the chart agent can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Flowchart,
    Gantt,
    Sequence,
    Mindmap,
    Pie,
    UserJourney,
    C4,
}

impl ChartType {
    pub const ALL: [ChartType; 7] = [
        ChartType::Flowchart,
        ChartType::Gantt,
        ChartType::Sequence,
        ChartType::Mindmap,
        ChartType::Pie,
        ChartType::UserJourney,
        ChartType::C4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Flowchart => "flowchart",
            ChartType::Gantt => "gantt",
            ChartType::Sequence => "sequence",
            ChartType::Mindmap => "mindmap",
            ChartType::Pie => "pie",
            ChartType::UserJourney => "user_journey",
            ChartType::C4 => "c4",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::ALL
            .into_iter()
            .find(|chart_type| chart_type.as_str() == s)
            .ok_or_else(|| format!("unknown chart type '{}'", s))
    }
}

/// The editable body of a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionContent {
    pub title: String,
    pub content_html: String,
    pub image_placement: Option<ImagePlacement>,
    pub mermaid_chart: Option<String>,
    pub chart_type: Option<ChartType>,
}

impl SectionContent {
    pub fn new(title: impl Into<String>, content_html: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content_html: content_html.into(),
            image_placement: None,
            mermaid_chart: None,
            chart_type: None,
        }
    }

    /// True when the text a reader sees differs, which is what history tracks
    pub fn text_differs(&self, other: &SectionContent) -> bool {
        self.title != other.title || self.content_html != other.content_html
    }
}

/// An ordered content block of a proposal
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub proposal_id: Uuid,
    /// 0-based; positions of a proposal's sections are always `0..n`
    pub position: i32,
    #[serde(flatten)]
    pub content: SectionContent,
    pub images: Vec<Image>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a section's text taken before it was changed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionVersion {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}

/// Request to append a section to a proposal
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionRequest {
    #[validate(length(min = 1, max = 255, message = "Section title must be between 1 and 255 characters"))]
    pub title: String,
    #[serde(default)]
    pub content_html: String,
    pub image_placement: Option<ImagePlacement>,
}

impl CreateSectionRequest {
    pub fn into_content(self) -> Result<SectionContent, AppError> {
        self.validate()?;
        Ok(SectionContent {
            image_placement: self.image_placement,
            ..SectionContent::new(self.title, self.content_html)
        })
    }
}

/// AI enhancement options, shared by the enhance endpoint and section updates
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceSectionRequest {
    #[validate(length(max = 2000, message = "Instructions are too long"))]
    pub instructions: Option<String>,
    #[validate(length(max = 64, message = "Tone is too long"))]
    pub tone: Option<String>,
    #[serde(default)]
    pub focus_points: Vec<String>,
}

/// Request to update a section; may ask the AI agent to enhance the merged content
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionRequest {
    #[validate(length(min = 1, max = 255, message = "Section title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    pub content_html: Option<String>,
    pub image_placement: Option<ImagePlacement>,
    pub expected_version: Option<i32>,
    #[validate(nested)]
    pub enhance: Option<EnhanceSectionRequest>,
}

impl UpdateSectionRequest {
    /// Merge the provided fields over `current`
    pub fn merge_into(&self, current: &SectionContent) -> SectionContent {
        SectionContent {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            content_html: self
                .content_html
                .clone()
                .unwrap_or_else(|| current.content_html.clone()),
            image_placement: self.image_placement.or(current.image_placement),
            mermaid_chart: current.mermaid_chart.clone(),
            chart_type: current.chart_type,
        }
    }
}

/// Request to reorder every section of a proposal
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderSectionsRequest {
    pub section_ids: Vec<Uuid>,
    pub expected_version: Option<i32>,
}

/// Request to generate section content from keywords
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateContentRequest {
    #[validate(length(min = 1, max = 500, message = "Keywords must be between 1 and 500 characters"))]
    pub keywords: String,
}

/// Request to generate a Mermaid chart
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateChartRequest {
    pub chart_type: ChartType,
    #[validate(length(min = 1, max = 2000, message = "Description must be between 1 and 2000 characters"))]
    pub description: String,
}

/// Request to modify the chart stored on a section
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChartRequest {
    #[validate(length(min = 1, max = 2000, message = "Prompt must be between 1 and 2000 characters"))]
    pub prompt: String,
}

/// Chart code returned by the chart endpoints that do not persist
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    pub chart_type: ChartType,
    pub mermaid_chart: String,
}

/// Chart type suggested for a section's content
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSuggestion {
    pub section_id: Uuid,
    pub suggestion: Option<ChartType>,
}

/// Improvement suggestions for a section's text; empty for an empty section
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSuggestions {
    pub section_id: Uuid,
    pub suggestions: Vec<String>,
}

/// Bullet points to expand into a paragraph
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExpandBulletsRequest {
    #[validate(length(min = 1, max = 30, message = "Provide between 1 and 30 bullet points"))]
    pub bullet_points: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedText {
    pub expanded_text: String,
}
