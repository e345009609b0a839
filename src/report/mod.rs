//! Finalised analysis reports and their storage.
//!
//! The pipeline produces one [`ReportBundle`] per job and hands it to a
//! [`ReportStore`] keyed by [`ReportId`]. The store treats reports as opaque
//! values; the schema below is the one the advisor pipeline emits.

mod error;
mod id;
mod store;

pub use error::ReportError;
pub use id::{DataSignature, ReportId, stable_hash};
pub use store::ReportStore;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

/// Report schema version written by this crate.
pub const REPORT_VERSION: &str = "1.0";

/// Answers collected by the advisor interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewInput {
    /// Programme area the applicant works in.
    pub program_area: String,
    /// Populations served.
    pub populations: Vec<String>,
    /// Target geographies.
    pub geography: Vec<String>,
    /// Planning horizon in years.
    pub timeframe_years: Option<u32>,
    /// Lower and upper budget bounds in US dollars.
    pub budget_usd_range: Option<(Option<f64>, Option<f64>)>,
    /// Desired outcomes.
    pub outcomes: Vec<String>,
    /// Known constraints.
    pub constraints: Vec<String>,
    /// Preferred kinds of funder.
    pub preferred_funder_types: Vec<String>,
    /// Free keywords.
    pub keywords: Vec<String>,
    /// Free-form notes.
    pub notes: String,
    /// Role of the person being interviewed.
    pub user_role: String,
}

impl Default for InterviewInput {
    fn default() -> Self {
        Self {
            program_area: String::new(),
            populations: Vec::new(),
            geography: Vec::new(),
            timeframe_years: None,
            budget_usd_range: None,
            outcomes: Vec::new(),
            constraints: Vec::new(),
            preferred_funder_types: Vec::new(),
            keywords: Vec::new(),
            notes: String::new(),
            user_role: "Grant Analyst/Writer".to_owned(),
        }
    }
}

impl InterviewInput {
    /// Stable hash of the interview answers.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] if the answers cannot be encoded.
    pub fn stable_hash(&self) -> Result<String, ReportError> {
        stable_hash(self)
    }
}

/// Normalised needs derived from the interview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredNeeds {
    /// Subject tags.
    pub subjects: Vec<String>,
    /// Population tags.
    pub populations: Vec<String>,
    /// Geography codes.
    pub geographies: Vec<String>,
    /// Relative weight per tag, in insertion order.
    pub weights: IndexMap<String, f64>,
}

/// Whitelisted analysis tools a plan may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricTool {
    /// Summary statistics.
    DfDescribe,
    /// Grouped sums.
    DfGroupbySum,
    /// Largest rows by a column.
    DfTopN,
    /// Value frequencies.
    DfValueCounts,
    /// Distinct values.
    DfUnique,
    /// Equality filter.
    DfFilterEquals,
    /// Membership filter.
    DfFilterIn,
    /// Range filter.
    DfFilterRange,
    /// Pivot table.
    DfPivotTable,
    /// Strongest correlations.
    DfCorrTop,
    /// Read-only SQL selection.
    DfSqlSelect,
    /// Current chart state.
    GetChartState,
}

impl MetricTool {
    /// Wire name of the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DfDescribe => "df_describe",
            Self::DfGroupbySum => "df_groupby_sum",
            Self::DfTopN => "df_top_n",
            Self::DfValueCounts => "df_value_counts",
            Self::DfUnique => "df_unique",
            Self::DfFilterEquals => "df_filter_equals",
            Self::DfFilterIn => "df_filter_in",
            Self::DfFilterRange => "df_filter_range",
            Self::DfPivotTable => "df_pivot_table",
            Self::DfCorrTop => "df_corr_top",
            Self::DfSqlSelect => "df_sql_select",
            Self::GetChartState => "get_chart_state",
        }
    }
}

/// One metric the plan asks the executor to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRequest {
    /// Tool to run.
    pub tool: MetricTool,
    /// Tool parameters.
    #[serde(default)]
    pub params: IndexMap<String, serde_json::Value>,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Optional stable id.
    #[serde(default)]
    pub id: Option<String>,
}

/// Metrics to compute and the outline of the narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPlan {
    /// Requested metrics.
    pub metric_requests: Vec<MetricRequest>,
    /// Section headings for the narrative.
    pub narrative_outline: Vec<String>,
}

/// A computed metric, rendered as a Markdown table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Stable datapoint id (`DP-…`).
    pub id: String,
    /// Title shown with the table.
    pub title: String,
    /// Tool or method that produced it.
    pub method: String,
    /// Parameters passed to the method.
    #[serde(default)]
    pub params: IndexMap<String, serde_json::Value>,
    /// Markdown table body.
    #[serde(default)]
    pub table_md: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

/// A funder suggested by the recommendation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunderCandidate {
    /// Funder name.
    pub name: String,
    /// Fit score.
    #[serde(default)]
    pub score: f64,
    /// Why the funder fits.
    #[serde(default)]
    pub rationale: String,
    /// Datapoints backing the rationale.
    #[serde(default)]
    pub grounded_dp_ids: Vec<String>,
}

/// Advice on tailoring a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningTip {
    /// The advice.
    pub text: String,
    /// Datapoints backing the advice.
    #[serde(default)]
    pub grounded_dp_ids: Vec<String>,
}

/// A suggested follow-up search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text.
    pub query: String,
    /// Notes on using the query.
    #[serde(default)]
    pub notes: String,
}

/// Output of the recommendation stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendations {
    /// Suggested funders.
    pub funder_candidates: Vec<FunderCandidate>,
    /// Proposal tuning advice.
    pub response_tuning: Vec<TuningTip>,
    /// Follow-up searches.
    pub search_queries: Vec<SearchQuery>,
}

/// Kind of material attached to a report section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// A figure reference.
    Figure,
    /// A table.
    Table,
    /// Inline text.
    #[default]
    Text,
    /// A hyperlink.
    Link,
    /// A datapoint reference.
    DatapointRef,
}

/// Material attached to a report section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    /// Attachment kind.
    pub kind: AttachmentKind,
    /// Referenced figure or datapoint id.
    pub ref_id: Option<String>,
    /// Inline content.
    pub content: Option<String>,
}

/// One narrative section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    /// Section heading.
    pub title: String,
    /// Markdown body.
    pub markdown_body: String,
    /// Attached material.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Compact summary of a chart, used to ground its interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSummary {
    /// Chart label.
    pub label: String,
    /// Notable observations.
    pub highlights: Vec<String>,
    /// Headline statistics.
    pub stats: IndexMap<String, serde_json::Value>,
    /// Free-form notes.
    pub notes: String,
}

/// A rendered chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureArtifact {
    /// Stable figure id (`FIG-…`).
    pub id: String,
    /// Chart label.
    #[serde(default)]
    pub label: String,
    /// PNG rendering, base64 encoded.
    #[serde(default)]
    pub png_base64: Option<String>,
    /// HTML rendering.
    #[serde(default)]
    pub html: Option<String>,
    /// Structured summary of the chart.
    #[serde(default)]
    pub summary: Option<ChartSummary>,
    /// Short plain-language interpretation.
    #[serde(default)]
    pub interpretation_text: Option<String>,
}

/// The finalised output of one analysis job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBundle {
    /// Interview the job started from.
    pub interview: InterviewInput,
    /// Needs derived from the interview.
    pub needs: StructuredNeeds,
    /// Plan the job executed.
    pub plan: AnalysisPlan,
    /// Computed datapoints.
    #[serde(default)]
    pub datapoints: Vec<DataPoint>,
    /// Funder recommendations.
    #[serde(default)]
    pub recommendations: Recommendations,
    /// Narrative sections.
    #[serde(default)]
    pub sections: Vec<ReportSection>,
    /// Charts.
    #[serde(default)]
    pub figures: Vec<FigureArtifact>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339", default = "OffsetDateTime::now_utc")]
    pub created_at: OffsetDateTime,
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    REPORT_VERSION.to_owned()
}

impl ReportBundle {
    /// Start a bundle with empty results, stamped `created_at`.
    #[must_use]
    pub fn new(
        interview: InterviewInput,
        needs: StructuredNeeds,
        plan: AnalysisPlan,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            interview,
            needs,
            plan,
            datapoints: Vec::new(),
            recommendations: Recommendations::default(),
            sections: Vec::new(),
            figures: Vec::new(),
            created_at,
            version: default_version(),
        }
    }

    /// Datapoints indexed by id.
    #[must_use]
    pub fn datapoints_by_id(&self) -> HashMap<&str, &DataPoint> {
        self.datapoints
            .iter()
            .map(|dp| (dp.id.as_str(), dp))
            .collect()
    }

    /// Canonical JSON export: sorted keys, no insignificant whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] if the bundle cannot be encoded.
    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json_canonicalizer::to_string(self).map_err(ReportError::Serialize)
    }

    /// Parse a bundle previously written by [`Self::to_json`].
    ///
    /// Unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Parse`] when `text` is not a valid bundle.
    pub fn from_json(text: &str) -> Result<Self, ReportError> {
        serde_json::from_str(text).map_err(ReportError::Parse)
    }
}
