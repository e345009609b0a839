//! Deterministic sample inputs and report for the simulated pipeline.

use crate::report::{
    AnalysisPlan, Attachment, AttachmentKind, DataPoint, DataSignature, InterviewInput,
    MetricRequest, MetricTool, ReportBundle, ReportSection, StructuredNeeds,
};
use indexmap::IndexMap;
use serde_json::json;
use time::OffsetDateTime;

/// Number of datapoints each narrative section cites.
const CITATIONS_PER_SECTION: usize = 3;

const SECTIONS: [(&str, &str); 8] = [
    (
        "Overview",
        "This report summarises the grant data that matches your interview answers and points to where funding is concentrated.",
    ),
    (
        "Funding Patterns",
        "Funding clusters around a small number of subject areas. Proposals that sit close to those areas compete with more applicants but draw on deeper budgets.",
    ),
    (
        "Key Players",
        "A handful of foundations account for most of the dollars awarded. Their giving history is the best guide to what they will fund next.",
    ),
    (
        "Populations",
        "Grants in this dataset favour some populations over others. Gaps in coverage can be an opening for a well-argued proposal.",
    ),
    (
        "Geographies",
        "Awards are concentrated in a few regions. Local presence matters, but adjacent regions with matching priorities are worth a look.",
    ),
    (
        "Time Trends",
        "Year-on-year totals show which subjects are growing and which are flat. Time submissions to match the funders' annual cycles.",
    ),
    (
        "Actionable Insights",
        "Spread applications across several funders, mirror their stated priorities in your framing, and submit early in their cycles.",
    ),
    (
        "Next Steps",
        "Build a shortlist of aligned funders, tailor a message for each, and track their announcements between application rounds.",
    ),
];

/// Interview answers used by the demo.
#[must_use]
pub fn sample_interview() -> InterviewInput {
    InterviewInput {
        program_area: "Youth literacy".to_owned(),
        populations: vec!["Children and Youth".to_owned(), "Low-income families".to_owned()],
        geography: vec!["us-ca".to_owned()],
        timeframe_years: Some(3),
        budget_usd_range: Some((Some(50_000.0), Some(250_000.0))),
        outcomes: vec!["Improve third-grade reading scores".to_owned()],
        keywords: vec!["Reading".to_owned(), "After-school".to_owned()],
        ..InterviewInput::default()
    }
}

/// Fingerprint of the dataset the demo pretends to analyse.
#[must_use]
pub const fn sample_signature() -> DataSignature {
    DataSignature {
        rows: 1200,
        total_amount_usd: 48_250_000.0,
    }
}

/// Needs derived from the interview without any model assistance.
#[must_use]
pub fn derive_needs(interview: &InterviewInput) -> StructuredNeeds {
    let tag = |value: &String| value.trim().to_lowercase().replace(' ', "_");
    let subjects = std::iter::once(&interview.program_area)
        .chain(&interview.keywords)
        .filter(|value| !value.trim().is_empty())
        .map(tag)
        .collect();
    StructuredNeeds {
        subjects,
        populations: interview.populations.iter().map(tag).collect(),
        geographies: interview
            .geography
            .iter()
            .map(|code| code.trim().to_uppercase())
            .collect(),
        weights: IndexMap::new(),
    }
}

/// Three-request plan used when no planner is available.
#[must_use]
pub fn default_plan() -> AnalysisPlan {
    let request = |tool: MetricTool, params: serde_json::Value, title: &str| MetricRequest {
        tool,
        params: match params {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => IndexMap::new(),
        },
        title: title.to_owned(),
        id: None,
    };
    AnalysisPlan {
        metric_requests: vec![
            request(
                MetricTool::DfGroupbySum,
                json!({"by": ["grant_subject_tran"], "value": "amount_usd", "n": 10}),
                "Top Subjects by Amount",
            ),
            request(
                MetricTool::DfValueCounts,
                json!({"column": "grant_population_tran", "n": 10}),
                "Top Populations",
            ),
            request(
                MetricTool::DfPivotTable,
                json!({"index": ["year_issued"], "value": "amount_usd", "agg": "sum", "top": 20}),
                "Time Trend by Year",
            ),
        ],
        narrative_outline: vec![
            "Overview".to_owned(),
            "Funding Patterns".to_owned(),
            "Populations Served".to_owned(),
            "Time Trends".to_owned(),
        ],
    }
}

/// One placeholder datapoint per planned metric, numbered `DP-001` onward.
#[must_use]
pub fn datapoints_for(plan: &AnalysisPlan) -> Vec<DataPoint> {
    plan.metric_requests
        .iter()
        .zip(1..)
        .map(|(request, n): (&MetricRequest, u32)| DataPoint {
            id: request.id.clone().unwrap_or_else(|| format!("DP-{n:03}")),
            title: request.title.clone(),
            method: request.tool.as_str().to_owned(),
            params: request.params.clone(),
            table_md: "| key | value |\n|---|---|\n| (simulated) | 0 |".to_owned(),
            notes: "Simulated result".to_owned(),
        })
        .collect()
}

/// The fixed eight-section narrative, each section citing the first
/// datapoints.
#[must_use]
pub fn deterministic_sections(datapoints: &[DataPoint]) -> Vec<ReportSection> {
    let cited = datapoints.iter().take(CITATIONS_PER_SECTION);
    let citation = cited
        .clone()
        .map(|dp| format!("{} ({})", dp.title, dp.id))
        .collect::<Vec<_>>()
        .join(", ");
    let attachments: Vec<Attachment> = cited
        .map(|dp| Attachment {
            kind: AttachmentKind::DatapointRef,
            ref_id: Some(dp.id.clone()),
            content: None,
        })
        .collect();

    SECTIONS
        .iter()
        .map(|(title, body)| ReportSection {
            title: (*title).to_owned(),
            markdown_body: if citation.is_empty() {
                (*body).to_owned()
            } else {
                format!("{body} (Grounded in {citation})")
            },
            attachments: attachments.clone(),
        })
        .collect()
}

/// Complete report for `interview`, stamped `created_at`.
#[must_use]
pub fn sample_report(interview: &InterviewInput, created_at: OffsetDateTime) -> ReportBundle {
    let plan = default_plan();
    let datapoints = datapoints_for(&plan);
    let sections = deterministic_sections(&datapoints);
    let mut report = ReportBundle::new(interview.clone(), derive_needs(interview), plan, created_at);
    report.datapoints = datapoints;
    report.sections = sections;
    report
}
