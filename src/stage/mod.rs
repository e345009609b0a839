//! Pipeline stage catalogue for the advisor analysis job.
//!
//! The catalogue is a fixed, ordered table. Its order is both the display
//! order used by progress views and the precedence used when free-text
//! backend messages are classified (see [`classify`]).

mod classify;

pub use classify::{classify, classify_stage};

use serde::{Serialize, Serializer};

/// Enumerates pipeline stages in execution order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineStage {
    /// Stage 0: summarise the interview intake.
    SummarizingIntake = 0,
    /// Stage 1: normalise interview answers into structured needs.
    NormalizingNeeds = 1,
    /// Stage 2: plan which metric tools to run.
    PlanningAnalysis = 2,
    /// Stage 3: execute the planned metrics.
    ExecutingMetrics = 3,
    /// Stage 4: synthesise narrative report sections.
    SynthesizingSections = 4,
    /// Stage 5: generate funder recommendations.
    GeneratingRecommendations = 5,
    /// Stage 6: build figures and finalise the report bundle.
    BuildingFigures = 6,
}

/// The total number of stages in the catalogue.
pub const PIPELINE_STAGE_COUNT: usize = 7;

/// Immutable metadata describing one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    /// Dense, zero-based position in the catalogue.
    pub index: usize,
    /// Canonical backend phrase used to classify status messages.
    pub marker: &'static str,
    /// Short user-facing title.
    pub title: &'static str,
    /// Plain-language explanation of what the stage does.
    pub description: &'static str,
    /// Rough wall-clock estimate shown next to the running stage.
    pub estimated_duration: &'static str,
    /// Decorative glyph for views that allow emoji.
    pub icon: &'static str,
}

/// Stage metadata in catalogue order.
pub static CATALOG: [StageDefinition; PIPELINE_STAGE_COUNT] = [
    StageDefinition {
        index: 0,
        marker: "Summarizing intake",
        title: "Understanding your requirements",
        description: "Reading your inputs to understand what you need",
        estimated_duration: "30-45 seconds",
        icon: "📋",
    },
    StageDefinition {
        index: 1,
        marker: "Normalizing interview into StructuredNeeds",
        title: "Analyzing your data patterns",
        description: "Finding trends that match your criteria",
        estimated_duration: "45-60 seconds",
        icon: "🔍",
    },
    StageDefinition {
        index: 2,
        marker: "Planning analysis (tools)",
        title: "Planning analysis approach",
        description: "Deciding which calculations will be most helpful",
        estimated_duration: "30-45 seconds",
        icon: "🎯",
    },
    StageDefinition {
        index: 3,
        marker: "Executing planned metrics",
        title: "Running calculations",
        description: "Computing metrics and insights from your data",
        estimated_duration: "60-90 seconds",
        icon: "📊",
    },
    StageDefinition {
        index: 4,
        marker: "Synthesizing report sections",
        title: "Writing personalized recommendations",
        description: "Creating tailored advice based on your specific needs",
        estimated_duration: "45-75 seconds",
        icon: "✍️",
    },
    StageDefinition {
        index: 5,
        marker: "Generating recommendations",
        title: "Identifying potential funders",
        description: "Finding foundations and grants that match your project",
        estimated_duration: "30-60 seconds",
        icon: "🏦",
    },
    StageDefinition {
        index: 6,
        marker: "Building figures and finalizing",
        title: "Creating final report",
        description: "Building charts and formatting your complete analysis",
        estimated_duration: "30-45 seconds",
        icon: "📈",
    },
];

/// Return the stage catalogue in order.
///
/// Every call returns the same static slice.
#[must_use]
pub fn stages() -> &'static [StageDefinition] {
    &CATALOG
}

impl PipelineStage {
    /// All stages in catalogue order.
    pub const ALL: [Self; PIPELINE_STAGE_COUNT] = [
        Self::SummarizingIntake,
        Self::NormalizingNeeds,
        Self::PlanningAnalysis,
        Self::ExecutingMetrics,
        Self::SynthesizingSections,
        Self::GeneratingRecommendations,
        Self::BuildingFigures,
    ];

    /// Zero-based catalogue index of this stage.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Convert a zero-based index into a [`PipelineStage`].
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::SummarizingIntake),
            1 => Some(Self::NormalizingNeeds),
            2 => Some(Self::PlanningAnalysis),
            3 => Some(Self::ExecutingMetrics),
            4 => Some(Self::SynthesizingSections),
            5 => Some(Self::GeneratingRecommendations),
            6 => Some(Self::BuildingFigures),
            _ => None,
        }
    }

    /// Catalogue entry for this stage.
    #[must_use]
    #[expect(
        clippy::indexing_slicing,
        reason = "discriminants are dense and bounded by the catalogue length"
    )]
    pub fn definition(self) -> &'static StageDefinition {
        &CATALOG[self.index()]
    }

    /// Backend marker phrase for this stage.
    #[must_use]
    pub fn marker(self) -> &'static str {
        self.definition().marker
    }

    /// User-facing title for this stage.
    #[must_use]
    pub fn title(self) -> &'static str {
        self.definition().title
    }

    /// The stage that follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }
}

impl Serialize for PipelineStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.index() as u64)
    }
}

/// Compile-time guard ensuring `PipelineStage::ALL` lists every stage in
/// index order.
const _: () = {
    let mut i = 0;
    while i < PIPELINE_STAGE_COUNT {
        assert!(
            PipelineStage::ALL[i].index() == i,
            "PipelineStage::ALL must follow index order"
        );
        i += 1;
    }
};
