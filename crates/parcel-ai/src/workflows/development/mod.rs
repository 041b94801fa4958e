//! Zoning allowances, development scenarios, and the comprehensive parcel report.
//!
//! Stages 1-6 (transit through selection) are pure and synchronous; only the analysis
//! service talks to collaborators.

pub(crate) mod compliance;
pub mod domain;
pub mod financial;
pub mod pipeline;
pub mod providers;
pub mod report;
pub mod router;
pub mod rulebook;
pub mod scenarios;
pub mod selection;
pub mod service;
pub mod transit;
pub mod zoning;

#[cfg(test)]
mod tests;

pub use compliance::evaluate_compliance;
pub use domain::{
    Allowance, AllowanceSet, ComplianceRecord, ConstructionType, Coordinates, DensityTier,
    DesignGuidance, DevelopmentScenario, DistanceBasis, FinancialSummary, MaximumPotential,
    OptimizedPlan, Parcel, Pathway, PropertyMetrics, ScenarioKind, ScenarioScore, ServiceLevel,
    TodTier, TransitProfile, UnitType,
};
pub use pipeline::{DevelopmentPipeline, PipelineRun};
pub use providers::{
    Comparable, MarketAnalysis, PropertyData, PropertyDataProvider, ProviderError,
    RegulatoryAnalysis, RegulatoryProvider, UnavailableProvider,
};
pub use report::{AnalysisRequest, AppliedDefault, ComprehensiveReport, DataSources, PropertyFacts};
pub use router::analysis_router;
pub use rulebook::{RegulatoryTables, RuleBook, RuleBookError};
pub use selection::{ScenarioSelection, ScoringWeights};
pub use service::{AnalysisError, ParcelAnalysisService, ReportCache};
pub use transit::{DistanceSource, FixedDistance, StationDistanceSource, TransitDistance};
