use super::compliance::evaluate_compliance;
use super::domain::{
    AllowanceSet, ComplianceRecord, Coordinates, DevelopmentScenario, Parcel, TransitProfile,
};
use super::financial::price_candidates;
use super::rulebook::RegulatoryTables;
use super::scenarios::{generate_candidates, CandidateProgram, SiteContext};
use super::selection::{select_best, ScenarioSelection, ScoringWeights};
use super::transit::{classify_transit, DistanceSource};
use super::zoning::compute_allowances;

/// Output of every stage for one parcel.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub transit: TransitProfile,
    pub allowances: AllowanceSet,
    pub compliance: ComplianceRecord,
    pub site: SiteContext,
    pub candidates: Vec<CandidateProgram>,
    pub scenarios: Vec<DevelopmentScenario>,
    pub selection: ScenarioSelection,
}

impl PipelineRun {
    pub fn recommended(&self) -> &DevelopmentScenario {
        &self.scenarios[self.selection.recommended_index]
    }
}

/// Synchronous engine: each stage consumes the previous stage's typed output.
pub struct DevelopmentPipeline<'a> {
    tables: &'a dyn RegulatoryTables,
    distances: &'a dyn DistanceSource,
    weights: ScoringWeights,
}

impl<'a> DevelopmentPipeline<'a> {
    pub fn new(tables: &'a dyn RegulatoryTables, distances: &'a dyn DistanceSource) -> Self {
        Self {
            tables,
            distances,
            weights: ScoringWeights::STANDARD,
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn classify(&self, parcel: &Parcel, location: Option<Coordinates>) -> TransitProfile {
        classify_transit(self.tables, self.distances, &parcel.municipality, location)
    }

    pub fn run(&self, parcel: &Parcel, location: Option<Coordinates>) -> PipelineRun {
        let transit = self.classify(parcel, location);
        self.run_with_transit(parcel, transit)
    }

    /// Run every stage after transit classification against a supplied profile.
    pub fn run_with_transit(&self, parcel: &Parcel, transit: TransitProfile) -> PipelineRun {
        let allowances = compute_allowances(self.tables, parcel, &transit);
        let compliance = evaluate_compliance(self.tables, parcel, &allowances, &transit);
        tracing::debug!(
            maximum_pathway = allowances.maximum_potential.pathway.label(),
            maximum_units = allowances.maximum_potential.allowance.units,
            ssmuh_eligible = compliance.ssmuh_eligible,
            "allowances computed"
        );

        let site = SiteContext {
            lot_area_sqft: parcel.lot_area_sqft,
            assessed_value: parcel.assessed_value,
            allowances: allowances.clone(),
            compliance: compliance.clone(),
        };
        let candidates = generate_candidates(&site);
        let scenarios = price_candidates(&site, &candidates);

        // Single family with suite is unconditional, so there is always a winner.
        let selection = select_best(&scenarios, &self.weights).unwrap_or(ScenarioSelection {
            recommended_index: 0,
            scores: Vec::new(),
        });
        tracing::debug!(
            scenarios = scenarios.len(),
            recommended = scenarios
                .get(selection.recommended_index)
                .map(|scenario| scenario.name.as_str())
                .unwrap_or_default(),
            "scenarios scored"
        );

        PipelineRun {
            transit,
            allowances,
            compliance,
            site,
            candidates,
            scenarios,
            selection,
        }
    }
}
