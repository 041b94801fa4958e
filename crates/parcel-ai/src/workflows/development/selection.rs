use serde::{Deserialize, Serialize};

use super::domain::{DevelopmentScenario, ScenarioScore};

const DENSITY_TARGET_UNITS: f64 = 6.0;
const RISK_CEILING: f64 = 5.0;

/// Relative weight of each scoring criterion; the four must sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub roi: f64,
    pub compliance: f64,
    pub density: f64,
    pub risk: f64,
}

impl ScoringWeights {
    pub const STANDARD: Self = Self {
        roi: 0.40,
        compliance: 0.25,
        density: 0.20,
        risk: 0.15,
    };

    pub fn total(&self) -> f64 {
        self.roi + self.compliance + self.density + self.risk
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSelection {
    pub recommended_index: usize,
    pub scores: Vec<ScenarioScore>,
}

pub fn score_scenario(scenario: &DevelopmentScenario, weights: &ScoringWeights) -> ScenarioScore {
    let flags = scenario.compliance.flags();
    let compliance_fraction =
        flags.iter().filter(|flag| **flag).count() as f64 / flags.len() as f64;
    let density_fraction = (scenario.total_units as f64 / DENSITY_TARGET_UNITS).min(1.0);
    let risk_fraction =
        ((RISK_CEILING - scenario.risk_factors.len() as f64) / RISK_CEILING).max(0.0);

    let roi_component = weights.roi * (scenario.financials.roi_pct / 100.0);
    let compliance_component = weights.compliance * compliance_fraction;
    let density_component = weights.density * density_fraction;
    let risk_component = weights.risk * risk_fraction;

    ScenarioScore {
        scenario: scenario.name.clone(),
        roi_component,
        compliance_component,
        density_component,
        risk_component,
        total: roi_component + compliance_component + density_component + risk_component,
    }
}

/// Strictly greatest score wins; equal scores keep the first generated scenario.
pub fn select_best(
    scenarios: &[DevelopmentScenario],
    weights: &ScoringWeights,
) -> Option<ScenarioSelection> {
    let scores: Vec<ScenarioScore> = scenarios
        .iter()
        .map(|scenario| score_scenario(scenario, weights))
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (index, score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score.total <= top => {}
            _ => best = Some((index, score.total)),
        }
    }

    best.map(|(recommended_index, _)| ScenarioSelection {
        recommended_index,
        scores,
    })
}
