use super::domain::{ConstructionType, DevelopmentScenario, FinancialSummary, Pathway};
use super::scenarios::{CandidateProgram, SiteContext};

pub const SOFT_COST_RATIO: f64 = 0.25;
/// Floor on projected revenue relative to total project cost.
pub const MINIMUM_MARGIN_MULTIPLIER: f64 = 1.15;
/// Annual rent is capitalized at twelve times to estimate a sale value.
pub const RENT_INCOME_MULTIPLE: f64 = 12.0;
pub const ROI_HURDLE_PCT: f64 = 15.0;

const MONTHS_PER_YEAR: f64 = 12.0;
const BASE_CONSTRUCTION_MONTHS: u32 = 6;
const SQFT_PER_CONSTRUCTION_MONTH: f64 = 1_000.0;
const STOREY_HEIGHT_M: f64 = 3.5;
/// Revenue floored at the minimum margin lands on the hurdle itself, give or take rounding.
const ROI_TOLERANCE_PCT: f64 = 1e-6;

/// Hard cost per square foot by total unit count.
pub fn cost_per_sqft(total_units: u32) -> f64 {
    match total_units {
        0 | 1 => 280.0,
        2 => 300.0,
        3 | 4 => 320.0,
        _ => 350.0,
    }
}

pub fn storeys_for_units(total_units: u32) -> u32 {
    match total_units {
        0..=2 => 2,
        3..=6 => 3,
        _ => 4,
    }
}

pub fn construction_months(gross_floor_area_sqft: f64) -> u32 {
    (gross_floor_area_sqft / SQFT_PER_CONSTRUCTION_MONTH).ceil().max(0.0) as u32
        + BASE_CONSTRUCTION_MONTHS
}

pub fn price_candidates(
    site: &SiteContext,
    candidates: &[CandidateProgram],
) -> Vec<DevelopmentScenario> {
    candidates
        .iter()
        .map(|candidate| price_candidate(site, candidate))
        .collect()
}

pub fn price_candidate(site: &SiteContext, candidate: &CandidateProgram) -> DevelopmentScenario {
    let gross_floor_area_sqft: f64 = candidate
        .unit_mix
        .iter()
        .map(|unit| unit.square_feet * unit.count as f64)
        .sum();
    let raw_coverage = if site.lot_area_sqft > 0.0 {
        gross_floor_area_sqft / site.lot_area_sqft
    } else {
        0.0
    };
    let land_coverage = raw_coverage.min(candidate.governing_fsr);

    let storeys = storeys_for_units(candidate.total_units);
    let building_height_m =
        (storeys as f64 * STOREY_HEIGHT_M).min(site.allowances.current.max_height_m);
    let construction_type = ConstructionType::for_height(building_height_m);

    let financials = summarize(site, candidate, gross_floor_area_sqft);
    let risk_factors = risk_factors(site, candidate, raw_coverage, construction_type, &financials);

    DevelopmentScenario {
        name: candidate.name.clone(),
        kind: candidate.kind,
        pathway: candidate.pathway,
        total_units: candidate.total_units,
        unit_mix: candidate.unit_mix.clone(),
        gross_floor_area_sqft,
        land_coverage,
        governing_fsr: candidate.governing_fsr,
        storeys,
        building_height_m,
        construction_type,
        compliance: site.compliance.clone(),
        financials,
        risk_factors,
    }
}

fn summarize(
    site: &SiteContext,
    candidate: &CandidateProgram,
    gross_floor_area_sqft: f64,
) -> FinancialSummary {
    let cost_per_sqft = cost_per_sqft(candidate.total_units);
    let construction_cost = gross_floor_area_sqft * cost_per_sqft;
    let soft_costs = construction_cost * SOFT_COST_RATIO;
    let land_value = site.assessed_value;
    let total_project_cost = construction_cost + soft_costs + land_value;

    let monthly_rent_roll: f64 = candidate
        .unit_mix
        .iter()
        .map(|unit| unit.monthly_rent * unit.count as f64)
        .sum();
    let rent_derived_value = monthly_rent_roll * MONTHS_PER_YEAR * RENT_INCOME_MULTIPLE;
    let revenue = rent_derived_value.max(total_project_cost * MINIMUM_MARGIN_MULTIPLIER);

    let net_profit = revenue - total_project_cost;
    let roi_pct = if total_project_cost > 0.0 {
        net_profit / total_project_cost * 100.0
    } else {
        0.0
    };

    let construction_months = construction_months(gross_floor_area_sqft);

    FinancialSummary {
        cost_per_sqft,
        construction_cost,
        soft_costs,
        land_value,
        total_project_cost,
        monthly_rent_roll,
        revenue,
        net_profit,
        roi_pct,
        construction_months,
        construction_duration: format!("{construction_months} months"),
    }
}

fn risk_factors(
    site: &SiteContext,
    candidate: &CandidateProgram,
    raw_coverage: f64,
    construction_type: ConstructionType,
    financials: &FinancialSummary,
) -> Vec<String> {
    let mut risks = Vec::new();

    if financials.roi_pct < ROI_HURDLE_PCT - ROI_TOLERANCE_PCT {
        risks.push(format!(
            "ROI {:.1}% below {ROI_HURDLE_PCT:.0}% hurdle",
            financials.roi_pct
        ));
    }

    if raw_coverage > candidate.governing_fsr {
        risks.push(format!(
            "Program density {raw_coverage:.2} exceeds governing FSR {:.2}; floor area must be reduced",
            candidate.governing_fsr
        ));
    }

    if construction_type != ConstructionType::WoodFrame {
        risks.push(format!("{} construction", construction_type.label()));
    }

    if financials.construction_months > 12 {
        risks.push(format!(
            "Construction timeline of {} exceeds 12 months",
            financials.construction_duration
        ));
    }

    if candidate.pathway == Pathway::Ssmuh {
        risks.push("Relies on SSMUH provisions pending local bylaw adoption".to_string());
    }

    if site.compliance.parking_required && candidate.total_units >= 3 {
        risks.push("Off-street parking must be provided".to_string());
    }

    risks
}
