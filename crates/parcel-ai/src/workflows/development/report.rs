use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::domain::{
    AllowanceSet, ComplianceRecord, Coordinates, DesignGuidance, DevelopmentScenario,
    OptimizedPlan, Parcel, PropertyMetrics, TransitProfile,
};
use super::pipeline::PipelineRun;
use super::providers::{Comparable, MarketAnalysis, PropertyData, RegulatoryAnalysis};

pub const DEFAULT_ZONING: &str = "RS-1";
pub const DEFAULT_LOT_SIZE_SQFT: f64 = 4_000.0;
pub const DEFAULT_ASSESSED_VALUE: f64 = 1_200_000.0;

const MAX_SCORED_COMPARABLES: usize = 6;

/// Caller-supplied facts about one parcel; anything omitted is looked up or defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub address: String,
    pub municipality: String,
    #[serde(default)]
    pub lot_size_sqft: Option<f64>,
    #[serde(default)]
    pub zoning: Option<String>,
    #[serde(default)]
    pub assessed_value: Option<f64>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl AnalysisRequest {
    pub fn new(address: impl Into<String>, municipality: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            municipality: municipality.into(),
            ..Self::default()
        }
    }

    pub fn requested_zoning(&self) -> Option<&str> {
        self.zoning
            .as_deref()
            .map(str::trim)
            .filter(|zoning| !zoning.is_empty())
    }
}

/// Which collaborators actually returned data for this report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSources {
    pub property_data: bool,
    pub regulatory_analysis: bool,
    pub comparables: bool,
    pub market_analysis: bool,
    pub measured_transit_distance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedDefault {
    pub field: String,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFacts {
    pub comparables: Vec<Comparable>,
    pub market_analysis: Option<MarketAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveReport {
    pub plan: OptimizedPlan,
    pub property: PropertyFacts,
    pub regulatory: Option<RegulatoryAnalysis>,
    pub data_sources: DataSources,
    pub applied_defaults: Vec<AppliedDefault>,
    pub rulebook_version: String,
    pub cache_key: String,
    pub generated_at: DateTime<Utc>,
}

impl ComprehensiveReport {
    pub fn recommended(&self) -> &DevelopmentScenario {
        &self.plan.recommended
    }
}

/// Pick request value, then provider value, then the documented default.
pub fn resolve_zoning(
    request: &AnalysisRequest,
    property: Option<&PropertyData>,
) -> (String, Option<AppliedDefault>) {
    if let Some(zoning) = request.requested_zoning() {
        return (zoning.to_string(), None);
    }
    if let Some(zoning) = property
        .and_then(|data| data.zoning.as_deref())
        .map(str::trim)
        .filter(|zoning| !zoning.is_empty())
    {
        return (zoning.to_string(), None);
    }
    (
        DEFAULT_ZONING.to_string(),
        Some(applied("zoning", DEFAULT_ZONING, property.is_some())),
    )
}

pub fn resolve_parcel(
    request: &AnalysisRequest,
    property: Option<&PropertyData>,
) -> (Parcel, Vec<AppliedDefault>) {
    let mut defaults = Vec::new();
    let provided = property.is_some();

    let (zoning, zoning_default) = resolve_zoning(request, property);
    defaults.extend(zoning_default);

    let lot_area_sqft = positive(request.lot_size_sqft)
        .or_else(|| positive(property.and_then(|data| data.lot_size_sqft)))
        .unwrap_or_else(|| {
            defaults.push(applied(
                "lot_size_sqft",
                &format!("{DEFAULT_LOT_SIZE_SQFT:.0}"),
                provided,
            ));
            DEFAULT_LOT_SIZE_SQFT
        });

    let assessed_value = positive(request.assessed_value)
        .or_else(|| positive(property.and_then(|data| data.assessed_value)))
        .unwrap_or_else(|| {
            defaults.push(applied(
                "assessed_value",
                &format!("{DEFAULT_ASSESSED_VALUE:.0}"),
                provided,
            ));
            DEFAULT_ASSESSED_VALUE
        });

    let parcel = Parcel {
        address: request.address.trim().to_string(),
        municipality: request.municipality.trim().to_string(),
        lot_area_sqft,
        zoning,
        assessed_value,
    };
    (parcel, defaults)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn applied(field: &str, value: &str, provider_answered: bool) -> AppliedDefault {
    let reason = if provider_answered {
        "not supplied by request or property data"
    } else {
        "not supplied by request; property data unavailable"
    };
    AppliedDefault {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn transit_score(transit: &TransitProfile) -> u8 {
    if transit.rapid_transit_200m {
        95
    } else if transit.rapid_transit_400m {
        85
    } else if transit.rapid_transit_800m {
        70
    } else if transit.frequent_transit_400m {
        60
    } else if transit.route_count > 0 {
        40
    } else {
        20
    }
}

pub fn market_demand_score(property: Option<&PropertyData>) -> u8 {
    let Some(data) = property else {
        return 50;
    };
    if let Some(index) = data
        .market_analysis
        .as_ref()
        .and_then(|market| market.demand_index)
        .filter(|index| index.is_finite())
    {
        return index.clamp(0.0, 100.0).round() as u8;
    }
    let counted = data.comparables.len().min(MAX_SCORED_COMPARABLES) as u8;
    50 + 5 * counted
}

pub fn property_metrics(
    parcel: &Parcel,
    transit: &TransitProfile,
    property: Option<&PropertyData>,
) -> PropertyMetrics {
    PropertyMetrics {
        lot_size_sqft: parcel.lot_area_sqft,
        current_value: parcel.assessed_value,
        zoning: parcel.zoning.clone(),
        transit_score: transit_score(transit),
        market_demand_score: market_demand_score(property),
    }
}

pub fn municipal_requirements(compliance: &ComplianceRecord) -> Vec<String> {
    let mut requirements = compliance.special_requirements.clone();
    if compliance.parking_required {
        requirements.push("Off-street parking required".to_string());
    }
    requirements
}

/// Derive guidance from the recommended scenario; provider notes replace the rule-derived lists.
pub fn design_guidance(
    recommended: &DevelopmentScenario,
    allowances: &AllowanceSet,
    compliance: &ComplianceRecord,
    regulatory: Option<&RegulatoryAnalysis>,
) -> DesignGuidance {
    let unit_mix_summary = recommended
        .unit_mix
        .iter()
        .map(|unit| {
            format!(
                "{} x {} ({} bd / {} ba, {:.0} sq ft)",
                unit.count, unit.label, unit.bedrooms, unit.bathrooms, unit.square_feet
            )
        })
        .collect();

    let design_constraints = match regulatory {
        Some(analysis) if !analysis.design_constraints.is_empty() => {
            analysis.design_constraints.clone()
        }
        _ => derived_constraints(recommended, allowances, compliance),
    };
    let opportunities = match regulatory {
        Some(analysis) if !analysis.opportunities.is_empty() => analysis.opportunities.clone(),
        _ => derived_opportunities(allowances, compliance),
    };

    DesignGuidance {
        storeys: recommended.storeys,
        building_height_m: recommended.building_height_m,
        construction_type: recommended.construction_type,
        land_coverage: recommended.land_coverage,
        unit_mix_summary,
        design_constraints,
        opportunities,
    }
}

fn derived_constraints(
    recommended: &DevelopmentScenario,
    allowances: &AllowanceSet,
    compliance: &ComplianceRecord,
) -> Vec<String> {
    let mut constraints = vec![
        format!(
            "Maximum height {:.1} m under current zoning",
            allowances.current.max_height_m
        ),
        format!(
            "Floor space ratio capped at {:.2}",
            recommended.governing_fsr
        ),
    ];
    if compliance.parking_required {
        constraints.push("Provide off-street parking".to_string());
    }
    constraints.extend(compliance.special_requirements.iter().cloned());
    constraints
}

fn derived_opportunities(allowances: &AllowanceSet, compliance: &ComplianceRecord) -> Vec<String> {
    let mut opportunities = Vec::new();
    if allowances.ssmuh.eligible {
        opportunities.push(format!(
            "SSMUH permits up to {} units",
            allowances.ssmuh.units
        ));
    }
    if allowances.tod.eligible {
        opportunities.push(format!(
            "TOD permits up to {} units and {} storeys ({} tier)",
            allowances.tod.units, allowances.tod.storeys, allowances.tod.label
        ));
    }
    if !compliance.parking_required {
        opportunities.push("Parking minimums relaxed near transit".to_string());
    }
    opportunities
}

pub fn build_plan(
    parcel: Parcel,
    run: PipelineRun,
    property: Option<&PropertyData>,
    regulatory: Option<&RegulatoryAnalysis>,
) -> OptimizedPlan {
    let recommended = run.recommended().clone();
    let metrics = property_metrics(&parcel, &run.transit, property);
    let municipal_requirements = municipal_requirements(&run.compliance);
    let design_guidance =
        design_guidance(&recommended, &run.allowances, &run.compliance, regulatory);

    OptimizedPlan {
        parcel,
        metrics,
        transit: run.transit,
        allowances: run.allowances,
        compliance: run.compliance,
        scenarios: run.scenarios,
        recommended,
        scores: run.selection.scores,
        municipal_requirements,
        design_guidance,
    }
}

/// Stable fingerprint of the resolved inputs and of what each collaborator returned, hex encoded.
pub fn cache_key(
    parcel: &Parcel,
    coordinates: Option<Coordinates>,
    rulebook_version: &str,
    property: Option<&PropertyData>,
    regulatory: Option<&RegulatoryAnalysis>,
) -> String {
    let location = coordinates
        .map(|point| format!("{:.6},{:.6}", point.latitude, point.longitude))
        .unwrap_or_default();
    let fingerprint = format!(
        "{}|{}|{:.2}|{}|{:.2}|{}|{}|{}|{}",
        parcel.address.to_ascii_lowercase(),
        parcel.municipality.to_ascii_lowercase(),
        parcel.lot_area_sqft,
        parcel.zoning.to_ascii_uppercase(),
        parcel.assessed_value,
        location,
        rulebook_version,
        payload_fingerprint(property),
        payload_fingerprint(regulatory)
    );

    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn payload_fingerprint<T: Serialize>(payload: Option<&T>) -> String {
    match payload {
        Some(value) => {
            serde_json::to_string(value).unwrap_or_else(|_| "unserializable".to_string())
        }
        None => "absent".to_string(),
    }
}
