use super::domain::{AllowanceSet, ComplianceRecord, DensityTier, Parcel, TransitProfile};
use super::rulebook::RegulatoryTables;

/// Derive eligibility flags and municipal notes; no numeric modelling happens here.
pub fn evaluate_compliance(
    tables: &dyn RegulatoryTables,
    parcel: &Parcel,
    allowances: &AllowanceSet,
    transit: &TransitProfile,
) -> ComplianceRecord {
    let ssmuh = &allowances.ssmuh;
    let maximum = &allowances.maximum_potential;
    let urban_containment = tables
        .municipality(&parcel.municipality)
        .map(|profile| profile.urban_containment)
        .unwrap_or(false);

    let density_tier = DensityTier::for_units(maximum.allowance.units);
    let height_allowance = format!(
        "Up to {} storeys ({})",
        maximum.allowance.storeys,
        maximum.pathway.label()
    );

    ComplianceRecord {
        ssmuh_eligible: ssmuh.eligible,
        fourplex_eligible: ssmuh.eligible && ssmuh.units >= 4,
        sixplex_eligible: ssmuh.eligible && ssmuh.units >= 6,
        tod_eligible: allowances.tod.eligible,
        urban_containment,
        parking_required: !(transit.frequent_transit_400m || transit.rapid_transit_800m),
        density_tier,
        density_label: density_tier.label().to_string(),
        height_allowance,
        special_requirements: tables.special_requirements(&parcel.municipality, &parcel.zoning),
    }
}
