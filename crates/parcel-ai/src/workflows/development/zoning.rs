use super::domain::{
    Allowance, AllowanceSet, MaximumPotential, Parcel, Pathway, TodTier, TransitProfile,
};
use super::rulebook::{normalize_zone_key, RegulatoryTables};

pub const SSMUH_MIN_POPULATION: u32 = 5_000;
pub const SSMUH_SMALL_LOT_MAX_M2: f64 = 280.0;
/// Literal threshold for the six-unit bonus; sits one square metre above the four-unit cut.
pub const SSMUH_SIX_UNIT_MIN_M2: f64 = 281.0;

const STOREY_HEIGHT_M: f64 = 3.5;

pub fn current_allowance(tables: &dyn RegulatoryTables, zoning: &str) -> Allowance {
    let key = normalize_zone_key(zoning);
    match tables.zoning_rule(&key) {
        Some(rule) => Allowance {
            pathway: Pathway::Current,
            units: rule.units,
            storeys: rule.storeys,
            fsr: rule.fsr,
            max_height_m: rule.max_height_m,
            eligible: true,
            label: rule.zone.clone(),
            rationale: format!("{} ({})", rule.description, rule.zone),
        },
        None => {
            let fallback = tables.fallback_zoning();
            Allowance {
                pathway: Pathway::Current,
                units: fallback.units,
                storeys: fallback.storeys,
                fsr: fallback.fsr,
                max_height_m: fallback.max_height_m,
                eligible: true,
                label: fallback.zone.clone(),
                rationale: format!(
                    "Unrecognized zoning code '{}'; most restrictive allowance applied",
                    zoning.trim()
                ),
            }
        }
    }
}

pub fn is_recognized_zoning(tables: &dyn RegulatoryTables, zoning: &str) -> bool {
    tables.zoning_rule(&normalize_zone_key(zoning)).is_some()
}

pub fn ssmuh_allowance(
    tables: &dyn RegulatoryTables,
    parcel: &Parcel,
    transit: &TransitProfile,
) -> Allowance {
    let municipality = tables.municipality(&parcel.municipality);
    let population = municipality.map(|profile| profile.population).unwrap_or(0);
    let urban_containment = municipality
        .map(|profile| profile.urban_containment)
        .unwrap_or(false);
    let zone_key = normalize_zone_key(&parcel.zoning);

    let ineligible_reason = if municipality.is_none() {
        Some(format!(
            "Municipality '{}' is not covered by the rule book",
            parcel.municipality.trim()
        ))
    } else if population <= SSMUH_MIN_POPULATION {
        Some(format!(
            "Municipal population {population} does not exceed {SSMUH_MIN_POPULATION}"
        ))
    } else if !urban_containment {
        Some("Parcel is outside the urban containment boundary".to_string())
    } else if !tables.is_ssmuh_compatible(&zone_key) {
        Some(format!(
            "Zoning {} is not single-family or duplex compatible",
            if zone_key.is_empty() { "(none)" } else { zone_key.as_str() }
        ))
    } else {
        None
    };

    if let Some(reason) = ineligible_reason {
        return Allowance {
            pathway: Pathway::Ssmuh,
            units: 1,
            storeys: 0,
            fsr: 0.0,
            max_height_m: 0.0,
            eligible: false,
            label: "Not eligible".to_string(),
            rationale: reason,
        };
    }

    let lot_m2 = parcel.lot_area_m2();
    let (units, fsr, rationale) = if lot_m2 <= SSMUH_SMALL_LOT_MAX_M2 {
        (
            3,
            0.9,
            format!("Lot of {lot_m2:.1} m² is at or below {SSMUH_SMALL_LOT_MAX_M2} m²"),
        )
    } else if transit.frequent_transit_400m && lot_m2 >= SSMUH_SIX_UNIT_MIN_M2 {
        (
            6,
            1.5,
            format!("Lot of {lot_m2:.1} m² within 400 m of frequent transit"),
        )
    } else {
        (
            4,
            1.0,
            format!("Lot of {lot_m2:.1} m² exceeds {SSMUH_SMALL_LOT_MAX_M2} m²"),
        )
    };

    Allowance {
        pathway: Pathway::Ssmuh,
        units,
        storeys: 3,
        fsr,
        max_height_m: 11.0,
        eligible: true,
        label: format!("SSMUH {units}-unit"),
        rationale,
    }
}

pub fn tod_allowance(transit: &TransitProfile) -> Allowance {
    let Some(tier) = transit.tod_tier() else {
        return Allowance {
            pathway: Pathway::Tod,
            units: 0,
            storeys: 0,
            fsr: 0.0,
            max_height_m: 0.0,
            eligible: false,
            label: "Not eligible".to_string(),
            rationale: "No rapid transit station within 800 m".to_string(),
        };
    };

    let (units, storeys, fsr) = match tier {
        TodTier::Within200m => (12, 20, 5.0),
        TodTier::Within400m => (8, 12, 4.0),
        TodTier::Within800m => (6, 8, 3.0),
    };

    Allowance {
        pathway: Pathway::Tod,
        units,
        storeys,
        fsr,
        max_height_m: storeys as f64 * STOREY_HEIGHT_M,
        eligible: true,
        label: tier.label().to_string(),
        rationale: format!("Within {} of rapid transit", tier.label()),
    }
}

/// Greatest unit count wins; ties keep the earliest pathway in evaluation order.
pub fn maximum_potential(
    current: &Allowance,
    ssmuh: &Allowance,
    tod: &Allowance,
) -> MaximumPotential {
    let mut best = current;
    for candidate in [ssmuh, tod] {
        if candidate.units > best.units {
            best = candidate;
        }
    }

    MaximumPotential {
        pathway: best.pathway,
        allowance: best.clone(),
    }
}

pub fn compute_allowances(
    tables: &dyn RegulatoryTables,
    parcel: &Parcel,
    transit: &TransitProfile,
) -> AllowanceSet {
    let current = current_allowance(tables, &parcel.zoning);
    let ssmuh = ssmuh_allowance(tables, parcel, transit);
    let tod = tod_allowance(transit);
    let maximum_potential = maximum_potential(&current, &ssmuh, &tod);

    AllowanceSet {
        current,
        ssmuh,
        tod,
        maximum_potential,
    }
}
