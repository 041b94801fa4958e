use super::domain::{AllowanceSet, ComplianceRecord, Pathway, ScenarioKind, UnitType};

pub const DUPLEX_MIN_LOT_SQFT: f64 = 3_000.0;
pub const FOURPLEX_MIN_LOT_SQFT: f64 = 4_000.0;
pub const SIXPLEX_MIN_LOT_SQFT: f64 = 5_000.0;

/// Everything the generator and the financial modeler need about the site.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub lot_area_sqft: f64,
    pub assessed_value: f64,
    pub allowances: AllowanceSet,
    pub compliance: ComplianceRecord,
}

/// An unpriced building program produced by the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateProgram {
    pub kind: ScenarioKind,
    pub name: String,
    pub pathway: Pathway,
    pub unit_mix: Vec<UnitType>,
    pub total_units: u32,
    pub governing_fsr: f64,
}

impl CandidateProgram {
    fn from_template(kind: ScenarioKind, allowances: &AllowanceSet) -> Self {
        let pathway = template_pathway(kind);
        let unit_mix = unit_mix_template(kind);
        let total_units = unit_mix.iter().map(|unit| unit.count).sum();

        Self {
            kind,
            name: kind.label().to_string(),
            pathway,
            unit_mix,
            total_units,
            governing_fsr: allowances.get(pathway).fsr,
        }
    }
}

/// Emit the fixed catalogue in order, keeping only templates whose guard passes.
pub fn generate_candidates(site: &SiteContext) -> Vec<CandidateProgram> {
    ScenarioKind::ordered()
        .into_iter()
        .filter(|kind| guard_passes(*kind, site))
        .map(|kind| CandidateProgram::from_template(kind, &site.allowances))
        .collect()
}

pub fn guard_passes(kind: ScenarioKind, site: &SiteContext) -> bool {
    let lot = site.lot_area_sqft;
    let ssmuh = site.compliance.ssmuh_eligible;
    match kind {
        ScenarioKind::SingleFamilyWithSuite => true,
        ScenarioKind::Duplex => lot >= DUPLEX_MIN_LOT_SQFT,
        ScenarioKind::Fourplex => ssmuh && lot >= FOURPLEX_MIN_LOT_SQFT,
        ScenarioKind::SixUnitApartment => ssmuh && lot >= SIXPLEX_MIN_LOT_SQFT,
    }
}

fn template_pathway(kind: ScenarioKind) -> Pathway {
    match kind {
        ScenarioKind::SingleFamilyWithSuite | ScenarioKind::Duplex => Pathway::Current,
        ScenarioKind::Fourplex | ScenarioKind::SixUnitApartment => Pathway::Ssmuh,
    }
}

pub fn unit_mix_template(kind: ScenarioKind) -> Vec<UnitType> {
    match kind {
        ScenarioKind::SingleFamilyWithSuite => vec![
            unit("Primary residence", 3, 2.5, 2_000.0, 1, 4_200.0),
            unit("Secondary suite", 1, 1.0, 650.0, 1, 1_800.0),
        ],
        ScenarioKind::Duplex => vec![unit("Duplex unit", 3, 2.5, 1_400.0, 2, 3_600.0)],
        ScenarioKind::Fourplex => vec![
            unit("Two-bedroom", 2, 2.0, 1_000.0, 2, 2_900.0),
            unit("Three-bedroom", 3, 2.0, 1_200.0, 2, 3_400.0),
        ],
        ScenarioKind::SixUnitApartment => vec![
            unit("One-bedroom", 1, 1.0, 650.0, 2, 2_100.0),
            unit("Two-bedroom", 2, 2.0, 900.0, 2, 2_800.0),
            unit("Three-bedroom", 3, 2.0, 1_100.0, 2, 3_300.0),
        ],
    }
}

fn unit(
    label: &str,
    bedrooms: u8,
    bathrooms: f32,
    square_feet: f64,
    count: u32,
    monthly_rent: f64,
) -> UnitType {
    UnitType {
        label: label.to_string(),
        bedrooms,
        bathrooms,
        square_feet,
        count,
        monthly_rent,
    }
}
