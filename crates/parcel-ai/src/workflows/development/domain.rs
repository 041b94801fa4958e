use serde::{Deserialize, Serialize};

pub const SQUARE_METRES_PER_SQUARE_FOOT: f64 = 0.092_903;

/// Immutable description of the parcel under analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub address: String,
    pub municipality: String,
    pub lot_area_sqft: f64,
    pub zoning: String,
    pub assessed_value: f64,
}

impl Parcel {
    pub fn lot_area_m2(&self) -> f64 {
        self.lot_area_sqft * SQUARE_METRES_PER_SQUARE_FOOT
    }
}

/// WGS84 position used for measured transit distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Regulatory regime that produced an allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pathway {
    Current,
    Ssmuh,
    Tod,
}

impl Pathway {
    /// Fixed evaluation order; ties resolve to the earliest entry.
    pub const fn ordered() -> [Self; 3] {
        [Self::Current, Self::Ssmuh, Self::Tod]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "Current",
            Self::Ssmuh => "SSMUH",
            Self::Tod => "TOD",
        }
    }
}

/// How the rapid-transit distance behind a profile was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBasis {
    Measured,
    Placeholder,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLevel {
    Rapid,
    Frequent,
    Basic,
    None,
}

impl ServiceLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rapid => "Rapid transit",
            Self::Frequent => "Frequent transit",
            Self::Basic => "Basic service",
            Self::None => "No scheduled service",
        }
    }
}

/// Proximity band used by the transit-oriented development allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TodTier {
    #[serde(rename = "200m")]
    Within200m,
    #[serde(rename = "400m")]
    Within400m,
    #[serde(rename = "800m")]
    Within800m,
}

impl TodTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Within200m => "200m",
            Self::Within400m => "400m",
            Self::Within800m => "800m",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitProfile {
    pub municipality: String,
    pub rapid_transit_200m: bool,
    pub rapid_transit_400m: bool,
    pub rapid_transit_800m: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_frequency: Option<String>,
    pub frequent_transit_400m: bool,
    pub service_level: ServiceLevel,
    pub route_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rapid_transit_distance_m: Option<f64>,
    pub distance_basis: DistanceBasis,
}

impl TransitProfile {
    pub fn not_served(municipality: &str) -> Self {
        Self {
            municipality: municipality.trim().to_string(),
            rapid_transit_200m: false,
            rapid_transit_400m: false,
            rapid_transit_800m: false,
            station_type: None,
            station_frequency: None,
            frequent_transit_400m: false,
            service_level: ServiceLevel::None,
            route_count: 0,
            rapid_transit_distance_m: None,
            distance_basis: DistanceBasis::Unknown,
        }
    }

    /// Tightest band wins; a parcel inside 200 m never reports the wider tiers.
    pub fn tod_tier(&self) -> Option<TodTier> {
        if self.rapid_transit_200m {
            Some(TodTier::Within200m)
        } else if self.rapid_transit_400m {
            Some(TodTier::Within400m)
        } else if self.rapid_transit_800m {
            Some(TodTier::Within800m)
        } else {
            None
        }
    }
}

/// One regime's permitted building envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allowance {
    pub pathway: Pathway,
    pub units: u32,
    pub storeys: u32,
    pub fsr: f64,
    pub max_height_m: f64,
    pub eligible: bool,
    pub label: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaximumPotential {
    pub pathway: Pathway,
    pub allowance: Allowance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceSet {
    pub current: Allowance,
    pub ssmuh: Allowance,
    pub tod: Allowance,
    pub maximum_potential: MaximumPotential,
}

impl AllowanceSet {
    pub fn get(&self, pathway: Pathway) -> &Allowance {
        match pathway {
            Pathway::Current => &self.current,
            Pathway::Ssmuh => &self.ssmuh,
            Pathway::Tod => &self.tod,
        }
    }

    pub fn max_fsr(&self) -> f64 {
        Pathway::ordered()
            .into_iter()
            .map(|pathway| self.get(pathway).fsr)
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityTier {
    Low,
    Gentle,
    Medium,
    High,
}

impl DensityTier {
    pub fn for_units(units: u32) -> Self {
        match units {
            0..=2 => Self::Low,
            3..=5 => Self::Gentle,
            6..=11 => Self::Medium,
            _ => Self::High,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low density",
            Self::Gentle => "Gentle density",
            Self::Medium => "Medium density",
            Self::High => "High density",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub ssmuh_eligible: bool,
    pub fourplex_eligible: bool,
    pub sixplex_eligible: bool,
    pub tod_eligible: bool,
    pub urban_containment: bool,
    pub parking_required: bool,
    pub density_tier: DensityTier,
    pub density_label: String,
    pub height_allowance: String,
    pub special_requirements: Vec<String>,
}

impl ComplianceRecord {
    /// The six scored flags; the last one is parking relief.
    pub fn flags(&self) -> [bool; 6] {
        [
            self.ssmuh_eligible,
            self.fourplex_eligible,
            self.sixplex_eligible,
            self.tod_eligible,
            self.urban_containment,
            !self.parking_required,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub label: String,
    pub bedrooms: u8,
    pub bathrooms: f32,
    pub square_feet: f64,
    pub count: u32,
    pub monthly_rent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    SingleFamilyWithSuite,
    Duplex,
    Fourplex,
    SixUnitApartment,
}

impl ScenarioKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::SingleFamilyWithSuite,
            Self::Duplex,
            Self::Fourplex,
            Self::SixUnitApartment,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SingleFamilyWithSuite => "Single Family with Legal Suite",
            Self::Duplex => "Duplex Development",
            Self::Fourplex => "Fourplex (SSMUH-compliant)",
            Self::SixUnitApartment => "Six-unit Small Apartment (SSMUH)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionType {
    WoodFrame,
    Mixed,
    Concrete,
}

impl ConstructionType {
    pub fn for_height(height_m: f64) -> Self {
        if height_m <= 10.7 {
            Self::WoodFrame
        } else if height_m <= 18.0 {
            Self::Mixed
        } else {
            Self::Concrete
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::WoodFrame => "Wood frame",
            Self::Mixed => "Wood frame over concrete podium",
            Self::Concrete => "Concrete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub cost_per_sqft: f64,
    pub construction_cost: f64,
    pub soft_costs: f64,
    pub land_value: f64,
    pub total_project_cost: f64,
    pub monthly_rent_roll: f64,
    pub revenue: f64,
    pub net_profit: f64,
    pub roi_pct: f64,
    pub construction_months: u32,
    pub construction_duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentScenario {
    pub name: String,
    pub kind: ScenarioKind,
    pub pathway: Pathway,
    pub total_units: u32,
    pub unit_mix: Vec<UnitType>,
    pub gross_floor_area_sqft: f64,
    pub land_coverage: f64,
    pub governing_fsr: f64,
    pub storeys: u32,
    pub building_height_m: f64,
    pub construction_type: ConstructionType,
    pub compliance: ComplianceRecord,
    pub financials: FinancialSummary,
    pub risk_factors: Vec<String>,
}

/// Snapshot of the headline metrics shown next to a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetrics {
    pub lot_size_sqft: f64,
    pub current_value: f64,
    pub zoning: String,
    pub transit_score: u8,
    pub market_demand_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignGuidance {
    pub storeys: u32,
    pub building_height_m: f64,
    pub construction_type: ConstructionType,
    pub land_coverage: f64,
    pub unit_mix_summary: Vec<String>,
    pub design_constraints: Vec<String>,
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioScore {
    pub scenario: String,
    pub roi_component: f64,
    pub compliance_component: f64,
    pub density_component: f64,
    pub risk_component: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedPlan {
    pub parcel: Parcel,
    pub metrics: PropertyMetrics,
    pub transit: TransitProfile,
    pub allowances: AllowanceSet,
    pub compliance: ComplianceRecord,
    pub scenarios: Vec<DevelopmentScenario>,
    pub recommended: DevelopmentScenario,
    pub scores: Vec<ScenarioScore>,
    pub municipal_requirements: Vec<String>,
    pub design_guidance: DesignGuidance,
}
