//! Versioned rule tables consumed by the development engine.
//!
//! The engine only sees the [`RegulatoryTables`] capability set. [`RuleBook`] is the shipped
//! implementation and can be replaced at runtime by a JSON document so jurisdictions can be
//! added without code changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Lookup surface the allowance, transit, and compliance stages depend on.
pub trait RegulatoryTables: Send + Sync {
    fn version(&self) -> &str;
    fn zoning_rule(&self, zone_key: &str) -> Option<&ZoningRule>;
    /// Most restrictive entry, applied to unrecognized zoning codes.
    fn fallback_zoning(&self) -> &ZoningRule;
    fn is_ssmuh_compatible(&self, zone_key: &str) -> bool;
    fn municipality(&self, name: &str) -> Option<&MunicipalityProfile>;
    fn rapid_transit_stations(&self) -> &[TransitStation];
    fn special_requirements(&self, municipality: &str, zoning: &str) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoningRule {
    pub zone: String,
    pub description: String,
    pub units: u32,
    pub storeys: u32,
    pub fsr: f64,
    pub max_height_m: f64,
    #[serde(default)]
    pub ssmuh_compatible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityProfile {
    pub name: String,
    pub population: u32,
    pub urban_containment: bool,
    #[serde(default)]
    pub rapid_transit: bool,
    #[serde(default)]
    pub frequent_transit: bool,
    #[serde(default)]
    pub station_type: Option<String>,
    #[serde(default)]
    pub station_frequency: Option<String>,
    #[serde(default)]
    pub route_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitStation {
    pub name: String,
    pub municipality: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Note attached to a parcel when the municipality and/or zoning pattern matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialRequirementRule {
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub zoning_contains: Option<String>,
    pub requirement: String,
}

impl SpecialRequirementRule {
    fn matches(&self, municipality: &str, zoning: &str) -> bool {
        if self.municipality.is_none() && self.zoning_contains.is_none() {
            return false;
        }

        let municipality_ok = self
            .municipality
            .as_deref()
            .map(|name| normalize_municipality(name) == normalize_municipality(municipality))
            .unwrap_or(true);
        let zoning_ok = self
            .zoning_contains
            .as_deref()
            .map(|pattern| {
                zoning
                    .to_ascii_uppercase()
                    .contains(&pattern.trim().to_ascii_uppercase())
            })
            .unwrap_or(true);

        municipality_ok && zoning_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBook {
    pub version: String,
    pub zoning: Vec<ZoningRule>,
    pub fallback_zoning: ZoningRule,
    #[serde(default)]
    pub ssmuh_zone_prefixes: Vec<String>,
    pub municipalities: Vec<MunicipalityProfile>,
    #[serde(default)]
    pub stations: Vec<TransitStation>,
    #[serde(default)]
    pub special_requirements: Vec<SpecialRequirementRule>,
}

#[derive(Debug, thiserror::Error)]
pub enum RuleBookError {
    #[error("failed to read rule book {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("rule book is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule book rejected: {0}")]
    Invalid(String),
}

impl RuleBook {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RuleBookError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RuleBookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, RuleBookError> {
        let book: RuleBook = serde_json::from_str(raw)?;
        book.validate()?;
        Ok(book)
    }

    pub fn validate(&self) -> Result<(), RuleBookError> {
        if self.version.trim().is_empty() {
            return Err(RuleBookError::Invalid("version must not be empty".to_string()));
        }

        for rule in self.zoning.iter().chain(std::iter::once(&self.fallback_zoning)) {
            if !rule.fsr.is_finite() || rule.fsr < 0.0 {
                return Err(RuleBookError::Invalid(format!(
                    "zone {} has invalid FSR {}",
                    rule.zone, rule.fsr
                )));
            }
            if !rule.max_height_m.is_finite() || rule.max_height_m < 0.0 {
                return Err(RuleBookError::Invalid(format!(
                    "zone {} has invalid height {}",
                    rule.zone, rule.max_height_m
                )));
            }
        }

        for station in &self.stations {
            if !(-90.0..=90.0).contains(&station.latitude)
                || !(-180.0..=180.0).contains(&station.longitude)
            {
                return Err(RuleBookError::Invalid(format!(
                    "station {} has out-of-range coordinates",
                    station.name
                )));
            }
        }

        Ok(())
    }

    /// Built-in British Columbia tables.
    pub fn standard() -> Self {
        let skytrain = Some(("SkyTrain", "2-5 min peak"));
        let canada_line = Some(("Canada Line", "3-6 min peak"));
        let millennium_line = Some(("Millennium Line", "3-6 min peak"));

        Self {
            version: "bc-2024.1".to_string(),
            zoning: vec![
                zone("RS-1", "One-family dwelling", 1, 2, 0.6, 9.5, true),
                zone("RS-3", "One-family dwelling, larger lots", 1, 2, 0.6, 9.5, true),
                zone("RS-5", "One-family dwelling with design review", 1, 2, 0.7, 9.5, true),
                zone("RS-7", "One-family dwelling with infill", 2, 2, 0.75, 10.7, true),
                zone("R1-1", "Residential inclusive", 4, 3, 1.0, 11.5, true),
                zone("RT-1", "Two-family dwelling", 2, 2, 0.75, 10.7, true),
                zone("RT-7", "Two-family dwelling with infill", 3, 3, 0.75, 10.7, true),
                zone("RM-1", "Low-rise multiple dwelling", 6, 3, 1.0, 12.0, false),
                zone("RM-3", "Multiple dwelling", 12, 4, 1.45, 13.7, false),
                zone("RM-4", "Multiple dwelling, townhouse form", 16, 4, 1.45, 13.7, false),
            ],
            fallback_zoning: zone(
                "UNRECOGNIZED",
                "Most restrictive fallback",
                1,
                2,
                0.6,
                9.5,
                false,
            ),
            ssmuh_zone_prefixes: vec![
                "RS".to_string(),
                "RT".to_string(),
                "R1".to_string(),
                "RD".to_string(),
            ],
            municipalities: vec![
                municipality("Vancouver", 662_248, true, true, true, skytrain, 112),
                municipality("Surrey", 568_322, true, true, true, skytrain, 64),
                municipality("Burnaby", 249_125, true, true, true, skytrain, 48),
                municipality("Richmond", 209_937, true, true, true, canada_line, 41),
                municipality("Coquitlam", 148_625, true, true, true, millennium_line, 29),
                municipality("New Westminster", 78_916, true, true, true, skytrain, 22),
                municipality("Port Moody", 33_535, true, true, false, millennium_line, 9),
                municipality("North Vancouver", 58_120, true, false, true, None, 26),
                municipality("Victoria", 91_867, true, false, true, None, 34),
                municipality("Saanich", 117_735, true, false, true, None, 28),
                municipality("Kelowna", 144_576, true, false, true, None, 24),
                municipality("Langley", 28_963, true, false, true, None, 12),
                municipality("Squamish", 23_819, true, false, false, None, 5),
                municipality("Tofino", 2_516, true, false, false, None, 1),
            ],
            stations: vec![
                station("Waterfront", "Vancouver", 49.2859, -123.1116),
                station("Broadway-City Hall", "Vancouver", 49.2627, -123.1146),
                station("Commercial-Broadway", "Vancouver", 49.2626, -123.0692),
                station("Joyce-Collingwood", "Vancouver", 49.2384, -123.0318),
                station("Metrotown", "Burnaby", 49.2257, -123.0039),
                station("Lougheed Town Centre", "Burnaby", 49.2485, -122.8970),
                station("New Westminster", "New Westminster", 49.2013, -122.9127),
                station("Surrey Central", "Surrey", 49.1896, -122.8480),
                station("King George", "Surrey", 49.1827, -122.8447),
                station("Richmond-Brighouse", "Richmond", 49.1680, -123.1365),
                station("Moody Centre", "Port Moody", 49.2781, -122.8458),
                station("Lafarge Lake-Douglas", "Coquitlam", 49.2856, -122.7916),
            ],
            special_requirements: vec![
                requirement(
                    Some("Vancouver"),
                    None,
                    "Laneway house potential: rear-yard laneway dwelling permitted alongside a secondary suite",
                ),
                requirement(
                    Some("Vancouver"),
                    Some("HA"),
                    "Heritage retention review required in HA districts",
                ),
                requirement(
                    Some("Victoria"),
                    None,
                    "Garden suite permitted; Missing Middle design guidelines apply",
                ),
                requirement(
                    Some("Saanich"),
                    None,
                    "Garden suite program: detached accessory dwelling permitted",
                ),
                requirement(
                    Some("North Vancouver"),
                    None,
                    "Coach house program: detached accessory dwelling permitted",
                ),
                requirement(
                    Some("Surrey"),
                    None,
                    "Secondary suite registration and suite utility fee apply",
                ),
                requirement(
                    Some("Richmond"),
                    None,
                    "Agricultural Land Reserve buffer check required near ALR edges",
                ),
                requirement(
                    None,
                    Some("CD"),
                    "Comprehensive Development district: site-specific bylaw governs",
                ),
                requirement(
                    None,
                    Some("HER"),
                    "Heritage designation: alterations require heritage alteration permit",
                ),
            ],
        }
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::standard()
    }
}

impl RegulatoryTables for RuleBook {
    fn version(&self) -> &str {
        &self.version
    }

    fn zoning_rule(&self, zone_key: &str) -> Option<&ZoningRule> {
        self.zoning
            .iter()
            .find(|rule| rule.zone.eq_ignore_ascii_case(zone_key))
    }

    fn fallback_zoning(&self) -> &ZoningRule {
        &self.fallback_zoning
    }

    fn is_ssmuh_compatible(&self, zone_key: &str) -> bool {
        if let Some(rule) = self.zoning_rule(zone_key) {
            return rule.ssmuh_compatible;
        }

        let prefix = zone_key.split('-').next().unwrap_or_default();
        !prefix.is_empty()
            && self
                .ssmuh_zone_prefixes
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(prefix))
    }

    fn municipality(&self, name: &str) -> Option<&MunicipalityProfile> {
        let key = normalize_municipality(name);
        if key.is_empty() {
            return None;
        }
        self.municipalities
            .iter()
            .find(|profile| normalize_municipality(&profile.name) == key)
    }

    fn rapid_transit_stations(&self) -> &[TransitStation] {
        &self.stations
    }

    fn special_requirements(&self, municipality: &str, zoning: &str) -> Vec<String> {
        self.special_requirements
            .iter()
            .filter(|rule| rule.matches(municipality, zoning))
            .map(|rule| rule.requirement.clone())
            .collect()
    }
}

pub fn normalize_municipality(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Reduce a zoning code to its two-token key, e.g. `"rs-1a"` and `"RS1"` both become `"RS-1"`.
pub fn normalize_zone_key(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    let mut tokens: Vec<String> = upper
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();

    if tokens.len() == 1 {
        let token = tokens.remove(0);
        match token.find(|c: char| c.is_ascii_digit()) {
            Some(idx) if idx > 0 => {
                tokens.push(token[..idx].to_string());
                tokens.push(token[idx..].to_string());
            }
            _ => tokens.push(token),
        }
    }

    let mut parts = tokens.into_iter();
    let prefix = parts.next().unwrap_or_default();
    match parts.next() {
        Some(suffix) => {
            let digits: String = suffix.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                format!("{prefix}-{suffix}")
            } else {
                format!("{prefix}-{digits}")
            }
        }
        None => prefix,
    }
}

fn zone(
    zone: &str,
    description: &str,
    units: u32,
    storeys: u32,
    fsr: f64,
    max_height_m: f64,
    ssmuh_compatible: bool,
) -> ZoningRule {
    ZoningRule {
        zone: zone.to_string(),
        description: description.to_string(),
        units,
        storeys,
        fsr,
        max_height_m,
        ssmuh_compatible,
    }
}

fn municipality(
    name: &str,
    population: u32,
    urban_containment: bool,
    rapid_transit: bool,
    frequent_transit: bool,
    station: Option<(&str, &str)>,
    route_count: u32,
) -> MunicipalityProfile {
    MunicipalityProfile {
        name: name.to_string(),
        population,
        urban_containment,
        rapid_transit,
        frequent_transit,
        station_type: station.map(|(kind, _)| kind.to_string()),
        station_frequency: station.map(|(_, frequency)| frequency.to_string()),
        route_count,
    }
}

fn station(name: &str, municipality: &str, latitude: f64, longitude: f64) -> TransitStation {
    TransitStation {
        name: name.to_string(),
        municipality: municipality.to_string(),
        latitude,
        longitude,
    }
}

fn requirement(
    municipality: Option<&str>,
    zoning_contains: Option<&str>,
    text: &str,
) -> SpecialRequirementRule {
    SpecialRequirementRule {
        municipality: municipality.map(str::to_string),
        zoning_contains: zoning_contains.map(str::to_string),
        requirement: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_keys_reduce_to_two_tokens() {
        assert_eq!(normalize_zone_key("RS-1"), "RS-1");
        assert_eq!(normalize_zone_key(" rs-1a "), "RS-1");
        assert_eq!(normalize_zone_key("RS1"), "RS-1");
        assert_eq!(normalize_zone_key("rt_11 (heritage)"), "RT-11");
        assert_eq!(normalize_zone_key("CD-1 (412)"), "CD-1");
        assert_eq!(normalize_zone_key(""), "");
    }

    #[test]
    fn municipality_lookup_ignores_case_and_spacing() {
        let book = RuleBook::standard();
        let profile = book
            .municipality("  new   WESTMINSTER ")
            .expect("municipality present");
        assert_eq!(profile.name, "New Westminster");
        assert!(book.municipality("").is_none());
        assert!(book.municipality("Atlantis").is_none());
    }

    #[test]
    fn unknown_zone_uses_prefix_for_ssmuh_compatibility() {
        let book = RuleBook::standard();
        assert!(book.is_ssmuh_compatible("RS-9"));
        assert!(book.is_ssmuh_compatible("RT-1"));
        assert!(!book.is_ssmuh_compatible("RM-1"));
        assert!(!book.is_ssmuh_compatible("C-2"));
        assert!(!book.is_ssmuh_compatible(""));
    }

    #[test]
    fn special_requirements_match_municipality_and_zoning() {
        let book = RuleBook::standard();
        let notes = book.special_requirements("vancouver", "RT-HA-1");
        assert!(notes.iter().any(|note| note.contains("Laneway house")));
        assert!(notes.iter().any(|note| note.contains("Heritage retention")));

        let notes = book.special_requirements("Squamish", "CD-4");
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("Comprehensive Development"));
    }

    #[test]
    fn standard_book_round_trips_through_json() {
        let book = RuleBook::standard();
        let raw = serde_json::to_string(&book).expect("serializes");
        let loaded = RuleBook::from_json(&raw).expect("loads");
        assert_eq!(loaded.version, book.version);
        assert_eq!(loaded.zoning.len(), book.zoning.len());
        assert_eq!(loaded.municipalities.len(), book.municipalities.len());
        assert_eq!(loaded.stations.len(), book.stations.len());
        assert!(loaded.zoning_rule("rm-3").is_some());
    }

    #[test]
    fn validation_rejects_negative_fsr() {
        let mut book = RuleBook::standard();
        book.zoning[0].fsr = -1.0;
        let raw = serde_json::to_string(&book).expect("serializes");
        let err = RuleBook::from_json(&raw).expect_err("negative FSR rejected");
        assert!(matches!(err, RuleBookError::Invalid(_)));
    }

    #[test]
    fn fallback_is_most_restrictive_entry() {
        let book = RuleBook::standard();
        let fallback = book.fallback_zoning();
        assert_eq!((fallback.units, fallback.storeys), (1, 2));
        assert!((fallback.fsr - 0.6).abs() < f64::EPSILON);
        assert!(book.zoning.iter().all(|rule| rule.units >= fallback.units
            && rule.storeys >= fallback.storeys
            && rule.fsr >= fallback.fsr));
    }
}
