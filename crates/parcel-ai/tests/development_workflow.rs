use std::sync::Arc;

use parcel_ai::workflows::assessment::AssessmentRoll;
use parcel_ai::workflows::development::{
    AnalysisRequest, Coordinates, DevelopmentPipeline, DistanceBasis, Parcel,
    ParcelAnalysisService, Pathway, RegulatoryTables, RuleBook, ScenarioKind,
    StationDistanceSource, UnavailableProvider,
};

fn parcel(municipality: &str, lot_area_sqft: f64, zoning: &str) -> Parcel {
    Parcel {
        address: "X".to_string(),
        municipality: municipality.to_string(),
        lot_area_sqft,
        zoning: zoning.to_string(),
        assessed_value: 1_350_000.0,
    }
}

#[test]
fn vancouver_parcel_beside_skytrain_maximizes_through_tod() {
    let book = RuleBook::standard();
    let pipeline = DevelopmentPipeline::new(&book, &StationDistanceSource);
    let near_commercial_broadway = Coordinates {
        latitude: 49.2630,
        longitude: -123.0695,
    };

    let run = pipeline.run(
        &parcel("Vancouver", 5_500.0, "RS-1"),
        Some(near_commercial_broadway),
    );

    assert!(run.transit.rapid_transit_200m);
    assert_eq!(run.allowances.tod.units, 12);
    assert_eq!(run.allowances.maximum_potential.pathway, Pathway::Tod);
    assert_eq!(run.scenarios.len(), 4);
    assert!(run
        .scenarios
        .iter()
        .all(|scenario| scenario.land_coverage <= scenario.governing_fsr + 1e-9));
}

#[test]
fn rapid_transit_city_without_coordinates_gets_no_tod_bonus() {
    let book = RuleBook::standard();
    let pipeline = DevelopmentPipeline::new(&book, &StationDistanceSource);

    let run = pipeline.run(&parcel("Surrey", 6_820.0, "RS-1"), None);

    assert_eq!(run.transit.distance_basis, DistanceBasis::Unknown);
    assert!(!run.allowances.tod.eligible);
    assert!(!run.compliance.tod_eligible);
    assert_eq!(run.allowances.ssmuh.units, 6);
    assert_eq!(run.allowances.maximum_potential.pathway, Pathway::Ssmuh);
    // Frequent bus service still waives parking.
    assert!(!run.compliance.parking_required);
}

#[test]
fn custom_rule_book_adds_a_jurisdiction_without_code_changes() {
    let mut book = RuleBook::standard();
    book.version = "bc-2024.1-nanaimo".to_string();
    let mut nanaimo = book
        .municipality("Victoria")
        .cloned()
        .expect("template municipality");
    nanaimo.name = "Nanaimo".to_string();
    nanaimo.population = 99_863;
    book.municipalities.push(nanaimo);

    let raw = serde_json::to_string(&book).expect("serializes");
    let loaded = RuleBook::from_json(&raw).expect("valid rule book");
    let pipeline = DevelopmentPipeline::new(&loaded, &StationDistanceSource);

    let run = pipeline.run(&parcel("nanaimo", 6_820.0, "RS-1"), None);
    assert!(run.compliance.ssmuh_eligible);
    assert_eq!(run.allowances.ssmuh.units, 6);
}

#[tokio::test]
async fn assessment_roll_backs_the_property_data_provider() {
    let csv = "Address,Municipality,Assessed Value,Lot Size,Zoning\n\
2250 Oak Bay Ave,Victoria,\"$1,615,000\",\"6,820 sq ft\",RS-1\n";
    let roll = AssessmentRoll::from_reader(csv.as_bytes()).expect("roll parses");
    let service = ParcelAnalysisService::new(
        Arc::new(roll),
        Arc::new(UnavailableProvider),
        Arc::new(RuleBook::standard()),
    );

    let report = service
        .analyze(AnalysisRequest::new("2250 Oak Bay Ave", "Victoria"))
        .await
        .expect("analysis succeeds");

    assert!(report.data_sources.property_data);
    assert!(!report.data_sources.regulatory_analysis);
    assert!(report.applied_defaults.is_empty());
    assert_eq!(report.plan.parcel.zoning, "RS-1");
    assert_eq!(report.plan.allowances.ssmuh.units, 6);
    assert_eq!(report.recommended().kind, ScenarioKind::SixUnitApartment);

    let json = serde_json::to_value(&report).expect("report serializes");
    assert!(json["plan"]["design_guidance"]["unit_mix_summary"].is_array());
    assert!(json["generated_at"].is_string());
}
