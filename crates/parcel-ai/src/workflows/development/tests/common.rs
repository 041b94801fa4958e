use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::development::compliance::evaluate_compliance;
use crate::workflows::development::domain::{Parcel, TransitProfile};
use crate::workflows::development::providers::{
    Comparable, MarketAnalysis, PropertyData, PropertyDataProvider, ProviderError,
    RegulatoryAnalysis, RegulatoryProvider,
};
use crate::workflows::development::report::ComprehensiveReport;
use crate::workflows::development::rulebook::RuleBook;
use crate::workflows::development::scenarios::SiteContext;
use crate::workflows::development::service::{ParcelAnalysisService, ReportCache};
use crate::workflows::development::transit::profile_from_distance;
use crate::workflows::development::zoning::compute_allowances;
use crate::workflows::development::UnavailableProvider;

pub(super) const ASSESSED_VALUE: f64 = 1_480_000.0;

pub(super) fn book() -> RuleBook {
    RuleBook::standard()
}

pub(super) fn parcel(municipality: &str, lot_area_sqft: f64, zoning: &str) -> Parcel {
    Parcel {
        address: "X".to_string(),
        municipality: municipality.to_string(),
        lot_area_sqft,
        zoning: zoning.to_string(),
        assessed_value: ASSESSED_VALUE,
    }
}

/// Profile with an explicit rapid-transit distance and frequent-bus flag.
pub(super) fn transit(
    municipality: &str,
    rapid_transit_distance_m: Option<f64>,
    frequent: bool,
) -> TransitProfile {
    profile_from_distance(municipality, rapid_transit_distance_m, frequent)
}

/// Victoria RS-1 is SSMUH eligible; Tofino is below the population threshold.
pub(super) fn site(lot_area_sqft: f64, ssmuh_eligible: bool) -> SiteContext {
    let municipality = if ssmuh_eligible { "Victoria" } else { "Tofino" };
    let tables = book();
    let parcel = parcel(municipality, lot_area_sqft, "RS-1");
    let profile = transit(municipality, None, ssmuh_eligible);
    let allowances = compute_allowances(&tables, &parcel, &profile);
    let compliance = evaluate_compliance(&tables, &parcel, &allowances, &profile);

    SiteContext {
        lot_area_sqft,
        assessed_value: parcel.assessed_value,
        allowances,
        compliance,
    }
}

pub(super) fn property_data() -> PropertyData {
    PropertyData {
        assessed_value: Some(1_650_000.0),
        lot_size_sqft: Some(6_820.0),
        zoning: Some("RS-1".to_string()),
        comparables: vec![
            Comparable {
                address: Some("1021 Oliver St".to_string()),
                sale_price: Some(1_720_000.0),
                lot_size_sqft: Some(6_500.0),
                sold_on: None,
            },
            Comparable {
                address: Some("1133 Pembroke St".to_string()),
                sale_price: Some(1_590_000.0),
                lot_size_sqft: Some(5_900.0),
                sold_on: None,
            },
        ],
        market_analysis: Some(MarketAnalysis {
            average_price_per_sqft: Some(640.0),
            demand_index: None,
            days_on_market: Some(21.0),
        }),
    }
}

pub(super) fn regulatory_analysis() -> RegulatoryAnalysis {
    RegulatoryAnalysis {
        zoning_summary: Some("One-family dwelling".to_string()),
        bylaws: vec!["Zoning Regulation Bylaw 80-159".to_string()],
        building_code: Some("BCBC 2024".to_string()),
        design_constraints: vec!["Front setback 7.5 m".to_string()],
        opportunities: vec!["Missing Middle program fast-track".to_string()],
    }
}

#[derive(Default)]
pub(super) struct StaticPropertyProvider {
    pub(super) data: PropertyData,
    pub(super) calls: AtomicUsize,
}

impl StaticPropertyProvider {
    pub(super) fn new(data: PropertyData) -> Self {
        Self {
            data,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PropertyDataProvider for StaticPropertyProvider {
    async fn property_data(
        &self,
        _address: &str,
        _municipality: &str,
    ) -> Result<PropertyData, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }
}

/// Records the zoning code each regulatory lookup was issued with.
#[derive(Default)]
pub(super) struct RecordingRegulatoryProvider {
    pub(super) zonings: Mutex<Vec<String>>,
}

impl RecordingRegulatoryProvider {
    pub(super) fn zonings(&self) -> Vec<String> {
        self.zonings.lock().expect("zoning mutex poisoned").clone()
    }
}

#[async_trait]
impl RegulatoryProvider for RecordingRegulatoryProvider {
    async fn regulatory_analysis(
        &self,
        _municipality: &str,
        zoning: &str,
    ) -> Result<RegulatoryAnalysis, ProviderError> {
        self.zonings
            .lock()
            .expect("zoning mutex poisoned")
            .push(zoning.to_string());
        Ok(regulatory_analysis())
    }
}

/// Fails the first lookup, then answers every later one.
#[derive(Default)]
pub(super) struct RecoveringRegulatoryProvider {
    calls: AtomicUsize,
}

impl RecoveringRegulatoryProvider {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegulatoryProvider for RecoveringRegulatoryProvider {
    async fn regulatory_analysis(
        &self,
        _municipality: &str,
        _zoning: &str,
    ) -> Result<RegulatoryAnalysis, ProviderError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(ProviderError::Unavailable("municipal portal down".to_string()));
        }
        Ok(regulatory_analysis())
    }
}

pub(super) struct SlowPropertyProvider;

#[async_trait]
impl PropertyDataProvider for SlowPropertyProvider {
    async fn property_data(
        &self,
        _address: &str,
        _municipality: &str,
    ) -> Result<PropertyData, ProviderError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(property_data())
    }
}

#[derive(Default)]
pub(super) struct MemoryCache {
    reports: Mutex<HashMap<String, ComprehensiveReport>>,
}

impl ReportCache for MemoryCache {
    fn get(&self, cache_key: &str) -> Option<ComprehensiveReport> {
        self.reports
            .lock()
            .expect("cache mutex poisoned")
            .get(cache_key)
            .cloned()
    }

    fn put(&self, report: ComprehensiveReport) {
        self.reports
            .lock()
            .expect("cache mutex poisoned")
            .insert(report.cache_key.clone(), report);
    }
}

pub(super) fn offline_service() -> ParcelAnalysisService<UnavailableProvider, UnavailableProvider>
{
    ParcelAnalysisService::new(
        Arc::new(UnavailableProvider),
        Arc::new(UnavailableProvider),
        Arc::new(book()),
    )
}

pub(super) fn connected_service() -> (
    ParcelAnalysisService<StaticPropertyProvider, RecordingRegulatoryProvider>,
    Arc<StaticPropertyProvider>,
    Arc<RecordingRegulatoryProvider>,
) {
    let property = Arc::new(StaticPropertyProvider::new(property_data()));
    let regulatory = Arc::new(RecordingRegulatoryProvider::default());
    let service = ParcelAnalysisService::new(property.clone(), regulatory.clone(), Arc::new(book()));
    (service, property, regulatory)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
