use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use parcel_ai::config::{EngineConfig, DEFAULT_REPORT_CACHE_CAPACITY};
use parcel_ai::error::AppError;
use parcel_ai::workflows::assessment::AssessmentRoll;
use parcel_ai::workflows::development::rulebook::normalize_municipality;
use parcel_ai::workflows::development::{
    ComprehensiveReport, ParcelAnalysisService, PropertyData, PropertyDataProvider,
    ProviderError, RegulatoryAnalysis, RegulatoryProvider, ReportCache, RuleBook,
    UnavailableProvider,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

pub(crate) type AnalysisService = ParcelAnalysisService<PropertySource, RegulatorySource>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Report cache holding at most `capacity` reports; the oldest insert is evicted first.
#[derive(Clone)]
pub(crate) struct InMemoryReportCache {
    entries: Arc<Mutex<CacheEntries>>,
    capacity: usize,
}

#[derive(Default)]
struct CacheEntries {
    reports: HashMap<String, ComprehensiveReport>,
    order: VecDeque<String>,
}

impl InMemoryReportCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(CacheEntries::default())),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reports
            .len()
    }
}

impl Default for InMemoryReportCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_REPORT_CACHE_CAPACITY)
    }
}

impl ReportCache for InMemoryReportCache {
    fn get(&self, cache_key: &str) -> Option<ComprehensiveReport> {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.reports.get(cache_key).cloned()
    }

    fn put(&self, report: ComprehensiveReport) {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let key = report.cache_key.clone();
        if guard.reports.insert(key.clone(), report).is_some() {
            return;
        }

        guard.order.push_back(key);
        while guard.order.len() > self.capacity {
            if let Some(evicted) = guard.order.pop_front() {
                guard.reports.remove(&evicted);
            }
        }
    }
}

/// Property facts read from a JSON document: municipality, then address, then the payload.
#[derive(Debug, Clone, Default)]
pub(crate) struct JsonPropertyProvider {
    entries: HashMap<(String, String), PropertyData>,
}

impl JsonPropertyProvider {
    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        Self::from_value(&value)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err).into())
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self, ProviderError> {
        let municipalities = value.as_object().ok_or_else(|| {
            ProviderError::InvalidPayload("property document must map municipalities".to_string())
        })?;

        let mut entries = HashMap::new();
        for (municipality, parcels) in municipalities {
            let parcels = parcels.as_object().ok_or_else(|| {
                ProviderError::InvalidPayload(format!("{municipality} must map addresses"))
            })?;
            for (address, payload) in parcels {
                entries.insert(
                    (normalize_municipality(address), normalize_municipality(municipality)),
                    PropertyData::from_json(payload)?,
                );
            }
        }
        Ok(Self { entries })
    }
}

#[async_trait]
impl PropertyDataProvider for JsonPropertyProvider {
    async fn property_data(
        &self,
        address: &str,
        municipality: &str,
    ) -> Result<PropertyData, ProviderError> {
        self.entries
            .get(&(normalize_municipality(address), normalize_municipality(municipality)))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("{address}, {municipality}")))
    }
}

/// Regulatory notes read from a JSON document keyed by municipality name.
#[derive(Debug, Clone, Default)]
pub(crate) struct JsonRegulatoryProvider {
    entries: HashMap<String, RegulatoryAnalysis>,
}

impl JsonRegulatoryProvider {
    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        Self::from_value(&value)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err).into())
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self, ProviderError> {
        let object = value.as_object().ok_or_else(|| {
            ProviderError::InvalidPayload("regulatory document must map municipalities".to_string())
        })?;

        let mut entries = HashMap::new();
        for (municipality, payload) in object {
            entries.insert(
                normalize_municipality(municipality),
                RegulatoryAnalysis::from_json(payload)?,
            );
        }
        Ok(Self { entries })
    }
}

#[async_trait]
impl RegulatoryProvider for JsonRegulatoryProvider {
    async fn regulatory_analysis(
        &self,
        municipality: &str,
        _zoning: &str,
    ) -> Result<RegulatoryAnalysis, ProviderError> {
        self.entries
            .get(&normalize_municipality(municipality))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(municipality.to_string()))
    }
}

/// Property data backing chosen at startup.
pub(crate) enum PropertySource {
    Roll(AssessmentRoll),
    Json(JsonPropertyProvider),
    Unconfigured(UnavailableProvider),
}

#[async_trait]
impl PropertyDataProvider for PropertySource {
    async fn property_data(
        &self,
        address: &str,
        municipality: &str,
    ) -> Result<PropertyData, ProviderError> {
        match self {
            PropertySource::Roll(roll) => roll.property_data(address, municipality).await,
            PropertySource::Json(document) => document.property_data(address, municipality).await,
            PropertySource::Unconfigured(none) => none.property_data(address, municipality).await,
        }
    }
}

pub(crate) enum RegulatorySource {
    Json(JsonRegulatoryProvider),
    Unconfigured(UnavailableProvider),
}

#[async_trait]
impl RegulatoryProvider for RegulatorySource {
    async fn regulatory_analysis(
        &self,
        municipality: &str,
        zoning: &str,
    ) -> Result<RegulatoryAnalysis, ProviderError> {
        match self {
            RegulatorySource::Json(document) => {
                document.regulatory_analysis(municipality, zoning).await
            }
            RegulatorySource::Unconfigured(none) => {
                none.regulatory_analysis(municipality, zoning).await
            }
        }
    }
}

pub(crate) fn load_rulebook(engine: &EngineConfig) -> Result<RuleBook, AppError> {
    match &engine.rulebook_path {
        Some(path) => {
            let book = RuleBook::from_path(path)?;
            info!(path = %path.display(), version = %book.version, "loaded rule book");
            Ok(book)
        }
        None => Ok(RuleBook::standard()),
    }
}

/// An assessment roll wins over a JSON property document when both are configured.
pub(crate) fn property_source(engine: &EngineConfig) -> Result<PropertySource, AppError> {
    if let Some(path) = &engine.assessment_csv {
        let roll = AssessmentRoll::from_path(path)?;
        info!(path = %path.display(), parcels = roll.len(), "loaded assessment roll");
        return Ok(PropertySource::Roll(roll));
    }

    match &engine.property_json {
        Some(path) => {
            let document = JsonPropertyProvider::from_path(path)?;
            info!(path = %path.display(), parcels = document.entries.len(), "loaded property data");
            Ok(PropertySource::Json(document))
        }
        None => Ok(PropertySource::Unconfigured(UnavailableProvider)),
    }
}

pub(crate) fn regulatory_source(engine: &EngineConfig) -> Result<RegulatorySource, AppError> {
    match &engine.regulatory_json {
        Some(path) => Ok(RegulatorySource::Json(JsonRegulatoryProvider::from_path(
            path,
        )?)),
        None => Ok(RegulatorySource::Unconfigured(UnavailableProvider)),
    }
}

pub(crate) fn build_analysis_service(engine: &EngineConfig) -> Result<AnalysisService, AppError> {
    let tables = load_rulebook(engine)?;
    let property = property_source(engine)?;
    let regulatory = regulatory_source(engine)?;

    Ok(
        ParcelAnalysisService::new(Arc::new(property), Arc::new(regulatory), Arc::new(tables))
            .with_timeout(engine.provider_timeout),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_ai::workflows::development::AnalysisRequest;
    use serde_json::json;

    #[tokio::test]
    async fn json_regulatory_provider_matches_municipality_loosely() {
        let provider = JsonRegulatoryProvider::from_value(&json!({
            "Victoria": {
                "zoningSummary": "R1-B single family",
                "designConstraints": ["Front setback 7.5 m"]
            }
        }))
        .expect("valid document");

        let analysis = provider
            .regulatory_analysis("  victoria ", "RS-1")
            .await
            .expect("entry present");
        assert_eq!(analysis.design_constraints, vec!["Front setback 7.5 m"]);

        let missing = provider.regulatory_analysis("Surrey", "RS-1").await;
        assert!(matches!(missing, Err(ProviderError::NotFound(_))));
    }

    #[tokio::test]
    async fn report_cache_stores_reports_by_key() {
        let cache = InMemoryReportCache::default();
        let service = build_analysis_service(&EngineConfig::default())
            .expect("service builds")
            .with_cache(Arc::new(cache.clone()));

        let report = service
            .analyze(AnalysisRequest::new("1021 Oliver St", "Victoria"))
            .await
            .expect("analysis succeeds");

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&report.cache_key).map(|cached| cached.generated_at),
            Some(report.generated_at)
        );
        assert!(cache.get("missing").is_none());
    }

    #[tokio::test]
    async fn report_cache_evicts_oldest_report_past_capacity() {
        let cache = InMemoryReportCache::with_capacity(2);
        let service = build_analysis_service(&EngineConfig::default())
            .expect("service builds")
            .with_cache(Arc::new(cache.clone()));

        let mut keys = Vec::new();
        for address in ["1 Fort St", "2 Fort St", "3 Fort St"] {
            let report = service
                .analyze(AnalysisRequest::new(address, "Victoria"))
                .await
                .expect("analysis succeeds");
            keys.push(report.cache_key);
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_some());
        assert!(cache.get(&keys[2]).is_some());

        service
            .analyze(AnalysisRequest::new("3 Fort St", "Victoria"))
            .await
            .expect("analysis succeeds");
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&keys[1]).is_some());
    }

    #[tokio::test]
    async fn json_property_provider_converts_display_values() {
        let provider = JsonPropertyProvider::from_value(&json!({
            "Victoria": {
                "1021 Oliver St": {
                    "assessedValue": "$1,480,000",
                    "lotSize": "6,820 sq ft",
                    "zoning": "RS-1"
                }
            }
        }))
        .expect("valid document");

        let data = provider
            .property_data("1021  oliver st", "VICTORIA")
            .await
            .expect("entry present");
        assert_eq!(data.assessed_value, Some(1_480_000.0));
        assert_eq!(data.lot_size_sqft, Some(6_820.0));
        assert_eq!(data.zoning.as_deref(), Some("RS-1"));

        let missing = provider.property_data("9 Elm St", "Victoria").await;
        assert!(matches!(missing, Err(ProviderError::NotFound(_))));

        let malformed = JsonPropertyProvider::from_value(&json!({ "Victoria": [] }));
        assert!(matches!(malformed, Err(ProviderError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn configured_property_document_feeds_the_analysis() {
        let path = std::env::temp_dir().join(format!(
            "parcel-ai-property-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            json!({
                "Victoria": {
                    "1021 Oliver St": { "assessed_value": 1_480_000, "lot_size_sqft": 6_820 }
                }
            })
            .to_string(),
        )
        .expect("write fixture");

        let engine = EngineConfig {
            property_json: Some(path.clone()),
            ..EngineConfig::default()
        };
        let service = build_analysis_service(&engine).expect("service builds");
        let report = service
            .analyze(AnalysisRequest::new("1021 Oliver St", "Victoria"))
            .await
            .expect("analysis succeeds");
        std::fs::remove_file(&path).ok();

        assert!(report.data_sources.property_data);
        assert_eq!(report.plan.parcel.lot_area_sqft, 6_820.0);
        let fields: Vec<&str> = report
            .applied_defaults
            .iter()
            .map(|applied| applied.field.as_str())
            .collect();
        assert_eq!(fields, vec!["zoning"]);
    }

    #[test]
    fn unconfigured_engine_uses_standard_rulebook() {
        let engine = EngineConfig::default();
        let book = load_rulebook(&engine).expect("standard book");
        assert_eq!(book.version, RuleBook::standard().version);
        assert!(matches!(
            property_source(&engine),
            Ok(PropertySource::Unconfigured(_))
        ));
    }
}
