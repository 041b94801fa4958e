use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_PROVIDER_TIMEOUT_MS;

use super::domain::DistanceBasis;
use super::pipeline::DevelopmentPipeline;
use super::providers::{
    PropertyData, PropertyDataProvider, ProviderError, RegulatoryAnalysis, RegulatoryProvider,
};
use super::report::{
    build_plan, cache_key, resolve_parcel, resolve_zoning, AnalysisRequest, ComprehensiveReport,
    DataSources, PropertyFacts,
};
use super::rulebook::RegulatoryTables;
use super::transit::{DistanceSource, StationDistanceSource};
use super::zoning::is_recognized_zoning;

/// Storage for finished reports, keyed by their cache key.
pub trait ReportCache: Send + Sync {
    fn get(&self, cache_key: &str) -> Option<ComprehensiveReport>;
    fn put(&self, report: ComprehensiveReport);
}

/// Aggregates collaborator data and runs the development pipeline for one parcel at a time.
pub struct ParcelAnalysisService<P, R> {
    property: Arc<P>,
    regulatory: Arc<R>,
    tables: Arc<dyn RegulatoryTables>,
    distances: Arc<dyn DistanceSource>,
    cache: Option<Arc<dyn ReportCache>>,
    timeout: Duration,
}

impl<P, R> ParcelAnalysisService<P, R>
where
    P: PropertyDataProvider + 'static,
    R: RegulatoryProvider + 'static,
{
    pub fn new(property: Arc<P>, regulatory: Arc<R>, tables: Arc<dyn RegulatoryTables>) -> Self {
        Self {
            property,
            regulatory,
            tables,
            distances: Arc::new(StationDistanceSource),
            cache: None,
            timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
        }
    }

    pub fn with_distance_source(mut self, distances: Arc<dyn DistanceSource>) -> Self {
        self.distances = distances;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ReportCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn rulebook_version(&self) -> &str {
        self.tables.version()
    }

    /// Previously generated report, if a cache is attached.
    pub fn cached(&self, cache_key: &str) -> Option<ComprehensiveReport> {
        self.cache.as_ref().and_then(|cache| cache.get(cache_key))
    }

    /// Produce a report; collaborator failures degrade to defaults instead of errors.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> Result<ComprehensiveReport, AnalysisError> {
        if request.address.trim().is_empty() {
            return Err(AnalysisError::MissingAddress);
        }

        let (property, regulatory) = match request.requested_zoning() {
            Some(zoning) => {
                let zoning = zoning.to_string();
                tokio::join!(
                    self.fetch_property(&request),
                    self.fetch_regulatory(&request.municipality, &zoning)
                )
            }
            None => {
                let property = self.fetch_property(&request).await;
                let (zoning, _) = resolve_zoning(&request, property.as_ref());
                let regulatory = self.fetch_regulatory(&request.municipality, &zoning).await;
                (property, regulatory)
            }
        };

        let (parcel, applied_defaults) = resolve_parcel(&request, property.as_ref());
        for default in &applied_defaults {
            debug!(field = %default.field, value = %default.value, "applied default");
        }
        if !is_recognized_zoning(self.tables.as_ref(), &parcel.zoning) {
            warn!(
                zoning = %parcel.zoning,
                "unrecognized zoning code; using most restrictive allowance"
            );
        }

        let key = cache_key(
            &parcel,
            request.coordinates,
            self.tables.version(),
            property.as_ref(),
            regulatory.as_ref(),
        );
        if let Some(report) = self.cached(&key) {
            debug!(cache_key = %key, "serving cached report");
            return Ok(report);
        }

        let pipeline = DevelopmentPipeline::new(self.tables.as_ref(), self.distances.as_ref());
        let run = pipeline.run(&parcel, request.coordinates);

        let data_sources = DataSources {
            property_data: property.is_some(),
            regulatory_analysis: regulatory.is_some(),
            comparables: property
                .as_ref()
                .is_some_and(|data| !data.comparables.is_empty()),
            market_analysis: property
                .as_ref()
                .is_some_and(|data| data.market_analysis.is_some()),
            measured_transit_distance: run.transit.distance_basis == DistanceBasis::Measured,
        };

        let plan = build_plan(parcel, run, property.as_ref(), regulatory.as_ref());
        info!(
            address = %plan.parcel.address,
            municipality = %plan.parcel.municipality,
            recommended = %plan.recommended.name,
            scenarios = plan.scenarios.len(),
            "parcel analysis complete"
        );

        let facts = property
            .map(|data| PropertyFacts {
                comparables: data.comparables,
                market_analysis: data.market_analysis,
            })
            .unwrap_or_default();

        let report = ComprehensiveReport {
            plan,
            property: facts,
            regulatory,
            data_sources,
            applied_defaults,
            rulebook_version: self.tables.version().to_string(),
            cache_key: key,
            generated_at: Utc::now(),
        };

        if let Some(cache) = &self.cache {
            cache.put(report.clone());
        }
        Ok(report)
    }

    async fn fetch_property(&self, request: &AnalysisRequest) -> Option<PropertyData> {
        let call = self
            .property
            .property_data(&request.address, &request.municipality);
        match self.bounded(call).await {
            Ok(data) => Some(data),
            Err(error) => {
                warn!(address = %request.address, %error, "property data unavailable");
                None
            }
        }
    }

    async fn fetch_regulatory(
        &self,
        municipality: &str,
        zoning: &str,
    ) -> Option<RegulatoryAnalysis> {
        let call = self.regulatory.regulatory_analysis(municipality, zoning);
        match self.bounded(call).await {
            Ok(analysis) => Some(analysis),
            Err(error) => {
                warn!(%municipality, %zoning, %error, "regulatory analysis unavailable");
                None
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: std::future::Future<Output = Result<T, ProviderError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                millis: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// Error raised when a request cannot be analyzed at all.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("address is required")]
    MissingAddress,
}
