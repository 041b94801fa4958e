use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property facts reported by an assessment or listings source. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyData {
    pub assessed_value: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub zoning: Option<String>,
    #[serde(default)]
    pub comparables: Vec<Comparable>,
    pub market_analysis: Option<MarketAnalysis>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparable {
    pub address: Option<String>,
    pub sale_price: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub sold_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub average_price_per_sqft: Option<f64>,
    pub demand_index: Option<f64>,
    pub days_on_market: Option<f64>,
}

/// Municipal planning notes for a zoning code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryAnalysis {
    pub zoning_summary: Option<String>,
    #[serde(default)]
    pub bylaws: Vec<String>,
    pub building_code: Option<String>,
    #[serde(default)]
    pub design_constraints: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error("no record for {0}")]
    NotFound(String),
    #[error("data source timed out after {millis} ms")]
    Timeout { millis: u64 },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[async_trait]
pub trait PropertyDataProvider: Send + Sync {
    async fn property_data(
        &self,
        address: &str,
        municipality: &str,
    ) -> Result<PropertyData, ProviderError>;
}

#[async_trait]
pub trait RegulatoryProvider: Send + Sync {
    async fn regulatory_analysis(
        &self,
        municipality: &str,
        zoning: &str,
    ) -> Result<RegulatoryAnalysis, ProviderError>;
}

/// Stand-in for a collaborator that has not been configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

#[async_trait]
impl PropertyDataProvider for UnavailableProvider {
    async fn property_data(
        &self,
        _address: &str,
        _municipality: &str,
    ) -> Result<PropertyData, ProviderError> {
        Err(ProviderError::Unavailable(
            "no property data source configured".to_string(),
        ))
    }
}

#[async_trait]
impl RegulatoryProvider for UnavailableProvider {
    async fn regulatory_analysis(
        &self,
        _municipality: &str,
        _zoning: &str,
    ) -> Result<RegulatoryAnalysis, ProviderError> {
        Err(ProviderError::Unavailable(
            "no regulatory data source configured".to_string(),
        ))
    }
}

impl PropertyData {
    /// Accepts camelCase or snake_case keys and numbers written as display strings.
    pub fn from_json(value: &Value) -> Result<Self, ProviderError> {
        let object = as_object(value, "property data")?;

        let comparables = field(object, &["comparables", "comparableSales", "comparable_sales"])
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(Comparable::from_json).collect())
            .unwrap_or_default();

        Ok(Self {
            assessed_value: number_field(
                object,
                &["assessedValue", "assessed_value", "marketValue", "market_value"],
            ),
            lot_size_sqft: number_field(
                object,
                &["lotSize", "lot_size", "lotSizeSqft", "lot_size_sqft"],
            ),
            zoning: text_field(object, &["zoning", "zoningCode", "zoning_code"]),
            comparables,
            market_analysis: field(object, &["marketAnalysis", "market_analysis"])
                .and_then(Value::as_object)
                .map(MarketAnalysis::from_object),
        })
    }
}

impl Comparable {
    fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            address: text_field(object, &["address"]),
            sale_price: number_field(object, &["salePrice", "sale_price", "price"]),
            lot_size_sqft: number_field(object, &["lotSize", "lot_size", "lot_size_sqft"]),
            sold_on: text_field(object, &["soldOn", "sold_on", "saleDate", "sale_date"])
                .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()),
        })
    }
}

impl MarketAnalysis {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            average_price_per_sqft: number_field(
                object,
                &[
                    "averagePricePerSqft",
                    "average_price_per_sqft",
                    "pricePerSqft",
                    "price_per_sqft",
                ],
            ),
            demand_index: number_field(object, &["demandIndex", "demand_index", "demand"]),
            days_on_market: number_field(
                object,
                &["daysOnMarket", "days_on_market", "averageDaysOnMarket"],
            ),
        }
    }
}

impl RegulatoryAnalysis {
    pub fn from_json(value: &Value) -> Result<Self, ProviderError> {
        let object = as_object(value, "regulatory analysis")?;

        Ok(Self {
            zoning_summary: text_field(object, &["zoningSummary", "zoning_summary", "summary"]),
            bylaws: list_field(object, &["bylaws", "byLaws", "by_laws"]),
            building_code: field(object, &["buildingCode", "building_code"]).and_then(|value| {
                match value {
                    Value::Object(_) | Value::Array(_) => Some(value.to_string()),
                    other => text(other),
                }
            }),
            design_constraints: list_field(object, &["designConstraints", "design_constraints"]),
            opportunities: list_field(object, &["opportunities"]),
        })
    }
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ProviderError> {
    value
        .as_object()
        .ok_or_else(|| ProviderError::InvalidPayload(format!("{what} must be a JSON object")))
}

fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn number_field(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    field(object, keys).and_then(number)
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(object, keys).and_then(text)
}

fn list_field(object: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match field(object, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(entry) => text_field(entry, &["title", "name", "description"]),
                other => text(other),
            })
            .collect(),
        Some(other) => text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(raw) => parse_display_number(raw),
        _ => None,
    }
}

/// Reads the first numeric run in strings such as "$1,250,000" or "6,820 sq ft".
pub fn parse_display_number(raw: &str) -> Option<f64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let mut digits = String::new();
    if raw[..start].ends_with('-') {
        digits.push('-');
    }
    for c in raw[start..].chars() {
        match c {
            '0'..='9' | '.' => digits.push(c),
            ',' | '_' => {}
            _ => break,
        }
    }
    digits
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
