//! Assessment-roll CSV exports as a property data source.

mod normalizer;
mod parser;

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;

use crate::workflows::development::providers::{PropertyData, PropertyDataProvider, ProviderError};
use normalizer::normalize_key;

#[derive(Debug, thiserror::Error)]
pub enum AssessmentImportError {
    #[error("failed to read assessment roll: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid assessment roll CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// In-memory assessment roll keyed by normalized address and municipality.
#[derive(Debug, Clone, Default)]
pub struct AssessmentRoll {
    records: HashMap<(String, String), PropertyData>,
}

impl AssessmentRoll {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AssessmentImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Later duplicates of an address never overwrite the first row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AssessmentImportError> {
        let mut records = HashMap::new();

        for record in parser::parse_records(reader)? {
            if record.address_key.is_empty() {
                continue;
            }
            records
                .entry((record.address_key, record.municipality_key))
                .or_insert(PropertyData {
                    assessed_value: record.assessed_value,
                    lot_size_sqft: record.lot_size_sqft,
                    zoning: record.zoning,
                    comparables: Vec::new(),
                    market_analysis: None,
                });
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lookup(&self, address: &str, municipality: &str) -> Option<&PropertyData> {
        self.records
            .get(&(normalize_key(address), normalize_key(municipality)))
    }
}

#[async_trait]
impl PropertyDataProvider for AssessmentRoll {
    async fn property_data(
        &self,
        address: &str,
        municipality: &str,
    ) -> Result<PropertyData, ProviderError> {
        self.lookup(address, municipality)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("{address}, {municipality}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ROLL: &str = "Address,Municipality,Assessed Value,Lot Size,Zoning\n\
1021 Oliver St,Victoria,\"$1,480,000\",\"6,820 sq ft\",RS-1\n\
1021  OLIVER ST.,victoria,\"$9,999,999\",100,RM-4\n\
88 Harbour Rd,Squamish,,,\n";

    #[test]
    fn normalize_key_collapses_whitespace_case_and_trailing_punctuation() {
        let normalized = normalizer::normalize_for_tests("\u{feff}1021  Oliver   St.");
        assert_eq!(normalized, "1021 oliver st");
    }

    #[test]
    fn roll_parses_display_numbers() {
        let roll = AssessmentRoll::from_reader(Cursor::new(ROLL)).expect("roll parses");
        let data = roll.lookup("1021 oliver st", "VICTORIA").expect("row present");

        assert_eq!(data.assessed_value, Some(1_480_000.0));
        assert_eq!(data.lot_size_sqft, Some(6_820.0));
        assert_eq!(data.zoning.as_deref(), Some("RS-1"));
    }

    #[test]
    fn duplicate_rows_keep_first_entry() {
        let roll = AssessmentRoll::from_reader(Cursor::new(ROLL)).expect("roll parses");
        assert_eq!(roll.len(), 2);
        let data = roll.lookup("1021 Oliver St", "Victoria").expect("row present");
        assert_eq!(data.zoning.as_deref(), Some("RS-1"));
    }

    #[test]
    fn blank_cells_become_missing_fields() {
        let roll = AssessmentRoll::from_reader(Cursor::new(ROLL)).expect("roll parses");
        let data = roll.lookup("88 Harbour Rd", "Squamish").expect("row present");

        assert_eq!(data, &PropertyData::default());
    }

    #[test]
    fn from_path_propagates_io_errors() {
        let error = AssessmentRoll::from_path("./does-not-exist.csv").expect_err("io error");
        assert!(matches!(error, AssessmentImportError::Io(_)));
    }

    #[tokio::test]
    async fn provider_reports_not_found_for_unknown_address() {
        let roll = AssessmentRoll::from_reader(Cursor::new(ROLL)).expect("roll parses");
        let error = roll
            .property_data("1 Nowhere Ln", "Victoria")
            .await
            .expect_err("missing address");
        assert!(matches!(error, ProviderError::NotFound(_)));
    }
}
