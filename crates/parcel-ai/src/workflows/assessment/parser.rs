use super::normalizer::normalize_key;
use crate::workflows::development::providers::parse_display_number;
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) struct AssessmentRecord {
    pub(crate) address_key: String,
    pub(crate) municipality_key: String,
    pub(crate) assessed_value: Option<f64>,
    pub(crate) lot_size_sqft: Option<f64>,
    pub(crate) zoning: Option<String>,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<AssessmentRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for record in csv_reader.deserialize::<AssessmentRow>() {
        let row = record?;
        records.push(AssessmentRecord {
            address_key: normalize_key(&row.address),
            municipality_key: normalize_key(&row.municipality),
            assessed_value: row.assessed_value.as_deref().and_then(parse_display_number),
            lot_size_sqft: row.lot_size.as_deref().and_then(parse_display_number),
            zoning: row.zoning,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct AssessmentRow {
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "Municipality", alias = "City")]
    municipality: String,
    #[serde(
        rename = "Assessed Value",
        alias = "Total Value",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    assessed_value: Option<String>,
    #[serde(
        rename = "Lot Size",
        alias = "Lot Size (sq ft)",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    lot_size: Option<String>,
    #[serde(rename = "Zoning", default, deserialize_with = "empty_string_as_none")]
    zoning: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
