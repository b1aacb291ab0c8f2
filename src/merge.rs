// src/merge.rs

use crate::crosswalk::CrosswalkRecord;
use crate::gazetteer::GazetteerRecord;
use crate::period::Quarter;
use serde::Serialize;
use std::collections::HashMap;

/// A gazetteer county joined with one of its crosswalk ZIPs.
/// Serialized field order matches the persisted column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedRecord {
    #[serde(rename = "ST_CTY_FIPS")]
    pub code: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ZIP")]
    pub zip: String,
    #[serde(rename = "YEAR")]
    pub year: i32,
    #[serde(rename = "MONTH")]
    pub quarter: Quarter,
}

/// Inner join on `code == county_code`.
///
/// Rows come out in gazetteer order, and within one county in crosswalk order.
/// Unmatched rows on either side are dropped; nothing is deduplicated.
pub fn merge(gazetteer: &[GazetteerRecord], crosswalk: &[CrosswalkRecord]) -> Vec<MergedRecord> {
    let mut by_county: HashMap<&str, Vec<&CrosswalkRecord>> = HashMap::new();
    for row in crosswalk {
        by_county.entry(row.county_code.as_str()).or_default().push(row);
    }

    let mut out = Vec::new();
    for county in gazetteer {
        let Some(rows) = by_county.get(county.code.as_str()) else {
            continue;
        };
        out.extend(rows.iter().map(|row| MergedRecord {
            code: county.code.clone(),
            name: county.name.clone(),
            zip: row.zip.clone(),
            year: row.year,
            quarter: row.quarter,
        }));
    }
    out
}
