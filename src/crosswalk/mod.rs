// src/crosswalk/mod.rs

pub mod decode;

pub use decode::{decode_table, TableFormat};

use crate::error::{Error, Result};
use crate::period::{Period, Quarter};
use serde::Serialize;
use tracing::{debug, warn};

pub const ZIP_COLUMN: &str = "ZIP";
pub const COUNTY_COLUMN: &str = "COUNTY";
/// Canonical name the county column is renamed to.
pub const FIPS_COLUMN: &str = "ST_CTY_FIPS";

const ZIP_WIDTH: usize = 5;
/// Two-digit state plus three-digit county, as listed in the gazetteer.
const COUNTY_WIDTH: usize = 5;

/// A decoded table as it came off the wire: header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One ZIP-to-county row, tagged with the period it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrosswalkRecord {
    #[serde(rename = "ZIP")]
    pub zip: String,
    #[serde(rename = "ST_CTY_FIPS")]
    pub county_code: String,
    #[serde(rename = "YEAR")]
    pub year: i32,
    #[serde(rename = "MONTH")]
    pub quarter: Quarter,
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub records: Vec<CrosswalkRecord>,
    /// `Validation` errors for rows that were dropped.
    pub rejected: Vec<Error>,
}

fn pad_digits(kind: &str, raw: &str, width: usize) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(format!("{} {:?} is not numeric", kind, raw)));
    }
    if value.len() > width {
        return Err(Error::Validation(format!(
            "{} {:?} has more than {} digits",
            kind, raw, width
        )));
    }
    Ok(format!("{:0>width$}", value, width = width))
}

/// Left-pad a zip to five digits. Rejects empty, non-digit and over-long values.
pub fn pad_zip(raw: &str) -> Result<String> {
    pad_digits("zip", raw, ZIP_WIDTH)
}

/// Left-pad a county FIPS code to five digits, so a code stored as the number
/// `1001` joins the gazetteer's `01001`.
pub fn pad_county(raw: &str) -> Result<String> {
    pad_digits("county code", raw, COUNTY_WIDTH)
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.as_str()))
}

/// Reshape one period's table into canonical crosswalk records.
///
/// A missing zip or county column is a `Schema` error for the whole period;
/// bad rows are dropped and reported in [`Normalized::rejected`].
#[tracing::instrument(level = "info", skip_all, fields(period = %period, rows = table.rows.len()))]
pub fn normalize(table: &RawTable, period: Period) -> Result<Normalized> {
    let headers: Vec<String> = table
        .headers
        .iter()
        .map(|h| h.trim().to_uppercase())
        .collect();

    let zip_idx = find_column(&headers, &[ZIP_COLUMN]).ok_or_else(|| Error::Schema {
        column: ZIP_COLUMN.to_string(),
        found: headers.clone(),
    })?;
    let county_idx =
        find_column(&headers, &[COUNTY_COLUMN, FIPS_COLUMN]).ok_or_else(|| Error::Schema {
            column: COUNTY_COLUMN.to_string(),
            found: headers.clone(),
        })?;

    let mut out = Normalized {
        records: Vec::with_capacity(table.rows.len()),
        rejected: Vec::new(),
    };

    for (row_no, row) in table.rows.iter().enumerate() {
        let raw_zip = row.get(zip_idx).map(String::as_str).unwrap_or("");
        let county = row.get(county_idx).map(|s| s.trim()).unwrap_or("");

        // fully blank trailing rows are common in spreadsheets
        if raw_zip.trim().is_empty() && county.is_empty() {
            continue;
        }

        let zip = match pad_zip(raw_zip) {
            Ok(z) => z,
            Err(e) => {
                warn!(%period, row = row_no + 1, error = %e, "rejecting crosswalk row");
                out.rejected.push(e);
                continue;
            }
        };
        let county_code = if county.is_empty() {
            Err(Error::Validation(format!("zip {} has no county code", zip)))
        } else {
            pad_county(county)
        };
        let county_code = match county_code {
            Ok(c) => c,
            Err(e) => {
                warn!(%period, row = row_no + 1, error = %e, "rejecting crosswalk row");
                out.rejected.push(e);
                continue;
            }
        };

        out.records.push(CrosswalkRecord {
            zip,
            county_code,
            year: period.year,
            quarter: period.quarter,
        });
    }

    debug!(
        records = out.records.len(),
        rejected = out.rejected.len(),
        "crosswalk normalized"
    );
    Ok(out)
}
