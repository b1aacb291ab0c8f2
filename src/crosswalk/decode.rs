use super::RawTable;
use crate::error::{Error, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::debug;
use url::Url;

/// Payload layouts the crosswalk can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Spreadsheet,
    Csv,
}

impl TableFormat {
    /// Pick a format from the URL extension, falling back to the zip magic
    /// (`.xlsx`/`.ods` are zip containers) and finally CSV.
    pub fn detect(url: &Url, bytes: &[u8]) -> Self {
        let path = url.path().to_ascii_lowercase();
        if [".xlsx", ".xls", ".xlsb", ".ods"].iter().any(|ext| path.ends_with(ext)) {
            TableFormat::Spreadsheet
        } else if path.ends_with(".csv") || path.ends_with(".txt") {
            TableFormat::Csv
        } else if bytes.starts_with(b"PK") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            TableFormat::Spreadsheet
        } else {
            TableFormat::Csv
        }
    }
}

/// Decode a fetched crosswalk payload into a [`RawTable`]; the first row holds the headers.
pub fn decode_table(url: &Url, bytes: Vec<u8>) -> Result<RawTable> {
    let format = TableFormat::detect(url, &bytes);
    debug!(%url, ?format, bytes = bytes.len(), "decoding crosswalk");
    let payload_err = |reason: String| Error::Payload {
        url: url.to_string(),
        reason,
    };
    match format {
        TableFormat::Spreadsheet => decode_spreadsheet(bytes).map_err(payload_err),
        TableFormat::Csv => decode_csv(&bytes).map_err(payload_err),
    }
}

fn decode_spreadsheet(bytes: Vec<u8>) -> std::result::Result<RawTable, String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheets".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| "worksheet is empty".to_string())?
        .iter()
        .map(cell_to_string)
        .collect();
    let rows: Vec<Vec<String>> = rows
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect();
    Ok(RawTable { headers, rows })
}

/// Render a cell as text. Whole floats lose their `.0` so that a zip stored as
/// a number reads `501`, not `501.0`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn decode_csv(bytes: &[u8]) -> std::result::Result<RawTable, String> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| format!("record {}: {}", idx + 1, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { headers, rows })
}
