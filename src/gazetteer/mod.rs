// src/gazetteer/mod.rs

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::HashSet, fs, path::Path};
use tracing::{debug, warn};

/// Column header line that precedes the county listing.
pub const ANCHOR: &str = "  FIPS code        name";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One county from the FIPS listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerRecord {
    #[serde(rename = "ST_CTY_FIPS")]
    pub code: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Result of extracting a listing: the clean records plus every line that was
/// dropped, in file order.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<GazetteerRecord>,
    /// `MalformedRecord` for unsplittable lines, `Validation` for duplicate codes.
    pub skipped: Vec<Error>,
}

/// Decode the raw listing. Older FCC files carry Latin-1 names such as
/// `Doña Ana`, so bytes that are not UTF-8 are read as Windows-1252.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(e) => {
            warn!(
                valid_up_to = e.valid_up_to(),
                "gazetteer is not UTF-8, decoding as Windows-1252"
            );
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            text
        }
    }
}

/// Cleans one data line: trim, cut any `(...)` annotation, collapse whitespace.
pub fn clean_line(raw: &str) -> String {
    let trimmed = raw.trim();
    let cut = match trimmed.find('(') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    WHITESPACE_RUN.replace_all(cut, " ").trim().to_string()
}

/// Parse the raw gazetteer text into `(code, name)` records.
///
/// Fails only if the header anchor is missing; bad lines and duplicate codes
/// are reported in [`Extraction::skipped`].
#[tracing::instrument(level = "info", skip(text), fields(bytes = text.len()))]
pub fn extract_records(text: &str) -> Result<Extraction> {
    let lines: Vec<&str> = text.lines().collect();
    let anchor_idx = lines
        .iter()
        .position(|l| l.trim_end_matches('\r') == ANCHOR)
        .ok_or_else(|| Error::Format(format!("anchor line {:?} not found", ANCHOR)))?;

    let mut out = Extraction::default();
    let mut seen: HashSet<String> = HashSet::new();

    // header + one separator line
    for (idx, raw) in lines.iter().enumerate().skip(anchor_idx + 2) {
        let line_no = idx + 1;
        let cleaned = clean_line(raw);
        if cleaned.is_empty() {
            continue;
        }

        let Some((code, name)) = cleaned.split_once(' ') else {
            warn!(line_no, line = %raw.trim(), "skipping malformed gazetteer line");
            out.skipped.push(Error::MalformedRecord {
                line_no,
                line: raw.trim().to_string(),
            });
            continue;
        };

        if !seen.insert(code.to_string()) {
            warn!(line_no, code, "duplicate FIPS code, keeping first occurrence");
            out.skipped.push(Error::Validation(format!(
                "duplicate FIPS code {} at line {}",
                code, line_no
            )));
            continue;
        }

        out.records.push(GazetteerRecord {
            code: code.to_string(),
            name: name.to_string(),
        });
    }

    debug!(
        records = out.records.len(),
        skipped = out.skipped.len(),
        "gazetteer extracted"
    );
    Ok(out)
}

/// Write the extracted records as a `ST_CTY_FIPS,Name` CSV.
pub fn write_audit_csv(records: &[GazetteerRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let tmp = path.with_extension("csv.tmp");
    {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        for rec in records {
            wtr.serialize(rec)?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn latin1_names_are_decoded_not_replaced() -> Result<()> {
        let mut raw = listing("").into_bytes();
        raw.extend_from_slice(b"    35013        Do\xF1a Ana County\n");
        let text = decode_text(&raw);
        assert!(matches!(text, Cow::Owned(_)));
        let ex = extract_records(&text)?;
        assert_eq!(ex.records[0].name, "Do\u{f1}a Ana County");
        Ok(())
    }

    #[test]
    fn utf8_listing_is_borrowed() {
        assert!(matches!(decode_text("Do\u{f1}a".as_bytes()), Cow::Borrowed("Do\u{f1}a")));
    }

    fn listing(body: &str) -> String {
        format!(
            "     state-level    place\n     FIPS code      name\n     -----------    -------\n\n{}\n\n{}",
            ANCHOR, body
        )
    }

    #[test]
    fn extracts_single_annotated_record() -> Result<()> {
        let text = "  FIPS code        name\n\n01001  Autauga County, AL (formerly X)\n";
        let ex = extract_records(text)?;
        assert_eq!(
            ex.records,
            vec![GazetteerRecord {
                code: "01001".into(),
                name: "Autauga County, AL".into()
            }]
        );
        assert!(ex.skipped.is_empty());
        Ok(())
    }

    #[test]
    fn collapses_internal_whitespace_and_skips_blanks() -> Result<()> {
        let text = listing(
            "    01000        Alabama\n\n   01003        Baldwin   County\t Alabama  \n   \n",
        );
        let ex = extract_records(&text)?;
        let names: Vec<_> = ex.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alabama", "Baldwin County Alabama"]);
        assert!(ex.skipped.is_empty());
        Ok(())
    }

    #[test]
    fn handles_crlf_line_endings() -> Result<()> {
        let text = "  FIPS code        name\r\n\r\n01001  Autauga County\r\n01003  Baldwin County\r\n";
        let ex = extract_records(text)?;
        assert_eq!(ex.records.len(), 2);
        assert_eq!(ex.records[1].name, "Baldwin County");
        Ok(())
    }

    #[test]
    fn missing_anchor_is_a_format_error() {
        let err = extract_records("FIPS code name\n\n01001 Autauga\n").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn anchor_must_match_exactly() {
        // one leading space instead of two
        assert!(extract_records(" FIPS code        name\n\n01001 Autauga\n").is_err());
    }

    #[test]
    fn code_only_line_is_skipped_not_fatal() -> Result<()> {
        let text = listing("01001  Autauga\n01002 (annotation only)\n01003  Baldwin\n");
        let ex = extract_records(&text)?;
        assert_eq!(ex.records.len(), 2);
        assert_eq!(ex.skipped.len(), 1);
        match &ex.skipped[0] {
            Error::MalformedRecord { line, .. } => assert_eq!(line, "01002 (annotation only)"),
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn duplicate_codes_keep_first_occurrence() -> Result<()> {
        let text = listing("01001  Autauga\n01001  Autauga Again\n01003  Baldwin\n");
        let ex = extract_records(&text)?;
        assert_eq!(ex.records.len(), 2);
        assert_eq!(ex.records[0].name, "Autauga");
        assert!(matches!(ex.skipped[0], Error::Validation(_)));
        Ok(())
    }

    #[test]
    fn line_directly_after_anchor_is_ignored() -> Result<()> {
        let text = "  FIPS code        name\n01000  Alabama\n01001  Autauga\n";
        let ex = extract_records(text)?;
        assert_eq!(ex.records.len(), 1);
        assert_eq!(ex.records[0].code, "01001");
        Ok(())
    }

    #[test]
    fn writes_audit_csv() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("county_fips.csv");
        let records = vec![
            GazetteerRecord { code: "01001".into(), name: "Autauga County, AL".into() },
            GazetteerRecord { code: "01003".into(), name: "Baldwin".into() },
        ];
        write_audit_csv(&records, &path)?;
        let body = fs::read_to_string(&path)?;
        assert_eq!(
            body,
            "ST_CTY_FIPS,Name\n01001,\"Autauga County, AL\"\n01003,Baldwin\n"
        );
        Ok(())
    }
}
