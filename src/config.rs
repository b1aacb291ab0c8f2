// src/config.rs

use crate::error::{Error, Result};
use crate::period::Quarter;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

pub const DEFAULT_CROSSWALK_URL_TEMPLATE: &str =
    "https://www.huduser.gov/portal/datasets/usps/ZIP_COUNTY_{month}{year}.xlsx";
pub const DEFAULT_GAZETTEER_URL: &str =
    "https://transition.fcc.gov/oet/info/maps/census/fips/fips.txt";

/// Upper bound on `max_retries`; beyond this the backoff is hours long.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// How the merged table is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Everything a run needs: where to write, which periods, where to fetch from.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub output_name: String,
    pub output_format: OutputFormat,
    pub start_year: i32, // inclusive
    pub end_year: i32,   // inclusive
    pub quarters: Vec<Quarter>,
    pub crosswalk_url_template: String,
    pub gazetteer_url: String,
    /// Write the extracted gazetteer (and the raw listing) next to the output.
    pub gazetteer_audit: bool,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/results"),
            output_name: "ct_zip_fips".to_string(),
            output_format: OutputFormat::Parquet,
            start_year: 2020,
            end_year: 2021,
            quarters: Quarter::ALL.to_vec(),
            crosswalk_url_template: DEFAULT_CROSSWALK_URL_TEMPLATE.to_string(),
            gazetteer_url: DEFAULT_GAZETTEER_URL.to_string(),
            gazetteer_audit: true,
            request_timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing keys fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");
        let file = File::open(path).map_err(|e| {
            Error::Config(format!("opening config {}: {}", path.display(), e))
        })?;
        let cfg: Self = serde_json::from_reader(BufReader::new(file))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(Error::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if self.quarters.is_empty() {
            return Err(Error::Config("quarters must not be empty".into()));
        }
        for placeholder in ["{year}", "{month}"] {
            if !self.crosswalk_url_template.contains(placeholder) {
                return Err(Error::Config(format!(
                    "crosswalk_url_template is missing {}",
                    placeholder
                )));
            }
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::Config(format!(
                "max_retries {} exceeds the limit of {}",
                self.max_retries, MAX_RETRIES_LIMIT
            )));
        }
        if self.output_name.trim().is_empty() {
            return Err(Error::Config("output_name must not be empty".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// `<output_dir>/<output_name>.<ext>`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_name, self.output_format.extension()))
    }

    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
    pub fn with_years(mut self, start_year: i32, end_year: i32) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }
    pub fn with_quarters<I: IntoIterator<Item = Quarter>>(mut self, quarters: I) -> Self {
        self.quarters = quarters.into_iter().collect();
        self
    }
    pub fn with_crosswalk_url_template(mut self, template: impl Into<String>) -> Self {
        self.crosswalk_url_template = template.into();
        self
    }
    pub fn with_gazetteer_url(mut self, url: impl Into<String>) -> Self {
        self.gazetteer_url = url.into();
        self
    }
    pub fn with_gazetteer_audit(mut self, yes: bool) -> Self {
        self.gazetteer_audit = yes;
        self
    }
    pub fn with_retries(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = backoff_ms;
        self
    }
}
