// src/pipeline/mod.rs

mod accumulator;

pub use accumulator::Accumulator;

use crate::{
    config::PipelineConfig,
    crosswalk::{self, decode_table},
    error::{Error, Result},
    fetch::Fetcher,
    gazetteer::{self, GazetteerRecord},
    merge::{merge, MergedRecord},
    period::{periods, Period},
    sink::Sink,
};
use chrono::{DateTime, Utc};
use std::{fs, rc::Rc, time::Instant};
use tracing::{debug, error, info, warn};
use url::Url;

pub const GAZETTEER_AUDIT_CSV: &str = "county_fips.csv";
pub const GAZETTEER_RAW_COPY: &str = "gov_fips.txt";

/// The extracted gazetteer, fetched once and reused for every period.
#[derive(Debug)]
pub struct GazetteerSnapshot {
    pub records: Vec<GazetteerRecord>,
    pub skipped_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodStatus {
    Merged { records: usize, rejected_rows: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodOutcome {
    pub period: Period,
    pub status: PeriodStatus,
}

#[derive(Debug)]
pub struct RunSummary {
    pub periods: Vec<PeriodOutcome>,
    pub gazetteer_records: usize,
    pub skipped_lines: usize,
    pub records: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.periods
            .iter()
            .filter(|p| matches!(p.status, PeriodStatus::Merged { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.periods.len() - self.succeeded()
    }
}

/// Drives fetch → normalize → merge for every configured period and hands the
/// accumulated table to the sink once.
pub struct Pipeline<F: Fetcher, S: Sink> {
    config: PipelineConfig,
    fetcher: F,
    sink: S,
    gazetteer: Option<Rc<GazetteerSnapshot>>,
}

impl<F: Fetcher, S: Sink> Pipeline<F, S> {
    pub fn new(config: PipelineConfig, fetcher: F, sink: S) -> Self {
        Self {
            config,
            fetcher,
            sink,
            gazetteer: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run every period. Per-period failures are logged and recorded in the
    /// summary; a gazetteer failure aborts before anything is persisted.
    #[tracing::instrument(level = "info", skip(self), fields(start = self.config.start_year, end = self.config.end_year))]
    pub fn run(&mut self) -> Result<RunSummary> {
        let started_at = Utc::now();
        self.config.validate()?;

        let snapshot = self.gazetteer()?;
        let mut acc = Accumulator::default();
        let mut outcomes = Vec::new();

        for period in periods(
            self.config.start_year,
            self.config.end_year,
            &self.config.quarters,
        ) {
            let start = Instant::now();
            let status = match self.process_period(period, &snapshot.records) {
                Ok((merged, rejected_rows)) => {
                    let records = merged.len();
                    acc.append(period, merged);
                    info!(%period, records, rejected_rows, elapsed = ?start.elapsed(), "completed");
                    PeriodStatus::Merged { records, rejected_rows }
                }
                Err(e) if e.is_recoverable() => {
                    warn!(%period, error = %e, "skipping period");
                    PeriodStatus::Skipped {
                        reason: e.to_string(),
                    }
                }
                Err(e) => {
                    error!(%period, error = %e, "aborting run");
                    return Err(e);
                }
            };
            outcomes.push(PeriodOutcome { period, status });
        }

        if acc.is_empty() {
            warn!("no crosswalk rows matched the gazetteer, persisting an empty table");
        }
        self.sink.persist(acc.records())?;

        let summary = RunSummary {
            periods: outcomes,
            gazetteer_records: snapshot.records.len(),
            skipped_lines: snapshot.skipped_lines,
            records: acc.len(),
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            records = summary.records,
            "run finished"
        );
        Ok(summary)
    }

    /// The cached gazetteer, fetching and extracting it on first use.
    pub fn gazetteer(&mut self) -> Result<Rc<GazetteerSnapshot>> {
        if let Some(snapshot) = &self.gazetteer {
            return Ok(Rc::clone(snapshot));
        }
        let snapshot = Rc::new(self.load_gazetteer()?);
        self.gazetteer = Some(Rc::clone(&snapshot));
        Ok(snapshot)
    }

    fn load_gazetteer(&self) -> Result<GazetteerSnapshot> {
        let url = parse_url(&self.config.gazetteer_url)?;
        info!(%url, "fetching gazetteer");
        let bytes = self.fetcher.fetch(&url)?;
        let text = gazetteer::decode_text(&bytes);
        let extraction = gazetteer::extract_records(&text)?;
        info!(
            records = extraction.records.len(),
            skipped = extraction.skipped.len(),
            "gazetteer ready"
        );

        if self.config.gazetteer_audit {
            if let Err(e) = self.write_audit(&bytes, &extraction.records) {
                warn!(error = %e, "could not write gazetteer audit files");
            }
        }

        Ok(GazetteerSnapshot {
            records: extraction.records,
            skipped_lines: extraction.skipped.len(),
        })
    }

    fn write_audit(&self, raw: &[u8], records: &[GazetteerRecord]) -> Result<()> {
        let dir = &self.config.output_dir;
        fs::write(dir.join(GAZETTEER_RAW_COPY), raw)?;
        gazetteer::write_audit_csv(records, dir.join(GAZETTEER_AUDIT_CSV))?;
        debug!(dir = %dir.display(), "gazetteer audit written");
        Ok(())
    }

    fn process_period(
        &self,
        period: Period,
        gazetteer: &[GazetteerRecord],
    ) -> Result<(Vec<MergedRecord>, usize)> {
        let url = parse_url(&period.render(&self.config.crosswalk_url_template))?;
        debug!(%period, %url, "fetching crosswalk");
        let bytes = self.fetcher.fetch(&url)?;
        let table = decode_table(&url, bytes)?;
        let normalized = crosswalk::normalize(&table, period)?;
        Ok((merge(gazetteer, &normalized.records), normalized.rejected.len()))
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Config(format!("invalid URL {:?}: {}", raw, e)))
}
