pub mod config;
pub mod crosswalk;
pub mod error;
pub mod fetch;
pub mod gazetteer;
pub mod merge;
pub mod period;
pub mod pipeline;
pub mod sink;

pub use crate::config::{OutputFormat, PipelineConfig};
pub use crate::crosswalk::{CrosswalkRecord, RawTable};
pub use crate::error::{Error, Result};
pub use crate::fetch::{Fetcher, HttpFetcher};
pub use crate::gazetteer::{Extraction, GazetteerRecord};
pub use crate::merge::{merge, MergedRecord};
pub use crate::period::{periods, Period, Quarter};
pub use crate::pipeline::{Accumulator, Pipeline, PeriodOutcome, PeriodStatus, RunSummary};
pub use crate::sink::{CsvSink, ParquetSink, Sink};
