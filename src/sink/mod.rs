// src/sink/mod.rs

use crate::config::OutputFormat;
use crate::error::Result;
use crate::merge::MergedRecord;
use arrow::{
    array::{ArrayRef, Int32Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;

/// Persisted column names, in order.
pub const COLUMNS: [&str; 5] = ["ST_CTY_FIPS", "Name", "ZIP", "YEAR", "MONTH"];

/// Receives the accumulated table once, at the end of a run.
pub trait Sink {
    fn persist(&mut self, records: &[MergedRecord]) -> Result<()>;
}

/// Build the sink matching `format` at `path`.
pub fn for_format(format: OutputFormat, path: impl Into<PathBuf>) -> Box<dyn Sink> {
    match format {
        OutputFormat::Parquet => Box::new(ParquetSink::new(path)),
        OutputFormat::Csv => Box::new(CsvSink::new(path)),
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn persist(&mut self, records: &[MergedRecord]) -> Result<()> {
        (**self).persist(records)
    }
}

/// Arrow schema of the merged table. Codes stay `Utf8` so leading zeros survive.
pub fn merged_schema() -> Schema {
    Schema::new(vec![
        Field::new(COLUMNS[0], DataType::Utf8, false),
        Field::new(COLUMNS[1], DataType::Utf8, false),
        Field::new(COLUMNS[2], DataType::Utf8, false),
        Field::new(COLUMNS[3], DataType::Int32, false),
        Field::new(COLUMNS[4], DataType::Utf8, false),
    ])
}

fn to_batch(schema: Arc<Schema>, records: &[MergedRecord]) -> Result<RecordBatch> {
    let codes: StringArray = records.iter().map(|r| Some(r.code.as_str())).collect();
    let names: StringArray = records.iter().map(|r| Some(r.name.as_str())).collect();
    let zips: StringArray = records.iter().map(|r| Some(r.zip.as_str())).collect();
    let years = Int32Array::from_iter_values(records.iter().map(|r| r.year));
    let months: StringArray = records.iter().map(|r| Some(r.quarter.tag())).collect();
    let cols: Vec<ArrayRef> = vec![
        Arc::new(codes),
        Arc::new(names),
        Arc::new(zips),
        Arc::new(years),
        Arc::new(months),
    ];
    Ok(RecordBatch::try_new(schema, cols)?)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes one SNAPPY-compressed Parquet file.
pub struct ParquetSink {
    path: PathBuf,
}

impl ParquetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Sink for ParquetSink {
    #[tracing::instrument(level = "info", skip(self, records), fields(path = %self.path.display(), rows = records.len()))]
    fn persist(&mut self, records: &[MergedRecord]) -> Result<()> {
        let schema = Arc::new(merged_schema());
        let batch = to_batch(schema.clone(), records)?;

        let tmp = tmp_path(&self.path);
        let file = File::create(&tmp)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        fs::rename(&tmp, &self.path)?;

        info!("wrote merged table");
        Ok(())
    }
}

/// Writes a header row plus one text row per record.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Sink for CsvSink {
    #[tracing::instrument(level = "info", skip(self, records), fields(path = %self.path.display(), rows = records.len()))]
    fn persist(&mut self, records: &[MergedRecord]) -> Result<()> {
        let tmp = tmp_path(&self.path);
        {
            let mut wtr = csv::Writer::from_path(&tmp)?;
            // explicit header so an empty run still yields a self-describing file
            wtr.write_record(COLUMNS)?;
            for r in records {
                let year = r.year.to_string();
                wtr.write_record([
                    r.code.as_str(),
                    r.name.as_str(),
                    r.zip.as_str(),
                    year.as_str(),
                    r.quarter.tag(),
                ])?;
            }
            wtr.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!("wrote merged table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Quarter;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn sample() -> Vec<MergedRecord> {
        vec![
            MergedRecord {
                code: "01001".into(),
                name: "Autauga County, AL".into(),
                zip: "00501".into(),
                year: 2020,
                quarter: Quarter::Mar,
            },
            MergedRecord {
                code: "01003".into(),
                name: "Baldwin".into(),
                zip: "36507".into(),
                year: 2021,
                quarter: Quarter::Dec,
            },
        ]
    }

    #[test]
    fn parquet_keeps_codes_as_strings() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ct_zip_fips.parquet");
        ParquetSink::new(&path).persist(&sample())?;
        assert!(!tmp_path(&path).exists());

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let batches: Vec<RecordBatch> = reader.collect::<std::result::Result<_, _>>()?;
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, COLUMNS);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Utf8);
        assert_eq!(batch.schema().field(2).data_type(), &DataType::Utf8);

        let zips = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("ZIP is Utf8");
        assert_eq!(zips.len(), 2);
        assert_eq!(zips.value(0), "00501");
        let months = batch
            .column(4)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("MONTH is Utf8");
        assert_eq!(months.value(1), "12");
        Ok(())
    }

    #[test]
    fn csv_has_header_and_padded_codes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ct_zip_fips.csv");
        CsvSink::new(&path).persist(&sample())?;
        let body = fs::read_to_string(&path)?;
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "ST_CTY_FIPS,Name,ZIP,YEAR,MONTH");
        assert_eq!(lines[1], "01001,\"Autauga County, AL\",00501,2020,03");
        assert_eq!(lines[2], "01003,Baldwin,36507,2021,12");
        Ok(())
    }

    #[test]
    fn empty_run_still_writes_header() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.csv");
        for_format(OutputFormat::Csv, &path).persist(&[])?;
        assert_eq!(fs::read_to_string(&path)?.trim_end(), "ST_CTY_FIPS,Name,ZIP,YEAR,MONTH");
        Ok(())
    }
}
