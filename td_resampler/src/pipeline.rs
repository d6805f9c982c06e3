//! [`TdResampler`]: one trading-data sample moving through the resampling pipeline.
//!
//! The facade owns the working table and replaces it stage by stage. Recoverable
//! anomalies (unknown zones, dropped output columns) are logged here and never
//! propagate. Other failures are returned and leave the working table as it was.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, info_span};

use crate::{
    aggregation::AggregationSpec,
    bucket::BucketingPolicy,
    config::PipelineConfig,
    cutoff::{self, Cutoff},
    error::Result,
    export::{self, Projection},
    loader::{self, LoadOptions},
    precision, resample,
    table::TimeIndexedTable,
    tz,
};

/// A loaded sample and the state needed to export it.
#[derive(Debug)]
pub struct TdResampler {
    source: PathBuf,
    datetime_columns: Vec<String>,
    table: TimeIndexedTable,
    aggregation: Option<AggregationSpec>,
    output_header: bool,
}

impl TdResampler {
    /// Load `path`. A missing file is [`Error::SourceNotFound`](crate::Error::SourceNotFound).
    pub fn open(path: impl Into<PathBuf>, opts: &LoadOptions) -> Result<Self> {
        let source = path.into();
        let table = loader::load_csv(&source, opts)?;
        Ok(Self {
            source,
            datetime_columns: opts.datetime_columns.clone(),
            table,
            aggregation: None,
            output_header: true,
        })
    }

    /// Wrap an already-built table.
    pub fn from_table(table: TimeIndexedTable, datetime_columns: Vec<String>) -> Self {
        Self {
            source: PathBuf::new(),
            datetime_columns,
            table,
            aggregation: None,
            output_header: true,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn table(&self) -> &TimeIndexedTable {
        &self.table
    }

    pub fn into_table(self) -> TimeIndexedTable {
        self.table
    }

    pub fn aggregation(&self) -> Option<&AggregationSpec> {
        self.aggregation.as_ref()
    }

    pub fn set_output_header(&mut self, header: bool) {
        self.output_header = header;
    }

    /// Convert the table from `from_tz` to `to_tz`.
    ///
    /// Failures are logged and leave the table untouched; processing continues with
    /// the unconverted timestamps.
    pub fn convert_tz(&mut self, from_tz: &str, to_tz: &str) {
        debug!(from_tz, to_tz, "Converting timezone");
        match tz::convert_timezone(&self.table, from_tz, to_tz) {
            Ok(table) => self.table = table,
            Err(e) => error!(error = %e, from_tz, to_tz, "timezone conversion failed; table left unchanged"),
        }
    }

    /// Resample into buckets. On success the raw rows are discarded; the aggregated
    /// table replaces them and is returned. On error the table is left as it was.
    pub fn resample(
        &mut self,
        spec: AggregationSpec,
        policy: &BucketingPolicy,
    ) -> Result<&TimeIndexedTable> {
        debug!(policy = ?policy, aggregation = %spec, "Calling resample");
        self.table = resample::resample(&self.table, &spec, policy)?;
        self.aggregation = Some(spec);
        Ok(&self.table)
    }

    pub fn apply_cutoff(&mut self, cutoff: &Cutoff) -> Result<()> {
        self.table = cutoff::apply_cutoff(self.table.clone(), cutoff)?;
        Ok(())
    }

    pub fn apply_precision(&mut self, decimals: i32) -> Result<()> {
        self.table = precision::apply_precision(self.table.clone(), decimals)?;
        Ok(())
    }

    /// Project to `columns` and write to `outfile`.
    ///
    /// Timestamp-composing names are removed; names not produced by the resample (or
    /// not in the table, if no resample ran) are dropped with a warning. Returns the
    /// projection that was written.
    pub fn write_csv(&mut self, outfile: &Path, columns: &[String]) -> Result<Projection> {
        let available: Vec<String> = match &self.aggregation {
            Some(spec) => spec.keys().map(String::from).collect(),
            None => self.table.column_names().into_iter().map(String::from).collect(),
        };
        let projection = export::project_columns(
            columns,
            &self.datetime_columns,
            available.iter().map(String::as_str),
        );
        debug!(columns = ?projection.kept, "Writing to disk");

        self.table = self.table.clone().select(&projection.kept)?;
        export::write_csv(&self.table, outfile, self.output_header)?;
        Ok(projection)
    }
}

/// Run the whole pipeline described by `cfg`.
pub fn run_pipeline(cfg: &PipelineConfig) -> Result<()> {
    let _span = info_span!("pipeline", input = %cfg.input.path.display()).entered();

    let mut sample = TdResampler::open(&cfg.input.path, &cfg.input.load_options())?;
    sample.set_output_header(cfg.output.header);

    if let Some(zone) = &cfg.timezone {
        sample.convert_tz(&zone.from, &zone.to);
    }

    let spec = cfg.resample.aggregation.clone();
    let rows = sample.resample(spec, &cfg.resample.policy())?.len();
    info!(rows, interval = %cfg.resample.interval, "resampled");

    if let Some(cutoff) = &cfg.cutoff {
        sample.apply_cutoff(&cutoff.to_cutoff()?)?;
    }
    sample.apply_precision(cfg.precision)?;

    let columns = cfg.output.columns_or(&cfg.resample.aggregation);
    sample.write_csv(&cfg.output.path, &columns)?;
    info!(output = %cfg.output.path.display(), rows = sample.table().len(), "done");
    Ok(())
}
