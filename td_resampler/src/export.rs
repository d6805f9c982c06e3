//! Column projection and CSV output.

use std::{fs::File, io, path::Path};

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use polars::prelude::{Column, DataFrame};
use polars_io::{csv::write::CsvWriter, SerWriter};
use tracing::{debug, warn};

use crate::{error::Result, table::TimeIndexedTable};

/// Header of the timestamp column in written files.
pub const INDEX_HEADER: &str = "DateTime";

/// Outcome of [`project_columns`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// Columns to write, in request order.
    pub kept: Vec<String>,
    /// Requested names that are not available.
    pub dropped: Vec<String>,
}

/// Resolve the requested output columns.
///
/// Timestamp-composing names are removed silently, since the row key already carries
/// them. Names not in `available` are dropped with a warning.
pub fn project_columns<'a>(
    requested: &[String],
    datetime_columns: &[String],
    available: impl IntoIterator<Item = &'a str> + Clone,
) -> Projection {
    let mut projection = Projection::default();
    for name in requested.iter().filter(|c| !datetime_columns.contains(*c)) {
        if available.clone().into_iter().any(|a| a == name.as_str()) {
            projection.kept.push(name.clone());
        } else {
            warn!(column = %name, "col {name} not in resampled data. discarded.");
            projection.dropped.push(name.clone());
        }
    }
    projection
}

/// Write `table` to `path`.
pub fn write_csv(table: &TimeIndexedTable, path: &Path, header: bool) -> Result<()> {
    let file = File::create(path)?;
    write_csv_to(table, file, header)?;
    debug!(path = %path.display(), rows = table.len(), columns = ?table.column_names(), "wrote csv");
    Ok(())
}

/// Write `table` as CSV to any writer, ascending by timestamp.
///
/// The timestamp is the first column, under [`INDEX_HEADER`]. Missing cells are empty.
pub fn write_csv_to<W: io::Write>(table: &TimeIndexedTable, writer: W, header: bool) -> Result<()> {
    let stamp = TimestampFormat::for_table(table);
    let stamps: Vec<String> = table.index().iter().map(|&ts| stamp.format(ts)).collect();

    let mut columns = vec![Column::new(INDEX_HEADER.into(), stamps)];
    columns.extend(table.frame().get_columns().iter().cloned());
    let mut df = DataFrame::new(columns)?;

    CsvWriter::new(writer).include_header(header).finish(&mut df)?;
    Ok(())
}

enum TimestampFormat {
    DateOnly,
    Naive,
    Zoned(Tz),
}

impl TimestampFormat {
    /// Naive tables whose timestamps all fall on midnight print dates only.
    fn for_table(table: &TimeIndexedTable) -> Self {
        match table.tz() {
            Some(tz) => TimestampFormat::Zoned(tz),
            None if table.index().iter().all(|ts| ts.time() == NaiveTime::MIN) => {
                TimestampFormat::DateOnly
            }
            None => TimestampFormat::Naive,
        }
    }

    fn format(&self, ts: DateTime<Utc>) -> String {
        match self {
            TimestampFormat::DateOnly => ts.format("%Y-%m-%d").to_string(),
            TimestampFormat::Naive => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            TimestampFormat::Zoned(tz) => ts.with_timezone(tz).format("%Y-%m-%d %H:%M:%S%:z").to_string(),
        }
    }
}
