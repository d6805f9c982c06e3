//! CSV loader: builds a [`TimeIndexedTable`] from a delimited file.
//!
//! One or more source columns (typically `Date` and `Time`) are joined with a space
//! and parsed as a single timestamp. The layout is inferred from the first row
//! ([`TimestampParser`]).

use std::path::Path;

use polars::prelude::{Column, DataFrame, DataType, IntoColumn, IntoSeries, StringChunked};
use polars_io::{csv::read::CsvReadOptions, SerReader};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    table::TimeIndexedTable,
    timestamp::TimestampParser,
};

/// Cell contents treated as a missing value.
pub const MISSING_TOKENS: &[&str] = &["", "nan", "NaN", "NAN", "NA", "N/A", "null", "NULL"];

/// Where and how to read the source file.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Source columns whose text, joined with a space, forms the timestamp.
    pub datetime_columns: Vec<String>,
    /// Columns to retain. Empty means every header column. Timestamp columns may be
    /// listed here too; they are never kept as data columns.
    pub columns: Vec<String>,
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            datetime_columns: vec!["Date".into(), "Time".into()],
            columns: ["Date", "Time", "Open", "High", "Low", "Close", "Up", "Down"]
                .map(String::from)
                .to_vec(),
            delimiter: b',',
        }
    }
}

/// Load `path` into a naive table.
///
/// Errors:
/// - [`Error::SourceNotFound`] if `path` is not a file
/// - [`Error::MissingColumn`] if a requested or timestamp column is absent from the header
/// - [`Error::Timestamp`] if a row's timestamp matches no known layout
pub fn load_csv(path: &Path, opts: &LoadOptions) -> Result<TimeIndexedTable> {
    if !path.is_file() {
        return Err(Error::SourceNotFound(path.to_path_buf()));
    }

    // every column is read as text; numeric columns are recognised after cleanup
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|parse| parse.with_separator(opts.delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    let headers: Vec<String> = raw
        .get_column_names()
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    let cells = |name: &str| -> Result<&StringChunked> {
        let pos = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        Ok(raw.get_columns()[pos].as_materialized_series().str()?)
    };

    let stamp_parts = opts
        .datetime_columns
        .iter()
        .map(|c| cells(c))
        .collect::<Result<Vec<_>>>()?;

    let wanted: Vec<String> = if opts.columns.is_empty() {
        headers.clone()
    } else {
        opts.columns.clone()
    };
    let columns = wanted
        .iter()
        .filter(|c| !opts.datetime_columns.contains(c))
        .map(|c| Ok(data_column(c, cells(c)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut parser = TimestampParser::new();
    let mut index = Vec::with_capacity(raw.height());
    for row in 0..raw.height() {
        let stamp = stamp_parts
            .iter()
            .map(|part| part.get(row).unwrap_or_default().trim())
            .collect::<Vec<_>>()
            .join(" ");
        let ts = parser.parse(&stamp).ok_or(Error::Timestamp {
            // 1-based, after the header line
            line: row as u64 + 2,
            value: stamp,
        })?;
        index.push(ts.and_utc());
    }

    let frame = DataFrame::new(columns)?;
    let (table, duplicates) = TimeIndexedTable::with_duplicates_removed(index, frame, None)?;
    if duplicates > 0 {
        warn!(duplicates, "duplicate timestamps in source; keeping the last row of each");
    }
    debug!(layout = ?parser.layout(), "timestamp layout");
    info!(path = %path.display(), rows = table.len(), columns = ?table.column_names(), "loaded source");
    Ok(table)
}

/// Trim cells, null out [`MISSING_TOKENS`], and make the column numeric when every
/// remaining cell parses as a number.
fn data_column(name: &str, cells: &StringChunked) -> Column {
    let cleaned: StringChunked = cells
        .into_iter()
        .map(|cell| cell.map(str::trim).filter(|c| !MISSING_TOKENS.contains(c)))
        .collect();
    let series = cleaned.with_name(name.into()).into_series();
    match series.strict_cast(&DataType::Float64) {
        Ok(numeric) => numeric.into_column(),
        Err(_) => series.into_column(),
    }
}
