//! Canonical in-memory table: a polars [`DataFrame`] of cells keyed by a unique,
//! ascending timestamp.
//!
//! Timestamps are stored as UTC instants plus an optional table-wide zone tag. A naive
//! table (no tag) stores its wall clock as if it were UTC, so `ts.naive_utc()` gives the
//! original wall-clock value back.
//!
//! Cell columns are either `Float64` (numeric) or `String` (text).

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use polars::prelude::{
    BooleanChunked, ChunkApply, Column, DataFrame, DataType, IdxCa, IdxSize, IntoColumn, IntoSeries,
    NewChunkedArray,
};

use crate::{
    error::{Error, Result},
    tz,
};

/// Whether `column` holds numbers (as opposed to text).
pub fn is_numeric(column: &Column) -> bool {
    matches!(column.dtype(), DataType::Float64)
}

/// Time-indexed table. Invariants: the frame has one row per index entry, and the
/// index is strictly ascending.
#[derive(Debug, Clone, Default)]
pub struct TimeIndexedTable {
    index: Vec<DateTime<Utc>>,
    frame: DataFrame,
    tz: Option<Tz>,
}

impl PartialEq for TimeIndexedTable {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.tz == other.tz && self.frame.equals_missing(&other.frame)
    }
}

impl TimeIndexedTable {
    /// Build a table from rows in arbitrary order.
    ///
    /// Rows are stably sorted by timestamp; when several rows share a timestamp the last
    /// one (in input order) wins.
    pub fn new(index: Vec<DateTime<Utc>>, frame: DataFrame, tz: Option<Tz>) -> Result<Self> {
        Ok(Self::with_duplicates_removed(index, frame, tz)?.0)
    }

    /// [`TimeIndexedTable::new`] from a list of columns.
    pub fn from_columns(
        index: Vec<DateTime<Utc>>,
        columns: Vec<Column>,
        tz: Option<Tz>,
    ) -> Result<Self> {
        if let Some(bad) = columns.iter().find(|c| c.len() != index.len()) {
            return Err(ragged(bad.name().as_str(), bad.len(), index.len()));
        }
        Self::new(index, DataFrame::new(columns)?, tz)
    }

    /// Like [`TimeIndexedTable::new`], also returning how many duplicate rows were dropped.
    pub fn with_duplicates_removed(
        index: Vec<DateTime<Utc>>,
        frame: DataFrame,
        tz: Option<Tz>,
    ) -> Result<(Self, usize)> {
        if frame.width() > 0 && frame.height() != index.len() {
            let first = frame.get_column_names()[0].to_string();
            return Err(ragged(&first, frame.height(), index.len()));
        }

        let mut order: Vec<usize> = (0..index.len()).collect();
        order.sort_by_key(|&i| index[i]);
        // after a stable sort, equal timestamps keep input order; keep the last of each run
        let keep: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|&(pos, &i)| order.get(pos + 1).is_none_or(|&next| index[next] != index[i]))
            .map(|(_, &i)| i)
            .collect();
        let dropped = index.len() - keep.len();

        let already_clean = dropped == 0 && keep.iter().enumerate().all(|(pos, &i)| pos == i);
        if already_clean {
            return Ok((Self { index, frame, tz }, 0));
        }
        let table = Self {
            index: keep.iter().map(|&i| index[i]).collect(),
            frame: take_rows(&frame, &keep)?,
            tz,
        };
        Ok((table, dropped))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// The cell columns, without the timestamp.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|n| n.as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.frame.column(name).ok()
    }

    /// Cells of a numeric column.
    pub fn numeric(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let series = self.column(name)?.as_materialized_series();
        Some(series.f64().ok()?.into_iter().collect())
    }

    /// Cells of a text column.
    pub fn text(&self, name: &str) -> Option<Vec<Option<String>>> {
        let series = self.column(name)?.as_materialized_series();
        Some(
            series
                .str()
                .ok()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect(),
        )
    }

    pub fn tz(&self) -> Option<Tz> {
        self.tz
    }

    /// Local wall-clock time of row `row`.
    pub fn wall_clock(&self, row: usize) -> NaiveDateTime {
        tz::wall_clock(self.index[row], self.tz)
    }

    pub fn wall_clocks(&self) -> Vec<NaiveDateTime> {
        self.index.iter().map(|&ts| tz::wall_clock(ts, self.tz)).collect()
    }

    /// Replace the index and zone tag, keeping the cells. The new index must have the
    /// same length and order as the old one.
    pub(crate) fn with_index(mut self, index: Vec<DateTime<Utc>>, tz: Option<Tz>) -> Self {
        debug_assert_eq!(index.len(), self.index.len());
        self.index = index;
        self.tz = tz;
        self
    }

    /// Keep the rows for which `keep` returns true.
    pub fn filter_rows(self, mut keep: impl FnMut(usize) -> bool) -> Result<Self> {
        let mask: Vec<bool> = (0..self.len()).map(|i| keep(i)).collect();
        if mask.iter().all(|&k| k) {
            return Ok(self);
        }
        let frame = if self.frame.width() == 0 {
            self.frame
        } else {
            self.frame.filter(&BooleanChunked::from_slice("keep".into(), &mask))?
        };
        let index = self
            .index
            .into_iter()
            .zip(&mask)
            .filter_map(|(ts, &k)| k.then_some(ts))
            .collect();
        Ok(Self {
            index,
            frame,
            tz: self.tz,
        })
    }

    /// Keep only `names`, in that order.
    pub fn select(mut self, names: &[String]) -> Result<Self> {
        if let Some(missing) = names.iter().find(|n| self.column(n).is_none()) {
            return Err(Error::MissingColumn(missing.clone()));
        }
        self.frame = self.frame.select(names.iter().map(String::as_str))?;
        Ok(self)
    }

    /// Apply `f` to every present numeric cell.
    pub fn map_numeric(mut self, f: impl Fn(f64) -> f64) -> Result<Self> {
        let columns = self
            .frame
            .get_columns()
            .iter()
            .map(|c| {
                if !is_numeric(c) {
                    return Ok(c.clone());
                }
                let mapped = c.as_materialized_series().f64()?.apply_values(&f);
                Ok(mapped.into_series().into_column())
            })
            .collect::<Result<Vec<_>>>()?;
        self.frame = DataFrame::new(columns)?;
        Ok(self)
    }
}

fn take_rows(frame: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    if frame.width() == 0 {
        return Ok(frame.clone());
    }
    let idx = IdxCa::from_vec("rows".into(), rows.iter().map(|&i| i as IdxSize).collect());
    Ok(frame.take(&idx)?)
}

fn ragged(column: &str, cells: usize, timestamps: usize) -> Error {
    Error::Config(format!(
        "column '{column}' has {cells} cells for {timestamps} timestamps"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, h, 0, 0).unwrap()
    }

    fn close(values: &[f64]) -> Column {
        Column::new("Close".into(), values)
    }

    #[test]
    fn sorts_rows_by_timestamp() {
        let t = TimeIndexedTable::from_columns(
            vec![ts(3), ts(1), ts(2)],
            vec![close(&[3.0, 1.0, 2.0])],
            None,
        )
        .unwrap();
        assert_eq!(t.index(), &[ts(1), ts(2), ts(3)]);
        assert_eq!(t.numeric("Close").unwrap(), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn duplicate_timestamps_keep_last_row() {
        let frame = DataFrame::new(vec![close(&[10.0, 20.0, 11.0, 12.0])]).unwrap();
        let (t, dropped) =
            TimeIndexedTable::with_duplicates_removed(vec![ts(1), ts(2), ts(1), ts(1)], frame, None)
                .unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(t.index(), &[ts(1), ts(2)]);
        assert_eq!(t.numeric("Close").unwrap(), vec![Some(12.0), Some(20.0)]);
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = TimeIndexedTable::from_columns(vec![ts(1)], vec![close(&[1.0, 2.0])], None)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn numeric_and_text_accessors_check_the_dtype() {
        let symbol = Column::new("Symbol".into(), &[Some("ES"), None]);
        let t = TimeIndexedTable::from_columns(
            vec![ts(1), ts(2)],
            vec![close(&[1.5, -2.0]), symbol],
            None,
        )
        .unwrap();
        assert!(is_numeric(t.column("Close").unwrap()));
        assert!(!is_numeric(t.column("Symbol").unwrap()));
        assert_eq!(t.text("Symbol").unwrap(), vec![Some("ES".to_string()), None]);
        assert_eq!(t.numeric("Symbol"), None);
    }

    #[test]
    fn select_reorders_and_reports_missing() {
        let open = Column::new("Open".into(), &[0.5]);
        let t = TimeIndexedTable::from_columns(vec![ts(1)], vec![open, close(&[1.0])], None)
            .unwrap();
        let picked = t.clone().select(&["Close".into(), "Open".into()]).unwrap();
        assert_eq!(picked.column_names(), vec!["Close", "Open"]);
        assert!(matches!(
            t.select(&["Volume".into()]),
            Err(Error::MissingColumn(c)) if c == "Volume"
        ));
    }

    #[test]
    fn filter_rows_keeps_columns_aligned() {
        let t = TimeIndexedTable::from_columns(
            vec![ts(1), ts(2), ts(3)],
            vec![close(&[1.0, 2.0, 3.0])],
            None,
        )
        .unwrap();
        let t = t.filter_rows(|i| i != 1).unwrap();
        assert_eq!(t.index(), &[ts(1), ts(3)]);
        assert_eq!(t.numeric("Close").unwrap(), vec![Some(1.0), Some(3.0)]);
    }
}
