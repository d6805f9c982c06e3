//! The resampling engine.
//!
//! Every row gets a bucket id from the [`Bucketer`]. The rows are then grouped by id in
//! polars, each column in the [`AggregationSpec`] is aggregated per group, and a bucket
//! is kept only when every aggregate is present.

use polars::prelude::{col, Column, DataFrame, Expr, IntoLazy, SortMultipleOptions};
use tracing::debug;

use crate::{
    aggregation::AggregationSpec,
    bucket::{Bucketer, BucketingPolicy},
    error::{Error, Result},
    table::{self, TimeIndexedTable},
};

/// Name of the bucket id key column while grouping.
const BUCKET: &str = "__bucket_id";

/// Aggregate `table` into buckets described by `policy`.
///
/// The output has one row per bucket that holds at least one source row and has no
/// missing aggregate, labeled according to the policy's label edge. Columns are the
/// spec's keys, in spec order.
///
/// Errors:
/// - [`Error::MissingColumn`] if a spec column is not in the table
/// - [`Error::NonNumericAggregation`] if a numeric-only function targets a text column
pub fn resample(
    table: &TimeIndexedTable,
    spec: &AggregationSpec,
    policy: &BucketingPolicy,
) -> Result<TimeIndexedTable> {
    let mut columns = validate(table, spec)?;

    let bucketer = table
        .index()
        .first()
        .map(|&first| Bucketer::new(policy, first, table.tz()));
    let ids: Vec<i64> = match &bucketer {
        Some(b) => table.index().iter().map(|&ts| b.bucket_id(ts)).collect(),
        None => Vec::new(),
    };
    let mut distinct = ids.clone();
    distinct.sort_unstable();
    distinct.dedup();
    columns.push(Column::new(BUCKET.into(), ids));

    let aggs: Vec<Expr> = spec.iter().map(|(name, func)| func.expr(name)).collect();
    let mut grouped = DataFrame::new(columns)?
        .lazy()
        .group_by_stable([col(BUCKET)])
        .agg(aggs);
    if let Some(all_present) = spec
        .keys()
        .map(|name| col(name).is_not_null())
        .reduce(|acc, present| acc.and(present))
    {
        grouped = grouped.filter(all_present);
    }
    let out = grouped
        .sort([BUCKET], SortMultipleOptions::default())
        .collect()?;

    let labels = match &bucketer {
        Some(b) => out
            .column(BUCKET)?
            .as_materialized_series()
            .i64()?
            .into_no_null_iter()
            .map(|id| b.label(id))
            .collect(),
        None => Vec::new(),
    };

    debug!(
        interval = %policy.interval,
        closed = %policy.closed_edge(),
        label = %policy.label_edge(),
        buckets = distinct.len(),
        dropped = distinct.len() - out.height(),
        "resampled"
    );

    TimeIndexedTable::new(labels, out.drop(BUCKET)?, table.tz())
}

/// Check every spec column against the table and return them in spec order.
fn validate(table: &TimeIndexedTable, spec: &AggregationSpec) -> Result<Vec<Column>> {
    spec.iter()
        .map(|(name, func)| {
            let column = table
                .column(name)
                .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
            if !table::is_numeric(column) && !func.accepts_text() {
                return Err(Error::NonNumericAggregation {
                    column: name.to_string(),
                    func,
                });
            }
            Ok(column.clone())
        })
        .collect()
}
