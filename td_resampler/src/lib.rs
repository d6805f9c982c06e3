//! Resampling of time-stamped trading bars.
//!
//! The crate loads OHLC-style rows from a CSV file into a [`TimeIndexedTable`],
//! optionally moves the timestamps into another time zone, aggregates the rows into
//! coarser buckets (daily, weekly, monthly, ...), trims the result by time of day and
//! date, rounds numeric columns and writes the surviving buckets back out as CSV.
//!
//! Every stage is a plain function from table to table; [`TdResampler`] strings them
//! together and applies the log-and-continue policy for recoverable anomalies.

pub mod aggregation;
pub mod bucket;
pub mod config;
pub mod cutoff;
pub mod error;
pub mod export;
pub mod interval;
pub mod loader;
pub mod pipeline;
pub mod precision;
pub mod resample;
pub mod table;
pub mod timestamp;
pub mod tz;

pub use aggregation::{AggFunc, AggregationSpec};
pub use bucket::{BucketingPolicy, Edge};
pub use cutoff::Cutoff;
pub use error::{Error, Result};
pub use interval::{Interval, IntervalUnit};
pub use pipeline::TdResampler;
pub use table::TimeIndexedTable;
