use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::{aggregation::AggFunc, interval::IntervalError, tz::TzError};

/// The unified error type for the `td_resampler` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The source CSV file does not exist. Fatal for a pipeline run.
    #[error("{} isn't a file", .0.display())]
    SourceNotFound(PathBuf),

    /// Polars failed while reading, aggregating or writing a frame.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// A generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A column was requested that the table (or the source header) does not have.
    #[error("Column not found: {0}")]
    MissingColumn(String),

    /// A timestamp could not be parsed with any known layout.
    #[error("Unparsable timestamp '{value}' at line {line}")]
    Timestamp {
        /// 1-based line in the source file.
        line: u64,
        /// The joined timestamp text.
        value: String,
    },

    /// A numeric-only aggregation was configured for a text column.
    #[error("Aggregation '{func}' needs a numeric column, but '{column}' holds text")]
    NonNumericAggregation {
        /// Column name.
        column: String,
        /// The offending function.
        func: AggFunc,
    },

    /// Bad interval descriptor.
    #[error(transparent)]
    Interval(#[from] IntervalError),

    /// Time zone lookup or localization failure.
    #[error(transparent)]
    Timezone(#[from] TzError),

    /// The pipeline config could not be parsed.
    #[error("Invalid pipeline config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A config value is present but unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_shows_its_cause() {
        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only volume",
        ));
        assert_eq!(err.to_string(), "I/O error: read-only volume");
    }
}
