//! Pipeline configuration: a TOML file describing one resampling run.
//!
//! ```toml
//! precision = 2
//!
//! [input]
//! path = "input.csv"
//! datetime_columns = ["Date", "Time"]
//! columns = ["Date", "Time", "Open", "High", "Low", "Close", "Up", "Down"]
//!
//! [timezone]
//! from = "US/Central"
//! to = "US/Eastern"
//!
//! [resample]
//! interval = "D"
//! closed = "left"
//! label = "right"
//!
//! [resample.aggregation]
//! Open = "first"
//! High = "max"
//! Low = "min"
//! Close = "last"
//!
//! [cutoff]
//! start_date = "12/20/2018"
//! end_date = "1/08/2019"
//!
//! [output]
//! path = "out.csv"
//! ```
//!
//! Entrypoints: [`load_config_str`] and [`load_config_path`]. Every table rejects unknown
//! keys, aggregation names are checked against [`AggFunc`](crate::AggFunc) and interval
//! tokens are parsed while reading, so a config that loads is ready to run.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    aggregation::AggregationSpec,
    bucket::{BucketingPolicy, Edge},
    cutoff::Cutoff,
    error::{Error, Result},
    interval::Interval,
    loader::LoadOptions,
    precision::DEFAULT_PRECISION,
    timestamp::{parse_time_of_day, parse_timestamp},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Decimal places for the rounding stage; omitted means 2.
    #[serde(default = "default_precision")]
    pub precision: i32,
    pub input: InputCfg,
    pub timezone: Option<TimezoneCfg>,
    pub resample: ResampleCfg,
    pub cutoff: Option<CutoffCfg>,
    pub output: OutputCfg,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputCfg {
    pub path: PathBuf,
    #[serde(default = "default_datetime_columns")]
    pub datetime_columns: Vec<String>,
    /// Columns to load; empty loads every header column.
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimezoneCfg {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResampleCfg {
    pub interval: Interval,
    pub closed: Option<Edge>,
    pub label: Option<Edge>,
    pub aggregation: AggregationSpec,
}

/// Cutoff bounds as written in the file; dates accept any layout the loader knows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CutoffCfg {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputCfg {
    pub path: PathBuf,
    /// Output columns; omitted means the aggregation keys in order.
    pub columns: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub header: bool,
}

fn default_precision() -> i32 {
    DEFAULT_PRECISION
}

fn default_datetime_columns() -> Vec<String> {
    vec!["Date".into(), "Time".into()]
}

fn default_true() -> bool {
    true
}

impl InputCfg {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            datetime_columns: self.datetime_columns.clone(),
            columns: self.columns.clone(),
            ..LoadOptions::default()
        }
    }
}

impl ResampleCfg {
    pub fn policy(&self) -> BucketingPolicy {
        BucketingPolicy {
            interval: self.interval,
            closed: self.closed,
            label: self.label,
        }
    }
}

impl CutoffCfg {
    /// Parse the textual bounds.
    pub fn to_cutoff(&self) -> Result<Cutoff> {
        let time = |field: &str, value: &Option<String>| {
            value
                .as_deref()
                .map(|s| {
                    parse_time_of_day(s)
                        .ok_or_else(|| Error::Config(format!("cutoff.{field}: bad time of day '{s}'")))
                })
                .transpose()
        };
        let date = |field: &str, value: &Option<String>| {
            value
                .as_deref()
                .map(|s| {
                    parse_timestamp(s)
                        .ok_or_else(|| Error::Config(format!("cutoff.{field}: bad date '{s}'")))
                })
                .transpose()
        };
        Ok(Cutoff {
            start_time: time("start_time", &self.start_time)?,
            end_time: time("end_time", &self.end_time)?,
            start_date: date("start_date", &self.start_date)?,
            end_date: date("end_date", &self.end_date)?,
        })
    }
}

impl OutputCfg {
    /// Requested output columns, defaulting to the aggregation keys.
    pub fn columns_or(&self, spec: &AggregationSpec) -> Vec<String> {
        self.columns
            .clone()
            .unwrap_or_else(|| spec.keys().map(String::from).collect())
    }
}

impl PipelineConfig {
    /// Check the parts serde cannot: cutoff bounds and an empty aggregation.
    pub fn validate(&self) -> Result<()> {
        if self.resample.aggregation.is_empty() {
            return Err(Error::Config("resample.aggregation is empty".into()));
        }
        if self.input.datetime_columns.is_empty() {
            return Err(Error::Config("input.datetime_columns is empty".into()));
        }
        if let Some(cutoff) = &self.cutoff {
            cutoff.to_cutoff()?;
        }
        Ok(())
    }
}

/// Parse and validate a pipeline config from TOML text.
pub fn load_config_str(s: &str) -> Result<PipelineConfig> {
    let cfg: PipelineConfig = toml::from_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Parse and validate a pipeline config from a file.
pub fn load_config_path(path: &Path) -> Result<PipelineConfig> {
    let s = std::fs::read_to_string(path)?;
    load_config_str(&s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregation::AggFunc, interval::IntervalUnit};
    use chrono::{NaiveDate, NaiveTime};

    const FULL: &str = r#"
precision = 3

[input]
path = "input.csv"
columns = ["Date", "Time", "Open", "Close"]

[timezone]
from = "US/Central"
to = "US/Eastern"

[resample]
interval = "W"
closed = "left"
label = "right"

[resample.aggregation]
Open = "first"
Close = "last"

[cutoff]
start_date = "12/20/2018"
end_date = "1/08/2019"
start_time = "09:30"
end_time = "16:00"

[output]
path = "out.csv"
header = false
"#;

    #[test]
    fn parses_full_config() {
        let cfg = load_config_str(FULL).unwrap();
        assert_eq!(cfg.precision, 3);
        assert_eq!(cfg.input.datetime_columns, vec!["Date", "Time"]);
        assert_eq!(cfg.resample.interval.unit(), IntervalUnit::Week);
        assert_eq!(cfg.resample.policy().closed_edge(), Edge::Left);
        assert_eq!(
            cfg.resample.aggregation.keys().collect::<Vec<_>>(),
            vec!["Open", "Close"]
        );
        assert_eq!(cfg.resample.aggregation.get("Close"), Some(AggFunc::Last));
        assert!(!cfg.output.header);
        assert_eq!(cfg.output.columns_or(&cfg.resample.aggregation), vec!["Open", "Close"]);

        let cutoff = cfg.cutoff.unwrap().to_cutoff().unwrap();
        assert_eq!(
            cutoff.start_date,
            NaiveDate::from_ymd_opt(2018, 12, 20).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(cutoff.end_time, NaiveTime::from_hms_opt(16, 0, 0));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = load_config_str(
            r#"
[input]
path = "in.csv"
[resample]
interval = "D"
aggregation = { Close = "last" }
[output]
path = "out.csv"
"#,
        )
        .unwrap();
        assert_eq!(cfg.precision, DEFAULT_PRECISION);
        assert!(cfg.timezone.is_none());
        assert!(cfg.cutoff.is_none());
        assert!(cfg.output.header);
        assert_eq!(cfg.resample.policy().label_edge(), Edge::Left);
    }

    #[test]
    fn unknown_aggregation_name_is_rejected_at_load() {
        let err = load_config_str(
            r#"
[input]
path = "in.csv"
[resample]
interval = "D"
aggregation = { Close = "ohlc" }
[output]
path = "out.csv"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn bad_interval_and_unknown_keys_are_rejected() {
        let bad_interval = r#"
[input]
path = "in.csv"
[resample]
interval = "fortnight"
aggregation = { Close = "last" }
[output]
path = "out.csv"
"#;
        assert!(load_config_str(bad_interval).is_err());

        let unknown_key = r#"
[input]
path = "in.csv"
delimiter = ";"
[resample]
interval = "D"
aggregation = { Close = "last" }
[output]
path = "out.csv"
"#;
        assert!(load_config_str(unknown_key).is_err());
    }

    #[test]
    fn bad_cutoff_is_a_config_error() {
        let cfg = r#"
[input]
path = "in.csv"
[resample]
interval = "D"
aggregation = { Close = "last" }
[cutoff]
start_time = "half past nine"
[output]
path = "out.csv"
"#;
        assert!(matches!(load_config_str(cfg), Err(Error::Config(_))));
    }
}
