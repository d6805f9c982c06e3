//! Per-column aggregation functions and the column → function mapping.
//!
//! [`AggFunc`] is a closed set; names are parsed once, when the spec is built or the
//! config is read, so an unknown name never reaches the resampler.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use polars::prelude::{col, DataType, Expr};
use serde::Deserialize;

/// A reduction over the cells of one column inside one bucket.
///
/// Missing cells are skipped by every function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    First,
    Last,
    Min,
    Max,
    Sum,
    Prod,
    Mean,
    Median,
    Count,
    /// Sample standard deviation (one degree of freedom).
    Std,
    /// Sample variance (one degree of freedom).
    Var,
}

impl AggFunc {
    pub const ALL: [AggFunc; 11] = [
        AggFunc::First,
        AggFunc::Last,
        AggFunc::Min,
        AggFunc::Max,
        AggFunc::Sum,
        AggFunc::Prod,
        AggFunc::Mean,
        AggFunc::Median,
        AggFunc::Count,
        AggFunc::Std,
        AggFunc::Var,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            AggFunc::First => "first",
            AggFunc::Last => "last",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Sum => "sum",
            AggFunc::Prod => "prod",
            AggFunc::Mean => "mean",
            AggFunc::Median => "median",
            AggFunc::Count => "count",
            AggFunc::Std => "std",
            AggFunc::Var => "var",
        }
    }

    /// Whether the function is defined for text columns.
    pub const fn accepts_text(self) -> bool {
        matches!(
            self,
            AggFunc::First | AggFunc::Last | AggFunc::Min | AggFunc::Max | AggFunc::Count
        )
    }

    /// The polars aggregation for `column` inside one bucket. The output keeps the
    /// column's name; a null result means the aggregate is missing.
    ///
    /// `sum` and `count` of no values are `0`; `std` and `var` need at least two values.
    /// `count` is always numeric, even on a text column.
    pub fn expr(self, column: &str) -> Expr {
        let cells = col(column);
        match self {
            AggFunc::First => cells.drop_nulls().first(),
            AggFunc::Last => cells.drop_nulls().last(),
            AggFunc::Min => cells.min(),
            AggFunc::Max => cells.max(),
            AggFunc::Sum => cells.sum(),
            AggFunc::Prod => cells.product(),
            AggFunc::Mean => cells.mean(),
            AggFunc::Median => cells.median(),
            AggFunc::Count => cells.count().cast(DataType::Float64),
            AggFunc::Std => cells.std(1),
            AggFunc::Var => cells.var(1),
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an aggregation name outside [`AggFunc::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown aggregation function '{0}'")]
pub struct UnknownAggFunc(pub String);

impl FromStr for AggFunc {
    type Err = UnknownAggFunc;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AggFunc::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| UnknownAggFunc(s.to_string()))
    }
}

/// Ordered mapping column name → aggregation function.
///
/// Only columns listed here survive a resample, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AggregationSpec(IndexMap<String, AggFunc>);

impl AggregationSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// The classic OHLC bar rules plus the `Up`/`Down` tick volumes.
    pub fn ohlc_up_down() -> Self {
        [
            ("Open", AggFunc::First),
            ("High", AggFunc::Max),
            ("Low", AggFunc::Min),
            ("Close", AggFunc::Last),
            ("Up", AggFunc::Last),
            ("Down", AggFunc::Last),
        ]
        .into_iter()
        .collect()
    }

    pub fn with(mut self, column: impl Into<String>, func: AggFunc) -> Self {
        self.insert(column, func);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, func: AggFunc) -> Option<AggFunc> {
        self.0.insert(column.into(), func)
    }

    pub fn get(&self, column: &str) -> Option<AggFunc> {
        self.0.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AggFunc)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AggFunc)> for AggregationSpec {
    fn from_iter<I: IntoIterator<Item = (K, AggFunc)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, f)| (k.into(), f)).collect())
    }
}

impl fmt::Display for AggregationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}:{v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Parses `Open=first,High=max,...`.
impl FromStr for AggregationSpec {
    type Err = UnknownAggFunc;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (column, func) = pair
                    .split_once(['=', ':'])
                    .ok_or_else(|| UnknownAggFunc(pair.to_string()))?;
                Ok((column.trim().to_string(), func.parse::<AggFunc>()?))
            })
            .collect()
    }
}
