//! Decimal rounding of numeric columns.

use tracing::debug;

use crate::{error::Result, table::TimeIndexedTable};

/// Decimal places used when none are configured.
pub const DEFAULT_PRECISION: i32 = 2;

/// Round `value` to `decimals` places, ties to even.
///
/// The tie is decided on `value * 10^decimals` (or `value / 10^-decimals` for negative
/// `decimals`), so `0.125` rounds to `0.12` and `0.375` to `0.38`. Non-finite values are
/// returned unchanged.
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals.abs());
    let rounded = if decimals >= 0 {
        (value * factor).round_ties_even() / factor
    } else {
        (value / factor).round_ties_even() * factor
    };
    if rounded.is_finite() { rounded } else { value }
}

/// Round every numeric cell of `table`. Text columns are left alone.
pub fn apply_precision(table: TimeIndexedTable, decimals: i32) -> Result<TimeIndexedTable> {
    if table.is_empty() {
        return Ok(table);
    }
    debug!(decimals, "applying precision");
    table.map_numeric(|v| round_half_even(v, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use polars::prelude::Column;

    #[test]
    fn ties_go_to_even() {
        assert_eq!(round_half_even(0.125, 2), 0.12);
        assert_eq!(round_half_even(0.375, 2), 0.38);
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(3.5, 0), 4.0);
        assert_eq!(round_half_even(-2.5, 0), -2.0);
        assert_eq!(round_half_even(1.23456, 3), 1.235);
    }

    #[test]
    fn negative_decimals_round_to_tens() {
        assert_eq!(round_half_even(1234.0, -1), 1230.0);
        assert_eq!(round_half_even(1250.0, -2), 1200.0);
    }

    #[test]
    fn non_finite_values_pass_through() {
        assert!(round_half_even(f64::NAN, 2).is_nan());
        assert_eq!(round_half_even(f64::INFINITY, 2), f64::INFINITY);
    }

    #[test]
    fn only_numeric_columns_are_rounded() {
        let index = vec![Utc.with_ymd_and_hms(2019, 1, 2, 0, 0, 0).unwrap()];
        let cols = vec![
            Column::new("Close".into(), &[Some(2.34567)]),
            Column::new("Down".into(), &[None::<f64>]),
            Column::new("Symbol".into(), &["1.23456"]),
        ];
        let t = TimeIndexedTable::from_columns(index, cols, None).unwrap();
        let out = apply_precision(t, 2).unwrap();
        assert_eq!(out.numeric("Close").unwrap(), vec![Some(2.35)]);
        assert_eq!(out.numeric("Down").unwrap(), vec![None]);
        assert_eq!(out.text("Symbol").unwrap(), vec![Some("1.23456".to_string())]);
        assert_eq!(out.column_names(), vec!["Close", "Down", "Symbol"]);
    }
}
