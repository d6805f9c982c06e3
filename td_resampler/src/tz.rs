//! Time zone lookup, localization and conversion.
//!
//! - [`parse_tz`] looks up an IANA zone name ("US/Central", "America/New_York").
//! - [`localize`] pins a naive wall-clock time in a zone to an instant.
//! - [`resolve_wall_clock`] is the lenient variant used for bucket labels.
//! - [`convert_timezone`] is the table-level converter (localize if naive, then re-tag).
//!
//! Wall times that fall in a spring-forward gap do not exist; wall times inside a
//! fall-back overlap occur twice. Localizing source rows rejects both.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, warn};

use crate::table::TimeIndexedTable;

/// Longest DST gap searched past when shifting a nonexistent wall time forward.
const MAX_GAP: TimeDelta = TimeDelta::hours(2);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TzError {
    #[error("UnknownTimeZoneError: {0}")]
    UnknownZone(String),

    #[error("ambiguous local time {naive} in {tz}")]
    Ambiguous { naive: NaiveDateTime, tz: Tz },

    #[error("nonexistent local time {naive} in {tz}")]
    Nonexistent { naive: NaiveDateTime, tz: Tz },
}

/// How [`localize`] treats wall times that DST makes ambiguous or nonexistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstPolicy {
    /// Both are errors. Used for source rows.
    Strict,
    /// Overlaps take the earlier instant; gaps move to the first valid minute after.
    /// Used for bucket labels.
    ShiftForward,
}

/// Look up an IANA time zone by name.
pub fn parse_tz(name: &str) -> Result<Tz, TzError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TzError::UnknownZone(name.to_string()))
}

/// Instant at which the wall clock in `tz` reads `naive`.
pub fn localize(naive: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Result<DateTime<Utc>, TzError> {
    match (tz.from_local_datetime(&naive), policy) {
        (LocalResult::Single(dt), _) => Ok(dt.to_utc()),
        (LocalResult::Ambiguous(earlier, _), DstPolicy::ShiftForward) => Ok(earlier.to_utc()),
        (LocalResult::Ambiguous(..), DstPolicy::Strict) => Err(TzError::Ambiguous { naive, tz }),
        (LocalResult::None, DstPolicy::Strict) => Err(TzError::Nonexistent { naive, tz }),
        (LocalResult::None, DstPolicy::ShiftForward) => {
            let minute = TimeDelta::minutes(1);
            std::iter::successors(Some(naive + minute), |t| Some(*t + minute))
                .take_while(|t| *t - naive <= MAX_GAP)
                .find_map(|t| tz.from_local_datetime(&t).earliest())
                .map(|dt| dt.to_utc())
                .ok_or(TzError::Nonexistent { naive, tz })
        }
    }
}

/// Wall-clock reading of an instant: in `tz` when tagged, the UTC clock otherwise
/// (a naive table stores its wall clock as UTC).
pub fn wall_clock(ts: DateTime<Utc>, tz: Option<Tz>) -> NaiveDateTime {
    match tz {
        Some(tz) => ts.with_timezone(&tz).naive_local(),
        None => ts.naive_utc(),
    }
}

/// Inverse of [`wall_clock`] that never fails ([`DstPolicy::ShiftForward`]).
pub fn resolve_wall_clock(naive: NaiveDateTime, tz: Option<Tz>) -> DateTime<Utc> {
    match tz {
        Some(tz) => localize(naive, tz, DstPolicy::ShiftForward).unwrap_or_else(|_| naive.and_utc()),
        None => naive.and_utc(),
    }
}

/// Re-express `table` in `to_tz`.
///
/// A naive table is first localized in `from_tz` (strict DST handling). A table that
/// already carries a zone is only re-tagged; `from_tz` is trusted, and a mismatch with
/// the recorded zone is logged but not rejected.
///
/// The input is never modified; on error the caller keeps the original table.
pub fn convert_timezone(
    table: &TimeIndexedTable,
    from_tz: &str,
    to_tz: &str,
) -> Result<TimeIndexedTable, TzError> {
    let from = parse_tz(from_tz)?;
    let to = parse_tz(to_tz)?;

    match table.tz() {
        None => {
            let index = table
                .index()
                .iter()
                .map(|ts| localize(ts.naive_utc(), from, DstPolicy::Strict))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(rows = index.len(), %from, %to, "localized naive timestamps");
            Ok(table.clone().with_index(index, Some(to)))
        }
        Some(current) => {
            if current != from {
                warn!(recorded = %current, %from, "from_tz differs from the table's zone; trusting from_tz");
            }
            Ok(table.clone().with_index(table.index().to_vec(), Some(to)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::America::New_York;
    use polars::prelude::Column;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn naive_table(stamps: &[NaiveDateTime]) -> TimeIndexedTable {
        let index = stamps.iter().map(|n| n.and_utc()).collect();
        let close = Column::new("Close".into(), vec![1.0; stamps.len()]);
        TimeIndexedTable::from_columns(index, vec![close], None).unwrap()
    }

    #[test]
    fn unknown_zone_is_reported() {
        assert_eq!(
            parse_tz("Mars/Olympus_Mons"),
            Err(TzError::UnknownZone("Mars/Olympus_Mons".into()))
        );
        assert_eq!(parse_tz("US/Eastern").unwrap(), chrono_tz::US::Eastern);
    }

    #[test]
    fn spring_forward_gap() {
        // New York jumps from 02:00 to 03:00 on 2024-03-10
        let gap = naive(2024, 3, 10, 2, 30);
        assert!(matches!(
            localize(gap, New_York, DstPolicy::Strict),
            Err(TzError::Nonexistent { .. })
        ));
        assert_eq!(
            localize(gap, New_York, DstPolicy::ShiftForward).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn fall_back_overlap() {
        // 01:30 on 2024-11-03 occurs twice: 05:30Z (EDT) and 06:30Z (EST)
        let twice = naive(2024, 11, 3, 1, 30);
        assert!(matches!(
            localize(twice, New_York, DstPolicy::Strict),
            Err(TzError::Ambiguous { .. })
        ));
        assert_eq!(
            localize(twice, New_York, DstPolicy::ShiftForward).unwrap(),
            Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap()
        );
    }

    #[test]
    fn central_to_eastern_shifts_wall_clock_by_one_hour() {
        let table = naive_table(&[naive(2018, 12, 20, 9, 0), naive(2018, 12, 20, 9, 15)]);
        let out = convert_timezone(&table, "US/Central", "US/Eastern").unwrap();
        assert_eq!(out.tz(), Some(chrono_tz::US::Eastern));
        assert_eq!(out.wall_clock(0), naive(2018, 12, 20, 10, 0));
        assert_eq!(out.index()[0], Utc.with_ymd_and_hms(2018, 12, 20, 15, 0, 0).unwrap());
        // input untouched
        assert_eq!(table.tz(), None);
        assert_eq!(table.wall_clock(0), naive(2018, 12, 20, 9, 0));
    }

    #[test]
    fn localized_table_is_only_retagged() {
        let table = naive_table(&[naive(2018, 12, 20, 9, 0)]);
        let eastern = convert_timezone(&table, "US/Central", "US/Eastern").unwrap();
        let utc = convert_timezone(&eastern, "US/Eastern", "UTC").unwrap();
        assert_eq!(utc.index(), eastern.index());
        assert_eq!(utc.wall_clock(0), naive(2018, 12, 20, 15, 0));
    }

    #[test]
    fn dst_gap_row_fails_whole_conversion() {
        let table = naive_table(&[naive(2024, 3, 10, 1, 0), naive(2024, 3, 10, 2, 30)]);
        let err = convert_timezone(&table, "America/New_York", "UTC").unwrap_err();
        assert!(matches!(err, TzError::Nonexistent { .. }));
    }

    #[test]
    fn labels_resolve_leniently() {
        let got = resolve_wall_clock(naive(2024, 3, 10, 2, 0), Some(New_York));
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap());
        assert_eq!(
            resolve_wall_clock(naive(2024, 1, 1, 0, 0), None),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
