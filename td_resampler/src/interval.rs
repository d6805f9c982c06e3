//! Interval descriptors for resampling buckets.
//!
//! An [`Interval`] pairs a non-zero amount with an [`IntervalUnit`]. Seconds, minutes,
//! hours and days are fixed-width ticks; weeks, months, quarters and years are calendar
//! periods closed on their last day. Weeks always end on Friday: `"W"` and every
//! `"W-<DAY>"` token resolve to the same Friday-anchored week.
//!
//! Typical usage:
//! ```
//! use td_resampler::interval::{Interval, IntervalUnit};
//!
//! let iv: Interval = "15min".parse().unwrap();
//! assert_eq!(iv.amount().get(), 15);
//! assert_eq!(iv.unit(), IntervalUnit::Minute);
//! assert_eq!("W".parse::<Interval>().unwrap().to_string(), "W-FRI");
//! ```

use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::TimeDelta;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::bucket::Edge;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("empty interval")]
    Empty,

    #[error("invalid interval amount '{0}': must be a positive integer")]
    InvalidAmount(String),

    #[error("unknown interval unit: {0}")]
    UnknownUnit(String),

    #[error("unknown weekday in weekly interval: {0}")]
    UnknownWeekday(String),
}

/// Interval granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    /// Saturday through Friday.
    Week,
    /// Calendar month.
    Month,
    /// Calendar quarter ending March, June, September, December.
    Quarter,
    /// Calendar year.
    Year,
}

impl IntervalUnit {
    /// Width in seconds for fixed-width units, `None` for calendar periods.
    pub const fn tick_secs(self) -> Option<i64> {
        match self {
            IntervalUnit::Second => Some(1),
            IntervalUnit::Minute => Some(60),
            IntervalUnit::Hour => Some(3_600),
            IntervalUnit::Day => Some(86_400),
            IntervalUnit::Week | IntervalUnit::Month | IntervalUnit::Quarter | IntervalUnit::Year => {
                None
            }
        }
    }
}

/// An interval = amount × unit (e.g., 15-Minute, 1-Day, 1-Week, 3-Month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Interval {
    amount: NonZeroU32,
    unit: IntervalUnit,
}

impl Interval {
    pub const fn new(amount: NonZeroU32, unit: IntervalUnit) -> Self {
        Self { amount, unit }
    }

    /// One unit of `unit`.
    pub const fn one(unit: IntervalUnit) -> Self {
        Self::new(NonZeroU32::MIN, unit)
    }

    pub const fn amount(&self) -> NonZeroU32 {
        self.amount
    }

    pub const fn unit(&self) -> IntervalUnit {
        self.unit
    }

    /// True for week, month, quarter and year intervals.
    pub const fn is_calendar(&self) -> bool {
        self.unit.tick_secs().is_none()
    }

    /// Bucket width for fixed-width intervals.
    pub fn tick(&self) -> Option<TimeDelta> {
        self.unit
            .tick_secs()
            .map(|secs| TimeDelta::seconds(secs * i64::from(self.amount.get())))
    }

    /// Closed edge used when the caller does not pick one: calendar periods are
    /// closed on the right (their last day), ticks on the left.
    pub const fn default_closed(&self) -> Edge {
        if self.is_calendar() { Edge::Right } else { Edge::Left }
    }

    /// Label edge used when the caller does not pick one; same rule as
    /// [`Interval::default_closed`].
    pub const fn default_label(&self) -> Edge {
        self.default_closed()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.amount.get();
        let u = match self.unit {
            IntervalUnit::Second => "S",
            IntervalUnit::Minute => "min",
            IntervalUnit::Hour => "H",
            IntervalUnit::Day => "D",
            IntervalUnit::Week => "W-FRI",
            IntervalUnit::Month => "M",
            IntervalUnit::Quarter => "Q",
            IntervalUnit::Year => "A",
        };
        if a == 1 { write!(f, "{u}") } else { write!(f, "{a}{u}") }
    }
}

const WEEKDAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

impl FromStr for Interval {
    type Err = IntervalError;

    /// Accepts an optional positive multiplier followed by a unit token:
    /// `S`/`sec`, `T`/`min`, `H`, `D`, `W`/`W-<DAY>`, `M`/`ME`, `Q`/`QE`, `A`/`Y`/`YE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IntervalError::Empty);
        }
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let amount = if digits.is_empty() {
            NonZeroU32::MIN
        } else {
            digits
                .parse::<u32>()
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(|| IntervalError::InvalidAmount(digits.to_string()))?
        };

        let unit = match unit {
            "S" | "s" | "sec" => IntervalUnit::Second,
            "T" | "min" => IntervalUnit::Minute,
            "H" | "h" => IntervalUnit::Hour,
            "D" | "d" => IntervalUnit::Day,
            "W" => IntervalUnit::Week,
            w if w.starts_with("W-") => {
                let day = w[2..].to_ascii_uppercase();
                if !WEEKDAYS.contains(&day.as_str()) {
                    return Err(IntervalError::UnknownWeekday(day));
                }
                if day != "FRI" {
                    warn!(requested = %w, "weekly buckets are always anchored on Friday; using W-FRI");
                }
                IntervalUnit::Week
            }
            "M" | "ME" => IntervalUnit::Month,
            "Q" | "QE" | "Q-DEC" => IntervalUnit::Quarter,
            "A" | "Y" | "YE" | "A-DEC" => IntervalUnit::Year,
            "" => return Err(IntervalError::UnknownUnit(s.to_string())),
            other => return Err(IntervalError::UnknownUnit(other.to_string())),
        };
        Ok(Interval::new(amount, unit))
    }
}

impl TryFrom<String> for Interval {
    type Error = IntervalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn parses_plain_units() {
        assert_eq!("D".parse::<Interval>().unwrap(), Interval::one(IntervalUnit::Day));
        assert_eq!("M".parse::<Interval>().unwrap(), Interval::one(IntervalUnit::Month));
        assert_eq!("Q".parse::<Interval>().unwrap(), Interval::one(IntervalUnit::Quarter));
        assert_eq!("A".parse::<Interval>().unwrap(), Interval::one(IntervalUnit::Year));
        assert_eq!("Y".parse::<Interval>().unwrap(), Interval::one(IntervalUnit::Year));
    }

    #[test]
    fn parses_multipliers() {
        assert_eq!(
            "15min".parse::<Interval>().unwrap(),
            Interval::new(nz(15), IntervalUnit::Minute)
        );
        assert_eq!("4H".parse::<Interval>().unwrap(), Interval::new(nz(4), IntervalUnit::Hour));
        assert_eq!("2W".parse::<Interval>().unwrap(), Interval::new(nz(2), IntervalUnit::Week));
    }

    #[test]
    fn every_weekly_token_is_a_friday_week() {
        for token in ["W", "W-FRI", "W-MON", "W-sun"] {
            let iv: Interval = token.parse().unwrap();
            assert_eq!(iv.unit(), IntervalUnit::Week, "{token}");
            assert_eq!(iv.to_string(), "W-FRI");
        }
        assert_eq!(
            "W-XYZ".parse::<Interval>(),
            Err(IntervalError::UnknownWeekday("XYZ".into()))
        );
    }

    #[test]
    fn rejects_bad_tokens() {
        assert_eq!("".parse::<Interval>(), Err(IntervalError::Empty));
        assert_eq!("0D".parse::<Interval>(), Err(IntervalError::InvalidAmount("0".into())));
        assert_eq!("5".parse::<Interval>(), Err(IntervalError::UnknownUnit("5".into())));
        assert_eq!("3X".parse::<Interval>(), Err(IntervalError::UnknownUnit("X".into())));
    }

    #[test]
    fn defaults_follow_interval_kind() {
        let day = Interval::one(IntervalUnit::Day);
        assert_eq!(day.default_closed(), Edge::Left);
        assert_eq!(day.default_label(), Edge::Left);
        assert_eq!(day.tick(), Some(TimeDelta::days(1)));

        let month = Interval::one(IntervalUnit::Month);
        assert_eq!(month.default_closed(), Edge::Right);
        assert_eq!(month.default_label(), Edge::Right);
        assert_eq!(month.tick(), None);
    }

    #[test]
    fn display_round_trips() {
        for token in ["S", "30S", "min", "5min", "H", "D", "3D", "W-FRI", "M", "6M", "Q", "A"] {
            let iv: Interval = token.parse().unwrap();
            assert_eq!(iv.to_string().parse::<Interval>().unwrap(), iv);
        }
    }
}
