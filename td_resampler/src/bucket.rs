//! Bucket mapping.
//!
//! - Second/minute/hour: edges at `origin + k * width` in elapsed time, where the
//!   origin is local midnight of the first row's day.
//! - Day: the same on the local clock, so a DST day is 23 or 25 hours long.
//! - Week: Saturday 00:00 to the following Saturday 00:00, so every week ends on a
//!   Friday. Week index 0 starts on Saturday 1970-01-03.
//! - Month/quarter/year: linear period indexing relative to 1970.
//! - Multiples of calendar periods group consecutive periods counted from the period
//!   holding the first row.
//!
//! A naive table stores its wall clock as UTC, so on naive tables the elapsed and
//! local-clock grids coincide.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::{
    interval::{Interval, IntervalUnit},
    tz,
};

/// Saturday 1970-01-03, the first day of week index 0.
const WEEK_SATURDAY_ANCHOR: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 3) {
    Some(d) => d,
    None => unreachable!(),
};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Bucket edge selector, used both for the closed side and for the label side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Left,
    Right,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Left => f.write_str("left"),
            Edge::Right => f.write_str("right"),
        }
    }
}

impl FromStr for Edge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Edge::Left),
            "right" => Ok(Edge::Right),
            other => Err(format!("unknown edge '{other}', expected left or right")),
        }
    }
}

/// How rows are grouped: the interval plus the closed and label edges.
///
/// Unset edges fall back to [`Interval::default_closed`] / [`Interval::default_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketingPolicy {
    pub interval: Interval,
    pub closed: Option<Edge>,
    pub label: Option<Edge>,
}

impl BucketingPolicy {
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            closed: None,
            label: None,
        }
    }

    pub fn closed(mut self, edge: Edge) -> Self {
        self.closed = Some(edge);
        self
    }

    pub fn label(mut self, edge: Edge) -> Self {
        self.label = Some(edge);
        self
    }

    pub fn closed_edge(&self) -> Edge {
        self.closed.unwrap_or_else(|| self.interval.default_closed())
    }

    pub fn label_edge(&self) -> Edge {
        self.label.unwrap_or_else(|| self.interval.default_label())
    }
}

/// Maps row instants to bucket ids and bucket ids to label instants.
///
/// Rows in the same bucket share an id. On a zoned table the local clock repeats an
/// hour at fall-back, so equal ids need not be adjacent in a sorted series.
#[derive(Debug, Clone)]
pub struct Bucketer {
    interval: Interval,
    closed: Edge,
    label: Edge,
    tz: Option<Tz>,
    /// Local midnight of the first row's day.
    origin_wall: NaiveDateTime,
    /// `origin_wall` pinned to an instant.
    origin: DateTime<Utc>,
    first_period: i64,
}

impl Bucketer {
    /// Build a bucketer aligned to the series whose first row is at `first`, on a
    /// table tagged with `tz` (naive when `None`).
    pub fn new(policy: &BucketingPolicy, first: DateTime<Utc>, tz: Option<Tz>) -> Self {
        let interval = policy.interval;
        let first_wall = tz::wall_clock(first, tz);
        let origin_wall = first_wall.date().and_time(NaiveTime::MIN);
        Self {
            interval,
            closed: policy.closed_edge(),
            label: policy.label_edge(),
            tz,
            origin_wall,
            origin: tz::resolve_wall_clock(origin_wall, tz),
            first_period: period_index(interval.unit(), first_wall.date()),
        }
    }

    /// Bucket id for a row instant.
    pub fn bucket_id(&self, ts: DateTime<Utc>) -> i64 {
        match self.grid() {
            Grid::Elapsed(width) => tick_id(delta_nanos(ts - self.origin), width, self.closed),
            Grid::WallTicks(width) => {
                let wall = tz::wall_clock(ts, self.tz);
                tick_id(delta_nanos(wall - self.origin_wall), width, self.closed)
            }
            Grid::Periods => {
                let p = period_index(self.interval.unit(), tz::wall_clock(ts, self.tz).date());
                (p - self.first_period).div_euclid(self.amount())
            }
        }
    }

    /// Left and right edges of a bucket.
    ///
    /// For calendar periods these are the midnights opening and closing the period,
    /// regardless of the closed edge.
    pub fn edges(&self, id: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        match self.wall_edges(id) {
            Some((left, right)) => (self.resolve(left), self.resolve(right)),
            None => {
                let width = self.width();
                let left = self.origin + TimeDelta::seconds(width.num_seconds() * id);
                (left, left + width)
            }
        }
    }

    /// Instant stamped on the aggregated row of bucket `id`.
    ///
    /// Calendar periods closed on the right are labeled with period end dates: the
    /// right label is the last day of the period, the left label the last day of
    /// the preceding one.
    pub fn label(&self, id: i64) -> DateTime<Utc> {
        let Some((left, right)) = self.wall_edges(id) else {
            let (left, right) = self.edges(id);
            return self.pick(left, right);
        };
        let (left, right) = if self.interval.is_calendar() && self.closed == Edge::Right {
            (left - TimeDelta::days(1), right - TimeDelta::days(1))
        } else {
            (left, right)
        };
        self.resolve(self.pick(left, right))
    }

    fn grid(&self) -> Grid {
        let unit = self.interval.unit();
        match unit.tick_secs() {
            None => Grid::Periods,
            Some(secs) => {
                let width = i128::from(secs) * i128::from(self.interval.amount().get()) * NANOS_PER_SEC;
                if unit == IntervalUnit::Day {
                    Grid::WallTicks(width)
                } else {
                    Grid::Elapsed(width)
                }
            }
        }
    }

    /// Wall-clock edges for grids laid on the local clock, `None` for elapsed ticks.
    fn wall_edges(&self, id: i64) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match self.grid() {
            Grid::Elapsed(_) => None,
            Grid::WallTicks(_) => {
                let width = self.width();
                let left = self.origin_wall + TimeDelta::seconds(width.num_seconds() * id);
                Some((left, left + width))
            }
            Grid::Periods => {
                let start = self.first_period + id * self.amount();
                let unit = self.interval.unit();
                Some((
                    period_start(unit, start).and_time(NaiveTime::MIN),
                    period_start(unit, start + self.amount()).and_time(NaiveTime::MIN),
                ))
            }
        }
    }

    fn pick<T>(&self, left: T, right: T) -> T {
        match self.label {
            Edge::Left => left,
            Edge::Right => right,
        }
    }

    fn resolve(&self, wall: NaiveDateTime) -> DateTime<Utc> {
        tz::resolve_wall_clock(wall, self.tz)
    }

    fn width(&self) -> TimeDelta {
        self.interval.tick().unwrap_or(TimeDelta::zero())
    }

    fn amount(&self) -> i64 {
        i64::from(self.interval.amount().get())
    }
}

/// Sub-day ticks count elapsed time, so a repeated local hour gets its own buckets.
/// Days and calendar periods follow the local clock.
enum Grid {
    Elapsed(i128),
    WallTicks(i128),
    Periods,
}

fn tick_id(delta: i128, width: i128, closed: Edge) -> i64 {
    let id = match closed {
        Edge::Left => delta.div_euclid(width),
        // (e_k, e_k + width]: ceil(delta / width) - 1
        Edge::Right => -((-delta).div_euclid(width)) - 1,
    };
    id as i64
}

fn delta_nanos(d: TimeDelta) -> i128 {
    i128::from(d.num_seconds()) * NANOS_PER_SEC + i128::from(d.subsec_nanos())
}

// ----- calendar internals -----

/// Linear index of the calendar period holding `date`.
fn period_index(unit: IntervalUnit, date: NaiveDate) -> i64 {
    let y = i64::from(date.year()) - 1970;
    let m0 = i64::from(date.month0());
    match unit {
        IntervalUnit::Week => (date - WEEK_SATURDAY_ANCHOR).num_days().div_euclid(7),
        IntervalUnit::Month => y * 12 + m0,
        IntervalUnit::Quarter => y * 4 + m0 / 3,
        IntervalUnit::Year => y,
        // ticks are bucketed by width, the period index is unused
        _ => 0,
    }
}

/// First day of calendar period `p`.
fn period_start(unit: IntervalUnit, p: i64) -> NaiveDate {
    let (year, month0) = match unit {
        IntervalUnit::Week => return WEEK_SATURDAY_ANCHOR + TimeDelta::days(7 * p),
        IntervalUnit::Month => (1970 + p.div_euclid(12), p.rem_euclid(12)),
        IntervalUnit::Quarter => (1970 + p.div_euclid(4), p.rem_euclid(4) * 3),
        IntervalUnit::Year => (1970 + p, 0),
        _ => (1970, 0),
    };
    NaiveDate::from_ymd_opt(year as i32, month0 as u32 + 1, 1)
        .expect("period index within chrono's date range")
}
