//! Post-aggregation trimming by time of day and by date.

use chrono::{NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::{error::Result, table::TimeIndexedTable};

/// Cutoff bounds, all optional. Bounds are compared with the table's wall clock.
///
/// - `start_time`/`end_time`: keep rows whose time of day lies in
///   `[start_time, end_time]` on every day. Only applied when both are set. When
///   `start_time > end_time` the window wraps around midnight.
/// - `start_date`: keep rows strictly after it.
/// - `end_date`: keep rows strictly before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cutoff {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl Cutoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between_time(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn start_date(mut self, after: NaiveDateTime) -> Self {
        self.start_date = Some(after);
        self
    }

    pub fn end_date(mut self, before: NaiveDateTime) -> Self {
        self.end_date = Some(before);
        self
    }

    pub fn is_noop(&self) -> bool {
        self.time_window().is_none() && self.start_date.is_none() && self.end_date.is_none()
    }

    fn time_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        self.start_time.zip(self.end_time)
    }
}

fn in_window(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        start <= t && t <= end
    } else {
        t >= start || t <= end
    }
}

/// Apply `cutoff` to `table`: time of day first, then start date, then end date.
pub fn apply_cutoff(table: TimeIndexedTable, cutoff: &Cutoff) -> Result<TimeIndexedTable> {
    let mut table = table;

    if let Some((start, end)) = cutoff.time_window() {
        debug!(%start, %end, "applying time-of-day cutoff");
        let wall = table.wall_clocks();
        table = table.filter_rows(|i| in_window(wall[i].time(), start, end))?;
    } else if cutoff.start_time.is_some() || cutoff.end_time.is_some() {
        debug!("time-of-day cutoff needs both start_time and end_time; skipped");
    }

    if let Some(after) = cutoff.start_date {
        debug!(start_date = %after, "applying start_date cutoff");
        let wall = table.wall_clocks();
        table = table.filter_rows(|i| wall[i] > after)?;
    }

    if let Some(before) = cutoff.end_date {
        debug!(end_date = %before, "applying end_date cutoff");
        let wall = table.wall_clocks();
        table = table.filter_rows(|i| wall[i] < before)?;
    }

    Ok(table)
}
