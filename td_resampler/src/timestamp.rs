//! Timestamp layout inference for source rows and cutoff bounds.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A parse layout: either a full date-time or a date that means its midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    DateTime(&'static str),
    Date(&'static str),
}

impl Layout {
    pub fn parse(self, s: &str) -> Option<NaiveDateTime> {
        match self {
            Layout::DateTime(fmt) => NaiveDateTime::parse_from_str(s, fmt).ok(),
            Layout::Date(fmt) => NaiveDate::parse_from_str(s, fmt)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN)),
        }
    }
}

/// Layouts tried in order. US month-first forms come before day-first ones.
pub const LAYOUTS: &[Layout] = &[
    Layout::DateTime("%m/%d/%Y %H:%M:%S"),
    Layout::DateTime("%m/%d/%Y %H:%M"),
    Layout::DateTime("%Y-%m-%d %H:%M:%S"),
    Layout::DateTime("%Y-%m-%d %H:%M"),
    Layout::DateTime("%Y-%m-%dT%H:%M:%S"),
    Layout::DateTime("%Y-%m-%dT%H:%M"),
    Layout::DateTime("%Y-%m-%d %H:%M:%S%.f"),
    Layout::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
    Layout::DateTime("%Y/%m/%d %H:%M:%S"),
    Layout::DateTime("%Y/%m/%d %H:%M"),
    Layout::DateTime("%d.%m.%Y %H:%M:%S"),
    Layout::DateTime("%d.%m.%Y %H:%M"),
    Layout::DateTime("%Y%m%d %H%M%S"),
    Layout::DateTime("%Y%m%d %H:%M:%S"),
    Layout::Date("%m/%d/%Y"),
    Layout::Date("%Y-%m-%d"),
    Layout::Date("%Y/%m/%d"),
    Layout::Date("%d.%m.%Y"),
    Layout::Date("%Y%m%d"),
];

/// Parser that remembers the last layout that worked, so a homogeneous column is
/// parsed with a single attempt per row.
#[derive(Debug, Default, Clone)]
pub struct TimestampParser {
    hint: Option<Layout>,
}

impl TimestampParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout inferred so far.
    pub fn layout(&self) -> Option<Layout> {
        self.hint
    }

    pub fn parse(&mut self, s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if let Some(ts) = self.hint.and_then(|layout| layout.parse(s)) {
            return Some(ts);
        }
        let (layout, ts) = LAYOUTS
            .iter()
            .find_map(|&layout| layout.parse(s).map(|ts| (layout, ts)))?;
        self.hint = Some(layout);
        Some(ts)
    }
}

/// Parse a single timestamp with no prior hint.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TimestampParser::new().parse(s)
}

/// Parse a time of day such as `09:30` or `16:00:00`.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    ["%H:%M:%S", "%H:%M", "%H%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}
