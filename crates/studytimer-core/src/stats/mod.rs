//! Dashboard aggregations.
//!
//! Everything here is a pure function over records (or a read through the
//! [`Store`]); rendering the numbers is left to the caller.

pub mod breakdown;
pub mod heatmap;
pub mod timeline;
pub mod weekly;

pub use breakdown::{tag_breakdown, tag_color, TagTotal};
pub use heatmap::{day_heat, month_grid, CalendarDay, DayHeat, HeatLevel, MonthGrid};
pub use timeline::{day_timeline, DayTimeline, Segment, SegmentKind};
pub use weekly::{rolling_week, DayTotal};

use chrono::NaiveDate;

use crate::error::Result;
use crate::storage::{Store, StudyRecord};

/// Seconds to whole minutes, rounding half up.
pub fn round_minutes(secs: u64) -> u64 {
    (secs + 30) / 60
}

/// `125` -> `"2h 5m"`, `120` -> `"2h"`, `45` -> `"45m"`, `0` -> `"0m"`.
pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Records for `day` in commit order, for the daily list.
pub fn today_records(store: &mut Store, day: NaiveDate) -> Result<Vec<StudyRecord>> {
    store.records_for_date(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_round_half_up() {
        assert_eq!(round_minutes(0), 0);
        assert_eq!(round_minutes(29), 0);
        assert_eq!(round_minutes(30), 1);
        assert_eq!(round_minutes(5400), 90);
    }

    #[test]
    fn format_minutes_matches_dashboard_text() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(125), "2h 5m");
    }
}
