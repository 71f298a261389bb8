use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::round_minutes;
use crate::error::Result;
use crate::storage::Store;

/// One bar of the 7-day chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    /// `"MM-DD"`
    pub label: String,
    pub minutes: u64,
}

/// Totals for the seven days ending at `today`, oldest first.
pub fn rolling_week(store: &mut Store, today: NaiveDate) -> Result<Vec<DayTotal>> {
    let mut week = Vec::with_capacity(7);
    for back in (0..7u64).rev() {
        let Some(date) = today.checked_sub_days(Days::new(back)) else {
            continue;
        };
        let seconds: u64 = store
            .records_for_date(date)?
            .iter()
            .map(|r| r.duration)
            .sum();
        week.push(DayTotal {
            date,
            label: date.format("%m-%d").to_string(),
            minutes: round_minutes(seconds),
        });
    }
    Ok(week)
}
