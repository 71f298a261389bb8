//! Calendar heat-map.
//!
//! A day's heat comes from the sum of each record's rounded minutes, so a
//! day of many short sub-30s records can legitimately read as level 0.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{format_minutes, round_minutes};
use crate::error::{Result, ValidationError};
use crate::storage::{Store, StudyRecord};

/// 0-5 bucket of a day's total study time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLevel {
    None,
    /// Under 3 hours
    Low,
    /// 3 to 4.5 hours
    Moderate,
    /// 4.5 to 6 hours
    High,
    /// 6 to 8 hours
    VeryHigh,
    /// 8 hours or more
    Max,
}

impl HeatLevel {
    pub fn from_minutes(minutes: u64) -> Self {
        match minutes {
            0 => HeatLevel::None,
            1..=179 => HeatLevel::Low,
            180..=269 => HeatLevel::Moderate,
            270..=359 => HeatLevel::High,
            360..=479 => HeatLevel::VeryHigh,
            _ => HeatLevel::Max,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMinutes {
    pub tag: String,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHeat {
    pub date: NaiveDate,
    pub level: HeatLevel,
    pub minutes: u64,
    pub by_tag: Vec<TagMinutes>,
    /// One-line description for tooltips and plain-text output.
    pub summary: String,
}

pub fn day_heat(date: NaiveDate, records: &[StudyRecord]) -> DayHeat {
    let mut by_tag: Vec<TagMinutes> = Vec::new();
    let mut minutes = 0;
    for record in records {
        let rounded = round_minutes(record.duration);
        minutes += rounded;
        match by_tag.iter_mut().find(|t| t.tag == record.tag) {
            Some(entry) => entry.minutes += rounded,
            None => by_tag.push(TagMinutes {
                tag: record.tag.clone(),
                minutes: rounded,
            }),
        }
    }

    let summary = if records.is_empty() {
        "No study records".to_string()
    } else {
        let tags: Vec<String> = by_tag
            .iter()
            .map(|t| format!("{}: {}", t.tag, format_minutes(t.minutes)))
            .collect();
        format!("Total {} ({})", format_minutes(minutes), tags.join(", "))
    };

    DayHeat {
        date,
        level: HeatLevel::from_minutes(minutes),
        minutes,
        by_tag,
        summary,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day: u32,
    /// False for the padding days borrowed from adjacent months.
    pub in_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
    #[serde(flatten)]
    pub heat: DayHeat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    /// Sunday-first, always a whole number of weeks.
    pub days: Vec<CalendarDay>,
}

impl MonthGrid {
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay]> {
        self.days.chunks(7)
    }

    pub fn title(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// Build the heat-map grid for `year`/`month` (1-12).
pub fn month_grid(
    store: &mut Store,
    year: i32,
    month: u32,
    today: NaiveDate,
    selected: Option<NaiveDate>,
) -> Result<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        ValidationError::InvalidValue {
            field: "month".into(),
            message: format!("{year}-{month} is not a calendar month"),
        }
    })?;
    let days_in_month = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(31, |last| last.day());
    let leading = first.weekday().num_days_from_sunday();
    let cells = (leading + days_in_month).div_ceil(7) * 7;
    let start = first
        .checked_sub_days(Days::new(u64::from(leading)))
        .unwrap_or(first);

    let mut days = Vec::with_capacity(cells as usize);
    for date in start.iter_days().take(cells as usize) {
        let records = store.records_for_date(date)?;
        let in_month = date.year() == year && date.month() == month;
        days.push(CalendarDay {
            day: date.day(),
            in_month,
            is_today: date == today,
            is_selected: in_month && Some(date) == selected,
            heat: day_heat(date, &records),
        });
    }

    Ok(MonthGrid { year, month, days })
}
