use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::json;
use studytimer_core::stats::{self, day_timeline, format_minutes, rolling_week, tag_breakdown};

use super::{open_store, print_json, today};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Records and total for one day
    Day {
        /// Day to show (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Per-day totals for the 7 days ending at a date
    Week {
        /// Last day of the window (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Per-tag totals for one day
    Breakdown {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Study and idle intervals for one day, midnight to midnight
    Timeline {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, mut store) = open_store();

    match action {
        StatsAction::Day { date } => {
            let date = date.unwrap_or_else(today);
            let records = stats::today_records(&mut store, date)?;
            let minutes = stats::round_minutes(records.iter().map(|r| r.duration).sum());
            print_json(&json!({
                "date": date,
                "records": records,
                "total_minutes": minutes,
                "total": format_minutes(minutes),
            }))?;
        }
        StatsAction::Week { date } => {
            let week = rolling_week(&mut store, date.unwrap_or_else(today))?;
            print_json(&week)?;
        }
        StatsAction::Breakdown { date } => {
            let records = store.records_for_date(date.unwrap_or_else(today))?;
            print_json(&tag_breakdown(&records))?;
        }
        StatsAction::Timeline { date } => {
            let date = date.unwrap_or_else(today);
            let timeline = day_timeline(&store.records_for_date(date)?);
            let segments: Vec<_> = timeline
                .segments
                .iter()
                .map(|s| {
                    let mut value = serde_json::to_value(s).unwrap_or_default();
                    value["from"] = s.start_label().into();
                    value["to"] = s.end_label().into();
                    value
                })
                .collect();
            print_json(&json!({
                "date": date,
                "segments": segments,
                "studied_minutes": timeline.studied_minutes,
                "studied": format_minutes(u64::from(timeline.studied_minutes)),
            }))?;
        }
    }
    Ok(())
}
