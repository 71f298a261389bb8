use chrono::{Datelike, NaiveDate};
use clap::Args;
use studytimer_core::stats::{month_grid, MonthGrid};

use super::{open_store, print_json, today};

#[derive(Args)]
pub struct CalendarArgs {
    /// Year to show (default: year of --date, or this year)
    #[arg(long)]
    pub year: Option<i32>,
    /// Month to show, 1-12 (default: month of --date, or this month)
    #[arg(long)]
    pub month: Option<u32>,
    /// Selected day (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Print a text grid of heat levels instead of JSON
    #[arg(long)]
    pub plain: bool,
}

pub fn run(args: CalendarArgs) -> Result<(), Box<dyn std::error::Error>> {
    let today = today();
    let anchor = args.date.unwrap_or(today);
    let year = args.year.unwrap_or(anchor.year());
    let month = args.month.unwrap_or(anchor.month());

    let (_, mut store) = open_store();
    let grid = month_grid(&mut store, year, month, today, args.date)?;

    if args.plain {
        print!("{}", render(&grid));
        Ok(())
    } else {
        print_json(&grid)
    }
}

/// `dd:L` cells, Sunday first; padding days are bracketed.
fn render(grid: &MonthGrid) -> String {
    let mut out = format!("{}\n Su    Mo    Tu    We    Th    Fr    Sa\n", grid.title());
    for week in grid.weeks() {
        let cells: Vec<String> = week
            .iter()
            .map(|d| {
                let cell = format!("{:>2}:{}", d.day, d.heat.level.level());
                if d.in_month {
                    format!(" {cell} ")
                } else {
                    format!("[{cell}]")
                }
            })
            .collect();
        out.push_str(&cells.join(""));
        out.push('\n');
    }
    out
}
