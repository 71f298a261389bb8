pub mod calendar;
pub mod config;
pub mod data;
pub mod stats;
pub mod tag;
pub mod timer;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use studytimer_core::{Config, Store};

/// Open the persistence facade. Never fails; falls back to memory.
pub fn open_store() -> (Config, Store) {
    let config = Config::load_or_default();
    let store = Store::open(&config);
    (config, store)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
