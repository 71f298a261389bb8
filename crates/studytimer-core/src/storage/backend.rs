//! Backend abstraction behind the [`Store`](super::Store) facade.
//!
//! Both implementations expose the same key space: records (auto-keyed,
//! looked up by date), tags (keyed by name, insertion ordered) and settings
//! (keyed by name).

use chrono::NaiveDate;

use super::model::{BackendKind, NewRecord, SettingValue, StudyRecord};
use crate::error::DatabaseError;

pub trait StoreBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Stored tags in insertion order. Empty when none were saved.
    fn load_tags(&self) -> Result<Vec<String>, DatabaseError>;

    /// Full replace. Duplicate names keep their first position.
    fn save_tags(&mut self, tags: &[String]) -> Result<(), DatabaseError>;

    fn insert_record(&mut self, record: &NewRecord) -> Result<StudyRecord, DatabaseError>;

    /// Records on `date` in insertion order.
    fn records_by_date(&self, date: NaiveDate) -> Result<Vec<StudyRecord>, DatabaseError>;

    fn all_records(&self) -> Result<Vec<StudyRecord>, DatabaseError>;

    /// Distinct dates with at least one record, ascending.
    fn record_dates(&self) -> Result<Vec<NaiveDate>, DatabaseError>;

    fn get_setting(&self, name: &str) -> Result<Option<SettingValue>, DatabaseError>;

    fn put_setting(&mut self, name: &str, value: &SettingValue) -> Result<(), DatabaseError>;

    fn delete_setting(&mut self, name: &str) -> Result<(), DatabaseError>;

    /// Replace every record and tag at once. Must be all-or-nothing.
    fn replace_all(&mut self, records: &[NewRecord], tags: &[String]) -> Result<(), DatabaseError>;
}

/// Order-preserving dedup shared by both backends.
pub(crate) fn unique_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}
