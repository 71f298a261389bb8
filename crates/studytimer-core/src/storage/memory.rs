//! Process-lifetime in-memory backend.
//!
//! Used when the SQLite database is unavailable or slow to open. Mirrors the
//! SQLite backend's semantics, including the positive-duration constraint.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use super::backend::{unique_tags, StoreBackend};
use super::model::{BackendKind, NewRecord, SettingValue, StudyRecord};
use crate::error::DatabaseError;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Vec<StudyRecord>,
    tags: Vec<String>,
    settings: HashMap<String, SettingValue>,
    next_id: i64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    fn check(record: &NewRecord) -> Result<(), DatabaseError> {
        if record.duration == 0 {
            return Err(DatabaseError::QueryFailed(
                "CHECK constraint failed: duration > 0".into(),
            ));
        }
        Ok(())
    }

    fn push(&mut self, record: &NewRecord) -> StudyRecord {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        let stored = record.clone().with_id(id);
        self.records.push(stored.clone());
        stored
    }
}

impl StoreBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn load_tags(&self) -> Result<Vec<String>, DatabaseError> {
        Ok(self.tags.clone())
    }

    fn save_tags(&mut self, tags: &[String]) -> Result<(), DatabaseError> {
        self.tags = unique_tags(tags);
        Ok(())
    }

    fn insert_record(&mut self, record: &NewRecord) -> Result<StudyRecord, DatabaseError> {
        Self::check(record)?;
        Ok(self.push(record))
    }

    fn records_by_date(&self, date: NaiveDate) -> Result<Vec<StudyRecord>, DatabaseError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.date == date)
            .cloned()
            .collect())
    }

    fn all_records(&self) -> Result<Vec<StudyRecord>, DatabaseError> {
        Ok(self.records.clone())
    }

    fn record_dates(&self) -> Result<Vec<NaiveDate>, DatabaseError> {
        let dates: BTreeSet<NaiveDate> = self.records.iter().map(|r| r.date).collect();
        Ok(dates.into_iter().collect())
    }

    fn get_setting(&self, name: &str) -> Result<Option<SettingValue>, DatabaseError> {
        Ok(self.settings.get(name).cloned())
    }

    fn put_setting(&mut self, name: &str, value: &SettingValue) -> Result<(), DatabaseError> {
        self.settings.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn delete_setting(&mut self, name: &str) -> Result<(), DatabaseError> {
        self.settings.remove(name);
        Ok(())
    }

    fn replace_all(&mut self, records: &[NewRecord], tags: &[String]) -> Result<(), DatabaseError> {
        for record in records {
            Self::check(record)?;
        }
        self.records.clear();
        self.tags = unique_tags(tags);
        for record in records {
            self.push(record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn new_record(duration: u64) -> NewRecord {
        NewRecord {
            tag: "Java".into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            duration,
        }
    }

    #[test]
    fn ids_are_assigned_sequentially() {
        let mut mem = MemoryBackend::new();
        assert_eq!(mem.insert_record(&new_record(10)).unwrap().id, 1);
        assert_eq!(mem.insert_record(&new_record(20)).unwrap().id, 2);
    }

    #[test]
    fn replace_all_is_all_or_nothing() {
        let mut mem = MemoryBackend::new();
        mem.insert_record(&new_record(10)).unwrap();
        let result = mem.replace_all(&[new_record(30), new_record(0)], &["OS".into()]);
        assert!(result.is_err());
        assert_eq!(mem.all_records().unwrap().len(), 1);
        assert!(mem.load_tags().unwrap().is_empty());
    }
}
