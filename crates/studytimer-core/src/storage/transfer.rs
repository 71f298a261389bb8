//! Import document parsing and validation.
//!
//! The accepted shape is a superset of [`ExportData`]: record ids are ignored
//! and a record without its own `date` takes the date of its group.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{parse_hhmm, ExportData, NewRecord};
use crate::error::ImportError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportDocument {
    #[serde(default)]
    pub records: BTreeMap<String, Vec<ImportedRecord>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportedRecord {
    pub tag: String,
    #[serde(default)]
    pub date: Option<String>,
    pub time: String,
    pub duration: u64,
}

/// What an import wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub records: usize,
    pub tags: usize,
    pub dates: usize,
}

impl ImportDocument {
    pub fn parse(json: &str) -> Result<Self, ImportError> {
        serde_json::from_str(json).map_err(ImportError::Parse)
    }

    /// Validate every entry and produce backend-ready rows.
    pub(crate) fn into_rows(self) -> Result<(Vec<NewRecord>, Vec<String>), ImportError> {
        let mut rows = Vec::new();
        for (group, records) in self.records {
            for record in records {
                let invalid = |message: String| ImportError::InvalidRecord {
                    date: group.clone(),
                    message,
                };
                let raw_date = record.date.as_deref().unwrap_or(&group);
                let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
                    .map_err(|e| invalid(format!("bad date '{raw_date}': {e}")))?;
                let time = parse_hhmm(&record.time)
                    .ok_or_else(|| invalid(format!("bad time '{}'", record.time)))?;
                let tag = record.tag.trim();
                if tag.is_empty() {
                    return Err(invalid("empty tag".into()));
                }
                if record.duration == 0 {
                    return Err(invalid(format!("zero duration for '{tag}'")));
                }
                rows.push(NewRecord {
                    tag: tag.to_string(),
                    date,
                    time,
                    duration: record.duration,
                });
            }
        }

        let tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Ok((rows, tags))
    }
}

impl From<ExportData> for ImportDocument {
    fn from(data: ExportData) -> Self {
        let records = data
            .records
            .into_iter()
            .map(|(date, records)| {
                let records = records
                    .into_iter()
                    .map(|r| ImportedRecord {
                        tag: r.tag,
                        date: Some(r.date.format("%Y-%m-%d").to_string()),
                        time: r.time.format("%H:%M").to_string(),
                        duration: r.duration,
                    })
                    .collect();
                (date, records)
            })
            .collect();
        Self {
            records,
            tags: data.tags,
        }
    }
}
