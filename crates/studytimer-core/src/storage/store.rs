//! Persistence facade.
//!
//! Callers never see which backend is serving them. The SQLite backend is
//! tried first with a bounded open; any failure there (at open or later)
//! switches the store to a process-lifetime [`MemoryBackend`] for good.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

use super::backend::StoreBackend;
use super::config::Config;
use super::data_dir;
use super::database::Database;
use super::memory::MemoryBackend;
use super::model::{
    keys, BackendKind, ExportData, NewRecord, SettingValue, StudyRecord, TimerSnapshot,
};
use super::transfer::{ImportDocument, ImportSummary};
use crate::error::{CoreError, DatabaseError, Result, ValidationError};

pub struct Store {
    backend: Box<dyn StoreBackend>,
    default_tags: Vec<String>,
    default_sound: bool,
}

impl Store {
    /// Open the store described by `config`. Never fails: when SQLite is
    /// unavailable the store silently runs in memory.
    pub fn open(config: &Config) -> Self {
        if config.storage.force_memory {
            tracing::info!("storage.force_memory set; using in-memory store");
            return Self::in_memory(config);
        }
        match data_dir() {
            Ok(dir) => Self::open_at(&dir.join(&config.storage.db_file), config),
            Err(e) => {
                tracing::warn!("{e}; falling back to in-memory store");
                Self::in_memory(config)
            }
        }
    }

    /// Open a SQLite store at `path`, falling back to memory on failure or timeout.
    pub fn open_at(path: &Path, config: &Config) -> Self {
        let timeout = Duration::from_millis(config.storage.open_timeout_ms);
        let backend: Box<dyn StoreBackend> = match open_bounded(path.to_path_buf(), timeout) {
            Ok(db) => {
                tracing::debug!(path = %path.display(), "opened sqlite store");
                Box::new(db)
            }
            Err(e) => {
                tracing::warn!("{e}; falling back to in-memory store");
                Box::new(MemoryBackend::new())
            }
        };
        Self::with_backend(backend, config)
    }

    pub fn in_memory(config: &Config) -> Self {
        Self::with_backend(Box::new(MemoryBackend::new()), config)
    }

    pub fn with_backend(backend: Box<dyn StoreBackend>, config: &Config) -> Self {
        Self {
            backend,
            default_tags: config.tags.defaults.clone(),
            default_sound: config.notifications.sound,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Run `op` on the current backend. A SQLite failure swaps in a fresh
    /// memory backend and replays `op` there; a memory failure is returned.
    fn run<T>(
        &mut self,
        mut op: impl FnMut(&mut dyn StoreBackend) -> std::result::Result<T, DatabaseError>,
    ) -> Result<T> {
        match op(self.backend.as_mut()) {
            Ok(value) => Ok(value),
            Err(e) if self.backend.kind() == BackendKind::Sqlite => {
                tracing::warn!("sqlite store failed ({e}); switching to in-memory store");
                self.backend = Box::new(MemoryBackend::new());
                op(self.backend.as_mut()).map_err(CoreError::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    // ── Tags ─────────────────────────────────────────────────────────

    /// Saved tags in insertion order, or the configured defaults when none are saved.
    pub fn tags(&mut self) -> Result<Vec<String>> {
        let tags = self.run(|b| b.load_tags())?;
        if tags.is_empty() {
            Ok(self.default_tags.clone())
        } else {
            Ok(tags)
        }
    }

    /// Replace the whole tag list. Blank names are dropped.
    pub fn set_tags(&mut self, tags: &[String]) -> Result<()> {
        let cleaned: Vec<String> = tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self.run(|b| b.save_tags(&cleaned))
    }

    /// Append a tag. Returns `false` when it already exists.
    pub fn add_tag(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyTag.into());
        }
        let mut tags = self.tags()?;
        if tags.iter().any(|t| t == name) {
            return Ok(false);
        }
        tags.push(name.to_string());
        self.set_tags(&tags)?;
        Ok(true)
    }

    /// Remove a tag. Removing the selected tag clears the selection.
    pub fn delete_tag(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        let mut tags = self.tags()?;
        let before = tags.len();
        tags.retain(|t| t != name);
        let removed = tags.len() != before;
        if removed {
            self.set_tags(&tags)?;
        }
        if self.selected_tag()?.as_deref() == Some(name) {
            self.set_selected_tag(None)?;
        }
        Ok(removed)
    }

    pub fn selected_tag(&mut self) -> Result<Option<String>> {
        Ok(self
            .setting(keys::SELECTED_TAG)?
            .map(|v| v.as_text())
            .filter(|t| !t.trim().is_empty()))
    }

    pub fn set_selected_tag(&mut self, tag: Option<&str>) -> Result<()> {
        match tag.map(str::trim) {
            Some("") => Err(ValidationError::EmptyTag.into()),
            Some(tag) => self.set_setting(keys::SELECTED_TAG, tag),
            None => self.set_setting(keys::SELECTED_TAG, ""),
        }
    }

    // ── Records ──────────────────────────────────────────────────────

    /// Commit a study record stamped with the current local date and time.
    pub fn add_record(&mut self, tag: &str, duration_secs: u64) -> Result<StudyRecord> {
        self.add_record_at(tag, duration_secs, Local::now().naive_local())
    }

    pub fn add_record_at(
        &mut self,
        tag: &str,
        duration_secs: u64,
        at: NaiveDateTime,
    ) -> Result<StudyRecord> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ValidationError::EmptyTag.into());
        }
        if duration_secs == 0 {
            return Err(ValidationError::ZeroDuration.into());
        }
        let time = at.time();
        let record = NewRecord {
            tag: tag.to_string(),
            date: at.date(),
            time: time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time),
            duration: duration_secs,
        };
        let saved = self.run(|b| b.insert_record(&record))?;
        tracing::debug!(id = saved.id, tag = %saved.tag, duration = saved.duration, "record saved");
        Ok(saved)
    }

    pub fn records_for_date(&mut self, date: NaiveDate) -> Result<Vec<StudyRecord>> {
        self.run(|b| b.records_by_date(date))
    }

    pub fn all_records(&mut self) -> Result<Vec<StudyRecord>> {
        self.run(|b| b.all_records())
    }

    pub fn all_record_dates(&mut self) -> Result<Vec<NaiveDate>> {
        self.run(|b| b.record_dates())
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn setting(&mut self, name: &str) -> Result<Option<SettingValue>> {
        self.run(|b| b.get_setting(name))
    }

    pub fn set_setting(&mut self, name: &str, value: impl Into<SettingValue>) -> Result<()> {
        let value = value.into();
        self.run(|b| b.put_setting(name, &value))
    }

    pub fn remove_setting(&mut self, name: &str) -> Result<()> {
        self.run(|b| b.delete_setting(name))
    }

    /// The persisted snapshot; all-zero when nothing was saved.
    pub fn timer_snapshot(&mut self) -> Result<TimerSnapshot> {
        let paused = self
            .setting(keys::TIMER_PAUSED)?
            .is_some_and(|v| v.as_bool());
        let remaining_seconds = self
            .setting(keys::TIMER_CURRENT_SECONDS)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let elapsed_before_pause_ms = self
            .setting(keys::TIMER_ELAPSED_BEFORE_PAUSE)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let tag = self
            .setting(keys::TIMER_TAG)?
            .map(|v| v.as_text())
            .filter(|t| !t.trim().is_empty());
        Ok(TimerSnapshot {
            paused,
            remaining_seconds,
            elapsed_before_pause_ms,
            tag,
        })
    }

    pub fn save_timer_snapshot(&mut self, snapshot: &TimerSnapshot) -> Result<()> {
        self.set_setting(keys::TIMER_PAUSED, snapshot.paused)?;
        self.set_setting(keys::TIMER_CURRENT_SECONDS, snapshot.remaining_seconds)?;
        self.set_setting(keys::TIMER_ELAPSED_BEFORE_PAUSE, snapshot.elapsed_before_pause_ms)?;
        match &snapshot.tag {
            Some(tag) => self.set_setting(keys::TIMER_TAG, tag.as_str()),
            None => self.remove_setting(keys::TIMER_TAG),
        }
    }

    pub fn clear_timer_snapshot(&mut self) -> Result<()> {
        self.set_setting(keys::TIMER_PAUSED, false)?;
        self.set_setting(keys::TIMER_ELAPSED_BEFORE_PAUSE, 0_u64)?;
        self.remove_setting(keys::TIMER_TAG)?;
        self.remove_setting(keys::TIMER_CURRENT_SECONDS)
    }

    pub fn sound_enabled(&mut self) -> Result<bool> {
        Ok(self
            .setting(keys::SOUND_ENABLED)?
            .map_or(self.default_sound, |v| v.as_bool()))
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) -> Result<()> {
        self.set_setting(keys::SOUND_ENABLED, enabled)
    }

    pub fn hint_shown(&mut self, name: &str) -> Result<bool> {
        Ok(self
            .setting(&keys::hint(name))?
            .is_some_and(|v| v.as_bool()))
    }

    pub fn mark_hint_shown(&mut self, name: &str) -> Result<()> {
        self.set_setting(&keys::hint(name), true)
    }

    // ── Export / import ──────────────────────────────────────────────

    pub fn export_all(&mut self) -> Result<ExportData> {
        let mut records: BTreeMap<String, Vec<StudyRecord>> = BTreeMap::new();
        for record in self.all_records()? {
            records
                .entry(record.date.format("%Y-%m-%d").to_string())
                .or_default()
                .push(record);
        }
        let tags = self.tags()?;
        Ok(ExportData { records, tags })
    }

    pub fn export_json(&mut self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_all()?)?)
    }

    /// Replace all records and tags with the document's contents.
    ///
    /// The document is validated in full first; on error nothing changes.
    pub fn import_all(&mut self, document: ImportDocument) -> Result<ImportSummary> {
        let (records, tags) = document.into_rows()?;
        self.run(|b| b.replace_all(&records, &tags))?;
        let dates = records
            .iter()
            .map(|r| r.date)
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        let summary = ImportSummary {
            records: records.len(),
            tags: tags.len(),
            dates,
        };
        tracing::info!(
            records = summary.records,
            tags = summary.tags,
            dates = summary.dates,
            "import complete"
        );
        Ok(summary)
    }

    pub fn import_json(&mut self, json: &str) -> Result<ImportSummary> {
        let document = ImportDocument::parse(json)?;
        self.import_all(document)
    }
}

/// Open SQLite on a worker thread, giving up after `timeout`.
fn open_bounded(path: PathBuf, timeout: Duration) -> std::result::Result<Database, DatabaseError> {
    let (tx, rx) = mpsc::channel();
    let worker_path = path.clone();
    let spawned = std::thread::Builder::new()
        .name("studytimer-db-open".into())
        .spawn(move || {
            // Receiver may be gone after a timeout.
            let _ = tx.send(Database::open_at(&worker_path));
        });
    if let Err(e) = spawned {
        return Err(DatabaseError::QueryFailed(format!("spawn opener: {e}")));
    }
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(DatabaseError::OpenTimeout {
            path,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
