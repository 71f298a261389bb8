//! Persisted data shapes shared by every storage backend.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Well-known setting names.
pub mod keys {
    pub const SELECTED_TAG: &str = "currentStudyTag";
    pub const TIMER_PAUSED: &str = "timer_paused";
    pub const TIMER_CURRENT_SECONDS: &str = "timer_currentSeconds";
    pub const TIMER_ELAPSED_BEFORE_PAUSE: &str = "timer_elapsedBeforePause";
    pub const TIMER_TAG: &str = "timer_tag";
    pub const SOUND_ENABLED: &str = "soundEnabled";

    /// Setting name for a one-time hint flag.
    pub fn hint(name: &str) -> String {
        format!("hint_{name}_shown")
    }
}

/// A committed study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRecord {
    pub id: i64,
    pub tag: String,
    pub date: NaiveDate,
    /// Local wall-clock time the session was committed, `HH:MM`.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Duration in seconds. Always greater than zero.
    pub duration: u64,
}

/// A record before the backend assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub tag: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration: u64,
}

impl NewRecord {
    pub fn with_id(self, id: i64) -> StudyRecord {
        StudyRecord {
            id,
            tag: self.tag,
            date: self.date,
            time: self.time,
            duration: self.duration,
        }
    }
}

impl StudyRecord {
    /// Minute of day (0..1440) at which the record starts.
    pub fn start_minute(&self) -> u32 {
        use chrono::Timelike;
        self.time.hour() * 60 + self.time.minute()
    }
}

/// An opaque setting value, coerced on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    /// `true`, `"true"` and non-zero numbers read as true.
    pub fn as_bool(&self) -> bool {
        match self {
            SettingValue::Bool(b) => *b,
            SettingValue::Int(i) => *i != 0,
            SettingValue::Float(f) => *f != 0.0,
            SettingValue::Text(s) => s.trim() == "true",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Bool(b) => Some(i64::from(*b)),
            SettingValue::Int(i) => Some(*i),
            SettingValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            SettingValue::Float(_) => None,
            SettingValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
        }
    }

    /// Non-negative integer view; negatives and garbage read as `None`.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|v| u64::try_from(v).ok())
    }

    pub fn as_text(&self) -> String {
        match self {
            SettingValue::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::Float(v) => write!(f, "{v}"),
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<u64> for SettingValue {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(SettingValue::Int)
            .unwrap_or(SettingValue::Float(v as f64))
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Text(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Text(v)
    }
}

/// Minimal persisted state needed to resume a paused session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimerSnapshot {
    pub paused: bool,
    pub remaining_seconds: u64,
    pub elapsed_before_pause_ms: u64,
    /// Tag the session was started under; outlives the tag list.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Which backend currently serves the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sqlite => f.write_str("sqlite"),
            BackendKind::Memory => f.write_str("memory"),
        }
    }
}

/// Export document: records grouped by ISO date, plus the tag list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExportData {
    pub records: BTreeMap<String, Vec<StudyRecord>>,
    pub tags: Vec<String>,
}

/// Serde helper for `HH:MM` times. Accepts `H:MM` and `HH:MM:SS` on input.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}

pub(crate) use hhmm::parse as parse_hhmm;
