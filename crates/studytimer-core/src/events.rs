use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Every timer state change produces an Event.
/// The CLI prints them as JSON; the session controller reacts to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        tag: String,
        total_secs: u64,
        next_rest_in_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        elapsed_before_pause_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        next_rest_in_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    /// The next rest begins within the warning lead time.
    RestImminent {
        in_secs: u64,
        at: DateTime<Utc>,
    },
    RestStarted {
        rest_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    RestEnded {
        remaining_secs: u64,
        next_rest_in_secs: u64,
        at: DateTime<Utc>,
    },
    /// Stopped early. `elapsed_secs` may be zero, in which case nothing is recorded.
    TimerStopped {
        tag: String,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        tag: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// A record was committed for a stopped or completed session.
    SessionRecorded {
        id: i64,
        tag: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// A paused session was restored from the persisted snapshot.
    SessionRestored {
        tag: Option<String>,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        tag: Option<String>,
        remaining_secs: u64,
        total_secs: u64,
        progress_pct: f64,
        next_rest_in_secs: Option<u64>,
        rest_remaining_secs: Option<u64>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short machine name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "TimerStarted",
            Event::TimerPaused { .. } => "TimerPaused",
            Event::TimerResumed { .. } => "TimerResumed",
            Event::RestImminent { .. } => "RestImminent",
            Event::RestStarted { .. } => "RestStarted",
            Event::RestEnded { .. } => "RestEnded",
            Event::TimerStopped { .. } => "TimerStopped",
            Event::TimerCompleted { .. } => "TimerCompleted",
            Event::SessionRecorded { .. } => "SessionRecorded",
            Event::SessionRestored { .. } => "SessionRestored",
            Event::StateSnapshot { .. } => "StateSnapshot",
        }
    }
}

/// Convert an epoch-millisecond reading into an event timestamp.
pub(crate) fn at(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::RestStarted {
            rest_secs: 10,
            remaining_secs: 5100,
            at: at(0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(json["rest_secs"], 10);
    }
}
