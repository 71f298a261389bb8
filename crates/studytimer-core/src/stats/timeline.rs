//! Same-day study timeline, midnight to midnight.
//!
//! Records are laid out by start time at minute resolution and the gaps
//! between them filled with idle segments, so the segments always cover
//! exactly `[0, 1440)` with no overlap. A record that starts before the
//! previous one ends is clipped to begin where the previous one ended, and
//! nothing extends past midnight.

use serde::{Deserialize, Serialize};

use crate::storage::StudyRecord;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentKind {
    Study { tag: String },
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(flatten)]
    pub kind: SegmentKind,
    /// Minutes after midnight, inclusive.
    pub start: u32,
    /// Minutes after midnight, exclusive. At most 1440.
    pub end: u32,
}

impl Segment {
    pub fn minutes(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_study(&self) -> bool {
        matches!(self.kind, SegmentKind::Study { .. })
    }

    /// `"HH:MM"`; the end of the day reads `"24:00"`.
    pub fn start_label(&self) -> String {
        clock_label(self.start)
    }

    pub fn end_label(&self) -> String {
        clock_label(self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTimeline {
    pub segments: Vec<Segment>,
    pub studied_minutes: u32,
}

pub fn day_timeline(records: &[StudyRecord]) -> DayTimeline {
    let mut sorted: Vec<&StudyRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.start_minute());

    let mut segments = Vec::with_capacity(sorted.len() * 2 + 1);
    let mut cursor = 0u32;
    let mut studied_minutes = 0u32;

    for record in sorted {
        let start = record.start_minute().max(cursor).min(MINUTES_PER_DAY);
        let minutes = u32::try_from(record.duration / 60).unwrap_or(MINUTES_PER_DAY);
        let end = start.saturating_add(minutes).min(MINUTES_PER_DAY);
        if end == start {
            continue;
        }
        if start > cursor {
            segments.push(Segment {
                kind: SegmentKind::Idle,
                start: cursor,
                end: start,
            });
        }
        segments.push(Segment {
            kind: SegmentKind::Study {
                tag: record.tag.clone(),
            },
            start,
            end,
        });
        studied_minutes += end - start;
        cursor = end;
    }

    if cursor < MINUTES_PER_DAY {
        segments.push(Segment {
            kind: SegmentKind::Idle,
            start: cursor,
            end: MINUTES_PER_DAY,
        });
    }

    DayTimeline {
        segments,
        studied_minutes,
    }
}

fn clock_label(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
