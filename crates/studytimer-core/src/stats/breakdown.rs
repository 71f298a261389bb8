//! Per-tag totals for a day's category chart.

use serde::{Deserialize, Serialize};

use super::round_minutes;
use crate::storage::StudyRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTotal {
    pub tag: String,
    pub seconds: u64,
    pub minutes: u64,
    /// CSS color, stable per tag name.
    pub color: String,
}

/// Total duration per tag, in order of first appearance.
pub fn tag_breakdown(records: &[StudyRecord]) -> Vec<TagTotal> {
    let mut totals: Vec<TagTotal> = Vec::new();
    for record in records {
        match totals.iter_mut().find(|t| t.tag == record.tag) {
            Some(total) => total.seconds += record.duration,
            None => totals.push(TagTotal {
                tag: record.tag.clone(),
                seconds: record.duration,
                minutes: 0,
                color: tag_color(&record.tag),
            }),
        }
    }
    for total in &mut totals {
        total.minutes = round_minutes(total.seconds);
    }
    totals
}

/// Deterministic `hsl(h, 70%, 60%)` color for a tag.
///
/// Hashes UTF-16 code units with `c + (hash << 5) - hash`, truncating the
/// shifted operand to 32 bits.
pub fn tag_color(tag: &str) -> String {
    let mut hash: i64 = 0;
    for unit in tag.encode_utf16() {
        let shifted = i64::from((hash as i32).wrapping_shl(5));
        hash = i64::from(unit).wrapping_add(shifted.wrapping_sub(hash));
    }
    let hue = (hash % 360).abs();
    format!("hsl({hue}, 70%, 60%)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn record(tag: &str, duration: u64) -> StudyRecord {
        StudyRecord {
            id: 0,
            tag: tag.into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration,
        }
    }

    #[test]
    fn totals_keep_first_appearance_order() {
        let records = vec![record("Math", 600), record("Java", 1800), record("Math", 90)];
        let totals = tag_breakdown(&records);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].tag, "Math");
        assert_eq!(totals[0].seconds, 690);
        assert_eq!(totals[0].minutes, 12);
        assert_eq!(totals[1].minutes, 30);
    }

    #[test]
    fn empty_day_has_no_totals() {
        assert!(tag_breakdown(&[]).is_empty());
    }

    #[test]
    fn color_is_stable_and_in_range() {
        // "a" = 97: 97 % 360
        assert_eq!(tag_color("a"), "hsl(97, 70%, 60%)");
        // "ab" = 98 + 97 * 31 = 3105; 3105 % 360 = 225
        assert_eq!(tag_color("ab"), "hsl(225, 70%, 60%)");
        assert_eq!(tag_color("Java"), tag_color("Java"));
        assert_eq!(tag_color(""), "hsl(0, 70%, 60%)");
    }
}
