//! Session length and rest-reminder timing.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Length of one study session.
    #[serde(default = "default_total_minutes")]
    pub total_minutes: u64,
    /// Shortest gap between rest reminders.
    #[serde(default = "default_rest_min_minutes")]
    pub rest_min_minutes: u64,
    /// Longest gap between rest reminders.
    #[serde(default = "default_rest_max_minutes")]
    pub rest_max_minutes: u64,
    /// How long each rest lasts. Not counted as study time.
    #[serde(default = "default_rest_secs")]
    pub rest_secs: u64,
    /// Lead time for the "rest coming up" cue; 0 disables it.
    #[serde(default = "default_rest_warning_secs")]
    pub rest_warning_secs: u64,
}

fn default_total_minutes() -> u64 {
    90
}
fn default_rest_min_minutes() -> u64 {
    3
}
fn default_rest_max_minutes() -> u64 {
    5
}
fn default_rest_secs() -> u64 {
    10
}
fn default_rest_warning_secs() -> u64 {
    2
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            total_minutes: default_total_minutes(),
            rest_min_minutes: default_rest_min_minutes(),
            rest_max_minutes: default_rest_max_minutes(),
            rest_secs: default_rest_secs(),
            rest_warning_secs: default_rest_warning_secs(),
        }
    }
}

impl TimerConfig {
    pub fn total_secs(&self) -> u64 {
        self.total_minutes.saturating_mul(60)
    }

    pub fn total_ms(&self) -> u64 {
        self.total_secs().saturating_mul(1000)
    }

    /// Inclusive bounds, in seconds, for the gap before the next rest.
    pub fn rest_interval_bounds_secs(&self) -> (u64, u64) {
        let min = self.rest_min_minutes.saturating_mul(60);
        let max = self.rest_max_minutes.saturating_mul(60).max(min);
        (min, max)
    }

    /// Draw the next rest gap uniformly from the configured window.
    pub fn draw_rest_interval_secs<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let (min, max) = self.rest_interval_bounds_secs();
        rng.gen_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn defaults_match_ninety_minute_session() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.total_secs(), 5400);
        assert_eq!(cfg.rest_interval_bounds_secs(), (180, 300));
    }

    #[test]
    fn inverted_window_collapses_to_minimum() {
        let cfg = TimerConfig {
            rest_min_minutes: 4,
            rest_max_minutes: 2,
            ..TimerConfig::default()
        };
        let mut rng = Pcg64::seed_from_u64(1);
        assert_eq!(cfg.draw_rest_interval_secs(&mut rng), 240);
    }

    proptest! {
        #[test]
        fn rest_interval_stays_within_window(
            seed in any::<u64>(),
            min in 1u64..10,
            span in 0u64..10,
        ) {
            let cfg = TimerConfig {
                rest_min_minutes: min,
                rest_max_minutes: min + span,
                ..TimerConfig::default()
            };
            let mut rng = Pcg64::seed_from_u64(seed);
            for _ in 0..50 {
                let secs = cfg.draw_rest_interval_secs(&mut rng);
                prop_assert!(secs >= min * 60);
                prop_assert!(secs <= (min + span) * 60);
            }
        }
    }
}
