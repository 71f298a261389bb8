//! Session timer engine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads or timers: every command takes the current time in epoch
//! milliseconds and the caller is responsible for calling `tick()`
//! periodically. Elapsed study time is always derived from a wall-clock
//! anchor, so missed or throttled ticks never desynchronize the countdown.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (PausedByUser | PausedForRest) -> Running -> Completed -> Idle
//!            \______________ stop ______________/
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(TimerConfig::default());
//! engine.start(Some("Java"), now_ms())?;
//! // In a loop:
//! engine.tick(now_ms()); // Returns Some(Event) on rest/completion edges
//! ```

use std::fmt;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use super::rest::TimerConfig;
use crate::error::TimerError;
use crate::events::{at, Event};
use crate::storage::TimerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
    PausedByUser,
    PausedForRest,
    /// Full session elapsed; the owner commits the record and calls `reset()`.
    Completed,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::PausedByUser => "paused",
            TimerState::PausedForRest => "resting",
            TimerState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Core timer engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    config: TimerConfig,
    state: TimerState,
    tag: Option<String>,
    /// While running, elapsed study time is `now - anchor_ms`.
    anchor_ms: Option<u64>,
    /// Study time frozen at the last pause or rest. Source of truth while not running.
    elapsed_before_pause_ms: u64,
    next_rest_at_ms: Option<u64>,
    rest_ends_at_ms: Option<u64>,
    rest_warned: bool,
    rng: Pcg64,
}

impl TimerEngine {
    /// Create an idle engine with an entropy-seeded rest generator.
    pub fn new(config: TimerConfig) -> Self {
        Self::with_rng(config, Pcg64::from_entropy())
    }

    /// Create an idle engine whose rest draws are reproducible.
    pub fn with_seed(config: TimerConfig, seed: u64) -> Self {
        Self::with_rng(config, Pcg64::seed_from_u64(seed))
    }

    fn with_rng(config: TimerConfig, rng: Pcg64) -> Self {
        Self {
            config,
            state: TimerState::Idle,
            tag: None,
            anchor_ms: None,
            elapsed_before_pause_ms: 0,
            next_rest_at_ms: None,
            rest_ends_at_ms: None,
            rest_warned: false,
            rng,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn total_secs(&self) -> u64 {
        self.config.total_secs()
    }

    /// Study time so far, capped at the session length.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let elapsed = match (self.state, self.anchor_ms) {
            (TimerState::Running, Some(anchor)) => now_ms.saturating_sub(anchor),
            _ => self.elapsed_before_pause_ms,
        };
        elapsed.min(self.config.total_ms())
    }

    pub fn elapsed_secs(&self, now_ms: u64) -> u64 {
        self.elapsed_ms(now_ms) / 1000
    }

    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        self.total_secs().saturating_sub(self.elapsed_secs(now_ms))
    }

    /// 0.0 .. 100.0 progress through the session.
    pub fn progress_pct(&self, now_ms: u64) -> f64 {
        let total = self.config.total_ms();
        if total == 0 {
            return 0.0;
        }
        (self.elapsed_ms(now_ms) as f64 / total as f64 * 100.0).min(100.0)
    }

    pub fn next_rest_in_secs(&self, now_ms: u64) -> Option<u64> {
        self.next_rest_at_ms
            .map(|deadline| deadline.saturating_sub(now_ms).div_ceil(1000))
    }

    pub fn rest_remaining_secs(&self, now_ms: u64) -> Option<u64> {
        self.rest_ends_at_ms
            .map(|end| end.saturating_sub(now_ms).div_ceil(1000))
    }

    /// Whether a session is in progress (running, paused or resting).
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            TimerState::Running | TimerState::PausedByUser | TimerState::PausedForRest
        )
    }

    /// Persistable view of the current session.
    pub fn snapshot(&self, now_ms: u64) -> TimerSnapshot {
        let paused = self.state == TimerState::PausedByUser;
        TimerSnapshot {
            paused,
            remaining_seconds: self.remaining_secs(now_ms),
            // Only a user pause leaves something to resume from.
            elapsed_before_pause_ms: if paused { self.elapsed_ms(now_ms) } else { 0 },
            tag: self.tag.clone(),
        }
    }

    /// Build a full state snapshot event.
    pub fn status(&self, now_ms: u64) -> Event {
        Event::StateSnapshot {
            state: self.state,
            tag: self.tag.clone(),
            remaining_secs: self.remaining_secs(now_ms),
            total_secs: self.total_secs(),
            progress_pct: self.progress_pct(now_ms),
            next_rest_in_secs: self.next_rest_in_secs(now_ms),
            rest_remaining_secs: self.rest_remaining_secs(now_ms),
            at: at(now_ms),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh session for `tag`.
    ///
    /// # Errors
    /// `NoTagSelected` when `tag` is missing or blank; `InvalidTransition`
    /// when a session is already in progress.
    pub fn start(&mut self, tag: Option<&str>, now_ms: u64) -> Result<Event, TimerError> {
        if self.is_active() {
            return Err(self.invalid("start"));
        }
        let tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TimerError::NoTagSelected)?;

        self.reset();
        self.tag = Some(tag.to_string());
        self.state = TimerState::Running;
        self.anchor_ms = Some(now_ms);
        let next_rest_in_secs = self.schedule_rest(now_ms);
        Ok(Event::TimerStarted {
            tag: tag.to_string(),
            total_secs: self.total_secs(),
            next_rest_in_secs,
            at: at(now_ms),
        })
    }

    pub fn pause(&mut self, now_ms: u64) -> Result<Event, TimerError> {
        if self.state != TimerState::Running {
            return Err(self.invalid("pause"));
        }
        self.freeze(now_ms);
        self.state = TimerState::PausedByUser;
        Ok(Event::TimerPaused {
            remaining_secs: self.remaining_secs(now_ms),
            elapsed_before_pause_ms: self.elapsed_before_pause_ms,
            at: at(now_ms),
        })
    }

    pub fn resume(&mut self, now_ms: u64) -> Result<Event, TimerError> {
        if self.state != TimerState::PausedByUser {
            return Err(self.invalid("resume"));
        }
        self.thaw(now_ms);
        // A deadline that passed while paused is redrawn rather than fired at once.
        if self.next_rest_at_ms.map_or(true, |deadline| deadline <= now_ms) {
            self.schedule_rest(now_ms);
        }
        Ok(Event::TimerResumed {
            remaining_secs: self.remaining_secs(now_ms),
            next_rest_in_secs: self.next_rest_in_secs(now_ms),
            at: at(now_ms),
        })
    }

    /// Pause when running, resume when paused by the user.
    pub fn toggle(&mut self, now_ms: u64) -> Result<Event, TimerError> {
        match self.state {
            TimerState::Running => self.pause(now_ms),
            TimerState::PausedByUser => self.resume(now_ms),
            _ => Err(self.invalid("pause or resume")),
        }
    }

    /// End the session early and return to `Idle`. Both pending schedules are dropped.
    pub fn stop(&mut self, now_ms: u64) -> Result<Event, TimerError> {
        if !self.is_active() {
            return Err(self.invalid("stop"));
        }
        let elapsed_secs = self.elapsed_secs(now_ms);
        let tag = self.tag.clone().unwrap_or_default();
        self.reset();
        Ok(Event::TimerStopped {
            tag,
            elapsed_secs,
            at: at(now_ms),
        })
    }

    /// Call periodically. Returns an event on completion, rest start/end,
    /// or the pre-rest warning. Completion wins over a due rest.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                let anchor = self.anchor_ms?;
                if now_ms.saturating_sub(anchor) >= self.config.total_ms() {
                    self.elapsed_before_pause_ms = self.config.total_ms();
                    self.anchor_ms = None;
                    self.next_rest_at_ms = None;
                    self.rest_ends_at_ms = None;
                    self.state = TimerState::Completed;
                    return Some(Event::TimerCompleted {
                        tag: self.tag.clone().unwrap_or_default(),
                        duration_secs: self.total_secs(),
                        at: at(now_ms),
                    });
                }

                let deadline = self.next_rest_at_ms?;
                if now_ms >= deadline {
                    self.freeze(now_ms);
                    self.next_rest_at_ms = None;
                    self.rest_ends_at_ms =
                        Some(now_ms.saturating_add(self.config.rest_secs.saturating_mul(1000)));
                    self.rest_warned = true;
                    self.state = TimerState::PausedForRest;
                    return Some(Event::RestStarted {
                        rest_secs: self.config.rest_secs,
                        remaining_secs: self.remaining_secs(now_ms),
                        at: at(now_ms),
                    });
                }

                let lead_ms = self.config.rest_warning_secs.saturating_mul(1000);
                if !self.rest_warned && lead_ms > 0 && deadline - now_ms <= lead_ms {
                    self.rest_warned = true;
                    return Some(Event::RestImminent {
                        in_secs: (deadline - now_ms).div_ceil(1000),
                        at: at(now_ms),
                    });
                }
                None
            }
            TimerState::PausedForRest => {
                let end = self.rest_ends_at_ms?;
                if now_ms < end {
                    return None;
                }
                self.rest_ends_at_ms = None;
                self.thaw(now_ms);
                let next_rest_in_secs = self.schedule_rest(now_ms);
                Some(Event::RestEnded {
                    remaining_secs: self.remaining_secs(now_ms),
                    next_rest_in_secs,
                    at: at(now_ms),
                })
            }
            _ => None,
        }
    }

    /// The page is going away: force a resumable pause.
    ///
    /// Returns the snapshot to persist, or `None` when no session is active.
    pub fn unload(&mut self, now_ms: u64) -> Option<TimerSnapshot> {
        match self.state {
            TimerState::Running => {
                self.freeze(now_ms);
            }
            TimerState::PausedForRest => {
                self.rest_ends_at_ms = None;
            }
            TimerState::PausedByUser => {}
            TimerState::Idle | TimerState::Completed => return None,
        }
        self.state = TimerState::PausedByUser;
        Some(self.snapshot(now_ms))
    }

    /// Rebuild a paused session from a persisted snapshot.
    ///
    /// Returns `false` (and stays idle) unless the snapshot is marked paused.
    /// `fallback_tag` is used only when the snapshot carries no tag.
    pub fn restore(&mut self, snapshot: &TimerSnapshot, fallback_tag: Option<String>) -> bool {
        if !snapshot.paused || self.is_active() {
            return false;
        }
        self.reset();
        self.elapsed_before_pause_ms = self.resolve_elapsed_ms(snapshot);
        self.tag = snapshot
            .tag
            .clone()
            .or(fallback_tag)
            .filter(|t| !t.trim().is_empty());
        self.state = TimerState::PausedByUser;
        true
    }

    /// Drop the session and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.tag = None;
        self.anchor_ms = None;
        self.elapsed_before_pause_ms = 0;
        self.next_rest_at_ms = None;
        self.rest_ends_at_ms = None;
        self.rest_warned = false;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn invalid(&self, action: &'static str) -> TimerError {
        TimerError::InvalidTransition {
            action,
            state: self.state.to_string(),
        }
    }

    fn freeze(&mut self, now_ms: u64) {
        self.elapsed_before_pause_ms = self.elapsed_ms(now_ms);
        self.anchor_ms = None;
    }

    fn thaw(&mut self, now_ms: u64) {
        self.anchor_ms = Some(now_ms.saturating_sub(self.elapsed_before_pause_ms));
        self.state = TimerState::Running;
    }

    fn schedule_rest(&mut self, now_ms: u64) -> u64 {
        let gap_secs = self.config.draw_rest_interval_secs(&mut self.rng);
        self.next_rest_at_ms = Some(now_ms.saturating_add(gap_secs.saturating_mul(1000)));
        self.rest_warned = false;
        gap_secs
    }

    /// Elapsed-before-pause is authoritative. Snapshots that only carry a
    /// remaining count (older writers) derive elapsed from it instead.
    fn resolve_elapsed_ms(&self, snapshot: &TimerSnapshot) -> u64 {
        let total_secs = self.total_secs();
        let elapsed = if snapshot.elapsed_before_pause_ms > 0 {
            snapshot.elapsed_before_pause_ms
        } else if snapshot.remaining_seconds > 0 && snapshot.remaining_seconds < total_secs {
            (total_secs - snapshot.remaining_seconds) * 1000
        } else {
            0
        };
        elapsed.min(self.config.total_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_760_000_000_000;

    fn secs(s: u64) -> u64 {
        T0 + s * 1000
    }

    /// Rests pushed far out so they never interfere.
    fn no_rest_config() -> TimerConfig {
        TimerConfig {
            rest_min_minutes: 10_000,
            rest_max_minutes: 10_000,
            ..TimerConfig::default()
        }
    }

    #[test]
    fn start_requires_tag() {
        let mut engine = TimerEngine::with_seed(TimerConfig::default(), 1);
        assert_eq!(engine.start(None, T0), Err(TimerError::NoTagSelected));
        assert_eq!(engine.start(Some("  "), T0), Err(TimerError::NoTagSelected));
        assert_eq!(engine.state(), TimerState::Idle);
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::with_seed(TimerConfig::default(), 1);
        assert!(engine.start(Some("Java"), T0).is_ok());
        assert_eq!(engine.state(), TimerState::Running);
        assert_eq!(engine.remaining_secs(T0), 5400);

        assert!(engine.pause(secs(10)).is_ok());
        assert_eq!(engine.state(), TimerState::PausedByUser);

        assert!(engine.resume(secs(20)).is_ok());
        assert_eq!(engine.state(), TimerState::Running);
        assert!(engine.start(Some("Java"), secs(21)).is_err());
    }

    #[test]
    fn paused_interval_is_not_counted() {
        let mut engine = TimerEngine::with_seed(no_rest_config(), 7);
        engine.start(Some("Java"), T0).unwrap();
        engine.tick(secs(100));
        assert_eq!(engine.remaining_secs(secs(100)), 5300);

        engine.pause(secs(100)).unwrap();
        assert_eq!(engine.remaining_secs(secs(150)), 5300);
        engine.resume(secs(150)).unwrap();
        engine.tick(secs(160));
        assert_eq!(engine.remaining_secs(secs(160)), 5400 - 100 - 10);
    }

    #[test]
    fn missed_ticks_do_not_drift() {
        let mut engine = TimerEngine::with_seed(no_rest_config(), 7);
        engine.start(Some("Java"), T0).unwrap();
        // One tick after a long background gap still lands on wall-clock time.
        engine.tick(secs(1234));
        assert_eq!(engine.remaining_secs(secs(1234)), 5400 - 1234);
    }

    #[test]
    fn stop_reports_elapsed_and_resets() {
        let mut engine = TimerEngine::with_seed(TimerConfig::default(), 3);
        engine.start(Some("Java"), T0).unwrap();
        let event = engine.stop(secs(65)).unwrap();
        match event {
            Event::TimerStopped { tag, elapsed_secs, .. } => {
                assert_eq!(tag, "Java");
                assert_eq!(elapsed_secs, 65);
            }
            other => panic!("Expected TimerStopped, got {other:?}"),
        }
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.next_rest_in_secs(secs(65)), None);
        assert!(engine.stop(secs(66)).is_err());
    }

    #[test]
    fn stop_immediately_reports_zero() {
        let mut engine = TimerEngine::with_seed(TimerConfig::default(), 3);
        engine.start(Some("Java"), T0).unwrap();
        match engine.stop(T0).unwrap() {
            Event::TimerStopped { elapsed_secs, .. } => assert_eq!(elapsed_secs, 0),
            other => panic!("Expected TimerStopped, got {other:?}"),
        }
    }

    #[test]
    fn rest_suspends_countdown_then_resumes() {
        let config = TimerConfig {
            rest_min_minutes: 3,
            rest_max_minutes: 3,
            rest_secs: 10,
            rest_warning_secs: 2,
            ..TimerConfig::default()
        };
        let mut engine = TimerEngine::with_seed(config, 11);
        engine.start(Some("Java"), T0).unwrap();
        assert_eq!(engine.next_rest_in_secs(T0), Some(180));

        assert!(matches!(
            engine.tick(secs(178)),
            Some(Event::RestImminent { in_secs: 2, .. })
        ));
        assert_eq!(engine.tick(secs(179)), None);

        assert!(matches!(engine.tick(secs(180)), Some(Event::RestStarted { .. })));
        assert_eq!(engine.state(), TimerState::PausedForRest);
        assert_eq!(engine.rest_remaining_secs(secs(185)), Some(5));
        assert_eq!(engine.remaining_secs(secs(189)), 5400 - 180);
        assert_eq!(engine.tick(secs(189)), None);

        assert!(matches!(engine.tick(secs(190)), Some(Event::RestEnded { .. })));
        assert_eq!(engine.state(), TimerState::Running);
        assert_eq!(engine.next_rest_in_secs(secs(190)), Some(180));
        // Ten resting seconds were not charged to the session.
        assert_eq!(engine.remaining_secs(secs(200)), 5400 - 190);
    }

    #[test]
    fn deadline_passed_while_paused_is_redrawn() {
        let config = TimerConfig {
            rest_min_minutes: 3,
            rest_max_minutes: 3,
            ..TimerConfig::default()
        };
        let mut engine = TimerEngine::with_seed(config, 5);
        engine.start(Some("Java"), T0).unwrap();
        engine.pause(secs(60)).unwrap();
        engine.resume(secs(600)).unwrap();
        assert_eq!(engine.next_rest_in_secs(secs(600)), Some(180));
        assert_eq!(engine.tick(secs(601)), None);
    }

    #[test]
    fn completion_wins_over_due_rest() {
        let config = TimerConfig {
            total_minutes: 1,
            rest_min_minutes: 1,
            rest_max_minutes: 1,
            ..TimerConfig::default()
        };
        let mut engine = TimerEngine::with_seed(config, 9);
        engine.start(Some("Java"), T0).unwrap();
        match engine.tick(secs(60)) {
            Some(Event::TimerCompleted { duration_secs, tag, .. }) => {
                assert_eq!(duration_secs, 60);
                assert_eq!(tag, "Java");
            }
            other => panic!("Expected TimerCompleted, got {other:?}"),
        }
        assert_eq!(engine.state(), TimerState::Completed);
        assert_eq!(engine.remaining_secs(secs(61)), 0);
        engine.reset();
        assert_eq!(engine.state(), TimerState::Idle);
    }

    #[test]
    fn unload_forces_resumable_pause() {
        let mut engine = TimerEngine::with_seed(no_rest_config(), 2);
        engine.start(Some("Java"), T0).unwrap();
        let snapshot = engine.unload(secs(300)).unwrap();
        assert!(snapshot.paused);
        assert_eq!(snapshot.remaining_seconds, 5100);
        assert_eq!(snapshot.elapsed_before_pause_ms, 300_000);

        let mut reloaded = TimerEngine::with_seed(no_rest_config(), 2);
        assert_eq!(snapshot.tag.as_deref(), Some("Java"));
        assert!(reloaded.restore(&snapshot, Some("Math".into())));
        assert_eq!(reloaded.state(), TimerState::PausedByUser);
        assert_eq!(reloaded.tag(), Some("Java"));
        reloaded.resume(secs(10_000)).unwrap();
        assert_eq!(reloaded.remaining_secs(secs(10_010)), 5100 - 10);
    }

    #[test]
    fn unload_while_idle_is_noop() {
        let mut engine = TimerEngine::with_seed(TimerConfig::default(), 2);
        assert!(engine.unload(T0).is_none());
    }

    #[test]
    fn restore_derives_elapsed_from_remaining_when_missing() {
        let mut engine = TimerEngine::with_seed(TimerConfig::default(), 2);
        let legacy = TimerSnapshot {
            paused: true,
            remaining_seconds: 5000,
            elapsed_before_pause_ms: 0,
            tag: None,
        };
        assert!(engine.restore(&legacy, None));
        assert_eq!(engine.remaining_secs(T0), 5000);
        assert!(!engine.restore(&TimerSnapshot::default(), None));
    }

    #[test]
    fn status_returns_state_snapshot() {
        let engine = TimerEngine::with_seed(TimerConfig::default(), 2);
        match engine.status(T0) {
            Event::StateSnapshot {
                state,
                remaining_secs,
                total_secs,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(remaining_secs, 5400);
                assert_eq!(total_secs, 5400);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
