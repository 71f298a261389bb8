//! Session controller: the timer engine wired to persistence and cues.
//!
//! The engine only computes transitions. Everything with a side effect
//! lives here: the selected tag is read from the store on start, the
//! snapshot is written after every transition, a record is committed once
//! per stopped or completed session, and cues go to the notifier.

use crate::error::Result;
use crate::events::{at, Event};
use crate::notify::{Cue, Notifier};
use crate::storage::{Store, TimerSnapshot};
use crate::timer::TimerEngine;

pub struct SessionController {
    engine: TimerEngine,
    store: Store,
    notifier: Box<dyn Notifier>,
}

impl SessionController {
    pub fn new(engine: TimerEngine, store: Store, notifier: Box<dyn Notifier>) -> Self {
        Self {
            engine,
            store,
            notifier,
        }
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    /// Pick up a session left paused by an earlier context.
    pub fn restore(&mut self, now_ms: u64) -> Result<Option<Event>> {
        let snapshot = self.store.timer_snapshot()?;
        if !snapshot.paused {
            return Ok(None);
        }
        // Snapshots written before the tag was persisted fall back to the selection.
        let fallback = match snapshot.tag {
            Some(_) => None,
            None => self.store.selected_tag()?,
        };
        if !self.engine.restore(&snapshot, fallback) {
            return Ok(None);
        }
        tracing::debug!(remaining = self.engine.remaining_secs(now_ms), "session restored");
        Ok(Some(Event::SessionRestored {
            tag: self.engine.tag().map(str::to_string),
            remaining_secs: self.engine.remaining_secs(now_ms),
            at: at(now_ms),
        }))
    }

    /// Start a session for the currently selected tag.
    pub fn start(&mut self, now_ms: u64) -> Result<Event> {
        let tag = self.store.selected_tag()?;
        let event = self.engine.start(tag.as_deref(), now_ms)?;
        tracing::info!(tag = ?tag, "session started");
        self.persist(now_ms)?;
        Ok(event)
    }

    pub fn pause(&mut self, now_ms: u64) -> Result<Event> {
        let event = self.engine.pause(now_ms)?;
        self.persist(now_ms)?;
        Ok(event)
    }

    pub fn resume(&mut self, now_ms: u64) -> Result<Event> {
        let event = self.engine.resume(now_ms)?;
        self.persist(now_ms)?;
        Ok(event)
    }

    pub fn toggle(&mut self, now_ms: u64) -> Result<Event> {
        let event = self.engine.toggle(now_ms)?;
        self.persist(now_ms)?;
        Ok(event)
    }

    /// Idle: start. Running or paused: toggle.
    pub fn start_or_toggle(&mut self, now_ms: u64) -> Result<Event> {
        if self.engine.is_active() {
            self.toggle(now_ms)
        } else {
            self.start(now_ms)
        }
    }

    /// End the session early. Returns the stop event, followed by a
    /// `SessionRecorded` event when any study time elapsed.
    ///
    /// The snapshot is cleared even when the record cannot be written.
    pub fn stop(&mut self, now_ms: u64) -> Result<Vec<Event>> {
        let event = self.engine.stop(now_ms)?;
        let mut events = Vec::with_capacity(2);
        let mut recorded = Ok(None);
        if let Event::TimerStopped {
            tag, elapsed_secs, ..
        } = &event
        {
            tracing::info!(tag = %tag, elapsed_secs, "session stopped");
            recorded = self.commit(tag, *elapsed_secs, now_ms);
        }
        events.push(event);
        self.store.clear_timer_snapshot()?;
        events.extend(recorded?);
        Ok(events)
    }

    /// Advance the engine and perform any resulting side effects.
    pub fn tick(&mut self, now_ms: u64) -> Result<Vec<Event>> {
        let Some(event) = self.engine.tick(now_ms) else {
            return Ok(Vec::new());
        };
        let mut events = vec![event.clone()];
        match &event {
            Event::RestImminent { in_secs, .. } => {
                self.cue(&Cue::RestImminent { in_secs: *in_secs });
            }
            Event::RestStarted { rest_secs, .. } => {
                self.cue(&Cue::RestStarted {
                    rest_secs: *rest_secs,
                });
            }
            Event::RestEnded { .. } => {
                self.cue(&Cue::RestEnded);
            }
            Event::TimerCompleted {
                tag, duration_secs, ..
            } => {
                tracing::info!(tag = %tag, "session completed");
                let recorded = self.commit(tag, *duration_secs, now_ms);
                self.engine.reset();
                self.store.clear_timer_snapshot()?;
                self.cue(&Cue::SessionCompleted { tag: tag.clone() });
                events.extend(recorded?);
            }
            _ => {}
        }
        Ok(events)
    }

    /// The context is going away: leave the session paused for the next one.
    pub fn unload(&mut self, now_ms: u64) -> Result<Option<TimerSnapshot>> {
        let Some(snapshot) = self.engine.unload(now_ms) else {
            return Ok(None);
        };
        self.store.save_timer_snapshot(&snapshot)?;
        tracing::debug!(remaining = snapshot.remaining_seconds, "session unloaded");
        Ok(Some(snapshot))
    }

    pub fn status(&self, now_ms: u64) -> Event {
        self.engine.status(now_ms)
    }

    /// Flip the sound cue flag and return the new value.
    pub fn toggle_sound(&mut self) -> Result<bool> {
        let enabled = !self.store.sound_enabled()?;
        self.store.set_sound_enabled(enabled)?;
        Ok(enabled)
    }

    fn persist(&mut self, now_ms: u64) -> Result<()> {
        let snapshot = self.engine.snapshot(now_ms);
        self.store.save_timer_snapshot(&snapshot)
    }

    fn commit(&mut self, tag: &str, duration_secs: u64, now_ms: u64) -> Result<Option<Event>> {
        if duration_secs == 0 {
            return Ok(None);
        }
        let record = self.store.add_record(tag, duration_secs)?;
        Ok(Some(Event::SessionRecorded {
            id: record.id,
            tag: record.tag,
            duration_secs: record.duration,
            at: at(now_ms),
        }))
    }

    fn cue(&mut self, cue: &Cue) {
        let sound = match self.store.sound_enabled() {
            Ok(sound) => sound,
            Err(e) => {
                tracing::warn!("reading sound flag failed: {e}");
                false
            }
        };
        if let Err(e) = self.notifier.notify(cue, sound) {
            tracing::warn!(notifier = self.notifier.name(), "notification failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, NotifyError, TimerError};
    use crate::storage::Config;
    use crate::timer::{TimerConfig, TimerState};
    use std::sync::{Arc, Mutex};

    const T0: u64 = 1_760_000_000_000;

    fn secs(s: u64) -> u64 {
        T0 + s * 1000
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(Cue, bool)>>>);

    impl Notifier for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn notify(&mut self, cue: &Cue, sound: bool) -> std::result::Result<(), NotifyError> {
            self.0.lock().unwrap().push((cue.clone(), sound));
            Ok(())
        }
    }

    struct Failing;

    impl Notifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn notify(&mut self, _: &Cue, _: bool) -> std::result::Result<(), NotifyError> {
            Err(NotifyError::Unavailable("no audio device".into()))
        }
    }

    fn controller(config: TimerConfig, notifier: Box<dyn Notifier>) -> SessionController {
        let mut store = Store::in_memory(&Config::default());
        store.set_selected_tag(Some("Java")).unwrap();
        SessionController::new(TimerEngine::with_seed(config, 42), store, notifier)
    }

    fn short_rests() -> TimerConfig {
        TimerConfig {
            rest_min_minutes: 3,
            rest_max_minutes: 3,
            ..TimerConfig::default()
        }
    }

    #[test]
    fn start_without_selection_fails() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        ctl.store_mut().set_selected_tag(None).unwrap();
        assert!(matches!(
            ctl.start(T0),
            Err(CoreError::Timer(TimerError::NoTagSelected))
        ));
        assert_eq!(ctl.engine().state(), TimerState::Idle);
    }

    #[test]
    fn stop_after_65s_commits_one_record() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        ctl.start(T0).unwrap();
        let events = ctl.stop(secs(65)).unwrap();
        assert!(matches!(
            events.last(),
            Some(Event::SessionRecorded { duration_secs: 65, .. })
        ));

        let mut store = ctl.into_store();
        let records = store.all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration, 65);
        assert_eq!(records[0].tag, "Java");
        assert!(!store.timer_snapshot().unwrap().paused);
    }

    #[test]
    fn resume_clears_persisted_pause() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        ctl.start(T0).unwrap();
        ctl.pause(secs(30)).unwrap();
        let paused = ctl.store_mut().timer_snapshot().unwrap();
        assert!(paused.paused);
        assert_eq!(paused.elapsed_before_pause_ms, 30_000);

        ctl.resume(secs(40)).unwrap();
        let resumed = ctl.store_mut().timer_snapshot().unwrap();
        assert!(!resumed.paused);
        assert_eq!(resumed.elapsed_before_pause_ms, 0);
    }

    #[test]
    fn immediate_stop_commits_nothing() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        ctl.start(T0).unwrap();
        let events = ctl.stop(T0).unwrap();
        assert_eq!(events.len(), 1);
        assert!(ctl.into_store().all_records().unwrap().is_empty());
    }

    #[test]
    fn pause_persists_snapshot_for_next_context() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        ctl.start(T0).unwrap();
        ctl.pause(secs(100)).unwrap();
        let store = ctl.into_store();

        let mut next = SessionController::new(
            TimerEngine::with_seed(TimerConfig::default(), 1),
            store,
            Box::new(Recorder::default()),
        );
        assert!(matches!(
            next.restore(secs(500)).unwrap(),
            Some(Event::SessionRestored { remaining_secs: 5300, .. })
        ));
        next.resume(secs(500)).unwrap();
        assert_eq!(next.engine().remaining_secs(secs(510)), 5290);
    }

    #[test]
    fn deleted_tag_still_records_on_stop_after_restore() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        ctl.start(T0).unwrap();
        ctl.pause(secs(100)).unwrap();
        let mut store = ctl.into_store();
        assert!(store.delete_tag("Java").unwrap());
        assert_eq!(store.selected_tag().unwrap(), None);

        let mut next = SessionController::new(
            TimerEngine::with_seed(TimerConfig::default(), 1),
            store,
            Box::new(Recorder::default()),
        );
        match next.restore(secs(200)).unwrap() {
            Some(Event::SessionRestored {
                tag,
                remaining_secs,
                ..
            }) => {
                assert_eq!(tag.as_deref(), Some("Java"));
                assert_eq!(remaining_secs, 5300);
            }
            other => panic!("Expected SessionRestored, got {other:?}"),
        }
        let events = next.stop(secs(200)).unwrap();
        assert!(matches!(
            events.as_slice(),
            [Event::TimerStopped { .. }, Event::SessionRecorded { duration_secs: 100, .. }]
        ));
        assert_eq!(next.engine().state(), TimerState::Idle);

        let snapshot = next.store_mut().timer_snapshot().unwrap();
        assert!(!snapshot.paused);
        assert_eq!(snapshot.tag, None);
        assert!(next.restore(secs(300)).unwrap().is_none());

        let records = next.into_store().all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tag, "Java");
    }

    #[test]
    fn failed_commit_still_clears_snapshot() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        ctl.store_mut().set_selected_tag(None).unwrap();
        // An untagged snapshot from an older build, with nothing selected.
        ctl.store_mut()
            .save_timer_snapshot(&TimerSnapshot {
                paused: true,
                remaining_seconds: 5300,
                elapsed_before_pause_ms: 100_000,
                tag: None,
            })
            .unwrap();
        assert!(ctl.restore(T0).unwrap().is_some());

        assert!(ctl.stop(T0).is_err());
        assert_eq!(ctl.engine().state(), TimerState::Idle);
        assert!(!ctl.store_mut().timer_snapshot().unwrap().paused);
        assert!(ctl.restore(T0).unwrap().is_none());
    }

    #[test]
    fn unload_running_session_leaves_it_paused() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        ctl.start(T0).unwrap();
        let snapshot = ctl.unload(secs(30)).unwrap().unwrap();
        assert!(snapshot.paused);
        assert_eq!(snapshot.remaining_seconds, 5370);
        assert_eq!(ctl.store_mut().timer_snapshot().unwrap(), snapshot);
    }

    #[test]
    fn rest_cues_honour_sound_flag() {
        let recorder = Recorder::default();
        let mut ctl = controller(short_rests(), Box::new(recorder.clone()));
        ctl.store_mut().set_sound_enabled(false).unwrap();
        ctl.start(T0).unwrap();
        ctl.tick(secs(178)).unwrap();
        ctl.tick(secs(180)).unwrap();
        ctl.tick(secs(190)).unwrap();

        let cues = recorder.0.lock().unwrap().clone();
        assert_eq!(
            cues,
            vec![
                (Cue::RestImminent { in_secs: 2 }, false),
                (Cue::RestStarted { rest_secs: 10 }, false),
                (Cue::RestEnded, false),
            ]
        );
    }

    #[test]
    fn completion_commits_full_duration_and_resets() {
        let config = TimerConfig {
            total_minutes: 2,
            rest_min_minutes: 10,
            rest_max_minutes: 10,
            ..TimerConfig::default()
        };
        let recorder = Recorder::default();
        let mut ctl = controller(config, Box::new(recorder.clone()));
        ctl.start(T0).unwrap();
        let events = ctl.tick(secs(121)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::SessionRecorded { duration_secs: 120, .. }));
        assert_eq!(ctl.engine().state(), TimerState::Idle);
        assert_eq!(
            recorder.0.lock().unwrap().last().map(|(cue, _)| cue.clone()),
            Some(Cue::SessionCompleted { tag: "Java".into() })
        );
        assert_eq!(ctl.into_store().all_records().unwrap()[0].duration, 120);
    }

    #[test]
    fn notifier_failure_is_swallowed() {
        let mut ctl = controller(short_rests(), Box::new(Failing));
        ctl.start(T0).unwrap();
        let events = ctl.tick(secs(180)).unwrap();
        assert!(matches!(events[0], Event::RestStarted { .. }));
        assert_eq!(ctl.engine().state(), TimerState::PausedForRest);
    }

    #[test]
    fn toggle_sound_flips_flag() {
        let mut ctl = controller(TimerConfig::default(), Box::new(Recorder::default()));
        assert!(!ctl.toggle_sound().unwrap());
        assert!(ctl.toggle_sound().unwrap());
    }
}
