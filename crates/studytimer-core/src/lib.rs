//! # Study Timer Core Library
//!
//! Core logic for a personal study timer: tagged study sessions with a fixed
//! countdown and randomized rest reminders, plus aggregated review of the
//! recorded history. The `studytimer` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires the caller
//!   to periodically invoke `tick()`; elapsed time is always re-derived from
//!   wall-clock deltas
//! - **Session Controller**: Wires the engine to storage and notifications
//! - **Storage**: A persistence facade over SQLite that silently falls back to
//!   an in-memory store, plus TOML-based configuration
//! - **Stats**: Per-tag breakdown, day timeline, rolling week and heat-map
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`SessionController`]: Side effects of timer transitions
//! - [`Store`]: Record, tag and setting persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod notify;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{
    ConfigError, CoreError, DatabaseError, ImportError, NotifyError, TimerError, ValidationError,
};
pub use events::Event;
pub use notify::{Cue, Notifier, NullNotifier, TerminalNotifier};
pub use session::SessionController;
pub use storage::{BackendKind, Config, Store, StudyRecord, TimerSnapshot};
pub use timer::{TimerConfig, TimerEngine, TimerState};
