//! Timer page.
//!
//! Each invocation is one page context: it restores a paused session from
//! the store, applies the command and, on the way out, leaves any live
//! session paused for the next context. `start`, `resume` and `run` keep the
//! session in the foreground until it stops, completes or the user goes back.

use std::io::IsTerminal;
use std::time::Duration;

use clap::Subcommand;
use studytimer_core::timer::{format_clock, now_ms};
use studytimer_core::{Event, SessionController, TerminalNotifier, TimerEngine, TimerState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{open_store, print_json};

const SHORTCUTS_HINT: &str = "timer_shortcuts";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a session for the selected tag and run it in the foreground
    Start,
    /// Resume the paused session in the foreground
    Resume,
    /// Open the timer and wait for keyboard shortcuts
    Run,
    /// Stop the paused session and record the time studied so far
    Stop,
    /// Print current timer state as JSON
    Status,
}

/// One line of input in the foreground loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shortcut {
    /// `p` or space: start, pause or resume
    Toggle,
    /// `s`, `x` or `esc`
    Stop,
    /// `m`
    Sound,
    /// `b` or `q`: pause and leave
    Back,
}

fn parse_shortcut(line: &str) -> Option<Shortcut> {
    if line.contains(' ') && line.trim().is_empty() {
        return Some(Shortcut::Toggle);
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "p" => Some(Shortcut::Toggle),
        "s" | "x" | "esc" => Some(Shortcut::Stop),
        "m" => Some(Shortcut::Sound),
        "b" | "q" => Some(Shortcut::Back),
        _ => None,
    }
}

fn open_session() -> SessionController {
    let (config, store) = open_store();
    SessionController::new(
        TimerEngine::new(config.timer.clone()),
        store,
        Box::new(TerminalNotifier::stderr(config.notifications.bell)),
    )
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session();
    let now = now_ms();
    let restored = session.restore(now)?;

    match action {
        TimerAction::Start => {
            let event = session.start(now)?;
            print_json(&event)?;
            foreground(session)
        }
        TimerAction::Resume => {
            let event = session.resume(now)?;
            print_json(&event)?;
            foreground(session)
        }
        TimerAction::Run => {
            match restored {
                Some(event) => print_json(&event)?,
                None => print_json(&session.status(now))?,
            }
            foreground(session)
        }
        TimerAction::Stop => {
            for event in session.stop(now)? {
                print_json(&event)?;
            }
            Ok(())
        }
        TimerAction::Status => print_json(&session.status(now)),
    }
}

fn foreground(session: SessionController) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_loop(session));
    // A stdin read may still be parked on the blocking pool.
    runtime.shutdown_background();
    result
}

fn emit(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(kind = event.kind(), "timer event");
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

async fn run_loop(mut session: SessionController) -> Result<(), Box<dyn std::error::Error>> {
    if !session.store_mut().hint_shown(SHORTCUTS_HINT)? {
        eprintln!("shortcuts: p/space = start/pause, s/x = stop, m = sound, b/q = back");
        session.store_mut().mark_hint_shown(SHORTCUTS_HINT)?;
    }

    let show_clock = std::io::stderr().is_terminal();
    let result = drive(&mut session, show_clock).await;
    if show_clock {
        eprintln!();
    }

    leave(&mut session, result, now_ms())
}

/// Leave any live session paused, even when the loop failed, then report
/// the loop's own error first.
fn leave(
    session: &mut SessionController,
    result: Result<(), Box<dyn std::error::Error>>,
    now: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let unloaded = session.unload(now);
    result?;
    unloaded?;
    if session.engine().state() != TimerState::Idle {
        emit(&session.status(now))?;
    }
    Ok(())
}

/// Handle ticks and shortcuts until the session ends or the user leaves.
async fn drive(
    session: &mut SessionController,
    show_clock: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = CancellationToken::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = &mut ctrl_c => {
                tracing::debug!("interrupted");
                break;
            }
            _ = ticker.tick() => {
                let now = now_ms();
                for event in session.tick(now)? {
                    emit(&event)?;
                    if matches!(event, Event::TimerCompleted { .. }) {
                        token.cancel();
                    }
                }
                if show_clock && session.engine().is_active() {
                    let engine = session.engine();
                    eprint!(
                        "\r{} {:<8}",
                        format_clock(engine.remaining_secs(now)),
                        engine.state().to_string()
                    );
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed: same as going back
                    break;
                };
                let now = now_ms();
                match parse_shortcut(&line) {
                    Some(Shortcut::Toggle) => match session.start_or_toggle(now) {
                        Ok(event) => emit(&event)?,
                        Err(e) => eprintln!("error: {e}"),
                    },
                    Some(Shortcut::Stop) => match session.stop(now) {
                        Ok(events) => {
                            for event in &events {
                                emit(event)?;
                            }
                            token.cancel();
                        }
                        Err(e) => eprintln!("error: {e}"),
                    },
                    Some(Shortcut::Sound) => {
                        let enabled = session.toggle_sound()?;
                        let toggled = serde_json::json!({
                            "type": "SoundToggled",
                            "enabled": enabled,
                        });
                        println!("{toggled}");
                    }
                    Some(Shortcut::Back) => break,
                    None => {
                        if !line.trim().is_empty() {
                            eprintln!("unknown shortcut: {}", line.trim());
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
