//! Rest and completion cues.

use std::io::Write;

use crate::error::NotifyError;

/// Something the user should notice while a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    /// A rest begins in `in_secs` seconds.
    RestImminent { in_secs: u64 },
    RestStarted { rest_secs: u64 },
    RestEnded,
    SessionCompleted { tag: String },
}

impl Cue {
    pub fn message(&self) -> String {
        match self {
            Cue::RestImminent { in_secs } => format!("Rest in {in_secs}s"),
            Cue::RestStarted { rest_secs } => {
                format!("Close your eyes for {rest_secs} seconds")
            }
            Cue::RestEnded => "Rest over, back to studying".to_string(),
            Cue::SessionCompleted { tag } => format!("Session complete: {tag}"),
        }
    }
}

/// Delivers cues to the user. Failures are reported but never fatal:
/// the session controller logs and drops them.
pub trait Notifier: Send {
    /// Unique identifier (e.g. "terminal").
    fn name(&self) -> &str;

    /// Show `cue`; play a sound as well when `sound` is true.
    fn notify(&mut self, cue: &Cue, sound: bool) -> Result<(), NotifyError>;
}

/// Writes cue messages to a stream, ringing the terminal bell for sound.
pub struct TerminalNotifier<W: Write + Send = std::io::Stderr> {
    out: W,
    bell: bool,
}

impl TerminalNotifier {
    pub fn stderr(bell: bool) -> Self {
        Self::new(std::io::stderr(), bell)
    }
}

impl<W: Write + Send> TerminalNotifier<W> {
    pub fn new(out: W, bell: bool) -> Self {
        Self { out, bell }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Notifier for TerminalNotifier<W> {
    fn name(&self) -> &str {
        "terminal"
    }

    fn notify(&mut self, cue: &Cue, sound: bool) -> Result<(), NotifyError> {
        if sound && self.bell {
            self.out.write_all(b"\x07")?;
        }
        writeln!(self.out, "{}", cue.message())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Drops every cue.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn name(&self) -> &str {
        "null"
    }

    fn notify(&mut self, _cue: &Cue, _sound: bool) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_rings_bell_only_with_sound() {
        let mut quiet = TerminalNotifier::new(Vec::new(), true);
        quiet.notify(&Cue::RestEnded, false).unwrap();
        assert_eq!(quiet.into_inner(), b"Rest over, back to studying\n");

        let mut loud = TerminalNotifier::new(Vec::new(), true);
        loud.notify(&Cue::RestStarted { rest_secs: 10 }, true).unwrap();
        let out = loud.into_inner();
        assert_eq!(out[0], 0x07);
        assert!(String::from_utf8_lossy(&out).contains("10 seconds"));
    }

    #[test]
    fn bell_can_be_disabled() {
        let mut notifier = TerminalNotifier::new(Vec::new(), false);
        notifier
            .notify(&Cue::SessionCompleted { tag: "Java".into() }, true)
            .unwrap();
        assert_eq!(notifier.into_inner(), b"Session complete: Java\n");
    }
}
