use serde::{Deserialize, Serialize};

/// Pomodoro sub-state: either focusing or on a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Focus,
    Break,
}

/// Emitted by [`PomodoroSession::tick`] when a countdown reaches zero
/// and the session hands off to the other phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    FocusComplete,
    BreakOver,
}

/// Wire-friendly view of the session, returned to control surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSnapshot {
    pub running: bool,
    pub on_break: bool,
    pub remaining_seconds: u32,
    pub focus_seconds: u32,
    pub break_seconds: u32,
}

/// The pomodoro countdown state machine.
///
/// While running, the owning coordinator drives it at 1 Hz through
/// [`tick`](Self::tick). Phases alternate strictly Focus, Break, Focus;
/// stopping always discards progress and parks the session at the start
/// of a full focus phase.
#[derive(Debug)]
pub struct PomodoroSession {
    running: bool,
    phase: Phase,
    remaining_seconds: u32,
    focus_seconds: u32,
    break_seconds: u32,
}

impl PomodoroSession {
    #[must_use]
    pub fn new(focus_seconds: u32, break_seconds: u32) -> Self {
        Self {
            running: false,
            phase: Phase::Focus,
            remaining_seconds: focus_seconds,
            focus_seconds,
            break_seconds,
        }
    }

    /// Begin (or resume) the countdown. Returns false when the session
    /// was already running; starting twice never arms a second timer.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Halt the countdown and reset to a full focus phase. Break
    /// progress is discarded too. No-op while idle.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.phase = Phase::Focus;
        self.remaining_seconds = self.focus_seconds;
    }

    /// Advance the countdown by one second.
    ///
    /// Reaching zero switches phase, reloads the countdown for the new
    /// phase and reports the handoff; the session keeps running.
    pub fn tick(&mut self) -> Option<PhaseEvent> {
        if !self.running {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return None;
        }
        match self.phase {
            Phase::Focus => {
                self.phase = Phase::Break;
                self.remaining_seconds = self.break_seconds;
                Some(PhaseEvent::FocusComplete)
            }
            Phase::Break => {
                self.phase = Phase::Focus;
                self.remaining_seconds = self.focus_seconds;
                Some(PhaseEvent::BreakOver)
            }
        }
    }

    /// Adopt new configured durations. Only an idle session is
    /// retargeted; a running countdown keeps its in-flight durations
    /// until it is stopped.
    pub fn apply_durations(&mut self, focus_seconds: u32, break_seconds: u32) {
        if self.running {
            return;
        }
        self.focus_seconds = focus_seconds;
        self.break_seconds = break_seconds;
        self.phase = Phase::Focus;
        self.remaining_seconds = focus_seconds;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Length of the focus phase, used for the daily-stats credit.
    #[must_use]
    pub fn focus_seconds(&self) -> u32 {
        self.focus_seconds
    }

    #[must_use]
    pub fn snapshot(&self) -> PomodoroSnapshot {
        PomodoroSnapshot {
            running: self.running,
            on_break: self.phase == Phase::Break,
            remaining_seconds: self.remaining_seconds,
            focus_seconds: self.focus_seconds,
            break_seconds: self.break_seconds,
        }
    }
}
