//! Countdown timer state machine

use serde::{Deserialize, Serialize};

/// Minimum configurable duration in minutes
pub const MIN_DURATION_MINUTES: u64 = 1;
/// Maximum configurable duration in minutes
pub const MAX_DURATION_MINUTES: u64 = 60;
/// Duration used when the timer is first created
pub const DEFAULT_DURATION_MINUTES: u64 = 5;

/// Phase of the countdown, derived from the raw state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Expired,
}

/// Outcome of applying a scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick arrived while the timer was not running; nothing changed
    Ignored,
    /// One second elapsed, countdown still going
    Decremented,
    /// The countdown just reached zero and stopped
    Expired,
}

/// Countdown timer state
///
/// Invariants: `remaining_seconds <= duration_seconds` always holds;
/// `running` is only true while `remaining_seconds > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerState {
    pub duration_seconds: u64,
    pub remaining_seconds: u64,
    pub running: bool,
}

impl TimerState {
    /// Create a new timer at the default duration, not running
    pub fn new() -> Self {
        Self::with_duration(DEFAULT_DURATION_MINUTES)
    }

    /// Create a timer configured for the given number of minutes (clamped)
    pub fn with_duration(minutes: u64) -> Self {
        let minutes = minutes.clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES);
        Self {
            duration_seconds: minutes * 60,
            remaining_seconds: minutes * 60,
            running: false,
        }
    }

    /// Set the countdown duration in minutes
    ///
    /// Out-of-range input is clamped to the nearest valid bound and absent
    /// input falls back to the minimum; invalid input is normalized rather
    /// than rejected. Resets the remaining time and stops the countdown.
    pub fn set_duration(&mut self, minutes: Option<i64>) {
        let minutes = match minutes {
            Some(m) if m < MIN_DURATION_MINUTES as i64 => MIN_DURATION_MINUTES,
            Some(m) if m > MAX_DURATION_MINUTES as i64 => MAX_DURATION_MINUTES,
            Some(m) => m as u64,
            None => MIN_DURATION_MINUTES,
        };
        self.duration_seconds = minutes * 60;
        self.remaining_seconds = self.duration_seconds;
        self.running = false;
    }

    /// Toggle between running and paused
    ///
    /// A no-op once the countdown has expired: the timer cannot start at
    /// zero, only `reset` or `set_duration` can leave the expired state.
    pub fn start_pause(&mut self) {
        if self.remaining_seconds == 0 {
            return;
        }
        self.running = !self.running;
    }

    /// Stop the countdown and restore the configured duration (idempotent)
    pub fn reset(&mut self) {
        if self.at_initial_state() {
            return;
        }
        self.running = false;
        self.remaining_seconds = self.duration_seconds;
    }

    /// Apply one scheduler tick
    ///
    /// Ignored unless the timer is running, so a stray tick arriving after
    /// a pause, reset, or expiry cannot decrement the countdown.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Ignored;
        }
        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            self.running = false;
            TickOutcome::Expired
        } else {
            TickOutcome::Decremented
        }
    }

    /// Derive the current phase
    pub fn phase(&self) -> TimerPhase {
        if self.running {
            TimerPhase::Running
        } else if self.remaining_seconds == 0 {
            TimerPhase::Expired
        } else {
            TimerPhase::Idle
        }
    }

    /// Whether start is currently possible
    pub fn can_start(&self) -> bool {
        self.remaining_seconds > 0
    }

    /// Whether the timer has moved away from its initial state
    pub fn can_reset(&self) -> bool {
        !self.at_initial_state()
    }

    fn at_initial_state(&self) -> bool {
        !self.running && self.remaining_seconds == self.duration_seconds
    }

    /// Remaining time as zero-padded MM:SS
    pub fn formatted_time(&self) -> String {
        let mins = self.remaining_seconds / 60;
        let secs = self.remaining_seconds % 60;
        format!("{:02}:{:02}", mins, secs)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}
