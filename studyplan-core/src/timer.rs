//! Focus timer state machine (Pomodoro style).
//!
//! Pure and clock-free: the caller drives [`FocusTimer::tick`] once per
//! second. See `studyplan-cli`'s focus runner for the async driver.

use serde::Serialize;

pub const FOCUS_SECONDS: u32 = 25 * 60;
pub const BREAK_SECONDS: u32 = 5 * 60;

/// Minutes credited for one finished focus interval.
pub const FOCUS_CREDIT_MINUTES: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Focus,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    FocusCompleted { minutes: u32 },
    BreakCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTimer {
    mode: TimerMode,
    active: bool,
    remaining: u32,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusTimer {
    pub fn new() -> Self {
        Self {
            mode: TimerMode::Focus,
            active: false,
            remaining: FOCUS_SECONDS,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    /// Pause or resume. Mode and remaining time are untouched.
    pub fn toggle(&mut self) {
        self.active = !self.active;
    }

    /// Back to an idle focus interval. No credit for the discarded interval.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance one second. Returns an event when an interval finishes; the
    /// next interval starts paused.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.active {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return None;
        }

        self.active = false;
        match self.mode {
            TimerMode::Focus => {
                self.mode = TimerMode::Break;
                self.remaining = BREAK_SECONDS;
                Some(TimerEvent::FocusCompleted {
                    minutes: FOCUS_CREDIT_MINUTES,
                })
            }
            TimerMode::Break => {
                self.mode = TimerMode::Focus;
                self.remaining = FOCUS_SECONDS;
                Some(TimerEvent::BreakCompleted)
            }
        }
    }

    /// `MM:SS` of the remaining time.
    pub fn format_clock(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }

    /// Share of the current interval already elapsed, 0..=100.
    pub fn progress_percent(&self) -> u32 {
        let total = match self.mode {
            TimerMode::Focus => FOCUS_SECONDS,
            TimerMode::Break => BREAK_SECONDS,
        };
        100 - (self.remaining * 100 / total)
    }
}
