//! Active-time tracking for the current session.
//!
//! ```text
//! Idle -> Running -> Idle
//! ```
//!
//! Time accrues in whole ticks supplied by the caller; the timer never reads
//! a clock itself. Auto-pause is observed by `check_inactivity`, so a pause can
//! lag the timeout by up to one check interval.

use serde::Serialize;

pub const TICK_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
}

#[derive(Debug, Clone)]
pub struct ActivityTimer {
    elapsed_ms: u64,
    state: TimerState,
    last_activity_at: i64,
}

impl ActivityTimer {
    pub fn new(now_ms: i64) -> Self {
        Self {
            elapsed_ms: 0,
            state: TimerState::Idle,
            last_activity_at: now_ms,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// A counted action: refreshes activity and starts the timer if idle.
    pub fn touch(&mut self, now_ms: i64) {
        self.last_activity_at = now_ms;
        self.state = TimerState::Running;
    }

    /// Activity that keeps a running timer alive without starting an idle one.
    pub fn observe_activity(&mut self, now_ms: i64) {
        self.last_activity_at = now_ms;
    }

    pub fn toggle(&mut self, now_ms: i64) -> TimerState {
        self.last_activity_at = now_ms;
        self.state = match self.state {
            TimerState::Idle => TimerState::Running,
            TimerState::Running => TimerState::Idle,
        };
        self.state
    }

    pub fn pause(&mut self) {
        self.state = TimerState::Idle;
    }

    /// Accrues one tick if running. Returns whether elapsed time changed.
    pub fn tick(&mut self) -> bool {
        if self.is_running() {
            self.elapsed_ms += TICK_MS;
            true
        } else {
            false
        }
    }

    /// Pauses the timer when no activity was seen for longer than `timeout_ms`.
    pub fn check_inactivity(&mut self, now_ms: i64, timeout_ms: u64) -> bool {
        if !self.is_running() {
            return false;
        }
        let idle_for = now_ms.saturating_sub(self.last_activity_at);
        if idle_for > timeout_ms as i64 {
            self.state = TimerState::Idle;
            return true;
        }
        false
    }

    /// Restores the elapsed total of a session resumed from history.
    pub fn restore(&mut self, elapsed_ms: u64) {
        self.elapsed_ms = elapsed_ms;
        self.state = TimerState::Idle;
    }

    pub fn reset(&mut self) {
        self.elapsed_ms = 0;
        self.state = TimerState::Idle;
    }
}
