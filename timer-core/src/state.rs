use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Pomodoro,
    DeepFocus,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Work,
    Break,
    LongBreak,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::Break => "Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

/// Persisted countdown anchor for the current phase.
///
/// Remaining time is always derived from `start_timestamp_ms` and the banked
/// `accumulated_elapsed_ms`, never from a decremented counter, so a process
/// that was suspended for ten minutes reads the correct value on its first
/// look at the clock.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerState {
    pub mode: TimerMode,
    pub phase: Phase,
    pub is_running: bool,
    pub is_paused: bool,
    /// Epoch ms at which the current run segment began (start or resume).
    pub start_timestamp_ms: u64,
    /// Elapsed time banked by earlier pauses of this phase.
    pub accumulated_elapsed_ms: u64,
    pub total_duration_secs: u64,
    /// Completed work phases since the last long break.
    pub current_session: u32,
    /// Epoch ms at which this phase was first armed. Stable across
    /// pause/resume, so it identifies one phase run.
    pub phase_started_at_ms: u64,
}

impl TimerState {
    pub fn is_idle(&self) -> bool {
        !self.is_running
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        if self.is_running && !self.is_paused {
            self.accumulated_elapsed_ms
                .saturating_add(now_ms.saturating_sub(self.start_timestamp_ms))
        } else {
            self.accumulated_elapsed_ms
        }
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_secs.saturating_mul(1000)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.total_duration_ms().saturating_sub(self.elapsed_ms(now_ms))
    }

    /// Whole seconds left, rounded up so the display only reads zero once
    /// the phase has actually ended.
    pub fn time_remaining_secs(&self, now_ms: u64) -> u64 {
        self.remaining_ms(now_ms).div_ceil(1000)
    }

    /// A phase run whose full duration has been consumed but which has not
    /// been completed yet.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.is_running && self.remaining_ms(now_ms) == 0
    }

    /// Wall-clock instant the running phase will end, if it is counting.
    pub fn end_timestamp_ms(&self, now_ms: u64) -> Option<u64> {
        if self.is_running && !self.is_paused {
            Some(now_ms.saturating_add(self.remaining_ms(now_ms)))
        } else {
            None
        }
    }

    pub fn progress_fraction(&self, now_ms: u64) -> f32 {
        let target = self.total_duration_ms();
        if target == 0 {
            return 1.0;
        }
        let frac = self.elapsed_ms(now_ms) as f32 / target as f32;
        frac.min(1.0)
    }
}
