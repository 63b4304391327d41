//! Focus cycle state machine.
//!
//! ```text
//!            work done (session + 1 < N)
//!   Work ─────────────────────────────────► Break
//!    ▲  │                                     │
//!    │  │ work done (session + 1 >= N)        │ break done
//!    │  ▼                                     │
//!    │ LongBreak ─────────────────────────────┤
//!    │        long break done (session = 0)   │
//!    └────────────────────────────────────────┘
//! ```
//!
//! Deep focus runs a single work phase and always drops back to idle.
//!
//! Operations never perform I/O. Anything the outside world must do in
//! response (arming the background alarm, cancelling it, playing the alarm
//! sound) is returned as a list of [`Effect`]s. Calls that make no sense in
//! the current state return an empty list and leave the state untouched.

use crate::preset::FocusPreset;
use crate::state::{Phase, TimerMode, TimerState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Effect {
    /// Arm the background alarm for `phase` ending at `end_timestamp_ms`.
    /// Replaces any alarm armed earlier.
    Schedule {
        mode: TimerMode,
        phase: Phase,
        end_timestamp_ms: u64,
    },
    /// Drop the background alarm without firing it.
    Cancel,
    /// The given phase just ended.
    PlayAlarm(Phase),
}

pub type Effects = Vec<Effect>;

pub struct TimerEngine {
    state: TimerState,
    preset: FocusPreset,
}

impl TimerEngine {
    pub fn new(preset: FocusPreset) -> Self {
        let state = TimerState {
            total_duration_secs: preset.duration_secs(Phase::Work),
            ..TimerState::default()
        };
        Self { state, preset }
    }

    /// Resume from a persisted state. An idle state with no duration yet is
    /// filled in from the preset so the display has something to show.
    pub fn restore(mut state: TimerState, preset: FocusPreset) -> Self {
        if state.is_idle() && state.total_duration_secs == 0 {
            state.total_duration_secs = preset.duration_secs(state.phase);
        }
        Self { state, preset }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn preset(&self) -> &FocusPreset {
        &self.preset
    }

    /// Replace the preset. A phase already running keeps its duration; an
    /// idle pomodoro picks up the new length for its queued phase.
    pub fn set_preset(&mut self, preset: FocusPreset) {
        self.preset = preset;
        if self.state.is_idle() && self.state.mode == TimerMode::Pomodoro {
            self.state.total_duration_secs = self.preset.duration_secs(self.state.phase);
        }
    }

    pub fn time_remaining_secs(&self, now_ms: u64) -> u64 {
        self.state.time_remaining_secs(now_ms)
    }

    /// Begin a work phase. `explicit_secs` overrides the preset length; a
    /// zero override is ignored.
    pub fn start_timer(
        &mut self,
        mode: TimerMode,
        explicit_secs: Option<u64>,
        now_ms: u64,
    ) -> Effects {
        if self.state.is_running {
            return Effects::new();
        }
        let total = explicit_secs
            .filter(|secs| *secs > 0)
            .unwrap_or_else(|| self.preset.duration_secs(Phase::Work));
        self.state.mode = mode;
        self.arm(Phase::Work, total, now_ms)
    }

    /// Begin the phase left queued by a completion that did not auto-advance.
    pub fn start_queued_phase(&mut self, now_ms: u64) -> Effects {
        if self.state.is_running {
            return Effects::new();
        }
        let phase = self.state.phase;
        let total = match self.state.total_duration_secs {
            0 => self.preset.duration_secs(phase),
            secs => secs,
        };
        self.arm(phase, total, now_ms)
    }

    pub fn pause_timer(&mut self, now_ms: u64) -> Effects {
        if !self.state.is_running || self.state.is_paused {
            return Effects::new();
        }
        self.state.accumulated_elapsed_ms = self
            .state
            .accumulated_elapsed_ms
            .saturating_add(now_ms.saturating_sub(self.state.start_timestamp_ms));
        self.state.is_paused = true;
        vec![Effect::Cancel]
    }

    pub fn resume_timer(&mut self, now_ms: u64) -> Effects {
        if !self.state.is_running || !self.state.is_paused {
            return Effects::new();
        }
        self.state.start_timestamp_ms = now_ms;
        self.state.is_paused = false;
        self.current_schedule(now_ms).into_iter().collect()
    }

    /// Back to an idle work phase. The session count is kept.
    pub fn reset_timer(&mut self) -> Effects {
        self.state = TimerState {
            mode: self.state.mode,
            current_session: self.state.current_session,
            total_duration_secs: self.preset.duration_secs(Phase::Work),
            ..TimerState::default()
        };
        vec![Effect::Cancel]
    }

    /// Forget everything, including the session count.
    pub fn clear(&mut self) -> Effects {
        self.state = TimerState {
            total_duration_secs: self.preset.duration_secs(Phase::Work),
            ..TimerState::default()
        };
        vec![Effect::Cancel]
    }

    /// Finish the current phase once its time is used up and move to the
    /// next one. Calling this again for the same phase end does nothing,
    /// because the state it checks has already moved on.
    pub fn complete_session(&mut self, now_ms: u64) -> Effects {
        if !self.state.is_expired(now_ms) {
            return Effects::new();
        }
        let ended = self.state.phase;
        let mut effects = vec![Effect::PlayAlarm(ended)];

        if self.state.mode == TimerMode::DeepFocus {
            self.go_idle(Phase::Work, self.state.total_duration_secs, now_ms);
            return effects;
        }

        let next = self.advance_cycle(ended);
        let total = self.preset.duration_secs(next);
        if self.preset.auto_starts(next) {
            effects.extend(self.arm(next, total, now_ms));
        } else {
            self.go_idle(next, total, now_ms);
        }
        effects
    }

    /// Re-anchor a running phase whose start lies in the future, which only
    /// happens when the wall clock moved backwards. Banked time is kept.
    pub fn rebase_clock(&mut self, now_ms: u64) -> Effects {
        if !self.state.is_running
            || self.state.is_paused
            || now_ms >= self.state.start_timestamp_ms
        {
            return Effects::new();
        }
        self.state.start_timestamp_ms = now_ms;
        self.current_schedule(now_ms).into_iter().collect()
    }

    /// The schedule request matching the running phase, if it is counting.
    pub fn current_schedule(&self, now_ms: u64) -> Option<Effect> {
        self.state
            .end_timestamp_ms(now_ms)
            .map(|end_timestamp_ms| Effect::Schedule {
                mode: self.state.mode,
                phase: self.state.phase,
                end_timestamp_ms,
            })
    }

    fn advance_cycle(&mut self, ended: Phase) -> Phase {
        match ended {
            Phase::Work => {
                self.state.current_session += 1;
                if self.state.current_session >= self.preset.sessions_before_long_break.max(1) {
                    Phase::LongBreak
                } else {
                    Phase::Break
                }
            }
            Phase::LongBreak => {
                self.state.current_session = 0;
                Phase::Work
            }
            Phase::Break => Phase::Work,
        }
    }

    fn arm(&mut self, phase: Phase, total_secs: u64, now_ms: u64) -> Effects {
        self.state.phase = phase;
        self.state.total_duration_secs = total_secs;
        self.state.start_timestamp_ms = now_ms;
        self.state.phase_started_at_ms = now_ms;
        self.state.accumulated_elapsed_ms = 0;
        self.state.is_running = true;
        self.state.is_paused = false;
        vec![Effect::Schedule {
            mode: self.state.mode,
            phase,
            end_timestamp_ms: now_ms.saturating_add(total_secs.saturating_mul(1000)),
        }]
    }

    fn go_idle(&mut self, phase: Phase, total_secs: u64, now_ms: u64) {
        self.state.phase = phase;
        self.state.total_duration_secs = total_secs;
        self.state.start_timestamp_ms = now_ms;
        self.state.accumulated_elapsed_ms = 0;
        self.state.is_running = false;
        self.state.is_paused = false;
    }
}
