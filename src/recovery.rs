//! Catch-up after the foreground was away.
//!
//! Runs on launch and whenever the foreground becomes active again. The
//! persisted anchor is enough to tell whether the phase ended while nobody
//! was looking; if it did, the phase is completed here exactly once. The
//! [`PhaseEndAck`] marker keeps repeated runs from replaying the alarm.

use serde::{Deserialize, Serialize};
use timer_core::{Phase, TimerState};

use crate::controller::FocusController;

/// Identifies one handled phase end.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseEndAck {
    pub phase: Phase,
    pub phase_started_at_ms: u64,
}

impl PhaseEndAck {
    pub fn for_state(state: &TimerState) -> Self {
        Self {
            phase: state.phase,
            phase_started_at_ms: state.phase_started_at_ms,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecoveryOutcome {
    Idle,
    Paused,
    /// Still counting; the background alarm was re-sent.
    Rearmed { remaining_secs: u64 },
    /// The phase ended unobserved and has now been completed.
    Completed { phase: Phase },
    /// The wall clock was behind the persisted anchor.
    ClockSkew,
}

pub fn reconcile(ctl: &mut FocusController) -> RecoveryOutcome {
    let now = ctl.now_ms();
    let state = ctl.state();
    if state.is_idle() {
        return RecoveryOutcome::Idle;
    }
    if !state.is_paused && now < state.start_timestamp_ms {
        log::warn!(
            "clock is {} ms behind the timer anchor, re-anchoring",
            state.start_timestamp_ms - now
        );
        ctl.rebase_clock();
        return RecoveryOutcome::ClockSkew;
    }
    if state.is_expired(now) {
        let phase = state.phase;
        log::info!("{} ended while away", phase.label());
        ctl.complete_session();
        return RecoveryOutcome::Completed { phase };
    }
    if state.is_paused {
        return RecoveryOutcome::Paused;
    }
    ctl.rearm_background();
    RecoveryOutcome::Rearmed {
        remaining_secs: ctl.time_remaining_secs(),
    }
}
