use std::sync::Arc;

use timer_core::{Effect, Effects, FocusPreset, Phase, TimerEngine, TimerMode, TimerState};

use crate::alerts::AlarmEffect;
use crate::bridge::NotificationBridge;
use crate::clock::Clock;
use crate::recovery::PhaseEndAck;
use crate::storage::TimerStorage;

/// Owns the single timer state of the foreground and carries out the
/// effects the engine asks for. Every mutation is persisted before the
/// call returns.
pub struct FocusController {
    engine: TimerEngine,
    bridge: NotificationBridge,
    alarm: Box<dyn AlarmEffect>,
    storage: TimerStorage,
    clock: Arc<dyn Clock>,
}

impl FocusController {
    pub fn load(
        storage: TimerStorage,
        bridge: NotificationBridge,
        alarm: Box<dyn AlarmEffect>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let preset = storage.load_preset();
        let engine = match storage.load_timer_state() {
            Some(state) => TimerEngine::restore(state, preset),
            None => TimerEngine::new(preset),
        };
        Self {
            engine,
            bridge,
            alarm,
            storage,
            clock,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn state(&self) -> &TimerState {
        self.engine.state()
    }

    pub fn preset(&self) -> &FocusPreset {
        self.engine.preset()
    }

    pub fn time_remaining_secs(&self) -> u64 {
        self.engine.time_remaining_secs(self.now_ms())
    }

    pub fn progress_fraction(&self) -> f32 {
        self.state().progress_fraction(self.now_ms())
    }

    pub fn start_timer(&mut self, mode: TimerMode, explicit_secs: Option<u64>) {
        let effects = self.engine.start_timer(mode, explicit_secs, self.now_ms());
        self.commit(effects);
    }

    pub fn start_queued_phase(&mut self) {
        let effects = self.engine.start_queued_phase(self.now_ms());
        self.commit(effects);
    }

    pub fn pause_timer(&mut self) {
        let effects = self.engine.pause_timer(self.now_ms());
        self.commit(effects);
    }

    pub fn resume_timer(&mut self) {
        let effects = self.engine.resume_timer(self.now_ms());
        self.commit(effects);
    }

    pub fn reset_timer(&mut self) {
        let effects = self.engine.reset_timer();
        self.commit(effects);
    }

    /// Logout-equivalent wipe: idle state, default preset, no markers.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.engine.set_preset(FocusPreset::default());
        let effects = self.engine.clear();
        self.commit(effects);
    }

    pub fn update_preset(&mut self, preset: FocusPreset) {
        self.engine.set_preset(preset);
        self.storage.save_preset(self.engine.preset());
        self.persist();
    }

    /// Finish the current phase if its time is up. Returns whether a phase
    /// was completed.
    ///
    /// The acknowledgement marker is checked before the alarm plays, so a
    /// phase end that was already handled (for example by a run whose state
    /// write did not land) advances the state without a second alarm.
    pub fn complete_session(&mut self) -> bool {
        let now = self.now_ms();
        if !self.state().is_expired(now) {
            return false;
        }
        let ack = PhaseEndAck::for_state(self.state());
        let already_acked = self.storage.load_phase_end_ack().as_ref() == Some(&ack);

        let mut effects = self.engine.complete_session(now);
        if already_acked {
            log::info!("{} end already acknowledged", ack.phase.label());
            effects.retain(|e| !matches!(e, Effect::PlayAlarm(_)));
        } else {
            self.storage.save_phase_end_ack(&ack);
        }
        self.commit(effects);
        true
    }

    /// Foreground tick: picks up changes made by other processes, completes
    /// an expired phase and returns the seconds left for display.
    pub fn poll(&mut self) -> u64 {
        self.sync_from_storage();
        self.complete_session();
        self.time_remaining_secs()
    }

    /// Adopt a timer state or preset that another process persisted since
    /// our last write, and bring the background scheduler in line with it.
    /// Returns whether anything changed.
    pub fn sync_from_storage(&mut self) -> bool {
        let Some(stored) = self.storage.load_timer_state() else {
            return false;
        };
        let engine = TimerEngine::restore(stored, self.storage.load_preset());
        if engine.state() == self.engine.state() && engine.preset() == self.engine.preset() {
            return false;
        }
        log::info!("timer changed by another process");
        self.engine = engine;
        let effect = self
            .engine
            .current_schedule(self.now_ms())
            .unwrap_or(Effect::Cancel);
        self.apply(effect);
        true
    }

    /// Re-anchor after the wall clock went backwards. Returns whether the
    /// state changed.
    pub fn rebase_clock(&mut self) -> bool {
        let effects = self.engine.rebase_clock(self.now_ms());
        let changed = !effects.is_empty();
        self.commit(effects);
        changed
    }

    /// Send the background scheduler the end of the running phase again.
    pub fn rearm_background(&mut self) -> bool {
        if !self.bridge.is_connected() {
            return false;
        }
        match self.engine.current_schedule(self.now_ms()) {
            Some(effect) => {
                self.apply(effect);
                true
            }
            None => false,
        }
    }

    fn commit(&mut self, effects: Effects) {
        if effects.is_empty() {
            return;
        }
        for effect in effects {
            self.apply(effect);
        }
        self.persist();
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Schedule {
                mode,
                phase,
                end_timestamp_ms,
            } => {
                let (title, body) = notification_text(mode, phase);
                self.bridge
                    .schedule(end_timestamp_ms, title.to_string(), body.to_string());
            }
            Effect::Cancel => self.bridge.cancel(),
            Effect::PlayAlarm(phase) => {
                log::info!("{} complete", phase.label());
                let sound = self.engine.preset().alarm_sound;
                if let Err(e) = self.alarm.play(phase, sound) {
                    log::warn!("alarm failed: {e}");
                }
            }
        }
    }

    fn persist(&self) {
        self.storage.save_timer_state(self.engine.state());
    }
}

/// Title and body shown when `phase` runs out.
pub fn notification_text(mode: TimerMode, phase: Phase) -> (&'static str, &'static str) {
    match (mode, phase) {
        (TimerMode::DeepFocus, _) => ("Deep focus complete", "Nice work. Take a breather."),
        (TimerMode::Pomodoro, Phase::Work) => ("Focus session complete", "Time for a break."),
        (TimerMode::Pomodoro, Phase::Break) => ("Break over", "Ready to focus again?"),
        (TimerMode::Pomodoro, Phase::LongBreak) => {
            ("Long break over", "A fresh cycle starts now.")
        }
    }
}
