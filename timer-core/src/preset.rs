use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Phase;

pub const MAX_PHASE_MINUTES: u32 = 600;
pub const MAX_SESSIONS_BEFORE_LONG_BREAK: u32 = 12;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlarmSound {
    #[default]
    Bell,
    Chime,
    Digital,
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetError {
    #[error("{field} must be between 1 and {max} minutes, got {value}")]
    Duration {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error(
        "sessions before long break must be between 1 and {max}, got {0}",
        max = MAX_SESSIONS_BEFORE_LONG_BREAK
    )]
    Sessions(u32),
}

/// Durations and auto-advance behaviour for a focus cycle.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusPreset {
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_before_long_break: u32,
    pub auto_start_breaks: bool,
    pub auto_start_work: bool,
    pub alarm_sound: AlarmSound,
}

impl Default for FocusPreset {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
            long_break_minutes: 15,
            sessions_before_long_break: 4,
            auto_start_breaks: true,
            auto_start_work: false,
            alarm_sound: AlarmSound::Bell,
        }
    }
}

impl FocusPreset {
    pub fn duration_secs(&self, phase: Phase) -> u64 {
        let minutes = match phase {
            Phase::Work => self.work_minutes,
            Phase::Break => self.break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        };
        u64::from(minutes) * 60
    }

    pub fn auto_starts(&self, phase: Phase) -> bool {
        match phase {
            Phase::Work => self.auto_start_work,
            Phase::Break | Phase::LongBreak => self.auto_start_breaks,
        }
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        for (field, value) in [
            ("work", self.work_minutes),
            ("break", self.break_minutes),
            ("long break", self.long_break_minutes),
        ] {
            if value == 0 || value > MAX_PHASE_MINUTES {
                return Err(PresetError::Duration {
                    field,
                    value,
                    max: MAX_PHASE_MINUTES,
                });
            }
        }
        if self.sessions_before_long_break == 0
            || self.sessions_before_long_break > MAX_SESSIONS_BEFORE_LONG_BREAK
        {
            return Err(PresetError::Sessions(self.sessions_before_long_break));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preset_is_classic_pomodoro() {
        let preset = FocusPreset::default();
        assert_eq!(preset.duration_secs(Phase::Work), 1500);
        assert_eq!(preset.duration_secs(Phase::Break), 300);
        assert_eq!(preset.duration_secs(Phase::LongBreak), 900);
        assert!(preset.validate().is_ok());
    }

    #[test]
    fn auto_start_flags_map_to_phase_kind() {
        let preset = FocusPreset {
            auto_start_breaks: true,
            auto_start_work: false,
            ..FocusPreset::default()
        };
        assert!(preset.auto_starts(Phase::Break));
        assert!(preset.auto_starts(Phase::LongBreak));
        assert!(!preset.auto_starts(Phase::Work));
    }

    #[test]
    fn rejects_zero_and_oversized_values() {
        let zero_work = FocusPreset {
            work_minutes: 0,
            ..FocusPreset::default()
        };
        assert_eq!(
            zero_work.validate(),
            Err(PresetError::Duration {
                field: "work",
                value: 0,
                max: MAX_PHASE_MINUTES
            })
        );

        let long_break = FocusPreset {
            long_break_minutes: 601,
            ..FocusPreset::default()
        };
        assert!(long_break.validate().is_err());

        let sessions = FocusPreset {
            sessions_before_long_break: 0,
            ..FocusPreset::default()
        };
        assert_eq!(sessions.validate(), Err(PresetError::Sessions(0)));
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let preset: FocusPreset =
            serde_json::from_str(r#"{"workMinutes":50,"alarmSound":"chime"}"#).unwrap();
        assert_eq!(preset.work_minutes, 50);
        assert_eq!(preset.alarm_sound, AlarmSound::Chime);
        assert_eq!(preset.break_minutes, 5);
    }
}
