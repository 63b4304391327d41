use std::io::Write;

use thiserror::Error;
use timer_core::{AlarmSound, Phase};

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("alarm output failed: {0}")]
    Output(#[from] std::io::Error),
}

/// Audible feedback for a finished phase. Best effort: callers log the
/// error and carry on with the phase transition.
pub trait AlarmEffect {
    fn play(&mut self, phase: Phase, sound: AlarmSound) -> Result<(), AlarmError>;
}

/// Rings the terminal bell; the number of rings tells the sounds apart.
pub struct TerminalAlarm;

impl AlarmEffect for TerminalAlarm {
    fn play(&mut self, phase: Phase, sound: AlarmSound) -> Result<(), AlarmError> {
        let rings = match sound {
            AlarmSound::Silent => return Ok(()),
            AlarmSound::Bell => 1,
            AlarmSound::Chime => 2,
            AlarmSound::Digital => 3,
        };
        let mut out = std::io::stdout().lock();
        out.write_all("\x07".repeat(rings).as_bytes())?;
        out.flush()?;
        log::debug!("alarm {:?} played for {}", sound, phase.label());
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    pub struct RecordingAlarm {
        pub played: Arc<Mutex<Vec<Phase>>>,
        pub fail: bool,
    }

    impl AlarmEffect for RecordingAlarm {
        fn play(&mut self, phase: Phase, _sound: AlarmSound) -> Result<(), AlarmError> {
            self.played.lock().unwrap().push(phase);
            if self.fail {
                return Err(std::io::Error::other("no audio device").into());
            }
            Ok(())
        }
    }
}
