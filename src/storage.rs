use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use timer_core::{FocusPreset, TimerState};

use crate::recovery::PhaseEndAck;

const KEY_TIMER_STATE: &str = "timer_state";
const KEY_PRESET: &str = "focus_preset";
const KEY_PHASE_END_ACK: &str = "phase_end_ack";
const ALL_KEYS: [&str; 3] = [KEY_TIMER_STATE, KEY_PRESET, KEY_PHASE_END_ACK];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt document: {0}")]
    Json(#[from] serde_json::Error),
}

/// One JSON document per key under the state directory.
pub struct TimerStorage {
    dir: PathBuf,
}

impl TimerStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_timer_state(&self) -> Option<TimerState> {
        self.load(KEY_TIMER_STATE)
    }

    pub fn save_timer_state(&self, state: &TimerState) {
        self.save(KEY_TIMER_STATE, state);
    }

    pub fn load_preset(&self) -> FocusPreset {
        self.load(KEY_PRESET).unwrap_or_default()
    }

    pub fn save_preset(&self, preset: &FocusPreset) {
        self.save(KEY_PRESET, preset);
    }

    pub fn load_phase_end_ack(&self) -> Option<PhaseEndAck> {
        self.load(KEY_PHASE_END_ACK)
    }

    pub fn save_phase_end_ack(&self, ack: &PhaseEndAck) {
        self.save(KEY_PHASE_END_ACK, ack);
    }

    /// Drop every persisted key.
    pub fn clear(&self) {
        for key in ALL_KEYS {
            match fs::remove_file(self.key_path(key)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::error!("Failed to remove {}: {}", key, e),
            }
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_key(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Ignoring stored {}: {}", key, e);
                None
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.write_key(key, value) {
            log::error!("Failed to save {}: {}", key, e);
        }
    }

    fn read_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let data = match fs::read(self.key_path(key)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(value)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.key_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}
