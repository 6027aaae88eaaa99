//! # Persistence Module
//!
//! Saves the user's settings and all-time best streak between runs.
//!
//! ## Features
//! - [`SettingsStore`] trait so the controller does not care where state lives
//! - [`JsonFileStore`]: pretty-printed JSON on disk
//! - [`MemoryStore`]: in-process store for tests and headless runs
//! - Missing or unreadable files fall back to defaults instead of failing

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::session::PersistentStats;
use crate::settings::GameSettings;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "FRETLY_CONFIG";
/// Settings file used when [`CONFIG_ENV`] is not set.
pub const DEFAULT_CONFIG_FILE: &str = "fretly.json";

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub settings: GameSettings,
    pub best_streak_ever: u32,
}

impl PersistedState {
    pub fn stats(&self) -> PersistentStats {
        PersistentStats {
            best_streak_ever: self.best_streak_ever,
        }
    }
}

pub trait SettingsStore: Send {
    /// Reads the stored state, or defaults if nothing usable is stored.
    fn load(&self) -> Result<PersistedState>;

    fn save(&self, state: &PersistedState) -> Result<()>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$FRETLY_CONFIG`, or `fretly.json` in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<PersistedState> {
        if !self.path.exists() {
            log::info!("[STORE] No settings at {}, using defaults", self.path.display());
            return Ok(PersistedState::default());
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read {}", self.path.display()))?;

        match serde_json::from_str::<PersistedState>(&data) {
            Ok(mut state) => {
                state.settings = state.settings.sanitized();
                log::info!("[STORE] Loaded settings from {}", self.path.display());
                Ok(state)
            }
            Err(e) => {
                log::warn!(
                    "[STORE] Ignoring unreadable settings in {}: {}",
                    self.path.display(),
                    e
                );
                Ok(PersistedState::default())
            }
        }
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).context("Could not serialize settings")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Could not write {}", self.path.display()))?;
        log::debug!("[STORE] Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Store that keeps state in memory and counts writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<PersistedState>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: Mutex::new(0),
        }
    }

    /// Last saved (or initial) state.
    pub fn snapshot(&self) -> PersistedState {
        self.state.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<PersistedState> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        *self.state.lock() = state.clone();
        *self.saves.lock() += 1;
        Ok(())
    }
}

impl<S: SettingsStore + Sync> SettingsStore for std::sync::Arc<S> {
    fn load(&self) -> Result<PersistedState> {
        (**self).load()
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        (**self).save(state)
    }
}
