use super::Settings;
use crate::atomic_file::write_json_atomic;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Loads and saves the process-wide settings file. Never surfaces parse or
/// I/O errors to callers.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Settings {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) => {
                debug!("Settings file {:?} not loaded ({}), using defaults", self.path, e);
                return Settings::default();
            }
        };

        match serde_json::from_str::<Settings>(&json) {
            Ok(settings) => settings.normalized(),
            Err(e) => {
                warn!("Settings file {:?} is invalid, using defaults: {}", self.path, e);
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> bool {
        match write_json_atomic(&self.path, settings) {
            Ok(()) => {
                info!("Saved settings to {:?}", self.path);
                true
            }
            Err(e) => {
                error!("Failed to save settings to {:?}: {}", self.path, e);
                false
            }
        }
    }
}
