//! User settings and their on-disk location.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = "cellgrid";
const SETTINGS_FILE: &str = "settings.json";

/// Settings read from `<config dir>/cellgrid/settings.json`.
///
/// Missing fields take their defaults, so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_rows: usize,
    pub default_cols: usize,
    pub column_width: u16,
    pub save_debounce_ms: u64,
    pub history_limit: usize,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub flush_on_exit: bool,
}

/// A settings file that exists but cannot be used.
#[derive(Debug, Error)]
#[error("malformed settings file {}: {source}", .path.display())]
pub struct SettingsError {
    pub path: PathBuf,
    #[source]
    pub source: serde_json::Error,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_rows: 100,
            default_cols: 26,
            column_width: 10,
            save_debounce_ms: 1000,
            history_limit: crate::domain::DEFAULT_HISTORY_LIMIT,
            data_dir: base_dir(dirs::data_dir()).join("grids"),
            log_file: base_dir(dirs::cache_dir()).join("cellgrid.log"),
            flush_on_exit: false,
        }
    }
}

fn base_dir(platform_dir: Option<PathBuf>) -> PathBuf {
    platform_dir.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Loads settings from the default location.
    pub fn load() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Reads `path`. A missing or unreadable file yields the defaults; a
    /// malformed one is an error so the caller can report it once logging
    /// is up.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let Ok(content) = fs::read_to_string(path) else {
            return Ok(Self::default());
        };
        serde_json::from_str(&content).map_err(|source| SettingsError { path: path.to_path_buf(), source })
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, json)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}
