//! Settings persistence
//!
//! Saves and loads [`Settings`] to/from a JSON file in the platform
//! configuration directory.
//!
//! # File Location
//!
//! `settings.json` under the directory `directories::ProjectDirs` picks
//! for this application, e.g. `~/.config/toychess/settings.json` on Linux.
//! Falls back to `settings.json` in the working directory when no home
//! directory can be determined.
//!
//! # Error Handling
//!
//! Loading never fails: a missing, unreadable or malformed file yields the
//! defaults with a warning. Saving reports errors to the caller.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::opening::MIN_REQUEST_GAP_MS;
use crate::core::error::CoreResult;

/// Settings filename
const SETTINGS_FILENAME: &str = "settings.json";

/// Default explorer endpoint
pub const DEFAULT_OPENING_ENDPOINT: &str = "https://explorer.lichess.ovh/lichess";

/// Default game speeds queried from the explorer
pub const DEFAULT_OPENING_SPEEDS: &str = "rapid,classical,blitz";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Start position as FEN; the standard position when absent
    pub start_fen: Option<String>,
    pub analysis: AnalysisSettings,
    pub opening: OpeningSettings,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_fen: None,
            analysis: AnalysisSettings::default(),
            opening: OpeningSettings::default(),
            log_filter: "info".to_string(),
        }
    }
}

/// Background evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub enabled: bool,
    /// Artificial latency of the stub evaluator
    pub reply_delay_ms: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reply_delay_ms: 150,
        }
    }
}

/// Opening explorer lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub speeds: String,
    pub min_request_gap_ms: u64,
}

impl Default for OpeningSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_OPENING_ENDPOINT.to_string(),
            speeds: DEFAULT_OPENING_SPEEDS.to_string(),
            min_request_gap_ms: MIN_REQUEST_GAP_MS,
        }
    }
}

/// Resolve the settings file path
pub fn settings_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "toychess") {
        proj_dirs.config_dir().join(SETTINGS_FILENAME)
    } else {
        PathBuf::from(SETTINGS_FILENAME)
    }
}

/// Load settings from `path`, falling back to defaults
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        info!("[SETTINGS] No settings file found at {:?}. Using defaults.", path);
        return Settings::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
            Ok(settings) => {
                info!("[SETTINGS] Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                warn!(
                    "[SETTINGS] Failed to parse settings file at {:?}: {}. Using defaults.",
                    path, e
                );
                Settings::default()
            }
        },
        Err(e) => {
            warn!(
                "[SETTINGS] Failed to read settings file at {:?}: {}. Using defaults.",
                path, e
            );
            Settings::default()
        }
    }
}

/// Write `settings` to `path`, creating parent directories as needed
pub fn save_settings(path: &Path, settings: &Settings) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    info!("[SETTINGS] Saved settings to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.start_fen.is_none());
        assert!(settings.analysis.enabled);
        assert_eq!(settings.opening.min_request_gap_ms, 5000);
        assert_eq!(settings.opening.speeds, "rapid,classical,blitz");
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        //! Missing sections and fields take their default values
        let settings: Settings =
            serde_json::from_str(r#"{ "opening": { "enabled": false }, "log_filter": "debug" }"#)
                .unwrap();
        assert!(!settings.opening.enabled);
        assert_eq!(settings.opening.endpoint, DEFAULT_OPENING_ENDPOINT);
        assert!(settings.analysis.enabled);
        assert_eq!(settings.log_filter, "debug");
    }

    #[test]
    fn test_settings_path_file_name() {
        assert!(settings_path().ends_with(SETTINGS_FILENAME));
    }
}
