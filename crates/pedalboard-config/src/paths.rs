//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/pedalboard/settings.toml`
//! - macOS: `~/Library/Application Support/pedalboard/settings.toml`
//! - Windows: `%APPDATA%\pedalboard\settings.toml`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "pedalboard";

/// File name of the settings file.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the settings file.
pub fn settings_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}
