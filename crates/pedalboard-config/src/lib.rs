//! Settings for the pedalboard application.
//!
//! # Features
//!
//! - **Settings file**: TOML with `[interaction]`, `[pedals]`, `[input]` and `[audio]` sections
//! - **Validation**: Ranges for every numeric field, `#rrggbb` colors, all problems reported at once
//! - **Paths**: Platform-specific location of `settings.toml`
//!
//! # Example
//!
//! ```rust,no_run
//! use pedalboard_config::{Settings, settings_path};
//!
//! let settings = Settings::load_or_default(settings_path()).unwrap();
//! let board_settings = settings.to_board_settings().unwrap();
//! assert!(board_settings.snap_threshold > 0.0);
//! ```

mod error;
mod settings;

/// Platform-specific paths for configuration.
pub mod paths;

/// Settings validation.
pub mod validation;

pub use error::ConfigError;
pub use paths::{SETTINGS_FILE, settings_path, user_config_dir};
pub use settings::{
    AudioSettings, InputSettings, InteractionSettings, PedalColors, PedalSettings, Settings,
    TieBreakRule,
};
pub use validation::{ValidationError, ValidationResult, validate_settings};
