//! The settings file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use pedalboard_core::{BoardSettings, Palette, Point, TieBreak};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, parse_color, validate_settings};

/// User settings, stored as TOML. Every section and key is optional.
///
/// # TOML Format
///
/// ```toml
/// [interaction]
/// snap_threshold = 30.0
/// tie_break = "first-match"   # or "nearest"
///
/// [pedals]
/// oscillator_frequency = 350.0
/// volume_gain = 2.0
/// distortion_amount = 400.0
///
/// [pedals.colors]
/// oscillator = "#4caf50"
/// output = "#424242"
///
/// [input]
/// x = 50.0
/// y = 300.0
///
/// [audio]
/// sample_rate = 48000
/// buffer_size = 512
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Drag-and-drop behaviour.
    pub interaction: InteractionSettings,
    /// Starter pedal parameters and colors.
    pub pedals: PedalSettings,
    /// Placement of a spliced input pedal.
    pub input: InputSettings,
    /// Audio stream parameters.
    pub audio: AudioSettings,
}

/// `[interaction]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InteractionSettings {
    /// Horizontal reach for plugging a released cable end, in pixels.
    pub snap_threshold: f64,
    /// Choice among several pedals in reach.
    pub tie_break: TieBreakRule,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        let board = BoardSettings::default();
        Self {
            snap_threshold: board.snap_threshold,
            tie_break: TieBreakRule::default(),
        }
    }
}

/// Serialized form of [`TieBreak`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreakRule {
    /// First eligible pedal in board order.
    #[default]
    FirstMatch,
    /// Eligible pedal with the smallest horizontal gap.
    Nearest,
}

impl From<TieBreakRule> for TieBreak {
    fn from(rule: TieBreakRule) -> Self {
        match rule {
            TieBreakRule::FirstMatch => TieBreak::FirstMatch,
            TieBreakRule::Nearest => TieBreak::Nearest,
        }
    }
}

/// `[pedals]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PedalSettings {
    /// Starter oscillator frequency in Hz.
    pub oscillator_frequency: f64,
    /// Starter volume gain.
    pub volume_gain: f64,
    /// Starter distortion shaping constant.
    pub distortion_amount: f64,
    /// Fill color per pedal kind.
    pub colors: PedalColors,
}

impl Default for PedalSettings {
    fn default() -> Self {
        let board = BoardSettings::default();
        Self {
            oscillator_frequency: board.oscillator_frequency,
            volume_gain: board.volume_gain,
            distortion_amount: board.distortion_amount,
            colors: PedalColors::default(),
        }
    }
}

/// `[pedals.colors]` section, `#rrggbb` strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PedalColors {
    /// Oscillator pedals.
    pub oscillator: String,
    /// Volume pedals.
    pub volume: String,
    /// Distortion pedals.
    pub distortion: String,
    /// Output pedals.
    pub output: String,
    /// Input pedals.
    pub input: String,
}

impl Default for PedalColors {
    fn default() -> Self {
        let palette = Palette::default();
        Self {
            oscillator: palette.oscillator.to_hex(),
            volume: palette.volume.to_hex(),
            distortion: palette.distortion.to_hex(),
            output: palette.output.to_hex(),
            input: palette.input.to_hex(),
        }
    }
}

impl PedalColors {
    /// `(key, value)` pairs in declaration order.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("oscillator", self.oscillator.as_str()),
            ("volume", self.volume.as_str()),
            ("distortion", self.distortion.as_str()),
            ("output", self.output.as_str()),
            ("input", self.input.as_str()),
        ]
    }

    /// Parses every color into a board palette.
    pub fn to_palette(&self) -> ValidationResult<Palette> {
        let color = |name: &str, value: &str| parse_color(&format!("pedals.colors.{name}"), value);
        Ok(Palette {
            oscillator: color("oscillator", &self.oscillator)?,
            volume: color("volume", &self.volume)?,
            distortion: color("distortion", &self.distortion)?,
            output: color("output", &self.output)?,
            input: color("input", &self.input)?,
        })
    }
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputSettings {
    /// Left edge of a spliced input pedal.
    pub x: f64,
    /// Top edge of a spliced input pedal.
    pub y: f64,
}

impl Default for InputSettings {
    fn default() -> Self {
        let p = BoardSettings::default().input_position;
        Self { x: p.x, y: p.y }
    }
}

/// `[audio]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    /// Requested stream sample rate in Hz.
    pub sample_rate: u32,
    /// Requested stream buffer size in frames.
    pub buffer_size: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    /// Any other failure (unreadable, malformed) is returned.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(e) if e.is_not_found() => {
                tracing::info!(path = %path.as_ref().display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every field; see [`validate_settings`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_settings(self)?;
        Ok(())
    }

    /// Validates and converts into the board's tunables.
    pub fn to_board_settings(&self) -> Result<BoardSettings, ConfigError> {
        self.validate()?;
        Ok(BoardSettings {
            snap_threshold: self.interaction.snap_threshold,
            tie_break: self.interaction.tie_break.into(),
            input_position: Point::new(self.input.x, self.input.y),
            oscillator_frequency: self.pedals.oscillator_frequency,
            volume_gain: self.pedals.volume_gain,
            distortion_amount: self.pedals.distortion_amount,
            palette: self.pedals.colors.to_palette()?,
        })
    }
}
