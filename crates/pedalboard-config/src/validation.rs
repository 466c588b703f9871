//! Settings validation.
//!
//! Every numeric field has a finite range; colors must parse as `#rrggbb`.
//! [`validate_settings`] reports every problem at once so a hand-edited file
//! can be fixed in one pass.

use pedalboard_core::Color;
use thiserror::Error;

use crate::settings::Settings;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside its allowed range.
    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted key of the field, e.g. `interaction.snap_threshold`.
        field: String,
        /// The offending value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// NaN or infinite value.
    #[error("{field} must be finite")]
    NotFinite {
        /// Dotted key of the field.
        field: String,
    },

    /// Color string that is not `#rrggbb`.
    #[error("{field} = {value:?} is not a #rrggbb color")]
    InvalidColor {
        /// Dotted key of the field.
        field: String,
        /// The string as written.
        value: String,
    },

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Allowed snap threshold in pixels. Zero would make plugging impossible.
pub const SNAP_THRESHOLD_RANGE: (f64, f64) = (1.0, 200.0);
/// Allowed oscillator frequency in Hz.
pub const FREQUENCY_RANGE: (f64, f64) = (20.0, 20_000.0);
/// Allowed linear gain.
pub const GAIN_RANGE: (f64, f64) = (0.0, 10.0);
/// Allowed distortion shaping constant.
pub const DISTORTION_RANGE: (f64, f64) = (0.0, 10_000.0);
/// Allowed stream sample rate in Hz.
pub const SAMPLE_RATE_RANGE: (u32, u32) = (8_000, 192_000);
/// Allowed stream buffer size in frames.
pub const BUFFER_SIZE_RANGE: (u32, u32) = (16, 8_192);

/// Checks a finite value against an inclusive range.
pub fn check_range(field: &str, value: f64, (min, max): (f64, f64)) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Parses a `#rrggbb` color field.
pub fn parse_color(field: &str, value: &str) -> ValidationResult<Color> {
    Color::from_hex(value).ok_or_else(|| ValidationError::InvalidColor {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Validates every field of `settings`.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    let mut errors = Vec::new();
    let mut push = |r: ValidationResult<()>| {
        if let Err(e) = r {
            errors.push(e);
        }
    };

    let i = &settings.interaction;
    push(check_range("interaction.snap_threshold", i.snap_threshold, SNAP_THRESHOLD_RANGE));

    let p = &settings.pedals;
    push(check_range("pedals.oscillator_frequency", p.oscillator_frequency, FREQUENCY_RANGE));
    push(check_range("pedals.volume_gain", p.volume_gain, GAIN_RANGE));
    push(check_range("pedals.distortion_amount", p.distortion_amount, DISTORTION_RANGE));
    for (name, value) in p.colors.entries() {
        push(parse_color(&format!("pedals.colors.{name}"), value).map(|_| ()));
    }

    let any = (f64::MIN, f64::MAX);
    push(check_range("input.x", settings.input.x, any));
    push(check_range("input.y", settings.input.y, any));

    let a = &settings.audio;
    let to_f64 = |(lo, hi): (u32, u32)| (f64::from(lo), f64::from(hi));
    push(check_range("audio.sample_rate", f64::from(a.sample_rate), to_f64(SAMPLE_RATE_RANGE)));
    push(check_range("audio.buffer_size", f64::from(a.buffer_size), to_f64(BUFFER_SIZE_RANGE)));

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
