//! Error types for the desktop shell.

use pedalboard_config::ConfigError;
use pedalboard_core::{AudioError, BoardError};
use thiserror::Error;

/// Errors raised while wiring the board to devices and settings.
#[derive(Debug, Error)]
pub enum AppError {
    /// No default audio device
    #[error("no audio device available")]
    NoDevice,

    /// No device whose name matches the requested one
    #[error("audio device not found: {0}")]
    DeviceNotFound(String),

    /// cpal failed to enumerate, configure, build, or start a stream
    #[error("audio stream error: {0}")]
    Stream(String),

    /// A board operation failed
    #[error(transparent)]
    Board(#[from] BoardError),

    /// The audio graph refused a call
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Settings could not be loaded or applied
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for the desktop shell.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_display() {
        assert_eq!(AppError::NoDevice.to_string(), "no audio device available");
        let err = AppError::DeviceNotFound("no output device matching 'usb'".to_string());
        assert!(err.to_string().contains("'usb'"));
    }

    #[test]
    fn audio_error_is_transparent() {
        let err: AppError = AudioError::Closed.into();
        assert_eq!(err.to_string(), "audio context is closed");
    }
}
