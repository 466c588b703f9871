//! Error types for board operations.

use thiserror::Error;

use crate::audio::AudioError;
use crate::cable::CableId;
use crate::pedal::PedalId;

/// Errors returned by [`Board`](crate::Board) operations.
///
/// Geometry and plugging never fail on valid handles; "no pedal in reach" is
/// a normal outcome. Audio failures during plug/unplug are not returned here
/// either: they are recorded as [`AudioFault`](crate::AudioFault)s.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    /// The pedal handle does not refer to a pedal on this board.
    #[error("pedal {0} not found")]
    UnknownPedal(PedalId),

    /// The cable handle does not refer to a cable on this board.
    #[error("cable {0} not found")]
    UnknownCable(CableId),

    /// A position with a NaN or infinite coordinate was supplied.
    #[error("invalid position ({x}, {y})")]
    InvalidPosition {
        /// Horizontal coordinate.
        x: f64,
        /// Vertical coordinate.
        y: f64,
    },

    /// Creating a pedal's audio node failed.
    #[error("audio node setup failed: {0}")]
    Audio(#[from] AudioError),

    /// A pedal and a cable disagree about being plugged together.
    #[error("link mismatch: {0}")]
    LinkMismatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioNodeId;
    use std::error::Error;

    #[test]
    fn display_messages() {
        assert_eq!(
            BoardError::UnknownPedal(PedalId(3)).to_string(),
            "pedal PedalId(3) not found"
        );
        assert_eq!(
            BoardError::UnknownCable(CableId(1)).to_string(),
            "cable CableId(1) not found"
        );
        assert_eq!(
            BoardError::InvalidPosition { x: f64::NAN, y: 2.0 }.to_string(),
            "invalid position (NaN, 2)"
        );
    }

    #[test]
    fn audio_error_converts_and_chains() {
        let err: BoardError = AudioError::NoInputs(AudioNodeId(7)).into();
        assert!(matches!(err, BoardError::Audio(AudioError::NoInputs(_))));
        assert!(err.source().is_some());
    }
}
