//! Pedal records.
//!
//! A pedal is a fixed-size rectangle on the board holding one audio node.
//! Behaviour that differs per kind is confined to [`setup_audio_node`]; all
//! other behaviour is shared. Cable references are handles into the owning
//! [`Board`](crate::Board), so operations that follow them live there.

use std::sync::Arc;

use crate::audio::{
    AudioContext, AudioError, AudioNodeId, DISTORTION_SAMPLES, NodeSpec, Waveform,
    distortion_curve,
};
use crate::cable::CableId;
use crate::geometry::{Edges, Point, Rect};
use crate::render::{Color, RenderSurface};

/// Width of every pedal in pixels.
pub const PEDAL_WIDTH: f64 = 100.0;

/// Height of every pedal in pixels.
pub const PEDAL_HEIGHT: f64 = 200.0;

/// Stable handle to a pedal on a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PedalId(pub(crate) u32);

impl PedalId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for PedalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PedalId({})", self.0)
    }
}

/// The processing role of a pedal, with its kind-specific parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum PedalKind {
    /// Sine-wave generator.
    Oscillator {
        /// Frequency in Hz.
        frequency: f64,
    },
    /// Gain stage.
    Volume {
        /// Linear gain.
        gain: f64,
    },
    /// Wave-shaping distortion.
    Distortion {
        /// Shaping constant `k` of the transfer curve.
        amount: f64,
    },
    /// Terminal output sink.
    Output,
    /// Pass-through fed by an external source node (microphone or keyboard).
    Input {
        /// The externally created node feeding this pedal.
        source: AudioNodeId,
    },
}

impl PedalKind {
    /// Short lowercase name, used in logs and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Oscillator { .. } => "oscillator",
            Self::Volume { .. } => "volume",
            Self::Distortion { .. } => "distortion",
            Self::Output => "output",
            Self::Input { .. } => "input",
        }
    }

    /// Source pedals generate signal and take nothing in on their input side.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Oscillator { .. } | Self::Input { .. })
    }
}

/// Builds the audio node for a pedal kind. This is the only per-kind step.
///
/// An `Input` pedal gets its own unity-gain node with the external source
/// connected into it, so disconnecting the pedal never detaches the source.
pub fn setup_audio_node(
    kind: &PedalKind,
    ctx: &mut dyn AudioContext,
) -> Result<AudioNodeId, AudioError> {
    match kind {
        PedalKind::Oscillator { frequency } => ctx.create_node(NodeSpec::Oscillator {
            waveform: Waveform::Sine,
            frequency: *frequency,
        }),
        PedalKind::Volume { gain } => ctx.create_node(NodeSpec::Gain { gain: *gain }),
        PedalKind::Distortion { amount } => {
            let curve: Arc<[f32]> = distortion_curve(*amount, DISTORTION_SAMPLES).into();
            ctx.create_node(NodeSpec::WaveShaper { curve })
        }
        PedalKind::Output => ctx.create_node(NodeSpec::Destination),
        PedalKind::Input { source } => {
            let node = ctx.create_node(NodeSpec::Gain { gain: 1.0 })?;
            ctx.connect(*source, node)?;
            Ok(node)
        }
    }
}

/// A pedal on the board.
#[derive(Clone, Debug)]
pub struct Pedal {
    pub(crate) kind: PedalKind,
    pub(crate) position: Point,
    pub(crate) color: Color,
    pub(crate) node: AudioNodeId,
    pub(crate) input_cable: Option<CableId>,
    pub(crate) output_cable: Option<CableId>,
}

impl Pedal {
    pub(crate) fn new(kind: PedalKind, position: Point, color: Color, node: AudioNodeId) -> Self {
        Self {
            kind,
            position,
            color,
            node,
            input_cable: None,
            output_cable: None,
        }
    }

    /// The pedal's kind.
    pub fn kind(&self) -> &PedalKind {
        &self.kind
    }

    /// Top-left corner.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Fill color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// The audio node this pedal holds.
    pub fn audio_node(&self) -> AudioNodeId {
        self.node
    }

    /// Cable plugged into the input (left) side, if any.
    pub fn input_cable(&self) -> Option<CableId> {
        self.input_cable
    }

    /// Cable plugged into the output (right) side, if any.
    pub fn output_cable(&self) -> Option<CableId> {
        self.output_cable
    }

    /// Occupied area.
    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, PEDAL_WIDTH, PEDAL_HEIGHT)
    }

    /// Left/right/top/bottom coordinates.
    pub fn edges(&self) -> Edges {
        self.rect().edges()
    }

    /// `true` iff `p` lies in `[x, x + W] × [y, y + H]`.
    pub fn contains_point(&self, p: Point) -> bool {
        self.rect().contains(p)
    }

    /// Moves the pedal itself. Attached cable ends are moved by
    /// [`Board::move_pedal`](crate::Board::move_pedal).
    pub(crate) fn translate(&mut self, dx: f64, dy: f64) {
        self.position = self.position.offset(dx, dy);
    }

    /// Paints the pedal body.
    pub fn draw(&self, surface: &mut dyn RenderSurface) {
        surface.fill_rect(self.rect(), self.color);
    }
}
