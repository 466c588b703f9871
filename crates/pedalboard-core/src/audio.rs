//! Audio-context boundary.
//!
//! The board never owns an audio engine. It is handed an [`AudioContext`] on
//! every call that needs one and only ever asks it to create a node, connect
//! two nodes, disconnect a node, or release a node it no longer holds. The context's lifecycle (start, suspend,
//! close) belongs to whoever created it.

use std::f64::consts::PI;
use std::sync::Arc;

use crossbeam_channel::Receiver;

/// Sample count of the distortion transfer curve.
pub const DISTORTION_SAMPLES: usize = 44100;

/// Shaping constant used by the distortion pedal.
pub const DISTORTION_AMOUNT: f64 = 400.0;

/// Handle to a node inside an [`AudioContext`].
///
/// Handles are assigned by the context and never reused within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AudioNodeId(pub(crate) u32);

impl AudioNodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for AudioNodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AudioNodeId({})", self.0)
    }
}

/// Periodic waveform of an oscillator node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Pure sine.
    #[default]
    Sine,
    /// Square wave.
    Square,
    /// Rising sawtooth.
    Sawtooth,
    /// Triangle wave.
    Triangle,
}

impl Waveform {
    /// Evaluates one period of the waveform at `phase` in `[0, 1)`.
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Self::Sine => (2.0 * PI * phase).sin(),
            Self::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Sawtooth => 2.0 * phase - 1.0,
            Self::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

/// What kind of processing node to create.
#[derive(Debug, Clone)]
pub enum NodeSpec {
    /// Free-running periodic source.
    Oscillator {
        /// Waveform shape.
        waveform: Waveform,
        /// Frequency in Hz.
        frequency: f64,
    },
    /// Sums its inputs and scales by `gain`.
    Gain {
        /// Linear gain factor.
        gain: f64,
    },
    /// Maps the summed input through a transfer curve over `[-1, 1]`.
    WaveShaper {
        /// Curve samples, evenly spaced over the input range.
        curve: Arc<[f32]>,
    },
    /// Terminal sink: whatever reaches it is audible.
    Destination,
    /// Source fed sample-by-sample from an external stream (e.g. a microphone).
    Stream(Receiver<f32>),
}

impl NodeSpec {
    /// Returns `true` for nodes that accept no input.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Oscillator { .. } | Self::Stream(_))
    }

    /// Returns `true` for nodes that produce no routable output.
    pub fn is_sink(&self) -> bool {
        matches!(self, Self::Destination)
    }
}

/// Failures reported by an [`AudioContext`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    /// The node handle does not belong to this context.
    #[error("audio node {0} not found")]
    UnknownNode(AudioNodeId),
    /// The node has no inputs to connect into.
    #[error("audio node {0} accepts no input")]
    NoInputs(AudioNodeId),
    /// The node has no outputs to connect from.
    #[error("audio node {0} has no output")]
    NoOutputs(AudioNodeId),
    /// The connection would close a feedback loop.
    #[error("connecting {from} to {to} would create a cycle")]
    Cycle {
        /// Upstream node.
        from: AudioNodeId,
        /// Downstream node.
        to: AudioNodeId,
    },
    /// The context has been closed and can no longer be used.
    #[error("audio context is closed")]
    Closed,
}

/// The operations the board needs from an audio engine.
pub trait AudioContext {
    /// Creates a node of the given kind.
    fn create_node(&mut self, spec: NodeSpec) -> Result<AudioNodeId, AudioError>;

    /// Routes the output of `from` into `to`.
    ///
    /// Connecting an already-connected pair must succeed without adding a
    /// second route.
    fn connect(&mut self, from: AudioNodeId, to: AudioNodeId) -> Result<(), AudioError>;

    /// Removes every outgoing route of `node`. Succeeds when there are none.
    fn disconnect(&mut self, node: AudioNodeId) -> Result<(), AudioError>;

    /// Frees `node` along with every route into or out of it. The handle is
    /// unknown to the context afterwards.
    fn remove_node(&mut self, node: AudioNodeId) -> Result<(), AudioError>;
}

/// Builds the wave-shaping distortion curve.
///
/// For sample `i` of `samples`, with `x = 2i/samples - 1`:
/// `curve[i] = (3 + k) · x · 20° / (π + k·|x|)` where 20° is in radians.
/// The function is pure; identical arguments always produce identical curves.
pub fn distortion_curve(amount: f64, samples: usize) -> Vec<f32> {
    let deg = PI / 180.0;
    (0..samples)
        .map(|i| {
            let x = i as f64 * 2.0 / samples as f64 - 1.0;
            ((3.0 + amount) * x * 20.0 * deg / (PI + amount * x.abs())) as f32
        })
        .collect()
}
