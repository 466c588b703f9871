//! Pedalboard desktop shell.
//!
//! An eframe window around [`pedalboard_core::Board`]: the canvas paints the
//! board and routes the mouse into its drag state machine, cpal drives the
//! shared [`AudioGraph`](pedalboard_core::AudioGraph) out to the speakers,
//! and the input picker splices a microphone or the keyboard tone source
//! in front of the chain.

pub mod app;
pub mod audio_io;
pub mod canvas;
pub mod error;
pub mod keyboard;

pub use app::{InputChoice, PedalboardApp};
pub use audio_io::{AudioOutput, MicrophoneInput, SharedGraph, StreamOptions};
pub use error::AppError;
pub use keyboard::KeyboardSource;
