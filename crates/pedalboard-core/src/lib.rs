//! Pedalboard Core - pedals, patch cables, and the audio graph they drive
//!
//! This crate models a board of effect pedals joined by patch cables. Every
//! visual plug or unplug is mirrored into an audio-processing graph in the
//! same call, so what is drawn and what is heard stay in step.
//!
//! # Core Abstractions
//!
//! ## Board
//!
//! - [`Board`] - Arena of pedals and cables addressed by [`PedalId`] / [`CableId`]
//! - [`DragState`] - Pointer-driven drag controller (pedal drag, cable-end drag, cancel)
//! - [`BoardSettings`] - Snap threshold, tie-break rule, starter pedal parameters
//!
//! ## Records
//!
//! - [`Pedal`] / [`PedalKind`] - One processing stage; [`setup_audio_node`] is the only per-kind step
//! - [`Cable`] - Two draggable ends drawn as case + contact, joined by a slack cord
//!
//! ## Boundaries
//!
//! - [`AudioContext`] - create-node / connect / disconnect / remove-node, implemented in-process by [`AudioGraph`]
//! - [`RenderSurface`] - fill-rect and Bézier-stroke target; [`RecordingSurface`] keeps a display list
//!
//! # Example
//!
//! ```rust
//! use pedalboard_core::{AudioGraph, Board, BoardSettings, Point};
//!
//! let mut ctx = AudioGraph::new(48_000.0);
//! let mut board = Board::starter(BoardSettings::default(), &mut ctx).unwrap();
//!
//! // Drag the spare cable's left end onto the oscillator's output. The cable
//! // that was plugged there is unplugged on that end.
//! board.pointer_down(Point::new(60.0, 322.0));
//! board.pointer_move(70.0, -200.0);
//! let plugged = board.pointer_up(&mut ctx).unwrap();
//! assert!(plugged.is_some());
//! assert_eq!(board.audio_links().len(), 2);
//! board.verify_links().unwrap();
//! ```

pub mod audio;
pub mod board;
pub mod cable;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod pedal;
pub mod render;

pub use audio::{
    AudioContext, AudioError, AudioNodeId, DISTORTION_AMOUNT, DISTORTION_SAMPLES, NodeSpec,
    Waveform, distortion_curve,
};
pub use board::{
    AudioFault, Board, BoardSettings, DEFAULT_SNAP_THRESHOLD, LinkAction, Palette, TieBreak,
};
pub use cable::{
    CASE_HEIGHT, CASE_WIDTH, CONTACT_HEIGHT, CONTACT_WIDTH, Cable, CableId, DEFAULT_SPAN,
};
pub use engine::AudioGraph;
pub use error::BoardError;
pub use geometry::{CubicBezier, Edges, Point, Rect, Side};
pub use interaction::DragState;
pub use pedal::{PEDAL_HEIGHT, PEDAL_WIDTH, Pedal, PedalId, PedalKind, setup_audio_node};
pub use render::{Color, DrawCommand, RecordingSurface, RenderSurface};
