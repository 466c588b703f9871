//! Playable tone source.
//!
//! A sine oscillator behind a gate. The gate's output is what gets spliced
//! onto the board as the input pedal's source, so the chain hears the note
//! only while a key is held.

use egui::Key;
use pedalboard_core::{AudioContext, AudioError, AudioGraph, AudioNodeId, NodeSpec, Waveform};

/// Two equal-tempered octaves, C3 to C5.
pub const NOTES: [(&str, f64); 25] = [
    ("C3", 130.81),
    ("C#3", 138.59),
    ("D3", 146.83),
    ("D#3", 155.56),
    ("E3", 164.81),
    ("F3", 174.61),
    ("F#3", 185.00),
    ("G3", 196.00),
    ("G#3", 207.65),
    ("A3", 220.00),
    ("A#3", 233.08),
    ("B3", 246.94),
    ("C4", 261.63),
    ("C#4", 277.18),
    ("D4", 293.66),
    ("D#4", 311.13),
    ("E4", 329.63),
    ("F4", 349.23),
    ("F#4", 369.99),
    ("G4", 392.00),
    ("G#4", 415.30),
    ("A4", 440.00),
    ("A#4", 466.16),
    ("B4", 493.88),
    ("C5", 523.25),
];

/// Tracker layout: the bottom letter row plays the lower octave, the top
/// row (with the digit row for sharps) plays the upper one.
const KEY_MAP: [(Key, usize); 25] = [
    (Key::Z, 0),
    (Key::S, 1),
    (Key::X, 2),
    (Key::D, 3),
    (Key::C, 4),
    (Key::V, 5),
    (Key::G, 6),
    (Key::B, 7),
    (Key::H, 8),
    (Key::N, 9),
    (Key::J, 10),
    (Key::M, 11),
    (Key::Q, 12),
    (Key::Num2, 13),
    (Key::W, 14),
    (Key::Num3, 15),
    (Key::E, 16),
    (Key::R, 17),
    (Key::Num5, 18),
    (Key::T, 19),
    (Key::Num6, 20),
    (Key::Y, 21),
    (Key::Num7, 22),
    (Key::U, 23),
    (Key::I, 24),
];

/// Index into [`NOTES`] played by a computer key.
pub fn note_for_key(key: Key) -> Option<usize> {
    KEY_MAP.iter().find(|(k, _)| *k == key).map(|&(_, note)| note)
}

/// Returns `true` for sharps, which the on-screen keyboard draws black.
pub fn is_sharp(note: usize) -> bool {
    NOTES.get(note).is_some_and(|(name, _)| name.contains('#'))
}

/// Gated oscillator living in an [`AudioGraph`].
#[derive(Debug)]
pub struct KeyboardSource {
    oscillator: AudioNodeId,
    gate: AudioNodeId,
    held: Option<usize>,
}

impl KeyboardSource {
    /// Creates the oscillator and the closed gate, and routes one into the other.
    pub fn new(graph: &mut AudioGraph) -> Result<Self, AudioError> {
        let oscillator = graph.create_node(NodeSpec::Oscillator {
            waveform: Waveform::Sine,
            frequency: NOTES[0].1,
        })?;
        let gate = graph.create_node(NodeSpec::Gain { gain: 0.0 })?;
        graph.connect(oscillator, gate)?;
        Ok(Self {
            oscillator,
            gate,
            held: None,
        })
    }

    /// The node to feed into the board's input pedal.
    pub fn output(&self) -> AudioNodeId {
        self.gate
    }

    /// The note currently sounding.
    pub fn held(&self) -> Option<usize> {
        self.held
    }

    /// Retunes to `note` and opens the gate. Out-of-range notes are ignored.
    pub fn press(&mut self, graph: &mut AudioGraph, note: usize) -> Result<(), AudioError> {
        let Some(&(name, hz)) = NOTES.get(note) else {
            return Ok(());
        };
        graph.set_frequency(self.oscillator, hz)?;
        graph.set_gain(self.gate, 1.0)?;
        self.held = Some(note);
        tracing::debug!(note = name, hz, "note on");
        Ok(())
    }

    /// Closes the gate.
    pub fn release(&mut self, graph: &mut AudioGraph) -> Result<(), AudioError> {
        if self.held.take().is_some() {
            graph.set_gain(self.gate, 0.0)?;
            tracing::debug!("note off");
        }
        Ok(())
    }

    /// Frees the oscillator. The gate belongs to the input pedal it was
    /// spliced into and is released with that pedal.
    pub fn dispose(self, graph: &mut AudioGraph) {
        if let Err(e) = graph.remove_node(self.oscillator) {
            tracing::warn!(error = %e, "releasing keyboard oscillator failed");
        }
    }

    /// Releases `note` only if it is the one sounding.
    pub fn release_note(&mut self, graph: &mut AudioGraph, note: usize) -> Result<(), AudioError> {
        if self.held == Some(note) {
            self.release(graph)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(graph: &mut AudioGraph) -> f32 {
        let mut out = vec![0.0f32; 512];
        graph.render(&mut out);
        out.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn note_table_is_ascending_equal_temperament() {
        for pair in NOTES.windows(2) {
            let ratio = pair[1].1 / pair[0].1;
            assert!((ratio - 2f64.powf(1.0 / 12.0)).abs() < 1e-3, "{pair:?}");
        }
        assert_eq!(NOTES[21], ("A4", 440.0));
    }

    #[test]
    fn key_map_covers_every_note_once() {
        let mut seen = [false; NOTES.len()];
        for (key, note) in KEY_MAP {
            assert!(!seen[note], "note {note} mapped twice");
            seen[note] = true;
            assert_eq!(note_for_key(key), Some(note));
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(note_for_key(Key::Escape), None);
    }

    #[test]
    fn sharps() {
        assert!(!is_sharp(0));
        assert!(is_sharp(1));
        assert!(!is_sharp(24));
        assert!(!is_sharp(99));
    }

    #[test]
    fn gate_follows_press_and_release() {
        let mut graph = AudioGraph::new(48000.0);
        let mut keys = KeyboardSource::new(&mut graph).unwrap();
        let out = graph.create_node(NodeSpec::Destination).unwrap();
        graph.connect(keys.output(), out).unwrap();

        assert_eq!(peak(&mut graph), 0.0);

        keys.press(&mut graph, 21).unwrap();
        assert_eq!(keys.held(), Some(21));
        assert!(peak(&mut graph) > 0.5);

        keys.release_note(&mut graph, 3).unwrap();
        assert_eq!(keys.held(), Some(21));

        keys.release_note(&mut graph, 21).unwrap();
        assert_eq!(keys.held(), None);
        assert_eq!(peak(&mut graph), 0.0);
    }

    #[test]
    fn replaced_keyboard_leaves_no_nodes_behind() {
        let mut graph = AudioGraph::new(48000.0);
        let mut board = pedalboard_core::Board::default();
        let first = KeyboardSource::new(&mut graph).unwrap();
        board.splice_input(first.output(), &mut graph).unwrap();
        let nodes = graph.node_count();

        let second = KeyboardSource::new(&mut graph).unwrap();
        first.dispose(&mut graph);
        board.splice_input(second.output(), &mut graph).unwrap();
        assert_eq!(graph.node_count(), nodes);
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn press_on_closed_graph_fails() {
        let mut graph = AudioGraph::new(48000.0);
        let mut keys = KeyboardSource::new(&mut graph).unwrap();
        graph.close();
        assert_eq!(keys.press(&mut graph, 0), Err(AudioError::Closed));
        assert_eq!(keys.held(), None);
    }
}
