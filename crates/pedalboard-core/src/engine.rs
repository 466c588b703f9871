//! In-process software audio context.
//!
//! [`AudioGraph`] implements [`AudioContext`] and renders mono blocks by
//! pulling every node in topological order. Topology is edited from the
//! interaction thread; an audio callback calls [`AudioGraph::render`] under
//! the same lock, so each connect/disconnect is atomic relative to a pull.
//!
//! The processing order is recompiled on every topology edit, never during a
//! pull. Per-node output buffers and the input mix are reused across blocks
//! and only grow when the block size does.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::audio::{AudioContext, AudioError, AudioNodeId, NodeSpec, Waveform};

/// Processing state of a single node.
enum NodeKind {
    Oscillator {
        waveform: Waveform,
        frequency: f64,
        phase: f64,
    },
    Gain {
        gain: f64,
    },
    WaveShaper {
        curve: Arc<[f32]>,
    },
    Destination,
    Stream(Receiver<f32>),
}

impl NodeKind {
    fn from_spec(spec: NodeSpec) -> Self {
        match spec {
            NodeSpec::Oscillator {
                waveform,
                frequency,
            } => Self::Oscillator {
                waveform,
                frequency,
                phase: 0.0,
            },
            NodeSpec::Gain { gain } => Self::Gain { gain },
            NodeSpec::WaveShaper { curve } => Self::WaveShaper { curve },
            NodeSpec::Destination => Self::Destination,
            NodeSpec::Stream(rx) => Self::Stream(rx),
        }
    }

    fn is_source(&self) -> bool {
        matches!(self, Self::Oscillator { .. } | Self::Stream(_))
    }
}

struct NodeData {
    kind: NodeKind,
    /// Scratch output for the current block.
    output: Vec<f32>,
}

/// A directed route between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Edge {
    from: AudioNodeId,
    to: AudioNodeId,
}

/// Software audio graph.
///
/// Node ids are slot indices and are never reused.
pub struct AudioGraph {
    nodes: Vec<Option<NodeData>>,
    edges: Vec<Edge>,
    /// Live node slots in topological order.
    schedule: Vec<usize>,
    /// Scratch for the schedule compile.
    in_degree: Vec<u32>,
    /// Summed input of the node being processed.
    mix: Vec<f32>,
    sample_rate: f64,
    closed: bool,
}

impl AudioGraph {
    /// Creates an empty graph running at `sample_rate` Hz.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            schedule: Vec::new(),
            in_degree: Vec::new(),
            mix: Vec::new(),
            sample_rate,
            closed: false,
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns `true` if `from` currently routes into `to`.
    pub fn has_edge(&self, from: AudioNodeId, to: AudioNodeId) -> bool {
        self.edges.contains(&Edge { from, to })
    }

    /// All current routes as `(from, to)` pairs.
    pub fn edges(&self) -> Vec<(AudioNodeId, AudioNodeId)> {
        self.edges.iter().map(|e| (e.from, e.to)).collect()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the context. Every later call fails with [`AudioError::Closed`]
    /// and [`render`](Self::render) produces silence.
    pub fn close(&mut self) {
        tracing::info!("audio graph closed");
        self.closed = true;
    }

    /// Retunes an oscillator node. Other node kinds are left untouched.
    pub fn set_frequency(&mut self, node: AudioNodeId, hz: f64) -> Result<(), AudioError> {
        if let NodeKind::Oscillator { frequency, .. } = &mut self.node_mut(node)?.kind {
            *frequency = hz;
        }
        Ok(())
    }

    /// Sets the factor of a gain node. Other node kinds are left untouched.
    pub fn set_gain(&mut self, node: AudioNodeId, value: f64) -> Result<(), AudioError> {
        if let NodeKind::Gain { gain } = &mut self.node_mut(node)?.kind {
            *gain = value;
        }
        Ok(())
    }

    /// Renders one block into `out`, clamped to `[-1, 1]`.
    ///
    /// Nodes that are not connected to a destination still advance, so
    /// oscillators keep their phase across re-patching.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if self.closed {
            return;
        }
        let frames = out.len();
        self.mix.resize(frames, 0.0);

        for &idx in &self.schedule {
            // Sum the inputs first; they were all produced earlier in the schedule.
            self.mix.fill(0.0);
            for edge in self.edges.iter().filter(|e| e.to.0 as usize == idx) {
                if let Some(Some(src)) = self.nodes.get(edge.from.0 as usize) {
                    for (m, s) in self.mix.iter_mut().zip(&src.output) {
                        *m += *s;
                    }
                }
            }

            let sample_rate = self.sample_rate;
            let Some(Some(node)) = self.nodes.get_mut(idx) else {
                continue;
            };
            node.output.resize(frames, 0.0);
            match &mut node.kind {
                NodeKind::Oscillator {
                    waveform,
                    frequency,
                    phase,
                } => {
                    let step = *frequency / sample_rate;
                    for s in &mut node.output {
                        *s = waveform.sample(*phase) as f32;
                        *phase = (*phase + step).rem_euclid(1.0);
                    }
                }
                NodeKind::Gain { gain } => {
                    for (s, m) in node.output.iter_mut().zip(&self.mix) {
                        *s = *m * *gain as f32;
                    }
                }
                NodeKind::WaveShaper { curve } => {
                    for (s, m) in node.output.iter_mut().zip(&self.mix) {
                        *s = shape(curve, *m);
                    }
                }
                NodeKind::Destination => {
                    node.output.fill(0.0);
                    for (o, m) in out.iter_mut().zip(&self.mix) {
                        *o += *m;
                    }
                }
                NodeKind::Stream(rx) => {
                    for s in &mut node.output {
                        *s = rx.try_recv().unwrap_or(0.0);
                    }
                }
            }
        }

        for s in out.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
    }

    fn check_open(&self) -> Result<(), AudioError> {
        if self.closed {
            Err(AudioError::Closed)
        } else {
            Ok(())
        }
    }

    fn node(&self, id: AudioNodeId) -> Result<&NodeData, AudioError> {
        self.check_open()?;
        self.nodes
            .get(id.0 as usize)
            .and_then(|n| n.as_ref())
            .ok_or(AudioError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: AudioNodeId) -> Result<&mut NodeData, AudioError> {
        self.check_open()?;
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(|n| n.as_mut())
            .ok_or(AudioError::UnknownNode(id))
    }

    /// DFS reachability check: can `from` reach `to` via existing edges?
    fn can_reach(&self, from: AudioNodeId, to: AudioNodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let idx = current.0 as usize;
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.extend(self.edges.iter().filter(|e| e.from == current).map(|e| e.to));
        }
        false
    }

    /// Recompiles the processing order (Kahn). `connect` refuses cycles, so
    /// every live node lands in the schedule exactly once. Reuses the
    /// schedule and scratch allocations.
    fn rebuild_schedule(&mut self) {
        let n = self.nodes.len();
        self.in_degree.clear();
        self.in_degree.resize(n, 0);
        for edge in &self.edges {
            self.in_degree[edge.to.0 as usize] += 1;
        }

        self.schedule.clear();
        self.schedule
            .extend((0..n).filter(|&i| self.nodes[i].is_some() && self.in_degree[i] == 0));

        // The schedule doubles as the FIFO: everything before `next` is placed.
        let mut next = 0;
        while next < self.schedule.len() {
            let idx = self.schedule[next];
            next += 1;
            for edge in &self.edges {
                if edge.from.0 as usize != idx {
                    continue;
                }
                let to_idx = edge.to.0 as usize;
                self.in_degree[to_idx] -= 1;
                if self.in_degree[to_idx] == 0 {
                    self.schedule.push(to_idx);
                }
            }
        }
    }
}

/// Wave-shaper lookup with linear interpolation, matching the usual
/// `index = (len - 1) · (x + 1) / 2` mapping. Input outside `[-1, 1]` clamps
/// to the curve ends.
fn shape(curve: &[f32], x: f32) -> f32 {
    match curve.len() {
        0 => x,
        1 => curve[0],
        len => {
            let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * (len - 1) as f32;
            let i = pos.floor() as usize;
            if i >= len - 1 {
                return curve[len - 1];
            }
            let frac = pos - i as f32;
            curve[i] + (curve[i + 1] - curve[i]) * frac
        }
    }
}

impl AudioContext for AudioGraph {
    fn create_node(&mut self, spec: NodeSpec) -> Result<AudioNodeId, AudioError> {
        self.check_open()?;
        let id = AudioNodeId(self.nodes.len() as u32);
        self.nodes.push(Some(NodeData {
            kind: NodeKind::from_spec(spec),
            output: Vec::new(),
        }));
        self.rebuild_schedule();
        tracing::debug!(node = %id, "audio node created");
        Ok(id)
    }

    fn connect(&mut self, from: AudioNodeId, to: AudioNodeId) -> Result<(), AudioError> {
        if matches!(self.node(from)?.kind, NodeKind::Destination) {
            return Err(AudioError::NoOutputs(from));
        }
        if self.node(to)?.kind.is_source() {
            return Err(AudioError::NoInputs(to));
        }
        if self.has_edge(from, to) {
            return Ok(());
        }
        if self.can_reach(to, from) {
            return Err(AudioError::Cycle { from, to });
        }
        self.edges.push(Edge { from, to });
        self.rebuild_schedule();
        tracing::debug!("audio connect: {from} → {to}");
        Ok(())
    }

    fn disconnect(&mut self, node: AudioNodeId) -> Result<(), AudioError> {
        self.node(node)?;
        let before = self.edges.len();
        self.edges.retain(|e| e.from != node);
        self.rebuild_schedule();
        tracing::debug!(
            node = %node,
            removed = before - self.edges.len(),
            "audio disconnect"
        );
        Ok(())
    }

    fn remove_node(&mut self, node: AudioNodeId) -> Result<(), AudioError> {
        self.node(node)?;
        let before = self.edges.len();
        self.edges.retain(|e| e.from != node && e.to != node);
        self.nodes[node.0 as usize] = None;
        self.rebuild_schedule();
        tracing::debug!(
            node = %node,
            removed_edges = before - self.edges.len(),
            "audio node removed"
        );
        Ok(())
    }
}
