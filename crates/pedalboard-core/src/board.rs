//! The pedal board: an arena of pedals and cables plus the plug topology.
//!
//! Pedals and cables refer to each other only through [`PedalId`] and
//! [`CableId`] handles. Every plug or unplug updates both sides of the
//! reference and the audio route between the two pedals a cable bridges in
//! the same call, so the drawn topology and the audio topology change
//! together.
//!
//! # Invariants
//!
//! - A cable end references a pedal iff that pedal's matching slot
//!   (`output_cable` for the left end, `input_cable` for the right end)
//!   references the cable. [`Board::verify_links`] checks this.
//! - An audio route `A → B` exists iff some cable has its left end in `A`
//!   and its right end in `B`, unless the audio context refused the route
//!   (see [`AudioFault`]).
//! - Moving a pedal moves the cable ends plugged into it by the same delta.

use std::collections::HashSet;

use crate::audio::{AudioContext, AudioError, AudioNodeId};
use crate::cable::{CONTACT_HEIGHT, Cable, CableId};
use crate::error::BoardError;
use crate::geometry::{Point, Side};
use crate::interaction::DragState;
use crate::pedal::{PEDAL_HEIGHT, Pedal, PedalId, PedalKind, setup_audio_node};
use crate::render::{Color, RenderSurface};

/// Horizontal proximity for snapping a released cable end onto a pedal.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 30.0;

/// How a released cable end chooses between several pedals in reach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// The first eligible pedal in board order.
    #[default]
    FirstMatch,
    /// The eligible pedal with the smallest horizontal gap; earliest on ties.
    Nearest,
}

/// Fill colors per pedal kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Oscillator pedals.
    pub oscillator: Color,
    /// Volume pedals.
    pub volume: Color,
    /// Distortion pedals.
    pub distortion: Color,
    /// Output pedals.
    pub output: Color,
    /// Input pedals.
    pub input: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            oscillator: Color::rgb(0x4c, 0xaf, 0x50),
            volume: Color::rgb(0x21, 0x96, 0xf3),
            distortion: Color::rgb(0xe5, 0x39, 0x35),
            output: Color::rgb(0x42, 0x42, 0x42),
            input: Color::rgb(0xff, 0xb3, 0x00),
        }
    }
}

impl Palette {
    /// Color for a pedal kind.
    pub fn color_for(&self, kind: &PedalKind) -> Color {
        match kind {
            PedalKind::Oscillator { .. } => self.oscillator,
            PedalKind::Volume { .. } => self.volume,
            PedalKind::Distortion { .. } => self.distortion,
            PedalKind::Output => self.output,
            PedalKind::Input { .. } => self.input,
        }
    }
}

/// Tunables of a board.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardSettings {
    /// Maximum horizontal gap (exclusive) between a released cable end and a
    /// pedal edge for the end to plug in.
    pub snap_threshold: f64,
    /// Choice among several pedals in reach.
    pub tie_break: TieBreak,
    /// Where a freshly spliced input pedal is placed.
    pub input_position: Point,
    /// Starter oscillator frequency in Hz.
    pub oscillator_frequency: f64,
    /// Starter volume gain.
    pub volume_gain: f64,
    /// Starter distortion shaping constant.
    pub distortion_amount: f64,
    /// Pedal colors.
    pub palette: Palette,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            tie_break: TieBreak::FirstMatch,
            input_position: Point::new(50.0, 300.0),
            oscillator_frequency: 350.0,
            volume_gain: 2.0,
            distortion_amount: crate::audio::DISTORTION_AMOUNT,
            palette: Palette::default(),
        }
    }
}

/// Whether an audio call was adding or removing a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkAction {
    /// `connect(from, to)`.
    Connect,
    /// `disconnect(from)`.
    Disconnect,
}

impl core::fmt::Display for LinkAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        })
    }
}

/// An audio call that failed while the visual plug went ahead.
///
/// The plug state is not rolled back; the fault is queued for the page to
/// report via [`Board::take_audio_faults`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{action} {from} → {to} failed: {source}")]
pub struct AudioFault {
    /// Attempted operation.
    pub action: LinkAction,
    /// Upstream pedal.
    pub from: PedalId,
    /// Downstream pedal.
    pub to: PedalId,
    /// What the audio context reported.
    pub source: AudioError,
}

/// A board of pedals and cables.
pub struct Board {
    pedals: Vec<Option<Pedal>>,
    /// Draw and hit-test order of live pedals.
    order: Vec<PedalId>,
    cables: Vec<Cable>,
    settings: BoardSettings,
    pub(crate) drag: DragState,
    faults: Vec<AudioFault>,
    dirty: bool,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardSettings::default())
    }
}

impl Board {
    /// Creates an empty board.
    pub fn new(settings: BoardSettings) -> Self {
        Self {
            pedals: Vec::new(),
            order: Vec::new(),
            cables: Vec::new(),
            settings,
            drag: DragState::Idle,
            faults: Vec::new(),
            dirty: true,
        }
    }

    /// Builds the starter chain: Oscillator → Volume → Distortion → Output,
    /// joined by three cables, plus one spare unplugged cable.
    pub fn starter(settings: BoardSettings, ctx: &mut dyn AudioContext) -> Result<Self, BoardError> {
        let kinds = [
            PedalKind::Oscillator {
                frequency: settings.oscillator_frequency,
            },
            PedalKind::Volume {
                gain: settings.volume_gain,
            },
            PedalKind::Distortion {
                amount: settings.distortion_amount,
            },
            PedalKind::Output,
        ];
        let mut board = Self::new(settings);

        let mut chain = Vec::with_capacity(kinds.len());
        for (i, kind) in kinds.into_iter().enumerate() {
            let x = 50.0 + 200.0 * i as f64;
            chain.push(board.add_pedal(kind, Point::new(x, 50.0), ctx)?);
        }
        for pair in chain.windows(2) {
            let cable = board.add_cable(Point::new(0.0, 0.0));
            board.connect_pedals(cable, pair[0], pair[1], ctx)?;
        }
        board.add_cable(Point::new(50.0, 320.0));

        tracing::info!(
            pedals = board.pedal_count(),
            cables = board.cable_count(),
            "starter board assembled"
        );
        Ok(board)
    }

    // --- Accessors ---

    /// Board tunables.
    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    /// Looks up a pedal.
    pub fn pedal(&self, id: PedalId) -> Option<&Pedal> {
        self.pedals.get(id.0 as usize).and_then(|p| p.as_ref())
    }

    /// Looks up a cable.
    pub fn cable(&self, id: CableId) -> Option<&Cable> {
        self.cables.get(id.0 as usize)
    }

    /// Live pedals in board order.
    pub fn pedals(&self) -> impl Iterator<Item = (PedalId, &Pedal)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.pedal(id).map(|p| (id, p)))
    }

    /// Cables in creation order.
    pub fn cables(&self) -> impl Iterator<Item = (CableId, &Cable)> + '_ {
        self.cables
            .iter()
            .enumerate()
            .map(|(i, c)| (CableId(i as u32), c))
    }

    /// Number of live pedals.
    pub fn pedal_count(&self) -> usize {
        self.order.len()
    }

    /// Number of cables.
    pub fn cable_count(&self) -> usize {
        self.cables.len()
    }

    /// Pedal downstream of `id` through its output cable.
    pub fn next_pedal(&self, id: PedalId) -> Option<PedalId> {
        let cable = self.pedal(id)?.output_cable?;
        self.cable(cable)?.output_pedal
    }

    /// Pedal upstream of `id` through its input cable.
    pub fn previous_pedal(&self, id: PedalId) -> Option<PedalId> {
        let cable = self.pedal(id)?.input_cable?;
        self.cable(cable)?.input_pedal
    }

    /// `true` when something visible changed since [`mark_clean`](Self::mark_clean).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledges a redraw.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Drains the audio failures recorded since the last call.
    pub fn take_audio_faults(&mut self) -> Vec<AudioFault> {
        std::mem::take(&mut self.faults)
    }

    // --- Mutations ---

    /// Places a new pedal, building its audio node. Its color comes from the
    /// board palette.
    pub fn add_pedal(
        &mut self,
        kind: PedalKind,
        position: Point,
        ctx: &mut dyn AudioContext,
    ) -> Result<PedalId, BoardError> {
        let color = self.settings.palette.color_for(&kind);
        self.add_pedal_with_color(kind, position, color, ctx)
    }

    /// Places a new pedal with an explicit color.
    pub fn add_pedal_with_color(
        &mut self,
        kind: PedalKind,
        position: Point,
        color: Color,
        ctx: &mut dyn AudioContext,
    ) -> Result<PedalId, BoardError> {
        check_position(position)?;
        let node = setup_audio_node(&kind, ctx)?;
        let id = PedalId(self.pedals.len() as u32);
        tracing::debug!(pedal = %id, kind = kind.name(), node = %node, "pedal added");
        self.pedals.push(Some(Pedal::new(kind, position, color, node)));
        self.order.push(id);
        self.dirty = true;
        Ok(id)
    }

    /// Drops a pedal from the board. Cables plugged into it stay on the board,
    /// unplugged on that end. Its audio node is released from the context,
    /// together with the wrapped source of an input pedal.
    pub fn remove_pedal(
        &mut self,
        id: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<Pedal, BoardError> {
        self.require_pedal(id)?;
        self.unplug_input(id, ctx)?;
        self.unplug_output(id, ctx)?;

        let Some(pedal) = self.pedals.get_mut(id.0 as usize).and_then(Option::take) else {
            return Err(BoardError::UnknownPedal(id));
        };
        let source = match pedal.kind {
            PedalKind::Input { source } => Some(source),
            _ => None,
        };
        for node in source.into_iter().chain([pedal.node]) {
            if let Err(e) = ctx.remove_node(node) {
                tracing::warn!(pedal = %id, node = %node, error = %e, "releasing audio node failed");
            }
        }
        self.order.retain(|&p| p != id);
        if matches!(self.drag, DragState::DraggingPedal { pedal, .. } if pedal == id) {
            self.drag = DragState::Idle;
        }
        tracing::debug!(pedal = %id, "pedal removed");
        self.dirty = true;
        Ok(pedal)
    }

    /// Adds an unplugged cable with its left end at `position`.
    pub fn add_cable(&mut self, position: Point) -> CableId {
        let id = CableId(self.cables.len() as u32);
        self.cables.push(Cable::new(position));
        self.dirty = true;
        id
    }

    /// Moves a pedal and the cable ends plugged into it by `(dx, dy)`.
    pub fn move_pedal(&mut self, id: PedalId, dx: f64, dy: f64) -> Result<(), BoardError> {
        check_position(Point::new(dx, dy))?;
        let pedal = self.pedal_mut(id)?;
        pedal.translate(dx, dy);
        let (input, output) = (pedal.input_cable, pedal.output_cable);

        if let Some(c) = input {
            self.cable_mut(c)?.move_side(Side::Right, dx, dy);
        }
        if let Some(c) = output {
            self.cable_mut(c)?.move_side(Side::Left, dx, dy);
        }
        self.dirty = true;
        Ok(())
    }

    /// Moves one end of a cable. Used by the drag controller; plug state is
    /// untouched.
    pub fn move_cable_end(
        &mut self,
        id: CableId,
        side: Side,
        dx: f64,
        dy: f64,
    ) -> Result<(), BoardError> {
        check_position(Point::new(dx, dy))?;
        self.cable_mut(id)?.move_side(side, dx, dy);
        self.dirty = true;
        Ok(())
    }

    // --- Cable-side plugging ---

    /// Snaps the left end flush with the pedal's right edge and plugs it into
    /// the pedal's output, routing audio to whatever the right end feeds.
    pub fn plug_left_into(
        &mut self,
        cable: CableId,
        pedal: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        self.snap_and_attach(cable, Side::Left, pedal, ctx)
    }

    /// Snaps the right end flush with the pedal's left edge and plugs it into
    /// the pedal's input, routing audio from whatever feeds the left end.
    pub fn plug_right_into(
        &mut self,
        cable: CableId,
        pedal: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        self.snap_and_attach(cable, Side::Right, pedal, ctx)
    }

    /// Unplugs the left end, tearing down the route it carried. No-op when
    /// the end is not plugged.
    pub fn unplug_left_side(
        &mut self,
        cable: CableId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        self.detach(cable, Side::Left, ctx)
    }

    /// Unplugs the right end, tearing down the route it carried. No-op when
    /// the end is not plugged.
    pub fn unplug_right_side(
        &mut self,
        cable: CableId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        self.detach(cable, Side::Right, ctx)
    }

    /// Plugs an end into a pedal without moving it. `Side::Left` means the
    /// pedal's output, `Side::Right` its input.
    pub fn plug_side(
        &mut self,
        cable: CableId,
        side: Side,
        pedal: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        self.attach(cable, side, pedal, ctx)
    }

    /// Programmatic patching: docks the left end on `from`'s right edge and
    /// the right end on `to`'s left edge, both at mid-height.
    pub fn connect_pedals(
        &mut self,
        cable: CableId,
        from: PedalId,
        to: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        self.dock(cable, Side::Left, from, ctx)?;
        self.dock(cable, Side::Right, to, ctx)
    }

    // --- Pedal-side plugging ---

    /// Records `cable` as the pedal's input cable and routes audio from the
    /// pedal upstream of it, if any. Calling it again with the same cable
    /// re-issues the (idempotent) connect.
    pub fn plug_in_input(
        &mut self,
        pedal: PedalId,
        cable: CableId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        self.attach(cable, Side::Right, pedal, ctx)
    }

    /// Records `cable` as the pedal's output cable and routes audio to the
    /// pedal downstream of it, if any.
    pub fn plug_in_output(
        &mut self,
        pedal: PedalId,
        cable: CableId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        self.attach(cable, Side::Left, pedal, ctx)
    }

    /// Clears the pedal's input cable and the route into the pedal. No-op when
    /// nothing is plugged.
    pub fn unplug_input(
        &mut self,
        pedal: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        match self.require_pedal(pedal)?.input_cable {
            Some(cable) => self.detach(cable, Side::Right, ctx),
            None => Ok(()),
        }
    }

    /// Clears the pedal's output cable and the route out of the pedal. No-op
    /// when nothing is plugged.
    pub fn unplug_output(
        &mut self,
        pedal: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        match self.require_pedal(pedal)?.output_cable {
            Some(cable) => self.detach(cable, Side::Left, ctx),
            None => Ok(()),
        }
    }

    // --- Input sources ---

    /// Splices an external source in as the upstream-most pedal.
    ///
    /// An existing input pedal is replaced in place, its output cable moving
    /// to the new pedal. Otherwise the new pedal is placed at
    /// [`BoardSettings::input_position`] and wired to the head of the chain
    /// that ends at the output pedal: a source head hands over its output
    /// cable, any other head receives the input on its input cable, or on the
    /// first free cable.
    pub fn splice_input(
        &mut self,
        source: AudioNodeId,
        ctx: &mut dyn AudioContext,
    ) -> Result<PedalId, BoardError> {
        let kind = PedalKind::Input { source };

        let existing = self
            .pedals()
            .find(|(_, p)| matches!(p.kind, PedalKind::Input { .. }))
            .map(|(id, p)| (id, p.position, p.output_cable));
        if let Some((old, position, output)) = existing {
            let new = self.add_pedal(kind, position, ctx)?;
            if let Some(cable) = output {
                self.dock(cable, Side::Left, new, ctx)?;
            }
            self.remove_pedal(old, ctx)?;
            tracing::info!(old = %old, new = %new, "input pedal replaced");
            return Ok(new);
        }

        let head = self.chain_head();
        let new = self.add_pedal(kind, self.settings.input_position, ctx)?;
        let Some(head) = head else {
            return Ok(new);
        };
        let head_pedal = self.require_pedal(head)?;
        let (is_source, input, output) = (
            head_pedal.kind.is_source(),
            head_pedal.input_cable,
            head_pedal.output_cable,
        );

        if is_source {
            if let Some(cable) = output {
                self.dock(cable, Side::Left, new, ctx)?;
            }
        } else if let Some(cable) = input {
            self.dock(cable, Side::Left, new, ctx)?;
        } else if let Some(cable) = self.free_cable() {
            self.connect_pedals(cable, new, head, ctx)?;
        }
        tracing::info!(pedal = %new, head = %head, "input pedal spliced");
        Ok(new)
    }

    // --- Consistency ---

    /// Checks that every pedal/cable reference is mirrored on the other side.
    pub fn verify_links(&self) -> Result<(), BoardError> {
        for (cid, cable) in self.cables() {
            for side in [Side::Left, Side::Right] {
                let Some(pid) = cable.pedal(side) else {
                    continue;
                };
                let Some(pedal) = self.pedal(pid) else {
                    return Err(BoardError::LinkMismatch(format!(
                        "{cid} {side:?} end references missing {pid}"
                    )));
                };
                if slot(pedal, side) != Some(cid) {
                    return Err(BoardError::LinkMismatch(format!(
                        "{cid} {side:?} end references {pid}, which does not reference it back"
                    )));
                }
            }
        }
        for (pid, pedal) in self.pedals() {
            for side in [Side::Left, Side::Right] {
                let Some(cid) = slot(pedal, side) else {
                    continue;
                };
                if self.cable(cid).and_then(|c| c.pedal(side)) != Some(pid) {
                    return Err(BoardError::LinkMismatch(format!(
                        "{pid} references {cid}, which does not reference it back"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Pedal pairs `(upstream, downstream)` bridged by a fully plugged cable.
    /// These are exactly the routes the audio graph should hold.
    pub fn audio_links(&self) -> Vec<(PedalId, PedalId)> {
        self.cables
            .iter()
            .filter_map(|c| Some((c.input_pedal?, c.output_pedal?)))
            .collect()
    }

    // --- Rendering ---

    /// Repaints the whole board: pedals first, then cables on top.
    pub fn draw(&self, surface: &mut dyn RenderSurface) {
        surface.clear();
        for (_, pedal) in self.pedals() {
            pedal.draw(surface);
        }
        for cable in &self.cables {
            cable.draw(surface);
        }
    }

    // --- Internals ---

    pub(crate) fn pedal_order(&self) -> &[PedalId] {
        &self.order
    }

    pub(crate) fn require_pedal(&self, id: PedalId) -> Result<&Pedal, BoardError> {
        self.pedal(id).ok_or(BoardError::UnknownPedal(id))
    }

    fn pedal_mut(&mut self, id: PedalId) -> Result<&mut Pedal, BoardError> {
        self.pedals
            .get_mut(id.0 as usize)
            .and_then(|p| p.as_mut())
            .ok_or(BoardError::UnknownPedal(id))
    }

    pub(crate) fn cable_mut(&mut self, id: CableId) -> Result<&mut Cable, BoardError> {
        self.cables
            .get_mut(id.0 as usize)
            .ok_or(BoardError::UnknownCable(id))
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn snap_and_attach(
        &mut self,
        cable: CableId,
        side: Side,
        pedal: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        let edges = self.require_pedal(pedal)?.edges();
        let c = self.cable_mut(cable)?;
        let dx = c.snap_delta(side, &edges);
        c.move_side(side, dx, 0.0);
        self.attach(cable, side, pedal, ctx)
    }

    /// Puts an end at the pedal's mid-height, then snaps and plugs it.
    fn dock(
        &mut self,
        cable: CableId,
        side: Side,
        pedal: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        let top = self.require_pedal(pedal)?.position.y;
        let c = self.cable_mut(cable)?;
        let dy = top + PEDAL_HEIGHT / 2.0 - CONTACT_HEIGHT / 2.0 - c.end(side).y;
        c.move_side(side, 0.0, dy);
        self.snap_and_attach(cable, side, pedal, ctx)
    }

    /// Links `cable`'s `side` end and `pedal` in both directions, then routes
    /// audio across the cable if its other end is plugged too.
    fn attach(
        &mut self,
        cable: CableId,
        side: Side,
        pedal: PedalId,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        let current = self.cable(cable).ok_or(BoardError::UnknownCable(cable))?.pedal(side);
        let occupant = slot(self.require_pedal(pedal)?, side);

        if current.is_some() && current != Some(pedal) {
            self.detach(cable, side, ctx)?;
        }
        if let Some(other) = occupant
            && other != cable
        {
            tracing::debug!(pedal = %pedal, evicted = %other, "pedal side already taken");
            self.detach(other, side, ctx)?;
        }

        self.cable_mut(cable)?.set_pedal(side, Some(pedal));
        set_slot(self.pedal_mut(pedal)?, side, Some(cable));
        tracing::debug!(cable = %cable, side = ?side, pedal = %pedal, "plugged");

        let c = self.cable(cable).ok_or(BoardError::UnknownCable(cable))?;
        if let (Some(from), Some(to)) = (c.input_pedal, c.output_pedal) {
            self.link(from, to, ctx);
        }
        self.dirty = true;
        Ok(())
    }

    /// Breaks the link between `cable`'s `side` end and its pedal, removing
    /// the route the cable carried.
    fn detach(
        &mut self,
        cable: CableId,
        side: Side,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), BoardError> {
        let c = self.cable(cable).ok_or(BoardError::UnknownCable(cable))?;
        let Some(pedal) = c.pedal(side) else {
            return Ok(());
        };
        if let (Some(from), Some(to)) = (c.input_pedal, c.output_pedal) {
            self.unlink(from, to, ctx);
        }

        if let Ok(p) = self.pedal_mut(pedal)
            && slot(p, side) == Some(cable)
        {
            set_slot(p, side, None);
        }
        self.cable_mut(cable)?.set_pedal(side, None);
        tracing::debug!(cable = %cable, side = ?side, pedal = %pedal, "unplugged");
        self.dirty = true;
        Ok(())
    }

    fn link(&mut self, from: PedalId, to: PedalId, ctx: &mut dyn AudioContext) {
        let (Some(a), Some(b)) = (self.pedal(from), self.pedal(to)) else {
            return;
        };
        if let Err(source) = ctx.connect(a.node, b.node) {
            self.record_fault(LinkAction::Connect, from, to, source);
        }
    }

    fn unlink(&mut self, from: PedalId, to: PedalId, ctx: &mut dyn AudioContext) {
        let Some(a) = self.pedal(from) else {
            return;
        };
        if let Err(source) = ctx.disconnect(a.node) {
            self.record_fault(LinkAction::Disconnect, from, to, source);
        }
    }

    fn record_fault(&mut self, action: LinkAction, from: PedalId, to: PedalId, source: AudioError) {
        let fault = AudioFault {
            action,
            from,
            to,
            source,
        };
        tracing::warn!(%fault, "audio route out of sync with cable");
        self.faults.push(fault);
    }

    /// Upstream-most pedal of the chain ending at the first output pedal (or
    /// at the first pedal when there is no output).
    fn chain_head(&self) -> Option<PedalId> {
        let start = self
            .pedals()
            .find(|(_, p)| p.kind == PedalKind::Output)
            .or_else(|| self.pedals().next())
            .map(|(id, _)| id)?;

        let mut seen = HashSet::from([start]);
        let mut head = start;
        while let Some(prev) = self.previous_pedal(head) {
            if !seen.insert(prev) {
                break;
            }
            head = prev;
        }
        Some(head)
    }

    fn free_cable(&self) -> Option<CableId> {
        self.cables()
            .find(|(_, c)| c.input_pedal.is_none() && c.output_pedal.is_none())
            .map(|(id, _)| id)
    }
}

/// The pedal slot a cable end of `side` occupies.
fn slot(pedal: &Pedal, side: Side) -> Option<CableId> {
    match side {
        Side::Left => pedal.output_cable,
        Side::Right => pedal.input_cable,
    }
}

fn set_slot(pedal: &mut Pedal, side: Side, cable: Option<CableId>) {
    match side {
        Side::Left => pedal.output_cable = cable,
        Side::Right => pedal.input_cable = cable,
    }
}

fn check_position(p: Point) -> Result<(), BoardError> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(BoardError::InvalidPosition { x: p.x, y: p.y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NodeSpec;
    use crate::engine::AudioGraph;
    use crate::render::{DrawCommand, RecordingSurface};

    fn two_pedals() -> (Board, AudioGraph, PedalId, PedalId) {
        let mut ctx = AudioGraph::new(48000.0);
        let mut board = Board::default();
        let a = board
            .add_pedal(PedalKind::Volume { gain: 1.0 }, Point::new(100.0, 10.0), &mut ctx)
            .unwrap();
        let b = board
            .add_pedal(PedalKind::Output, Point::new(300.0, 10.0), &mut ctx)
            .unwrap();
        (board, ctx, a, b)
    }

    fn node(board: &Board, id: PedalId) -> AudioNodeId {
        board.pedal(id).unwrap().audio_node()
    }

    #[test]
    fn plugging_both_ends_routes_audio() {
        let (mut board, mut ctx, a, b) = two_pedals();
        let c = board.add_cable(Point::new(150.0, 150.0));

        board.plug_left_into(c, a, &mut ctx).unwrap();
        assert!(ctx.edges().is_empty(), "one end plugged carries no audio");

        board.plug_right_into(c, b, &mut ctx).unwrap();
        assert!(ctx.has_edge(node(&board, a), node(&board, b)));
        assert_eq!(board.next_pedal(a), Some(b));
        assert_eq!(board.previous_pedal(b), Some(a));
        board.verify_links().unwrap();
    }

    #[test]
    fn unplugging_clears_both_sides_and_route() {
        let (mut board, mut ctx, a, b) = two_pedals();
        let c = board.add_cable(Point::new(150.0, 150.0));
        board.plug_left_into(c, a, &mut ctx).unwrap();
        board.plug_right_into(c, b, &mut ctx).unwrap();

        board.unplug_right_side(c, &mut ctx).unwrap();
        assert_eq!(board.pedal(b).unwrap().input_cable(), None);
        assert_eq!(board.cable(c).unwrap().output_pedal(), None);
        assert!(ctx.edges().is_empty());
        assert_eq!(board.pedal(a).unwrap().output_cable(), Some(c));
        board.verify_links().unwrap();

        // Redundant unplug is a no-op.
        board.unplug_right_side(c, &mut ctx).unwrap();
        board.unplug_input(b, &mut ctx).unwrap();
    }

    #[test]
    fn plugging_twice_is_idempotent() {
        let (mut board, mut ctx, a, b) = two_pedals();
        let c = board.add_cable(Point::new(150.0, 150.0));
        board.plug_left_into(c, a, &mut ctx).unwrap();
        board.plug_right_into(c, b, &mut ctx).unwrap();
        board.plug_in_input(b, c, &mut ctx).unwrap();
        board.plug_in_output(a, c, &mut ctx).unwrap();
        assert_eq!(ctx.edges().len(), 1);
        assert!(board.take_audio_faults().is_empty());
        board.verify_links().unwrap();
    }

    #[test]
    fn plugging_into_taken_side_evicts_previous_cable() {
        let (mut board, mut ctx, a, b) = two_pedals();
        let first = board.add_cable(Point::new(150.0, 150.0));
        let second = board.add_cable(Point::new(150.0, 400.0));
        board.plug_left_into(first, a, &mut ctx).unwrap();
        board.plug_right_into(first, b, &mut ctx).unwrap();

        board.plug_right_into(second, b, &mut ctx).unwrap();
        assert_eq!(board.pedal(b).unwrap().input_cable(), Some(second));
        assert_eq!(board.cable(first).unwrap().output_pedal(), None);
        assert!(ctx.edges().is_empty());
        board.verify_links().unwrap();
    }

    #[test]
    fn moving_pedal_drags_plugged_ends() {
        let (mut board, mut ctx, a, b) = two_pedals();
        let c = board.add_cable(Point::new(150.0, 150.0));
        board.plug_left_into(c, a, &mut ctx).unwrap();
        board.plug_right_into(c, b, &mut ctx).unwrap();
        let before = board.cable(c).unwrap().clone();

        board.move_pedal(a, 12.0, -4.0).unwrap();
        let after = board.cable(c).unwrap();
        assert_eq!(after.end(Side::Left), before.end(Side::Left).offset(12.0, -4.0));
        assert_eq!(after.end(Side::Right), before.end(Side::Right));
        let right_edge = board.pedal(a).unwrap().edges().right;
        assert!((after.plug_point(Side::Left).x - right_edge).abs() < 1e-9);
    }

    #[test]
    fn move_rejects_non_finite_delta() {
        let (mut board, _ctx, a, _) = two_pedals();
        let before = board.pedal(a).unwrap().position();
        assert!(matches!(
            board.move_pedal(a, f64::NAN, 0.0),
            Err(BoardError::InvalidPosition { .. })
        ));
        assert_eq!(board.pedal(a).unwrap().position(), before);
    }

    #[test]
    fn failed_connect_keeps_plug_and_records_fault() {
        let (mut board, mut ctx, a, b) = two_pedals();
        let c = board.add_cable(Point::new(150.0, 150.0));
        // Output → Volume: the destination has no output.
        board.plug_left_into(c, b, &mut ctx).unwrap();
        board.plug_right_into(c, a, &mut ctx).unwrap();

        assert_eq!(board.next_pedal(b), Some(a));
        let faults = board.take_audio_faults();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].action, LinkAction::Connect);
        assert!(matches!(faults[0].source, AudioError::NoOutputs(_)));
        assert!(board.take_audio_faults().is_empty());
    }

    #[test]
    fn remove_pedal_unplugs_attached_cables() {
        let (mut board, mut ctx, a, b) = two_pedals();
        let c = board.add_cable(Point::new(150.0, 150.0));
        board.plug_left_into(c, a, &mut ctx).unwrap();
        board.plug_right_into(c, b, &mut ctx).unwrap();

        let removed = board.remove_pedal(a, &mut ctx).unwrap();
        assert_eq!(removed.output_cable(), None);
        assert!(board.pedal(a).is_none());
        assert_eq!(board.pedal_count(), 1);
        assert_eq!(board.cable(c).unwrap().input_pedal(), None);
        assert_eq!(board.cable(c).unwrap().output_pedal(), Some(b));
        assert!(ctx.edges().is_empty());
        assert_eq!(ctx.node_count(), 1);
        assert_eq!(
            board.remove_pedal(a, &mut ctx).unwrap_err(),
            BoardError::UnknownPedal(a)
        );
    }

    #[test]
    fn removing_input_pedal_releases_its_source() {
        let mut ctx = AudioGraph::new(48000.0);
        let mut board = Board::default();
        let source = ctx.create_node(NodeSpec::Gain { gain: 1.0 }).unwrap();
        let input = board.splice_input(source, &mut ctx).unwrap();
        assert_eq!(ctx.node_count(), 2);

        board.remove_pedal(input, &mut ctx).unwrap();
        assert_eq!(ctx.node_count(), 0);
        assert!(ctx.edges().is_empty());
    }

    #[test]
    fn failed_release_still_disarms_cable() {
        let (mut board, mut ctx, a, _) = two_pedals();
        let c = board.add_cable(Point::new(400.0, 400.0));
        // A dangling occupant on `a`'s output makes the plug step fail.
        board.pedal_mut(a).unwrap().output_cable = Some(CableId(99));

        let state = board.pointer_down(Point::new(410.0, 403.0));
        assert!(matches!(state, DragState::DraggingCable { cable, side: Side::Left, .. } if cable == c));
        board.pointer_move(-220.0, -300.0);
        assert_eq!(
            board.pointer_up(&mut ctx),
            Err(BoardError::UnknownCable(CableId(99)))
        );

        assert_eq!(board.drag_state(), DragState::Idle);
        assert_eq!(board.cable(c).unwrap().moving(), None);
    }

    #[test]
    fn starter_board_is_a_live_chain() {
        let mut ctx = AudioGraph::new(48000.0);
        let board = Board::starter(BoardSettings::default(), &mut ctx).unwrap();
        assert_eq!(board.pedal_count(), 4);
        assert_eq!(board.cable_count(), 4);
        assert_eq!(board.audio_links().len(), 3);
        for (from, to) in board.audio_links() {
            assert!(ctx.has_edge(node(&board, from), node(&board, to)));
        }
        board.verify_links().unwrap();

        let mut out = vec![0.0f32; 512];
        ctx.render(&mut out);
        assert!(out.iter().any(|&s| s != 0.0), "starter chain is audible");
    }

    #[test]
    fn draw_paints_pedals_then_cables() {
        let mut ctx = AudioGraph::new(48000.0);
        let board = Board::starter(BoardSettings::default(), &mut ctx).unwrap();
        let mut s = RecordingSurface::new();
        board.draw(&mut s);
        let cmds = s.commands();
        assert_eq!(cmds[0], DrawCommand::Clear);
        // 4 pedal bodies, then 4 cables × (4 rects + 1 cord).
        assert_eq!(cmds.len(), 1 + 4 + 4 * 5);
        assert!(matches!(cmds[1], DrawCommand::FillRect { .. }));
        assert!(matches!(cmds.last(), Some(DrawCommand::StrokeBezier { .. })));
    }

    #[test]
    fn palette_colors_by_kind() {
        let palette = Palette::default();
        assert_eq!(palette.color_for(&PedalKind::Output), palette.output);
        assert_eq!(
            palette.color_for(&PedalKind::Volume { gain: 1.0 }),
            palette.volume
        );
    }
}
