//! Pointer-driven drag controller.
//!
//! One interaction is in flight at a time. `pointer_down` picks what is being
//! dragged, `pointer_move` forwards deltas to it, and `pointer_up` (or
//! [`Board::cancel_drag`]) ends the drag:
//!
//! ```text
//!            pointer_down on pedal          pointer_up / cancel
//!   Idle ───────────────────────▶ DraggingPedal ────────────────▶ Idle
//!     │  pointer_down on cable end              pointer_up: re-plug
//!     └────────────────────────▶ DraggingCable ────────────────▶ Idle
//! ```
//!
//! Releasing a cable end unplugs it, then looks for a pedal whose facing edge
//! is within [`BoardSettings::snap_threshold`](crate::BoardSettings) of the
//! end's plug point and plugs into it. No pedal in reach leaves the end
//! floating where it was dropped.

use crate::audio::AudioContext;
use crate::board::{Board, TieBreak};
use crate::cable::CableId;
use crate::error::BoardError;
use crate::geometry::{Point, Side};
use crate::pedal::PedalId;

/// What the pointer is currently dragging.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    /// No interaction in progress.
    #[default]
    Idle,
    /// A pedal (and the cable ends plugged into it) follows the pointer.
    DraggingPedal {
        /// The dragged pedal.
        pedal: PedalId,
        /// Total delta applied since the drag began.
        moved: Point,
    },
    /// One end of a cable follows the pointer.
    DraggingCable {
        /// The dragged cable.
        cable: CableId,
        /// The armed end.
        side: Side,
        /// Total delta applied since the drag began.
        moved: Point,
    },
}

impl DragState {
    /// `true` while a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl Board {
    /// Current drag state.
    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// Topmost pedal under `p` (the last one in board order).
    pub fn find_pedal_at(&self, p: Point) -> Option<PedalId> {
        self.pedal_order()
            .iter()
            .rev()
            .copied()
            .find(|&id| self.pedal(id).is_some_and(|pedal| pedal.contains_point(p)))
    }

    /// Topmost cable end under `p`. The left end wins when both ends of one
    /// cable are hit.
    pub fn find_cable_end_at(&self, p: Point) -> Option<(CableId, Side)> {
        self.cables()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .find_map(|(id, cable)| {
                if cable.is_inside_left(p) {
                    Some((id, Side::Left))
                } else if cable.is_inside_right(p) {
                    Some((id, Side::Right))
                } else {
                    None
                }
            })
    }

    /// Starts a drag at `p`: pedals are hit-tested first, then cable ends.
    /// Ignored while another drag is in progress or when `p` is not finite.
    pub fn pointer_down(&mut self, p: Point) -> DragState {
        if self.drag.is_dragging() {
            return self.drag;
        }
        if !p.is_finite() {
            tracing::warn!(x = p.x, y = p.y, "ignoring non-finite pointer position");
            return self.drag;
        }

        if let Some(pedal) = self.find_pedal_at(p) {
            self.drag = DragState::DraggingPedal {
                pedal,
                moved: Point::new(0.0, 0.0),
            };
        } else if let Some((cable, _)) = self.find_cable_end_at(p)
            && let Ok(c) = self.cable_mut(cable)
            && let Some(side) = c.set_moving(p)
        {
            self.drag = DragState::DraggingCable {
                cable,
                side,
                moved: Point::new(0.0, 0.0),
            };
        }
        tracing::trace!(state = ?self.drag, "pointer down");
        self.drag
    }

    /// Forwards a pointer delta to whatever is being dragged.
    pub fn pointer_move(&mut self, dx: f64, dy: f64) {
        if !Point::new(dx, dy).is_finite() {
            tracing::warn!(dx, dy, "ignoring non-finite pointer delta");
            return;
        }
        let result = match &mut self.drag {
            DragState::Idle => return,
            DragState::DraggingPedal { pedal, moved } => {
                *moved = moved.offset(dx, dy);
                let pedal = *pedal;
                self.move_pedal(pedal, dx, dy)
            }
            DragState::DraggingCable { cable, moved, .. } => {
                *moved = moved.offset(dx, dy);
                let cable = *cable;
                self.cable_mut(cable).map(|c| c.move_by(dx, dy))
            }
        };
        match result {
            Ok(()) => self.mark_dirty(),
            Err(e) => {
                tracing::warn!(error = %e, "dragged item vanished, ending drag");
                self.drag = DragState::Idle;
            }
        }
    }

    /// Ends the drag. A released cable end is unplugged and then plugged into
    /// the pedal in reach, if any; the pedal it ended up in is returned.
    pub fn pointer_up(
        &mut self,
        ctx: &mut dyn AudioContext,
    ) -> Result<Option<PedalId>, BoardError> {
        let state = std::mem::take(&mut self.drag);
        let DragState::DraggingCable { cable, side, .. } = state else {
            if state.is_dragging() {
                self.mark_dirty();
            }
            return Ok(None);
        };

        let c = self.cable_mut(cable)?;
        c.disarm();
        let point = c.plug_point(side);
        match side {
            Side::Left => self.unplug_left_side(cable, ctx)?,
            Side::Right => self.unplug_right_side(cable, ctx)?,
        }

        let target = self.find_plug_target(point, side);
        if let Some(pedal) = target {
            match side {
                Side::Left => self.plug_left_into(cable, pedal, ctx)?,
                Side::Right => self.plug_right_into(cable, pedal, ctx)?,
            }
        }
        self.mark_dirty();
        tracing::debug!(cable = %cable, side = ?side, pedal = ?target, "cable end released");
        Ok(target)
    }

    /// Aborts the drag: the dragged pedal or cable end goes back to where the
    /// drag began and no plug state changes. Returns whether a drag was
    /// cancelled.
    pub fn cancel_drag(&mut self) -> bool {
        let result = match std::mem::take(&mut self.drag) {
            DragState::Idle => return false,
            DragState::DraggingPedal { pedal, moved } => self.move_pedal(pedal, -moved.x, -moved.y),
            DragState::DraggingCable { cable, side, moved } => self
                .move_cable_end(cable, side, -moved.x, -moved.y)
                .and_then(|()| self.cable_mut(cable).map(|c| c.disarm())),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not revert cancelled drag");
        }
        self.mark_dirty();
        true
    }

    /// The pedal a cable end released at `point` would plug into.
    ///
    /// A pedal is eligible when the horizontal gap between `point` and its
    /// facing edge (right edge for a left end, left edge for a right end) is
    /// strictly below the snap threshold and `point.y` lies strictly between
    /// its top and bottom.
    pub fn find_plug_target(&self, point: Point, side: Side) -> Option<PedalId> {
        let threshold = self.settings().snap_threshold;
        let mut eligible = self.pedals().filter_map(|(id, pedal)| {
            let e = pedal.edges();
            let facing = match side {
                Side::Left => e.right,
                Side::Right => e.left,
            };
            let gap = (facing - point.x).abs();
            (gap < threshold && e.top < point.y && point.y < e.bottom).then_some((id, gap))
        });

        match self.settings().tie_break {
            TieBreak::FirstMatch => eligible.next().map(|(id, _)| id),
            TieBreak::Nearest => eligible
                .fold(None, |best: Option<(PedalId, f64)>, (id, gap)| match best {
                    Some((_, best_gap)) if best_gap <= gap => best,
                    _ => Some((id, gap)),
                })
                .map(|(id, _)| id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardSettings;
    use crate::engine::AudioGraph;
    use crate::pedal::PedalKind;

    fn board_with(pedals: &[(f64, f64)], settings: BoardSettings) -> (Board, AudioGraph, Vec<PedalId>) {
        let mut ctx = AudioGraph::new(48000.0);
        let mut board = Board::new(settings);
        let ids = pedals
            .iter()
            .map(|&(x, y)| {
                board
                    .add_pedal(PedalKind::Volume { gain: 1.0 }, Point::new(x, y), &mut ctx)
                    .unwrap()
            })
            .collect();
        (board, ctx, ids)
    }

    #[test]
    fn pointer_down_prefers_topmost_pedal() {
        let (mut board, _ctx, ids) =
            board_with(&[(0.0, 0.0), (50.0, 0.0)], BoardSettings::default());
        let state = board.pointer_down(Point::new(75.0, 20.0));
        assert_eq!(
            state,
            DragState::DraggingPedal {
                pedal: ids[1],
                moved: Point::new(0.0, 0.0)
            }
        );
    }

    #[test]
    fn pointer_down_on_empty_space_stays_idle() {
        let (mut board, _ctx, _) = board_with(&[(0.0, 0.0)], BoardSettings::default());
        board.add_cable(Point::new(300.0, 300.0));
        assert_eq!(board.pointer_down(Point::new(250.0, 250.0)), DragState::Idle);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let (mut board, _ctx, ids) = board_with(&[(0.0, 0.0)], BoardSettings::default());
        assert_eq!(board.pointer_down(Point::new(f64::NAN, 1.0)), DragState::Idle);

        board.pointer_down(Point::new(10.0, 10.0));
        board.pointer_move(f64::INFINITY, 0.0);
        assert_eq!(board.pedal(ids[0]).unwrap().position(), Point::new(0.0, 0.0));
    }

    #[test]
    fn second_pointer_down_does_not_restart_drag() {
        let (mut board, _ctx, ids) =
            board_with(&[(0.0, 0.0), (300.0, 0.0)], BoardSettings::default());
        board.pointer_down(Point::new(10.0, 10.0));
        let state = board.pointer_down(Point::new(310.0, 10.0));
        assert!(matches!(state, DragState::DraggingPedal { pedal, .. } if pedal == ids[0]));
    }

    #[test]
    fn dragging_pedal_accumulates_and_releases() {
        let (mut board, mut ctx, ids) = board_with(&[(0.0, 0.0)], BoardSettings::default());
        board.pointer_down(Point::new(10.0, 10.0));
        board.pointer_move(5.0, 5.0);
        board.pointer_move(-2.0, 1.0);
        assert_eq!(
            board.drag_state(),
            DragState::DraggingPedal {
                pedal: ids[0],
                moved: Point::new(3.0, 6.0)
            }
        );
        assert_eq!(board.pointer_up(&mut ctx).unwrap(), None);
        assert_eq!(board.drag_state(), DragState::Idle);
        assert_eq!(board.pedal(ids[0]).unwrap().position(), Point::new(3.0, 6.0));
    }

    #[test]
    fn cancel_returns_pedal_to_start() {
        let (mut board, _ctx, ids) = board_with(&[(20.0, 30.0)], BoardSettings::default());
        board.pointer_down(Point::new(25.0, 35.0));
        board.pointer_move(40.0, -10.0);
        assert!(board.cancel_drag());
        assert_eq!(board.pedal(ids[0]).unwrap().position(), Point::new(20.0, 30.0));
        assert!(!board.cancel_drag());
    }

    #[test]
    fn eligibility_is_strict() {
        let (board, _ctx, ids) = board_with(&[(100.0, 10.0)], BoardSettings::default());
        // Right edge at 200; band (10, 210).
        assert_eq!(board.find_plug_target(Point::new(229.0, 50.0), Side::Left), Some(ids[0]));
        assert_eq!(board.find_plug_target(Point::new(230.0, 50.0), Side::Left), None);
        assert_eq!(board.find_plug_target(Point::new(171.0, 50.0), Side::Left), Some(ids[0]));
        assert_eq!(board.find_plug_target(Point::new(200.0, 10.0), Side::Left), None);
        assert_eq!(board.find_plug_target(Point::new(200.0, 210.0), Side::Left), None);
        // The left edge faces right ends.
        assert_eq!(board.find_plug_target(Point::new(90.0, 50.0), Side::Right), Some(ids[0]));
        assert_eq!(board.find_plug_target(Point::new(200.0, 50.0), Side::Right), None);
    }

    #[test]
    fn tie_break_first_match_and_nearest() {
        // Right edges at 200 and 215.
        let pedals = [(100.0, 0.0), (115.0, 0.0)];
        let point = Point::new(214.0, 50.0);

        let (board, _ctx, ids) = board_with(&pedals, BoardSettings::default());
        assert_eq!(board.find_plug_target(point, Side::Left), Some(ids[0]));

        let nearest = BoardSettings {
            tie_break: TieBreak::Nearest,
            ..BoardSettings::default()
        };
        let (board, _ctx, ids) = board_with(&pedals, nearest.clone());
        assert_eq!(board.find_plug_target(point, Side::Left), Some(ids[1]));

        // Equal gaps: the earlier pedal wins.
        let (board, _ctx, ids) = board_with(&pedals, nearest);
        assert_eq!(board.find_plug_target(Point::new(207.5, 50.0), Side::Left), Some(ids[0]));
    }
}
