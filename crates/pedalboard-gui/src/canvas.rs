//! The board canvas.
//!
//! Paints the board through an egui [`Painter`] and turns egui's pointer
//! responses into the board's press / drag / release / cancel sequence.
//! Board coordinates have their origin at the canvas' top-left corner.

use egui::epaint::CubicBezierShape;
use egui::{
    Align2, Color32, CursorIcon, FontId, Key, Painter, PointerButton, Pos2, Response, Sense,
    Stroke, Ui, Vec2,
};
use parking_lot::Mutex;
use pedalboard_core::{
    AudioContext, AudioGraph, Board, BoardError, Color, CubicBezier, PedalId, Point, Rect,
    RenderSurface,
};

/// Canvas background.
pub const BACKGROUND: Color32 = Color32::from_rgb(0xf5, 0xf5, 0xf5);

/// Converts a board color.
pub fn to_color32(color: Color) -> Color32 {
    Color32::from_rgb(color.r, color.g, color.b)
}

/// Maps between board and screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasTransform {
    origin: Pos2,
}

impl CanvasTransform {
    /// A transform whose board origin sits at `origin` on screen.
    pub fn new(origin: Pos2) -> Self {
        Self { origin }
    }

    /// Board point to screen position.
    pub fn to_screen(self, p: Point) -> Pos2 {
        Pos2::new(self.origin.x + p.x as f32, self.origin.y + p.y as f32)
    }

    /// Screen position to board point.
    pub fn to_board(self, p: Pos2) -> Point {
        Point::new(f64::from(p.x - self.origin.x), f64::from(p.y - self.origin.y))
    }

    /// Board rectangle to screen rectangle.
    pub fn to_screen_rect(self, r: Rect) -> egui::Rect {
        egui::Rect::from_min_size(
            self.to_screen(Point::new(r.x, r.y)),
            Vec2::new(r.width as f32, r.height as f32),
        )
    }
}

/// [`RenderSurface`] backed by an egui painter.
pub struct PainterSurface<'a> {
    painter: &'a Painter,
    transform: CanvasTransform,
}

impl<'a> PainterSurface<'a> {
    /// Wraps `painter`, drawing board coordinates relative to `transform`.
    pub fn new(painter: &'a Painter, transform: CanvasTransform) -> Self {
        Self { painter, transform }
    }
}

impl RenderSurface for PainterSurface<'_> {
    fn clear(&mut self) {
        self.painter
            .rect_filled(self.painter.clip_rect(), 0.0, BACKGROUND);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.painter
            .rect_filled(self.transform.to_screen_rect(rect), 0.0, to_color32(color));
    }

    fn stroke_bezier(&mut self, curve: &CubicBezier, color: Color, width: f64) {
        let points = [curve.start, curve.control1, curve.control2, curve.end]
            .map(|p| self.transform.to_screen(p));
        self.painter.add(CubicBezierShape::from_points_stroke(
            points,
            false,
            Color32::TRANSPARENT,
            Stroke::new(width as f32, to_color32(color)),
        ));
    }
}

/// One step of pointer input in board coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Primary button went down.
    Press(Point),
    /// Pointer moved while pressed.
    Drag {
        /// Horizontal delta.
        dx: f64,
        /// Vertical delta.
        dy: f64,
    },
    /// Primary button went up.
    Release,
    /// Escape or secondary button: abort the drag.
    Cancel,
}

/// Feeds one pointer event into the board. Returns the pedal a released
/// cable end plugged into, if any.
pub fn apply_pointer(
    board: &mut Board,
    event: PointerEvent,
    ctx: &mut dyn AudioContext,
) -> Result<Option<PedalId>, BoardError> {
    match event {
        PointerEvent::Press(p) => {
            board.pointer_down(p);
            Ok(None)
        }
        PointerEvent::Drag { dx, dy } => {
            board.pointer_move(dx, dy);
            Ok(None)
        }
        PointerEvent::Release => board.pointer_up(ctx),
        PointerEvent::Cancel => {
            board.cancel_drag();
            Ok(None)
        }
    }
}

/// Reads this frame's pointer input off the canvas response.
fn pointer_events(ui: &Ui, response: &Response, transform: CanvasTransform) -> Vec<PointerEvent> {
    let (press_origin, escape, secondary) = ui.input(|i| {
        (
            i.pointer.press_origin(),
            i.key_pressed(Key::Escape),
            i.pointer.button_pressed(PointerButton::Secondary),
        )
    });
    let mut events = Vec::new();

    if response.clicked_by(PointerButton::Primary)
        && let Some(origin) = press_origin
    {
        // A click is a drag of zero length.
        events.push(PointerEvent::Press(transform.to_board(origin)));
        events.push(PointerEvent::Release);
        return events;
    }

    if response.drag_started_by(PointerButton::Primary)
        && let Some(origin) = press_origin
    {
        events.push(PointerEvent::Press(transform.to_board(origin)));
        if let Some(now) = response.interact_pointer_pos() {
            let d = now - origin;
            events.push(PointerEvent::Drag {
                dx: f64::from(d.x),
                dy: f64::from(d.y),
            });
        }
    } else if response.dragged_by(PointerButton::Primary) {
        let d = response.drag_delta();
        if d != Vec2::ZERO {
            events.push(PointerEvent::Drag {
                dx: f64::from(d.x),
                dy: f64::from(d.y),
            });
        }
    }

    if escape || secondary {
        events.push(PointerEvent::Cancel);
    }
    if response.drag_stopped_by(PointerButton::Primary) {
        events.push(PointerEvent::Release);
    }
    events
}

/// Draws the board into the remaining space and applies this frame's
/// pointer input. The graph is locked only while there is input to apply.
///
/// Board errors end the drag in progress; they are returned for display.
pub fn show(ui: &mut Ui, board: &mut Board, graph: &Mutex<AudioGraph>) -> Vec<BoardError> {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
    let transform = CanvasTransform::new(response.rect.min);

    let mut errors = Vec::new();
    let events = pointer_events(ui, &response, transform);
    if !events.is_empty() {
        let mut graph = graph.lock();
        for event in events {
            if let Err(e) = apply_pointer(board, event, &mut *graph) {
                tracing::warn!(error = %e, ?event, "pointer input failed");
                errors.push(e);
            }
        }
    }

    board.draw(&mut PainterSurface::new(&painter, transform));
    for (_, pedal) in board.pedals() {
        let r = pedal.rect();
        painter.text(
            transform.to_screen(Point::new(r.x + r.width / 2.0, r.y + 12.0)),
            Align2::CENTER_TOP,
            pedal.kind().name(),
            FontId::proportional(14.0),
            Color32::WHITE,
        );
    }

    if board.drag_state().is_dragging() {
        ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
    } else if let Some(hover) = response.hover_pos() {
        let p = transform.to_board(hover);
        if board.find_pedal_at(p).is_some() || board.find_cable_end_at(p).is_some() {
            ui.ctx().set_cursor_icon(CursorIcon::Grab);
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pedalboard_core::{BoardSettings, DragState, RecordingSurface};

    #[test]
    fn transform_round_trips() {
        let t = CanvasTransform::new(Pos2::new(10.0, 40.0));
        let p = Point::new(50.0, 300.0);
        assert_eq!(t.to_screen(p), Pos2::new(60.0, 340.0));
        assert_eq!(t.to_board(Pos2::new(60.0, 340.0)), p);

        let r = t.to_screen_rect(Rect::new(0.0, 0.0, 100.0, 200.0));
        assert_eq!(r.min, Pos2::new(10.0, 40.0));
        assert_eq!(r.size(), Vec2::new(100.0, 200.0));
    }

    #[test]
    fn color_conversion() {
        assert_eq!(to_color32(Color::rgb(1, 2, 3)), Color32::from_rgb(1, 2, 3));
    }

    #[test]
    fn pointer_sequence_drags_a_pedal() {
        let mut graph = AudioGraph::new(48000.0);
        let mut board = Board::starter(BoardSettings::default(), &mut graph).unwrap();
        let (osc, before) = board
            .pedals()
            .next()
            .map(|(id, p)| (id, p.position()))
            .unwrap();

        apply_pointer(&mut board, PointerEvent::Press(before.offset(5.0, 5.0)), &mut graph).unwrap();
        assert!(matches!(board.drag_state(), DragState::DraggingPedal { pedal, .. } if pedal == osc));
        apply_pointer(&mut board, PointerEvent::Drag { dx: 0.0, dy: 30.0 }, &mut graph).unwrap();
        assert_eq!(apply_pointer(&mut board, PointerEvent::Release, &mut graph).unwrap(), None);

        assert_eq!(board.pedal(osc).unwrap().position(), before.offset(0.0, 30.0));
        assert_eq!(board.drag_state(), DragState::Idle);
        board.verify_links().unwrap();
    }

    #[test]
    fn cancel_restores_and_late_release_is_ignored() {
        let mut graph = AudioGraph::new(48000.0);
        let mut board = Board::starter(BoardSettings::default(), &mut graph).unwrap();
        let links = board.audio_links();
        let (osc, before) = board
            .pedals()
            .next()
            .map(|(id, p)| (id, p.position()))
            .unwrap();

        for event in [
            PointerEvent::Press(before.offset(5.0, 5.0)),
            PointerEvent::Drag { dx: 400.0, dy: 0.0 },
            PointerEvent::Cancel,
            PointerEvent::Release,
        ] {
            apply_pointer(&mut board, event, &mut graph).unwrap();
        }

        assert_eq!(board.pedal(osc).unwrap().position(), before);
        assert_eq!(board.audio_links(), links);
    }

    #[test]
    fn painter_surface_emits_one_shape_per_draw_call() {
        let mut graph = AudioGraph::new(48000.0);
        let board = Board::starter(BoardSettings::default(), &mut graph).unwrap();
        let mut recording = RecordingSurface::new();
        board.draw(&mut recording);

        let ctx = egui::Context::default();
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            let painter = ctx.layer_painter(egui::LayerId::background());
            recording.replay(&mut PainterSurface::new(&painter, CanvasTransform::new(Pos2::ZERO)));
        });
        assert_eq!(output.shapes.len(), recording.commands().len());
    }
}
