//! Patch-cable records.
//!
//! A cable has two independently draggable ends. Each end is drawn as a
//! contact (the plug tip) and a case (the barrel). The stored coordinate of
//! an end is the outer-left corner of its plug at contact height: `x` is the
//! contact's left edge for a left end and the case's left edge for a right
//! end, `y` is the contact's top.
//!
//! ```text
//!   left end                          right end
//!   [contact][  case  ]~~~~ cord ~~~~[  case  ][contact]
//!   ^ (x1, y1)                       ^ (x2, y2)
//! ```
//!
//! Both ends share the same vertical convention: the contact spans
//! `[y, y + CONTACT_HEIGHT]` and the case is centred on it. The left end plugs
//! into a pedal's right edge (its output); the right end plugs into a pedal's
//! left edge (its input). When plugged, the face where contact meets case is
//! flush with the pedal edge, so the contact sits over the pedal.

use crate::geometry::{CubicBezier, Edges, Point, Rect, Side};
use crate::pedal::PedalId;
use crate::render::{Color, RenderSurface};

/// Width of a cable-end case.
pub const CASE_WIDTH: f64 = 50.0;
/// Height of a cable-end case.
pub const CASE_HEIGHT: f64 = 15.0;
/// Width of a cable-end contact.
pub const CONTACT_WIDTH: f64 = CASE_WIDTH * (2.0 / 3.0);
/// Height of a cable-end contact.
pub const CONTACT_HEIGHT: f64 = CASE_HEIGHT / 2.0;

/// Offset of a new cable's right end from its left end.
pub const DEFAULT_SPAN: Point = Point::new(400.0, 200.0);

/// Stroke width of the cord.
const CORD_WIDTH: f64 = 1.0;

/// Stable handle to a cable on a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CableId(pub(crate) u32);

impl CableId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for CableId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CableId({})", self.0)
    }
}

/// A patch cable on the board.
#[derive(Clone, Debug, PartialEq)]
pub struct Cable {
    pub(crate) left: Point,
    pub(crate) right: Point,
    pub(crate) moving: Option<Side>,
    /// Pedal whose output the left end is plugged into.
    pub(crate) input_pedal: Option<PedalId>,
    /// Pedal whose input the right end is plugged into.
    pub(crate) output_pedal: Option<PedalId>,
}

impl Cable {
    /// Creates an unplugged cable with its left end at `position` and its
    /// right end [`DEFAULT_SPAN`] away.
    pub fn new(position: Point) -> Self {
        Self::with_ends(position, position.offset(DEFAULT_SPAN.x, DEFAULT_SPAN.y))
    }

    /// Creates an unplugged cable with explicit end coordinates.
    pub fn with_ends(left: Point, right: Point) -> Self {
        Self {
            left,
            right,
            moving: None,
            input_pedal: None,
            output_pedal: None,
        }
    }

    /// Stored coordinate of one end.
    pub fn end(&self, side: Side) -> Point {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Pedal plugged into the given end.
    pub fn pedal(&self, side: Side) -> Option<PedalId> {
        match side {
            Side::Left => self.input_pedal,
            Side::Right => self.output_pedal,
        }
    }

    /// Pedal feeding this cable (plugged into the left end).
    pub fn input_pedal(&self) -> Option<PedalId> {
        self.input_pedal
    }

    /// Pedal fed by this cable (plugged into the right end).
    pub fn output_pedal(&self) -> Option<PedalId> {
        self.output_pedal
    }

    pub(crate) fn set_pedal(&mut self, side: Side, pedal: Option<PedalId>) {
        match side {
            Side::Left => self.input_pedal = pedal,
            Side::Right => self.output_pedal = pedal,
        }
    }

    /// The end armed for dragging, if any.
    pub fn moving(&self) -> Option<Side> {
        self.moving
    }

    /// Case rectangle of one end.
    pub fn case_rect(&self, side: Side) -> Rect {
        let p = self.end(side);
        let x = match side {
            Side::Left => p.x + CONTACT_WIDTH,
            Side::Right => p.x,
        };
        Rect::new(x, p.y - CONTACT_HEIGHT / 2.0, CASE_WIDTH, CASE_HEIGHT)
    }

    /// Contact rectangle of one end.
    pub fn contact_rect(&self, side: Side) -> Rect {
        let p = self.end(side);
        let x = match side {
            Side::Left => p.x,
            Side::Right => p.x + CASE_WIDTH,
        };
        Rect::new(x, p.y, CONTACT_WIDTH, CONTACT_HEIGHT)
    }

    /// Bounding box of case and contact, used for hit-testing.
    pub fn hit_box(&self, side: Side) -> Rect {
        let p = self.end(side);
        Rect::new(
            p.x,
            p.y - CONTACT_HEIGHT / 2.0,
            CASE_WIDTH + CONTACT_WIDTH,
            CASE_HEIGHT,
        )
    }

    /// `true` iff `p` is on the left end.
    pub fn is_inside_left(&self, p: Point) -> bool {
        self.hit_box(Side::Left).contains(p)
    }

    /// `true` iff `p` is on the right end.
    pub fn is_inside_right(&self, p: Point) -> bool {
        self.hit_box(Side::Right).contains(p)
    }

    /// `true` iff `p` is on either end.
    pub fn is_inside(&self, p: Point) -> bool {
        self.is_inside_left(p) || self.is_inside_right(p)
    }

    /// Arms the end under `p` for dragging (the left end wins if both are
    /// hit). Disarms when neither end is hit. Returns the armed end.
    pub fn set_moving(&mut self, p: Point) -> Option<Side> {
        self.moving = if self.is_inside_left(p) {
            Some(Side::Left)
        } else if self.is_inside_right(p) {
            Some(Side::Right)
        } else {
            None
        };
        self.moving
    }

    pub(crate) fn disarm(&mut self) {
        self.moving = None;
    }

    /// Moves the armed end by `(dx, dy)`. No-op when nothing is armed.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        if let Some(side) = self.moving {
            self.move_side(side, dx, dy);
        }
    }

    /// Moves one end by `(dx, dy)` regardless of which end is armed.
    pub fn move_side(&mut self, side: Side, dx: f64, dy: f64) {
        match side {
            Side::Left => self.left = self.left.offset(dx, dy),
            Side::Right => self.right = self.right.offset(dx, dy),
        }
    }

    /// Where an end meets a pedal edge: the contact/case face, at the
    /// contact's vertical centre.
    pub fn plug_point(&self, side: Side) -> Point {
        let p = self.end(side);
        let x = match side {
            Side::Left => p.x + CONTACT_WIDTH,
            Side::Right => p.x + CASE_WIDTH,
        };
        Point::new(x, p.y + CONTACT_HEIGHT / 2.0)
    }

    /// Horizontal offset that makes an end flush with the facing edge of a
    /// pedal: the right edge for the left end, the left edge for the right end.
    pub fn snap_delta(&self, side: Side, pedal: &Edges) -> f64 {
        let edge = match side {
            Side::Left => pedal.right,
            Side::Right => pedal.left,
        };
        edge - self.plug_point(side).x
    }

    /// The cord: from the outer face of the left case to the outer face of
    /// the right case.
    pub fn curve(&self) -> CubicBezier {
        let start = Point::new(
            self.left.x + CONTACT_WIDTH + CASE_WIDTH,
            self.left.y + CONTACT_HEIGHT / 2.0,
        );
        let end = Point::new(self.right.x, self.right.y + CONTACT_HEIGHT / 2.0);
        CubicBezier::slack(start, end)
    }

    /// Paints both ends and the cord.
    pub fn draw(&self, surface: &mut dyn RenderSurface) {
        for side in [Side::Left, Side::Right] {
            surface.fill_rect(self.contact_rect(side), Color::CABLE_CASE);
            surface.fill_rect(self.case_rect(side), Color::CABLE_CASE);
        }
        surface.stroke_bezier(&self.curve(), Color::CABLE_CORD, CORD_WIDTH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCommand, RecordingSurface};

    #[test]
    fn new_cable_spans_default_offset() {
        let c = Cable::new(Point::new(150.0, 150.0));
        assert_eq!(c.end(Side::Left), Point::new(150.0, 150.0));
        assert_eq!(c.end(Side::Right), Point::new(550.0, 350.0));
        assert_eq!(c.moving(), None);
        assert_eq!(c.pedal(Side::Left), None);
        assert_eq!(c.pedal(Side::Right), None);
    }

    #[test]
    fn hit_box_covers_case_and_contact() {
        let c = Cable::new(Point::new(0.0, 100.0));
        let top = 100.0 - CONTACT_HEIGHT / 2.0;
        assert!(c.is_inside_left(Point::new(0.0, top)));
        assert!(c.is_inside_left(Point::new(CASE_WIDTH + CONTACT_WIDTH, top + CASE_HEIGHT)));
        assert!(!c.is_inside_left(Point::new(CASE_WIDTH + CONTACT_WIDTH + 1.0, 100.0)));
        assert!(!c.is_inside_left(Point::new(10.0, top - 1.0)));
        assert!(c.is_inside_right(Point::new(410.0, 300.0)));
        assert!(!c.is_inside_right(Point::new(10.0, 100.0)));
    }

    #[test]
    fn set_moving_arms_and_disarms() {
        let mut c = Cable::new(Point::new(0.0, 100.0));
        assert_eq!(c.set_moving(Point::new(5.0, 100.0)), Some(Side::Left));
        assert_eq!(c.set_moving(Point::new(405.0, 300.0)), Some(Side::Right));
        assert_eq!(c.set_moving(Point::new(200.0, 200.0)), None);
        assert_eq!(c.moving(), None);
    }

    #[test]
    fn move_by_applies_to_armed_side_only() {
        let mut c = Cable::new(Point::new(0.0, 100.0));
        c.move_by(10.0, 10.0);
        assert_eq!(c, Cable::new(Point::new(0.0, 100.0)));

        c.set_moving(Point::new(405.0, 300.0));
        c.move_by(-5.0, 7.0);
        assert_eq!(c.end(Side::Left), Point::new(0.0, 100.0));
        assert_eq!(c.end(Side::Right), Point::new(395.0, 307.0));
    }

    #[test]
    fn snap_delta_makes_plug_point_flush() {
        let c = Cable::new(Point::new(195.0, 90.0));
        let edges = Edges {
            left: 100.0,
            right: 200.0,
            top: 10.0,
            bottom: 210.0,
        };
        let dx = c.snap_delta(Side::Left, &edges);
        let mut snapped = c.clone();
        snapped.move_side(Side::Left, dx, 0.0);
        assert!((snapped.plug_point(Side::Left).x - 200.0).abs() < 1e-9);

        let dx = c.snap_delta(Side::Right, &edges);
        snapped.move_side(Side::Right, dx, 0.0);
        assert!((snapped.plug_point(Side::Right).x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn curve_joins_outer_case_faces() {
        let c = Cable::with_ends(Point::new(0.0, 0.0), Point::new(300.0, 60.0));
        let curve = c.curve();
        let start_x = CONTACT_WIDTH + CASE_WIDTH;
        assert_eq!(curve.start, Point::new(start_x, CONTACT_HEIGHT / 2.0));
        assert_eq!(curve.end, Point::new(300.0, 60.0 + CONTACT_HEIGHT / 2.0));
        assert!((curve.control1.x - (start_x + (300.0 - start_x) / 3.0)).abs() < 1e-9);
        assert_eq!(curve.control1.y, curve.start.y);
        assert_eq!(curve.control2.y, curve.end.y);
    }

    #[test]
    fn draw_emits_four_rects_and_a_cord() {
        let c = Cable::new(Point::new(0.0, 0.0));
        let mut s = RecordingSurface::new();
        c.draw(&mut s);
        let rects = s
            .commands()
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::FillRect { .. }))
            .count();
        assert_eq!(rects, 4);
        assert!(matches!(
            s.commands().last(),
            Some(DrawCommand::StrokeBezier { .. })
        ));
    }
}
