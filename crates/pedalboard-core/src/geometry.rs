//! Board-space geometry: points, rectangles, edges and cable curves.
//!
//! All coordinates are in canvas pixels with the origin at the top-left and
//! `y` growing downward, matching the render surface.

/// A point (or a movement delta) in board space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` when both coordinates are finite.
    ///
    /// Pointer input that fails this check is rejected before it can reach
    /// stored positions.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns this point translated by `(dx, dy)`.
    #[inline]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// An axis-aligned rectangle given by its top-left corner and extent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// Left coordinate.
    pub x: f64,
    /// Top coordinate.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Closed containment test: points on the border are inside.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Returns the four edge coordinates.
    #[inline]
    pub fn edges(&self) -> Edges {
        Edges {
            left: self.x,
            right: self.x + self.width,
            top: self.y,
            bottom: self.y + self.height,
        }
    }
}

/// Edge coordinates of a rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edges {
    /// x of the left edge.
    pub left: f64,
    /// x of the right edge.
    pub right: f64,
    /// y of the top edge.
    pub top: f64,
    /// y of the bottom edge.
    pub bottom: f64,
}

/// One of the two ends of a cable.
///
/// The left end plugs into a pedal's output (its right edge); the right end
/// plugs into a pedal's input (its left edge).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The upstream end.
    Left,
    /// The downstream end.
    Right,
}

impl Side {
    /// Returns the opposite end.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A cubic Bézier segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
    /// Curve start.
    pub start: Point,
    /// First control point.
    pub control1: Point,
    /// Second control point.
    pub control2: Point,
    /// Curve end.
    pub end: Point,
}

impl CubicBezier {
    /// Builds the slack-cable curve between two contact points.
    ///
    /// The control points sit at one and two thirds of the horizontal span,
    /// taking their `y` from the start and end point respectively.
    pub fn slack(start: Point, end: Point) -> Self {
        let span = end.x - start.x;
        Self {
            start,
            control1: Point::new(start.x + span / 3.0, start.y),
            control2: Point::new(start.x + span * 2.0 / 3.0, end.y),
            end,
        }
    }

    /// Evaluates the curve at `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let (b0, b1, b2, b3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        Point::new(
            b0 * self.start.x + b1 * self.control1.x + b2 * self.control2.x + b3 * self.end.x,
            b0 * self.start.y + b1 * self.control1.y + b2 * self.control2.y + b3 * self.end.y,
        )
    }
}
