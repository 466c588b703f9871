//! Render-surface boundary.
//!
//! Pedals and cables paint themselves through [`RenderSurface`]; the surface
//! holds no board state. [`RecordingSurface`] keeps the issued commands as a
//! display list, which is what the tests inspect.

use crate::geometry::{CubicBezier, Rect};

/// An opaque RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Cable case/contact grey.
    pub const CABLE_CASE: Self = Self::rgb(0x8a, 0x8a, 0x8a);
    /// Cable cord black.
    pub const CABLE_CORD: Self = Self::rgb(0, 0, 0);

    /// Creates a color from channel values.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Formats as lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A 2-D drawing target.
pub trait RenderSurface {
    /// Erases everything drawn so far.
    fn clear(&mut self);

    /// Fills `rect` with `color`.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Strokes a cubic Bézier path.
    fn stroke_bezier(&mut self, curve: &CubicBezier, color: Color, width: f64);
}

/// One recorded drawing call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// [`RenderSurface::clear`].
    Clear,
    /// [`RenderSurface::fill_rect`].
    FillRect {
        /// Filled area.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// [`RenderSurface::stroke_bezier`].
    StrokeBezier {
        /// Stroked curve.
        curve: CubicBezier,
        /// Stroke color.
        color: Color,
        /// Stroke width in pixels.
        width: f64,
    },
}

/// A surface that records commands instead of painting.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    /// Creates an empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded since the last clear.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Replays the recording onto another surface.
    pub fn replay(&self, target: &mut dyn RenderSurface) {
        for cmd in &self.commands {
            match cmd {
                DrawCommand::Clear => target.clear(),
                DrawCommand::FillRect { rect, color } => target.fill_rect(*rect, *color),
                DrawCommand::StrokeBezier {
                    curve,
                    color,
                    width,
                } => target.stroke_bezier(curve, *color, *width),
            }
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_bezier(&mut self, curve: &CubicBezier, color: Color, width: f64) {
        self.commands.push(DrawCommand::StrokeBezier {
            curve: *curve,
            color,
            width,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let c = Color::from_hex("#1a2B3c").unwrap();
        assert_eq!(c, Color::rgb(0x1a, 0x2b, 0x3c));
        assert_eq!(c.to_hex(), "#1a2b3c");
        assert_eq!(Color::from_hex("ff0000"), Some(Color::rgb(255, 0, 0)));
    }

    #[test]
    fn hex_rejects_malformed() {
        for bad in ["", "#fff", "#gg0000", "#12345678", "#ééé"] {
            assert_eq!(Color::from_hex(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn clear_resets_recording() {
        let mut s = RecordingSurface::new();
        s.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::CABLE_CASE);
        s.clear();
        assert_eq!(s.commands(), &[DrawCommand::Clear]);
    }

    #[test]
    fn replay_copies_commands() {
        let mut a = RecordingSurface::new();
        a.clear();
        a.fill_rect(Rect::new(1.0, 2.0, 3.0, 4.0), Color::CABLE_CORD);
        let mut b = RecordingSurface::new();
        a.replay(&mut b);
        assert_eq!(a.commands(), b.commands());
    }
}
