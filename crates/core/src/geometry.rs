//! Units and coordinates.
//!
//! OOXML stores lengths in EMUs (English Metric Units). Field positions in the
//! layout contract are expressed in inches, which is what a template author
//! reads off the authoring tool.

use serde::{Deserialize, Serialize};

/// EMUs per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// EMUs per typographic point.
pub const EMU_PER_POINT: i64 = 12_700;

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Convert inches to EMUs.
pub fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH as f64).round() as i64
}

/// Convert EMUs to inches.
pub fn emu_to_inches(emu: i64) -> f64 {
    emu as f64 / EMU_PER_INCH as f64
}

/// Font size in points to the hundredths-of-a-point unit used by `a:rPr/@sz`.
pub fn points_to_hundredths(points: f64) -> u32 {
    (points * 100.0).round().max(0.0) as u32
}

/// A top-left coordinate in inches.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Both coordinates rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Position {
        Position::new(round_to(self.x, decimals), round_to(self.y, decimals))
    }
}

/// Width and height in inches.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn rounded(&self, decimals: u32) -> Size {
        Size::new(round_to(self.width, decimals), round_to(self.height, decimals))
    }
}

/// A shape's bounding box in EMUs, as stored in `a:xfrm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Rect {
    pub const fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }

    /// Build a rectangle from inch measurements.
    pub fn from_inches(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: inches_to_emu(x),
            y: inches_to_emu(y),
            cx: inches_to_emu(width),
            cy: inches_to_emu(height),
        }
    }

    /// Top-left corner in inches.
    pub fn position(&self) -> Position {
        Position::new(emu_to_inches(self.x), emu_to_inches(self.y))
    }

    /// Extent in inches.
    pub fn size(&self) -> Size {
        Size::new(emu_to_inches(self.cx), emu_to_inches(self.cy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.3937, 2), 0.39);
        assert_eq!(round_to(0.3937, 1), 0.4);
        assert_eq!(round_to(8.875, 1), 8.9);
    }

    #[test]
    fn test_emu_conversions() {
        assert_eq!(inches_to_emu(1.0), 914_400);
        assert_eq!(emu_to_inches(457_200), 0.5);
        assert_eq!(points_to_hundredths(9.0), 900);
        assert_eq!(points_to_hundredths(10.5), 1050);
    }

    #[test]
    fn test_rect_position_and_size() {
        let rect = Rect::from_inches(0.39, 0.17, 7.99, 0.43);
        assert_eq!(rect.position().rounded(2), Position::new(0.39, 0.17));
        assert_eq!(rect.size().rounded(2), Size::new(7.99, 0.43));
    }

    #[test]
    fn test_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);
        assert_eq!(b.distance(&b), 0.0);
    }
}
