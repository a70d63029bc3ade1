//! Foundation types and helpers shared by the whole pipeline.
//!
//! Defines the push-style path-consumer protocol every pipeline stage
//! speaks, the fill rule, and the small rounding helpers the rasterizer
//! relies on.

// ============================================================================
// Rounding helpers
// ============================================================================

/// Ceiling of a double as a signed integer.
#[inline]
pub fn iceil(v: f64) -> i32 {
    v.ceil() as i32
}

/// Euclidean length of the segment (x0,y0)-(x1,y1).
#[inline]
pub fn line_len(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let dx = x1 - x0;
    let dy = y1 - y0;
    (dx * dx + dy * dy).sqrt()
}

// ============================================================================
// Fill rule
// ============================================================================

/// Winding rule for polygon filling.
///
/// Both rules share one span-accumulation code path: the winding sum is
/// tested against `fill_rule.mask()`, `0x1` for even-odd and all-ones for
/// non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

impl FillRule {
    /// The bitmask applied to the winding sum when deciding whether a span
    /// between two crossings is inside the shape.
    #[inline]
    pub fn mask(self) -> i32 {
        match self {
            FillRule::EvenOdd => 0x1,
            FillRule::NonZero => !0,
        }
    }
}

// ============================================================================
// PathConsumer — the push-style path protocol
// ============================================================================

/// Ordered stream of path commands.
///
/// Contract: `move_to` must precede any drawing command of a subpath,
/// `close_path` is optional per subpath, and `path_done` is called exactly
/// once after all subpaths. Coordinates are `f64` in device space; stages
/// that need subpixel precision scale internally.
pub trait PathConsumer {
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quad_to(&mut self, x1: f64, y1: f64, x: f64, y: f64);
    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64);
    fn close_path(&mut self);
    fn path_done(&mut self);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iceil() {
        assert_eq!(iceil(1.0), 1);
        assert_eq!(iceil(1.1), 2);
        assert_eq!(iceil(-1.1), -1);
        assert_eq!(iceil(0.0), 0);
    }

    #[test]
    fn test_line_len() {
        assert!((line_len(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < 1e-12);
        assert!((line_len(1.0, 1.0, 1.0, 1.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_fill_rule_mask() {
        assert_eq!(FillRule::EvenOdd.mask(), 1);
        assert_eq!(FillRule::NonZero.mask(), !0);
        // Non-zero: any non-zero sum is inside
        assert_ne!(3 & FillRule::NonZero.mask(), 0);
        assert_ne!(-2 & FillRule::NonZero.mask(), 0);
        // Even-odd: a sum of 2 is outside
        assert_eq!(2 & FillRule::EvenOdd.mask(), 0);
        assert_ne!(1 & FillRule::EvenOdd.mask(), 0);
    }
}
