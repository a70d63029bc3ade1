//! Bézier curve support for the flattener and the dasher.
//!
//! Two representations are used. The forward-differencing flattener in the
//! renderer works on the polynomial coefficients of the curve ([`Curve`]),
//! while the dasher subdivides control-point arrays directly with de
//! Casteljau splits. Control-point arrays are flat `[f64; 8]` buffers with
//! an explicit coordinate count: 6 for a quadratic (start, control, end),
//! 8 for a cubic (start, two controls, end).

// ============================================================================
// Curve — polynomial form
// ============================================================================

/// Polynomial coefficients of a quadratic or cubic Bézier segment.
///
/// `x(t) = ax*t^3 + bx*t^2 + cx*t + x0` (quadratics have `ax == 0`), plus
/// the coefficients of the derivative polynomials (`dax = 3*ax`,
/// `dbx = 2*bx`) which the adaptive forward-differencing setup reads
/// directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Curve {
    pub ax: f64,
    pub ay: f64,
    pub bx: f64,
    pub by: f64,
    pub cx: f64,
    pub cy: f64,
    pub dax: f64,
    pub day: f64,
    pub dbx: f64,
    pub dby: f64,
}

impl Curve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cubic segment `(x1,y1)..(x4,y4)` with interior controls
    /// `(x2,y2)` and `(x3,y3)`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_cubic(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
        x4: f64,
        y4: f64,
    ) {
        self.ax = 3.0 * (x2 - x3) + x4 - x1;
        self.ay = 3.0 * (y2 - y3) + y4 - y1;
        self.bx = 3.0 * (x1 - 2.0 * x2 + x3);
        self.by = 3.0 * (y1 - 2.0 * y2 + y3);
        self.cx = 3.0 * (x2 - x1);
        self.cy = 3.0 * (y2 - y1);

        self.dax = 3.0 * self.ax;
        self.day = 3.0 * self.ay;
        self.dbx = 2.0 * self.bx;
        self.dby = 2.0 * self.by;
    }

    /// Load a quadratic segment `(x1,y1)..(x3,y3)` with control `(x2,y2)`.
    pub fn set_quad(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.ax = 0.0;
        self.ay = 0.0;
        self.bx = x1 - 2.0 * x2 + x3;
        self.by = y1 - 2.0 * y2 + y3;
        self.cx = 2.0 * (x2 - x1);
        self.cy = 2.0 * (y2 - y1);

        self.dax = 0.0;
        self.day = 0.0;
        self.dbx = 2.0 * self.bx;
        self.dby = 2.0 * self.by;
    }
}

// ============================================================================
// de Casteljau subdivision on control-point arrays
// ============================================================================

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Split the curve in `src` (with `coords` valid coordinates, 6 or 8) at
/// parameter `t`, writing the two halves into `left` and `right`. The last
/// point of `left` equals the first point of `right`.
pub fn subdivide_at(t: f64, src: &[f64; 8], left: &mut [f64; 8], right: &mut [f64; 8], coords: usize) {
    match coords {
        6 => {
            let x12 = lerp(src[0], src[2], t);
            let y12 = lerp(src[1], src[3], t);
            let x23 = lerp(src[2], src[4], t);
            let y23 = lerp(src[3], src[5], t);
            let x123 = lerp(x12, x23, t);
            let y123 = lerp(y12, y23, t);
            left[..6].copy_from_slice(&[src[0], src[1], x12, y12, x123, y123]);
            right[..6].copy_from_slice(&[x123, y123, x23, y23, src[4], src[5]]);
        }
        8 => {
            let x12 = lerp(src[0], src[2], t);
            let y12 = lerp(src[1], src[3], t);
            let x23 = lerp(src[2], src[4], t);
            let y23 = lerp(src[3], src[5], t);
            let x34 = lerp(src[4], src[6], t);
            let y34 = lerp(src[5], src[7], t);
            let x123 = lerp(x12, x23, t);
            let y123 = lerp(y12, y23, t);
            let x234 = lerp(x23, x34, t);
            let y234 = lerp(y23, y34, t);
            let x1234 = lerp(x123, x234, t);
            let y1234 = lerp(y123, y234, t);
            left.copy_from_slice(&[src[0], src[1], x12, y12, x123, y123, x1234, y1234]);
            right.copy_from_slice(&[x1234, y1234, x234, y234, x34, y34, src[6], src[7]]);
        }
        _ => unreachable!("curve arrays hold 6 or 8 coordinates"),
    }
}

/// True if every control point of the curve coincides with the first one.
/// Such a curve has no arc length and must be skipped before it reaches the
/// length-parameterizing iterator.
pub fn is_point_curve(pts: &[f64]) -> bool {
    let (x0, y0) = (pts[0], pts[1]);
    pts.chunks_exact(2).skip(1).all(|p| p[0] == x0 && p[1] == y0)
}

// ============================================================================
// Tests
// ============================================================================
