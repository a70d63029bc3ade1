//! Scanline rasterizer.
//!
//! [`Renderer`] consumes a path and produces an antialiased coverage grid.
//! Incoming segments are flattened (curves via adaptive forward
//! differencing) into edges over a subpixel grid, the edges are indexed by
//! the scanline where they first appear, and a single top-to-bottom sweep
//! maintains the active edge set, computes sorted crossings per scanline,
//! and accumulates per-pixel coverage deltas that are run-length encoded
//! into a [`CoverageCache`] one pixel row at a time.
//!
//! All arithmetic during the sweep is on integer subpixel coordinates; the
//! only floating point left is each edge's current x intercept, stepped by
//! its slope once per scanline.

use log::debug;

use crate::basics::{iceil, FillRule, PathConsumer};
use crate::cache::CoverageCache;
use crate::curve::Curve;

const NIL: i32 = -1;

// Adaptive forward differencing bounds, in subpixel units.
const CUBIC_COUNT_LG: u32 = 3;
const CUBIC_DEC_BND: f64 = 20.0;
const CUBIC_INC_BND: f64 = 8.0;
const QUAD_COUNT_LG: u32 = 4;
const QUAD_DEC_BND: f64 = 32.0;

/// One monotonically-descending edge in the arena. `next` chains edges
/// that start on the same scanline; `cur_x` is the x intercept at the
/// current scanline, advanced by `slope` as the sweep moves down.
#[derive(Debug, Clone)]
struct Edge {
    y_max: i32,
    cur_x: f64,
    slope: f64,
    orient: i32,
    next: i32,
}

/// Path-consuming scanline rasterizer.
///
/// Feed a path through the [`PathConsumer`] methods; `path_done` implicitly
/// closes the last subpath and runs the sweep. The result is then available
/// from [`coverage`](Renderer::coverage) or
/// [`into_coverage`](Renderer::into_coverage).
pub struct Renderer {
    lg_x: u32,
    lg_y: u32,
    scale_x: f64,
    scale_y: f64,

    // Clip bounds in subpixel units, max exclusive.
    bounds_min_x: i32,
    bounds_min_y: i32,
    bounds_max_x: i32,
    bounds_max_y: i32,
    fill_rule: FillRule,

    edges: Vec<Edge>,
    // Per-scanline chain heads and counts. The count keeps twice the number
    // of edges starting on the scanline in its high bits; the low bit marks
    // scanlines where some edge ends and the active set needs pruning.
    edge_buckets: Vec<i32>,
    edge_bucket_counts: Vec<u32>,

    // Accumulated subpixel bounds of all added edges.
    edge_min_x: f64,
    edge_max_x: f64,
    edge_min_y: f64,
    edge_max_y: f64,

    // Subpath start and current point, subpixel units.
    sx0: f64,
    sy0: f64,
    x0: f64,
    y0: f64,

    curve: Curve,
    cache: Option<CoverageCache>,
}

impl Renderer {
    /// Default subpixel resolution: 8x8 positions per pixel.
    pub const DEFAULT_SUBPIXEL_LG_X: u32 = 3;
    pub const DEFAULT_SUBPIXEL_LG_Y: u32 = 3;

    /// A renderer clipped to the pixel rectangle at `(pix_x, pix_y)` of
    /// size `pix_w` x `pix_h`, sampling `1 << lg_x` by `1 << lg_y` subpixel
    /// positions per pixel. A fully covered pixel accumulates coverage
    /// `(1 << lg_x) * (1 << lg_y)`.
    pub fn new(
        pix_x: i32,
        pix_y: i32,
        pix_w: i32,
        pix_h: i32,
        fill_rule: FillRule,
        lg_x: u32,
        lg_y: u32,
    ) -> Self {
        let height = ((pix_h.max(0)) << lg_y) as usize;
        Self {
            lg_x,
            lg_y,
            scale_x: (1i32 << lg_x) as f64,
            scale_y: (1i32 << lg_y) as f64,
            bounds_min_x: pix_x << lg_x,
            bounds_min_y: pix_y << lg_y,
            bounds_max_x: (pix_x + pix_w) << lg_x,
            bounds_max_y: (pix_y + pix_h) << lg_y,
            fill_rule,
            edges: Vec::new(),
            edge_buckets: vec![NIL; height + 1],
            edge_bucket_counts: vec![0; height + 1],
            edge_min_x: f64::INFINITY,
            edge_max_x: f64::NEG_INFINITY,
            edge_min_y: f64::INFINITY,
            edge_max_y: f64::NEG_INFINITY,
            sx0: 0.0,
            sy0: 0.0,
            x0: 0.0,
            y0: 0.0,
            curve: Curve::new(),
            cache: None,
        }
    }

    /// The coverage produced by the sweep.
    ///
    /// Panics if called before `path_done`; querying an unfinished render
    /// is a programming error.
    pub fn coverage(&self) -> &CoverageCache {
        self.cache
            .as_ref()
            .expect("coverage queried before path_done()")
    }

    /// Consume the renderer, returning the coverage. Panics if called
    /// before `path_done`.
    pub fn into_coverage(self) -> CoverageCache {
        self.cache.expect("coverage queried before path_done()")
    }

    // ------------------------------------------------------------------------
    // Edge construction
    // ------------------------------------------------------------------------

    /// Add one line segment in subpixel coordinates. Horizontal segments
    /// and segments entirely outside the vertical clip range cross no
    /// scanline and are dropped.
    fn add_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let (x1, y1, x2, y2, orient) = if y2 < y1 {
            (x2, y2, x1, y1, 0)
        } else {
            (x1, y1, x2, y2, 1)
        };
        let first_crossing = iceil(y1).max(self.bounds_min_y);
        let last_crossing = iceil(y2).min(self.bounds_max_y);
        if first_crossing >= last_crossing {
            return;
        }

        if y1 < self.edge_min_y {
            self.edge_min_y = y1;
        }
        if y2 > self.edge_max_y {
            self.edge_max_y = y2;
        }
        let (seg_min_x, seg_max_x) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
        if seg_min_x < self.edge_min_x {
            self.edge_min_x = seg_min_x;
        }
        if seg_max_x > self.edge_max_x {
            self.edge_max_x = seg_max_x;
        }

        let slope = (x2 - x1) / (y2 - y1);
        let cur_x = x1 + (first_crossing as f64 - y1) * slope;
        let bucket = (first_crossing - self.bounds_min_y) as usize;
        let idx = self.edges.len() as i32;
        self.edges.push(Edge {
            y_max: last_crossing,
            cur_x,
            slope,
            orient,
            next: self.edge_buckets[bucket],
        });
        self.edge_buckets[bucket] = idx;
        self.edge_bucket_counts[bucket] += 2;
        self.edge_bucket_counts[(last_crossing - self.bounds_min_y) as usize] |= 0x1;
    }

    // ------------------------------------------------------------------------
    // Curve flattening (adaptive forward differencing)
    // ------------------------------------------------------------------------

    /// Walk the cubic loaded into `self.curve` with adaptively-sized steps:
    /// halve the step while the second differences exceed the decrement
    /// bound, double it while the first differences stay below the
    /// increment bound. The final step lands exactly on `(xe, ye)`.
    fn flatten_cubic(&mut self, xe: f64, ye: f64) {
        let c = self.curve;
        let mut count = 1u32 << CUBIC_COUNT_LG;
        let f = count as f64;
        let mut dddx = 2.0 * c.dax / (f * f * f);
        let mut dddy = 2.0 * c.day / (f * f * f);
        let mut ddx = dddx + c.dbx / (f * f);
        let mut ddy = dddy + c.dby / (f * f);
        let mut dx = c.ax / (f * f * f) + c.bx / (f * f) + c.cx / f;
        let mut dy = c.ay / (f * f * f) + c.by / (f * f) + c.cy / f;

        let (mut x0, mut y0) = (self.x0, self.y0);
        while count > 0 {
            while ddx.abs() > CUBIC_DEC_BND || ddy.abs() > CUBIC_DEC_BND {
                dddx /= 8.0;
                dddy /= 8.0;
                ddx = ddx / 4.0 - dddx;
                ddy = ddy / 4.0 - dddy;
                dx = (dx - ddx) / 2.0;
                dy = (dy - ddy) / 2.0;
                count <<= 1;
            }
            while count % 2 == 0 && dx.abs() <= CUBIC_INC_BND && dy.abs() <= CUBIC_INC_BND {
                dx = 2.0 * dx + ddx;
                dy = 2.0 * dy + ddy;
                ddx = 4.0 * (ddx + dddx);
                ddy = 4.0 * (ddy + dddy);
                dddx *= 8.0;
                dddy *= 8.0;
                count >>= 1;
            }
            count -= 1;
            let (x1, y1) = if count > 0 {
                let x1 = x0 + dx;
                let y1 = y0 + dy;
                dx += ddx;
                dy += ddy;
                ddx += dddx;
                ddy += dddy;
                (x1, y1)
            } else {
                (xe, ye)
            };
            self.add_line(x0, y0, x1, y1);
            x0 = x1;
            y0 = y1;
        }
        self.x0 = xe;
        self.y0 = ye;
    }

    /// Quadratic variant: no third difference, so the step only ever needs
    /// halving.
    fn flatten_quad(&mut self, xe: f64, ye: f64) {
        let c = self.curve;
        let mut count = 1u32 << QUAD_COUNT_LG;
        let f = count as f64;
        let mut ddx = c.dbx / (f * f);
        let mut ddy = c.dby / (f * f);
        let mut dx = c.bx / (f * f) + c.cx / f;
        let mut dy = c.by / (f * f) + c.cy / f;

        let (mut x0, mut y0) = (self.x0, self.y0);
        while count > 0 {
            while ddx.abs() > QUAD_DEC_BND || ddy.abs() > QUAD_DEC_BND {
                ddx /= 4.0;
                ddy /= 4.0;
                dx = (dx - ddx) / 2.0;
                dy = (dy - ddy) / 2.0;
                count <<= 1;
            }
            count -= 1;
            let (x1, y1) = if count > 0 {
                let x1 = x0 + dx;
                let y1 = y0 + dy;
                dx += ddx;
                dy += ddy;
                (x1, y1)
            } else {
                (xe, ye)
            };
            self.add_line(x0, y0, x1, y1);
            x0 = x1;
            y0 = y1;
        }
        self.x0 = xe;
        self.y0 = ye;
    }

    // ------------------------------------------------------------------------
    // Sweep
    // ------------------------------------------------------------------------

    fn end_rendering(&mut self) {
        let spx = 1i32 << self.lg_x;
        let spy = 1i32 << self.lg_y;
        let alpha_max = (spx * spy) as u32;

        if self.edges.is_empty() {
            debug!("nothing to rasterize: no edges inside the clip");
            self.cache = Some(CoverageCache::empty(alpha_max));
            return;
        }

        let sp_min_x = iceil(self.edge_min_x).max(self.bounds_min_x);
        let sp_max_x = iceil(self.edge_max_x).min(self.bounds_max_x);
        let sp_min_y = iceil(self.edge_min_y).max(self.bounds_min_y);
        let sp_max_y = iceil(self.edge_max_y).min(self.bounds_max_y);

        let pix_min_x = sp_min_x >> self.lg_x;
        let pix_max_x = (sp_max_x + (spx - 1)) >> self.lg_x;
        let pix_min_y = sp_min_y >> self.lg_y;
        let pix_max_y = (sp_max_y + (spy - 1)) >> self.lg_y;

        if pix_min_x >= pix_max_x || pix_min_y >= pix_max_y {
            debug!("nothing to rasterize: empty clipped bounds");
            self.cache = Some(CoverageCache::empty(alpha_max));
            return;
        }

        let mut cache = CoverageCache::new(pix_min_x, pix_min_y, pix_max_x, pix_max_y, alpha_max);
        self.sweep(sp_min_y, sp_max_y, pix_min_x, pix_max_x, &mut cache);
        debug!(
            "rasterized {} edges into {}x{} pixels at ({}, {})",
            self.edges.len(),
            pix_max_x - pix_min_x,
            pix_max_y - pix_min_y,
            pix_min_x,
            pix_min_y
        );
        self.cache = Some(cache);
    }

    fn sweep(
        &mut self,
        sp_min_y: i32,
        sp_max_y: i32,
        pix_min_x: i32,
        pix_max_x: i32,
        cache: &mut CoverageCache,
    ) {
        let mask = self.fill_rule.mask();
        let lg_x = self.lg_x;
        let spx = 1i32 << lg_x;
        let sub_mask_x = spx - 1;
        let mask_y = (1i32 << self.lg_y) - 1;
        let bbox_x0 = pix_min_x << lg_x;
        let bbox_x1 = pix_max_x << lg_x;

        let pix_w = (pix_max_x - pix_min_x) as usize;
        // Coverage deltas for the pixel row being accumulated. Boundary
        // spills can land one past the last pixel, hence the two spare
        // slots.
        let mut alpha = vec![0i32; pix_w + 2];
        let mut active: Vec<i32> = Vec::new();
        let mut crossings: Vec<i32> = Vec::new();
        // Touched pixel columns of the current row, relative to pix_min_x.
        let mut row_min = i32::MAX;
        let mut row_max = i32::MIN;

        for cur_y in sp_min_y..sp_max_y {
            let bucket = (cur_y - self.bounds_min_y) as usize;

            if self.edge_bucket_counts[bucket] & 0x1 != 0 {
                let edges = &self.edges;
                active.retain(|&e| edges[e as usize].y_max > cur_y);
            }
            if self.edge_bucket_counts[bucket] >> 1 != 0 {
                let mut e = self.edge_buckets[bucket];
                while e != NIL {
                    active.push(e);
                    e = self.edges[e as usize].next;
                }
            }

            // Crossings carry the orientation in the low bit so ties sort
            // negative-orientation first. The active list stays in nearly
            // the same order between scanlines, so insertion sort is cheap.
            crossings.clear();
            for &ei in &active {
                let edge = &mut self.edges[ei as usize];
                let cross = ((edge.cur_x as i32) << 1) | edge.orient;
                edge.cur_x += edge.slope;

                let mut j = crossings.len();
                crossings.push(cross);
                while j > 0 && crossings[j - 1] > cross {
                    crossings[j] = crossings[j - 1];
                    j -= 1;
                }
                crossings[j] = cross;
            }

            let mut sum = 0i32;
            let mut prev = bbox_x0;
            for &cross in crossings.iter() {
                let curx = cross >> 1;
                if sum & mask != 0 {
                    let x0 = prev.max(bbox_x0);
                    let x1 = curx.min(bbox_x1);
                    if x0 < x1 {
                        let rx0 = x0 - bbox_x0;
                        let rx1 = x1 - bbox_x0;
                        let pix_x = rx0 >> lg_x;
                        let pix_x_last = (rx1 - 1) >> lg_x;
                        if pix_x == pix_x_last {
                            alpha[pix_x as usize] += rx1 - rx0;
                            alpha[(pix_x + 1) as usize] -= rx1 - rx0;
                        } else {
                            let pix_x_end = rx1 >> lg_x;
                            alpha[pix_x as usize] += spx - (rx0 & sub_mask_x);
                            alpha[(pix_x + 1) as usize] += rx0 & sub_mask_x;
                            alpha[pix_x_end as usize] -= spx - (rx1 & sub_mask_x);
                            alpha[(pix_x_end + 1) as usize] -= rx1 & sub_mask_x;
                        }
                        row_min = row_min.min(pix_x);
                        row_max = row_max.max(pix_x_last);
                    }
                }
                sum += ((cross & 0x1) << 1) - 1;
                prev = curx;
            }

            if cur_y & mask_y == mask_y {
                Self::emit_row(
                    cache,
                    &mut alpha,
                    cur_y >> self.lg_y,
                    pix_min_x,
                    &mut row_min,
                    &mut row_max,
                );
            }
        }
        // Bottom pixel row may be only partially swept.
        if (sp_max_y - 1) & mask_y != mask_y {
            Self::emit_row(
                cache,
                &mut alpha,
                (sp_max_y - 1) >> self.lg_y,
                pix_min_x,
                &mut row_min,
                &mut row_max,
            );
        }
    }

    /// Prefix-sum the delta row into coverage values, RLE them into the
    /// cache, and clear the touched span for the next row. Rows no span
    /// touched stay out of the cache entirely.
    fn emit_row(
        cache: &mut CoverageCache,
        alpha: &mut [i32],
        pix_y: i32,
        pix_min_x: i32,
        row_min: &mut i32,
        row_max: &mut i32,
    ) {
        if *row_max >= *row_min {
            let from = *row_min as usize;
            let to = *row_max as usize;
            cache.start_row(pix_y, pix_min_x + *row_min);

            let mut run_len = 1u32;
            let mut start_val = alpha[from];
            for i in from + 1..=to {
                let next_val = start_val + alpha[i];
                if next_val == start_val {
                    run_len += 1;
                } else {
                    cache.add_run(start_val, run_len);
                    run_len = 1;
                    start_val = next_val;
                }
            }
            cache.add_run(start_val, run_len);

            for a in &mut alpha[from..=to + 1] {
                *a = 0;
            }
        }
        *row_min = i32::MAX;
        *row_max = i32::MIN;
    }
}

impl PathConsumer for Renderer {
    fn move_to(&mut self, x: f64, y: f64) {
        self.close_path();
        self.sx0 = x * self.scale_x;
        self.sy0 = y * self.scale_y;
        self.x0 = self.sx0;
        self.y0 = self.sy0;
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let x1 = x * self.scale_x;
        let y1 = y * self.scale_y;
        self.add_line(self.x0, self.y0, x1, y1);
        self.x0 = x1;
        self.y0 = y1;
    }

    fn quad_to(&mut self, x1: f64, y1: f64, x: f64, y: f64) {
        let xe = x * self.scale_x;
        let ye = y * self.scale_y;
        self.curve.set_quad(
            self.x0,
            self.y0,
            x1 * self.scale_x,
            y1 * self.scale_y,
            xe,
            ye,
        );
        self.flatten_quad(xe, ye);
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        let xe = x * self.scale_x;
        let ye = y * self.scale_y;
        self.curve.set_cubic(
            self.x0,
            self.y0,
            x1 * self.scale_x,
            y1 * self.scale_y,
            x2 * self.scale_x,
            y2 * self.scale_y,
            xe,
            ye,
        );
        self.flatten_cubic(xe, ye);
    }

    fn close_path(&mut self) {
        self.add_line(self.x0, self.y0, self.sx0, self.sy0);
        self.x0 = self.sx0;
        self.y0 = self.sy0;
    }

    fn path_done(&mut self) {
        self.close_path();
        self.end_rendering();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CoverageRun;

    fn run(v: u32, l: u32) -> CoverageRun {
        CoverageRun { value: v, len: l }
    }

    fn rows_of(r: &Renderer) -> Vec<(i32, i32, Vec<CoverageRun>)> {
        r.coverage()
            .rows()
            .map(|(y, x, runs)| (y, x, runs.to_vec()))
            .collect()
    }

    fn render_square(fill_rule: FillRule, x0: f64, y0: f64, x1: f64, y1: f64) -> Renderer {
        let mut r = Renderer::new(0, 0, 16, 16, fill_rule, 2, 2);
        r.move_to(x0, y0);
        r.line_to(x1, y0);
        r.line_to(x1, y1);
        r.line_to(x0, y1);
        r.close_path();
        r.path_done();
        r
    }

    #[test]
    fn test_axis_aligned_square() {
        // 4x4 pixel square on integer boundaries at 4x4 subsampling: every
        // covered pixel saturates at 16, one run per row.
        let r = render_square(FillRule::NonZero, 2.0, 2.0, 6.0, 6.0);
        let c = r.coverage();
        assert_eq!(
            (c.bbox_x0(), c.bbox_y0(), c.bbox_x1(), c.bbox_y1()),
            (2, 2, 6, 6)
        );
        assert_eq!(c.alpha_max(), 16);
        for (y, x0, runs) in c.rows() {
            assert!((2..6).contains(&y));
            assert_eq!(x0, 2);
            assert_eq!(runs, &[run(16, 4)]);
        }
    }

    #[test]
    fn test_half_pixel_offset_square() {
        // Shift the square right by half a pixel: the left and right border
        // columns each get half coverage.
        let r = render_square(FillRule::NonZero, 2.5, 2.0, 6.5, 6.0);
        for (_, x0, runs) in r.coverage().rows() {
            assert_eq!(x0, 2);
            assert_eq!(runs, &[run(8, 1), run(16, 3), run(8, 1)]);
        }
    }

    #[test]
    fn test_winding_rules_agree_on_simple_path() {
        let a = render_square(FillRule::NonZero, 2.0, 2.0, 6.0, 6.0);
        let b = render_square(FillRule::EvenOdd, 2.0, 2.0, 6.0, 6.0);
        assert_eq!(rows_of(&a), rows_of(&b));
    }

    #[test]
    fn test_double_wound_square_differs_by_rule() {
        // The same square traced twice in the same direction: interior
        // winding is 2, so non-zero fills it and even-odd leaves it empty.
        let trace = |rule| {
            let mut r = Renderer::new(0, 0, 16, 16, rule, 2, 2);
            r.move_to(2.0, 2.0);
            for _ in 0..2 {
                r.line_to(6.0, 2.0);
                r.line_to(6.0, 6.0);
                r.line_to(2.0, 6.0);
                r.line_to(2.0, 2.0);
            }
            r.path_done();
            r
        };
        let nz = trace(FillRule::NonZero);
        let eo = trace(FillRule::EvenOdd);

        for (_, _, runs) in nz.coverage().rows() {
            assert_eq!(runs, &[run(16, 4)]);
        }
        for (_, _, runs) in eo.coverage().rows() {
            assert!(runs.is_empty());
        }
    }

    #[test]
    fn test_opposite_windings_cancel_under_nonzero() {
        // Two overlapping squares traced in opposite directions: the
        // overlap has winding 0, so non-zero leaves it uncovered while the
        // single-wound remainders stay full.
        let mut r = Renderer::new(0, 0, 16, 16, FillRule::NonZero, 2, 2);
        r.move_to(1.0, 1.0);
        r.line_to(5.0, 1.0);
        r.line_to(5.0, 5.0);
        r.line_to(1.0, 5.0);
        r.close_path();
        r.move_to(3.0, 3.0);
        r.line_to(3.0, 7.0);
        r.line_to(7.0, 7.0);
        r.line_to(7.0, 3.0);
        r.close_path();
        r.path_done();
        let c = r.coverage();

        // Row inside the first square only.
        assert_eq!(c.row(1).unwrap(), (1, &[run(16, 4)][..]));
        // Row through the overlap: full, hole, full.
        assert_eq!(
            c.row(3).unwrap(),
            (1, &[run(16, 2), run(0, 2), run(16, 2)][..])
        );
        // Row inside the second square only.
        assert_eq!(c.row(6).unwrap(), (3, &[run(16, 4)][..]));
    }

    #[test]
    fn test_triangle_partial_coverage() {
        // Right triangle (0,0)-(4,0)-(0,4). Pixels crossed by the diagonal
        // get the exact subpixel sample count; the rest are full or empty.
        let mut r = Renderer::new(0, 0, 8, 8, FillRule::NonZero, 2, 2);
        r.move_to(0.0, 0.0);
        r.line_to(4.0, 0.0);
        r.line_to(0.0, 4.0);
        r.close_path();
        r.path_done();

        assert_eq!(
            rows_of(&r),
            vec![
                (0, 0, vec![run(16, 3), run(10, 1)]),
                (1, 0, vec![run(16, 2), run(10, 1)]),
                (2, 0, vec![run(16, 1), run(10, 1)]),
                (3, 0, vec![run(10, 1)]),
            ]
        );
    }

    #[test]
    fn test_coverage_never_exceeds_alpha_max() {
        let mut r = Renderer::new(0, 0, 32, 32, FillRule::NonZero, 3, 3);
        r.move_to(1.3, 2.7);
        r.line_to(29.1, 5.2);
        r.line_to(17.8, 30.0);
        r.line_to(3.0, 22.4);
        r.close_path();
        r.path_done();
        let c = r.coverage();
        let mut total = 0u64;
        for (_, _, runs) in c.rows() {
            for run in runs {
                assert!(run.value <= c.alpha_max());
                total += (run.value * run.len) as u64;
            }
        }
        assert!(total > 0);
    }

    #[test]
    fn test_determinism() {
        let build = || {
            let mut r = Renderer::new(0, 0, 32, 32, FillRule::NonZero, 3, 3);
            r.move_to(1.3, 2.7);
            r.curve_to(8.0, 12.0, 20.0, -3.0, 29.1, 5.2);
            r.quad_to(31.0, 18.0, 17.8, 30.0);
            r.line_to(3.0, 22.4);
            r.close_path();
            r.path_done();
            rows_of(&r)
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_clip_bounds() {
        // Square larger than the 2x2 clip: output is exactly the clip,
        // fully covered.
        let mut r = Renderer::new(0, 0, 2, 2, FillRule::NonZero, 2, 2);
        r.move_to(-2.0, -2.0);
        r.line_to(3.0, -2.0);
        r.line_to(3.0, 3.0);
        r.line_to(-2.0, 3.0);
        r.close_path();
        r.path_done();
        let c = r.coverage();
        assert_eq!(
            (c.bbox_x0(), c.bbox_y0(), c.bbox_x1(), c.bbox_y1()),
            (0, 0, 2, 2)
        );
        for (_, x0, runs) in c.rows() {
            assert_eq!(x0, 0);
            assert_eq!(runs, &[run(16, 2)]);
        }
    }

    #[test]
    fn test_horizontal_collinear_points_do_not_change_output() {
        // Extra collinear points on the horizontal sides produce extra
        // horizontal segments, all of which are dropped.
        let mut r = Renderer::new(0, 0, 16, 16, FillRule::NonZero, 2, 2);
        r.move_to(2.0, 2.0);
        r.line_to(4.0, 2.0);
        r.line_to(6.0, 2.0);
        r.line_to(6.0, 6.0);
        r.line_to(4.0, 6.0);
        r.line_to(2.0, 6.0);
        r.close_path();
        r.path_done();
        let plain = render_square(FillRule::NonZero, 2.0, 2.0, 6.0, 6.0);
        assert_eq!(rows_of(&r), rows_of(&plain));
    }

    #[test]
    fn test_empty_path() {
        let mut r = Renderer::new(0, 0, 16, 16, FillRule::NonZero, 2, 2);
        r.path_done();
        assert!(r.coverage().is_empty());
    }

    #[test]
    fn test_path_outside_clip_is_empty() {
        let mut r = Renderer::new(0, 0, 4, 4, FillRule::NonZero, 2, 2);
        r.move_to(10.0, 10.0);
        r.line_to(12.0, 10.0);
        r.line_to(12.0, 12.0);
        r.close_path();
        r.path_done();
        assert!(r.coverage().is_empty());
    }

    #[test]
    #[should_panic(expected = "before path_done")]
    fn test_coverage_before_path_done_panics() {
        let mut r = Renderer::new(0, 0, 16, 16, FillRule::NonZero, 2, 2);
        r.move_to(2.0, 2.0);
        r.line_to(6.0, 2.0);
        let _ = r.coverage();
    }

    #[test]
    fn test_unclosed_subpath_is_closed_implicitly() {
        // Triangle without close_path: path_done closes it.
        let mut r = Renderer::new(0, 0, 8, 8, FillRule::NonZero, 2, 2);
        r.move_to(0.0, 0.0);
        r.line_to(4.0, 0.0);
        r.line_to(0.0, 4.0);
        r.path_done();

        let mut closed = Renderer::new(0, 0, 8, 8, FillRule::NonZero, 2, 2);
        closed.move_to(0.0, 0.0);
        closed.line_to(4.0, 0.0);
        closed.line_to(0.0, 4.0);
        closed.close_path();
        closed.path_done();

        assert_eq!(rows_of(&r), rows_of(&closed));
    }

    #[test]
    fn test_curves_land_on_endpoints() {
        // A lens built from two quads between the same endpoints. The
        // flattener snaps its last step to the exact endpoint, so the shape
        // closes without slivers and coverage stays within bounds.
        let mut r = Renderer::new(0, 0, 16, 16, FillRule::NonZero, 3, 3);
        r.move_to(2.0, 8.0);
        r.quad_to(8.0, 2.0, 14.0, 8.0);
        r.quad_to(8.0, 14.0, 2.0, 8.0);
        r.close_path();
        r.path_done();
        let c = r.coverage();
        assert!(!c.is_empty());
        let mut total = 0u64;
        for (_, _, runs) in c.rows() {
            for run in runs {
                assert!(run.value <= c.alpha_max());
                total += (run.value * run.len) as u64;
            }
        }
        // Each quad segment encloses 2/3 of its control triangle (area 36),
        // so the lens area is 48 px^2.
        let area = total as f64 / c.alpha_max() as f64;
        assert!((43.0..53.0).contains(&area), "area estimate {}", area);
    }

    #[test]
    fn test_cubic_shape_renders() {
        let mut r = Renderer::new(0, 0, 16, 16, FillRule::NonZero, 3, 3);
        r.move_to(2.0, 12.0);
        r.curve_to(4.0, 2.0, 12.0, 2.0, 14.0, 12.0);
        r.close_path();
        r.path_done();
        let c = r.coverage();
        assert!(!c.is_empty());
        // Full-coverage pixels must exist well inside the shape.
        let full = c
            .rows()
            .flat_map(|(_, _, runs)| runs.iter())
            .any(|run| run.value == c.alpha_max());
        assert!(full);
    }

    #[test]
    fn test_bottom_partial_pixel_row() {
        // Square ending at y=5.5: the last pixel row is half swept and must
        // still be emitted, at half coverage.
        let r = render_square(FillRule::NonZero, 2.0, 2.0, 6.0, 5.5);
        let c = r.coverage();
        assert_eq!(c.bbox_y1(), 6);
        let (_, runs) = c.row(5).unwrap();
        assert_eq!(runs, &[run(8, 4)]);
        let (_, runs) = c.row(4).unwrap();
        assert_eq!(runs, &[run(16, 4)]);
    }
}
