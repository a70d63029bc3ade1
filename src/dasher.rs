//! Streaming path dasher.
//!
//! [`Dasher`] sits between a path producer and the rasterizer: it consumes
//! the incoming command stream, walks the dash pattern along the path's arc
//! length, and forwards only the "on" portions downstream. Curves are split
//! at dash boundaries with de Casteljau subdivision; the parameter values
//! to split at come from [`LengthIterator`], a lazy in-order traversal of a
//! bounded-depth subdivision tree that never materializes more than one
//! curve per tree level.
//!
//! The first dash of every subpath is held back in a small buffer until we
//! know whether the subpath closes while that dash is still running. If it
//! does, the closing run and the initial run are emitted as one continuous
//! piece so that joins at the subpath start render correctly.

use smallvec::SmallVec;

use crate::basics::PathConsumer;
use crate::curve::{is_point_curve, subdivide_at};
use crate::error::Error;

// ============================================================================
// Seg — one buffered output segment
// ============================================================================

/// A drawing command with its coordinates, as held in the deferred
/// first-dash buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Seg {
    Line { x: f64, y: f64 },
    Quad { x1: f64, y1: f64, x: f64, y: f64 },
    Cubic { x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64 },
}

impl Seg {
    fn end(&self) -> (f64, f64) {
        match *self {
            Seg::Line { x, y } => (x, y),
            Seg::Quad { x, y, .. } => (x, y),
            Seg::Cubic { x, y, .. } => (x, y),
        }
    }
}

// ============================================================================
// Dasher
// ============================================================================

/// Path-consumer adaptor that rewrites the incoming path into dashed
/// sub-segments according to a dash pattern and phase.
pub struct Dasher<T: PathConsumer> {
    out: T,
    dash: Vec<f64>,

    // Normalized start state, restored on every move_to.
    start_idx: usize,
    start_dash_on: bool,
    start_phase: f64,

    idx: usize,
    dash_on: bool,
    phase: f64,

    // Subpath start and current point.
    sx: f64,
    sy: f64,
    x0: f64,
    y0: f64,

    // True until the first "off" stretch of the current subpath; while set,
    // output accumulates in first_segments instead of going downstream.
    starting: bool,
    needs_move_to: bool,
    first_segments: SmallVec<[Seg; 8]>,

    li: LengthIterator,
    // Scratch: current curve in [0..coords], its pending right part in
    // [coords..2*coords].
    cur_curve: [f64; 16],
}

impl<T: PathConsumer> Dasher<T> {
    /// Wrap `out`, splitting everything that flows through according to
    /// `dash` (alternating on/off lengths) offset by `phase`.
    ///
    /// `phase` must be non-negative and is normalized into the pattern by
    /// walking whole entries off it, toggling the on/off state at each
    /// boundary, so any `phase + k * pattern_length` yields the same start
    /// state. The dash array must contain at least one positive entry and
    /// no negative ones.
    pub fn new(out: T, dash: &[f64], phase: f64) -> Result<Self, Error> {
        if phase < 0.0 {
            return Err(Error::NegativeDashPhase(phase));
        }
        if dash.is_empty() || dash.iter().any(|&d| d < 0.0) || !dash.iter().any(|&d| d > 0.0) {
            return Err(Error::InvalidDashPattern);
        }

        let mut idx = 0;
        let mut dash_on = true;
        let mut phase = phase;
        while phase >= dash[idx] {
            phase -= dash[idx];
            idx = (idx + 1) % dash.len();
            dash_on = !dash_on;
        }

        Ok(Self {
            out,
            dash: dash.to_vec(),
            start_idx: idx,
            start_dash_on: dash_on,
            start_phase: phase,
            idx,
            dash_on,
            phase,
            sx: 0.0,
            sy: 0.0,
            x0: 0.0,
            y0: 0.0,
            starting: true,
            needs_move_to: true,
            first_segments: SmallVec::new(),
            li: LengthIterator::new(),
            cur_curve: [0.0; 16],
        })
    }

    /// Unwrap the downstream consumer.
    pub fn into_inner(self) -> T {
        self.out
    }

    fn advance_dash(&mut self) {
        self.idx = (self.idx + 1) % self.dash.len();
        self.dash_on = !self.dash_on;
    }

    fn flush_first_segments(&mut self) {
        let segs = std::mem::take(&mut self.first_segments);
        for seg in segs {
            self.emit_seg(seg);
        }
    }

    fn emit_seg(&mut self, seg: Seg) {
        match seg {
            Seg::Line { x, y } => self.out.line_to(x, y),
            Seg::Quad { x1, y1, x, y } => self.out.quad_to(x1, y1, x, y),
            Seg::Cubic { x1, y1, x2, y2, x, y } => self.out.curve_to(x1, y1, x2, y2, x, y),
        }
    }

    /// Route one output segment: buffer it while the first dash is still
    /// running, emit it (with a pending move) during an "on" stretch, or
    /// swallow it during an "off" stretch. Always advances the current
    /// point to the segment end.
    fn go_to(&mut self, seg: Seg) {
        let (x, y) = seg.end();
        if self.dash_on {
            if self.starting {
                self.first_segments.push(seg);
            } else {
                if self.needs_move_to {
                    self.out.move_to(self.x0, self.y0);
                    self.needs_move_to = false;
                }
                self.emit_seg(seg);
            }
        } else {
            self.starting = false;
            self.needs_move_to = true;
        }
        self.x0 = x;
        self.y0 = y;
    }

    fn go_to_curve_piece(&mut self, off: usize, coords: usize) {
        let c = &self.cur_curve[off..off + coords];
        let seg = if coords == 6 {
            Seg::Quad {
                x1: c[2],
                y1: c[3],
                x: c[4],
                y: c[5],
            }
        } else {
            Seg::Cubic {
                x1: c[2],
                y1: c[3],
                x2: c[4],
                y2: c[5],
                x: c[6],
                y: c[7],
            }
        };
        self.go_to(seg);
    }

    /// Dash the curve currently loaded into `cur_curve[..coords]`.
    fn something_to(&mut self, coords: usize) {
        if is_point_curve(&self.cur_curve[..coords]) {
            return;
        }
        self.li.initialize(&self.cur_curve, coords);

        let mut cur_off = 0;
        let mut last_split_t = 0.0;
        let mut left_in_dash = self.dash[self.idx] - self.phase;
        loop {
            let t = self.li.next(left_in_dash);
            if t >= 1.0 {
                break;
            }
            if t != 0.0 {
                // Split the remaining curve at t (rescaled to the remaining
                // parameter range) and emit the left part.
                let rel = (t - last_split_t) / (1.0 - last_split_t);
                let mut src = [0.0; 8];
                src[..coords].copy_from_slice(&self.cur_curve[cur_off..cur_off + coords]);
                let mut left = [0.0; 8];
                let mut right = [0.0; 8];
                subdivide_at(rel, &src, &mut left, &mut right, coords);
                self.cur_curve[..coords].copy_from_slice(&left[..coords]);
                self.cur_curve[coords..2 * coords].copy_from_slice(&right[..coords]);
                last_split_t = t;
                self.go_to_curve_piece(0, coords);
                cur_off = coords;
            }
            self.advance_dash();
            self.phase = 0.0;
            left_in_dash = self.dash[self.idx];
        }
        // Remaining tail of the curve.
        self.go_to_curve_piece(cur_off, coords);
        self.phase += self.li.last_seg_len();
        if self.phase >= self.dash[self.idx] {
            self.phase = 0.0;
            self.advance_dash();
        }
    }
}

impl<T: PathConsumer> PathConsumer for Dasher<T> {
    fn move_to(&mut self, x: f64, y: f64) {
        // Only now do we know the previous subpath will not close back into
        // its deferred first dash, so it is safe to emit it.
        if !self.first_segments.is_empty() {
            self.out.move_to(self.sx, self.sy);
            self.flush_first_segments();
        }
        self.needs_move_to = true;
        self.idx = self.start_idx;
        self.dash_on = self.start_dash_on;
        self.phase = self.start_phase;
        self.sx = x;
        self.sy = y;
        self.x0 = x;
        self.y0 = y;
        self.starting = true;
    }

    fn line_to(&mut self, x1: f64, y1: f64) {
        let dx = x1 - self.x0;
        let dy = y1 - self.y0;
        let mut len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            return;
        }
        let cx = dx / len;
        let cy = dy / len;
        loop {
            let left_in_dash = self.dash[self.idx] - self.phase;
            if len <= left_in_dash {
                self.go_to(Seg::Line { x: x1, y: y1 });
                self.phase += len;
                if len == left_in_dash {
                    self.phase = 0.0;
                    self.advance_dash();
                }
                return;
            }
            let ex = self.x0 + left_in_dash * cx;
            let ey = self.y0 + left_in_dash * cy;
            self.go_to(Seg::Line { x: ex, y: ey });
            len -= left_in_dash;
            self.advance_dash();
            self.phase = 0.0;
        }
    }

    fn quad_to(&mut self, x1: f64, y1: f64, x: f64, y: f64) {
        self.cur_curve[..6].copy_from_slice(&[self.x0, self.y0, x1, y1, x, y]);
        self.something_to(6);
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        self.cur_curve[..8].copy_from_slice(&[self.x0, self.y0, x1, y1, x2, y2, x, y]);
        self.something_to(8);
    }

    fn close_path(&mut self) {
        let (sx, sy) = (self.sx, self.sy);
        self.line_to(sx, sy);
        if !self.first_segments.is_empty() {
            // If the subpath closed while its first dash was still running,
            // the deferred segments continue straight from the closing run;
            // otherwise they need their own move.
            if !self.dash_on || self.needs_move_to {
                self.out.move_to(sx, sy);
            }
            self.flush_first_segments();
        }
        self.move_to(sx, sy);
    }

    fn path_done(&mut self) {
        if !self.first_segments.is_empty() {
            self.out.move_to(self.sx, self.sy);
            self.flush_first_segments();
        }
        self.out.path_done();
    }
}

// ============================================================================
// LengthIterator — arc-length parameterization of one curve
// ============================================================================

const REC_LIMIT: usize = 4;
const FLATNESS_ERR: f64 = 0.01;
const MIN_T_INC: f64 = 1.0 / ((1 << REC_LIMIT) as f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Lazy in-order traversal of the recursive subdivision tree of one curve,
/// yielding parameter values where cumulative arc length crosses requested
/// amounts.
///
/// Only the path from the root to the current leaf is materialized: one
/// curve per tree level plus a left/right marker. A node is a leaf when its
/// control polygon is within [`FLATNESS_ERR`] of its chord or the depth
/// limit is reached; a leaf's length is approximated as the average of
/// chord and control-polygon length.
struct LengthIterator {
    stack: [[f64; 8]; REC_LIMIT + 1],
    sides: [Side; REC_LIMIT],
    coords: usize,
    // t and accumulated length at the far end of the current leaf...
    next_t: f64,
    len_at_next_t: f64,
    // ...and at its near end.
    last_t: f64,
    len_at_last_t: f64,
    len_at_last_split: f64,
    last_seg_len: f64,
    rec_level: usize,
    done: bool,
}

impl LengthIterator {
    fn new() -> Self {
        Self {
            stack: [[0.0; 8]; REC_LIMIT + 1],
            sides: [Side::Left; REC_LIMIT],
            coords: 8,
            next_t: 0.0,
            len_at_next_t: 0.0,
            last_t: 0.0,
            len_at_last_t: 0.0,
            len_at_last_split: 0.0,
            last_seg_len: 0.0,
            rec_level: 0,
            done: false,
        }
    }

    fn initialize(&mut self, pts: &[f64; 16], coords: usize) {
        self.stack[0][..coords].copy_from_slice(&pts[..coords]);
        self.coords = coords;
        self.rec_level = 0;
        self.last_t = 0.0;
        self.len_at_last_t = 0.0;
        self.next_t = 0.0;
        self.len_at_next_t = 0.0;
        self.len_at_last_split = 0.0;
        self.last_seg_len = 0.0;
        self.done = false;
        self.go_left();
        if self.rec_level == 0 {
            // The root itself is flat: its single leaf is also the last.
            self.done = true;
        }
    }

    /// The parameter value at which the not-yet-consumed part of the curve
    /// should be split for the left piece to have arc length `len`. Returns
    /// 1.0 when less than `len` of curve remains; the actual remaining
    /// length is then available from [`last_seg_len`](Self::last_seg_len).
    fn next(&mut self, len: f64) -> f64 {
        let target = self.len_at_last_split + len;
        while self.len_at_next_t < target {
            if self.done {
                self.last_seg_len = self.len_at_next_t - self.len_at_last_split;
                return 1.0;
            }
            self.go_to_next_leaf();
        }
        self.len_at_last_split = target;
        let leaf_len = self.len_at_next_t - self.len_at_last_t;
        let t_in_leaf = if leaf_len > 0.0 {
            (target - self.len_at_last_t) / leaf_len
        } else {
            1.0
        };
        let mut t = t_in_leaf * (self.next_t - self.last_t) + self.last_t;
        if t >= 1.0 {
            t = 1.0;
            self.done = true;
        }
        self.last_seg_len = len;
        t
    }

    /// Arc length of the piece emitted by the last `next` call.
    fn last_seg_len(&self) -> f64 {
        self.last_seg_len
    }

    /// Move to the in-order successor leaf: up past exhausted right
    /// branches, across to one right sibling, then leftward down.
    fn go_to_next_leaf(&mut self) {
        self.rec_level -= 1;
        while self.sides[self.rec_level] == Side::Right {
            if self.rec_level == 0 {
                self.done = true;
                return;
            }
            self.rec_level -= 1;
        }
        self.sides[self.rec_level] = Side::Right;
        // The parent slot holds the right half left behind by go_left.
        self.stack[self.rec_level + 1] = self.stack[self.rec_level];
        self.rec_level += 1;
        self.go_left();
    }

    /// Descend to the leftmost leaf below the current node, leaving each
    /// level's right half in the parent slot, then account for the leaf's
    /// length and parameter span.
    fn go_left(&mut self) {
        loop {
            let len = self.on_leaf();
            if len >= 0.0 {
                self.last_t = self.next_t;
                self.len_at_last_t = self.len_at_next_t;
                self.next_t += (1u32 << (REC_LIMIT - self.rec_level)) as f64 * MIN_T_INC;
                self.len_at_next_t += len;
                return;
            }
            let src = self.stack[self.rec_level];
            let mut left = [0.0; 8];
            let mut right = [0.0; 8];
            subdivide_at(0.5, &src, &mut left, &mut right, self.coords);
            self.stack[self.rec_level] = right;
            self.stack[self.rec_level + 1] = left;
            self.sides[self.rec_level] = Side::Left;
            self.rec_level += 1;
        }
    }

    /// Leaf test for the current node: its approximate length if it is flat
    /// enough (or the depth limit is reached), -1.0 otherwise.
    fn on_leaf(&self) -> f64 {
        let c = &self.stack[self.rec_level];
        let mut poly_len = 0.0;
        let (mut px, mut py) = (c[0], c[1]);
        for p in c[2..self.coords].chunks_exact(2) {
            poly_len += crate::basics::line_len(px, py, p[0], p[1]);
            px = p[0];
            py = p[1];
        }
        let chord = crate::basics::line_len(c[0], c[1], c[self.coords - 2], c[self.coords - 1]);
        if poly_len - chord < FLATNESS_ERR || self.rec_level == REC_LIMIT {
            (poly_len + chord) / 2.0
        } else {
            -1.0
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
