//! Run-length-encoded coverage cache.
//!
//! The output object of a render pass: one RLE row per pixel row of the
//! clipped bounding box, written top to bottom by the sweep and immutable
//! afterwards. Coverage is typically constant over long horizontal runs
//! (fully inside or fully outside the shape), which is what the run-length
//! encoding exploits.

/// One `(value, length)` run within a cached row. `value` is in
/// `[0, alpha_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageRun {
    pub value: u32,
    pub len: u32,
}

#[derive(Debug, Clone, Default)]
struct Row {
    x0: i32,
    runs: Vec<CoverageRun>,
}

/// Sparse RLE coverage grid produced by one render pass.
///
/// The bounding box is in pixels, `x1`/`y1` exclusive. Rows with no runs
/// are fully transparent. A consumer normalizes run values against
/// [`alpha_max`](CoverageCache::alpha_max), which equals
/// `subpixel_positions_x * subpixel_positions_y`.
#[derive(Debug, Clone)]
pub struct CoverageCache {
    bbox_x0: i32,
    bbox_y0: i32,
    bbox_x1: i32,
    bbox_y1: i32,
    alpha_max: u32,
    rows: Vec<Row>,
    cur_row: usize,
}

impl CoverageCache {
    /// A cache covering the pixel rectangle `[x0, x1) x [y0, y1)`, all rows
    /// initially transparent.
    pub(crate) fn new(x0: i32, y0: i32, x1: i32, y1: i32, alpha_max: u32) -> Self {
        let height = (y1 - y0).max(0) as usize;
        Self {
            bbox_x0: x0,
            bbox_y0: y0,
            bbox_x1: x1,
            bbox_y1: y1,
            alpha_max,
            rows: vec![Row::default(); height],
            cur_row: usize::MAX,
        }
    }

    /// The "nothing to draw" cache: valid, zero-area, no rows.
    pub(crate) fn empty(alpha_max: u32) -> Self {
        Self::new(0, 0, 0, 0, alpha_max)
    }

    pub fn bbox_x0(&self) -> i32 {
        self.bbox_x0
    }

    pub fn bbox_y0(&self) -> i32 {
        self.bbox_y0
    }

    /// Exclusive right pixel bound.
    pub fn bbox_x1(&self) -> i32 {
        self.bbox_x1
    }

    /// Exclusive bottom pixel bound.
    pub fn bbox_y1(&self) -> i32 {
        self.bbox_y1
    }

    /// Maximum coverage value a fully covered pixel accumulates.
    pub fn alpha_max(&self) -> u32 {
        self.alpha_max
    }

    /// True if the bounding box has zero area.
    pub fn is_empty(&self) -> bool {
        self.bbox_x0 >= self.bbox_x1 || self.bbox_y0 >= self.bbox_y1
    }

    /// Begin the RLE row for pixel row `pix_y`, whose first run starts at
    /// pixel column `x`. Rows must be started in increasing `pix_y` order.
    pub(crate) fn start_row(&mut self, pix_y: i32, x: i32) {
        let idx = (pix_y - self.bbox_y0) as usize;
        debug_assert!(
            self.cur_row == usize::MAX || idx > self.cur_row,
            "cache rows must be written top to bottom"
        );
        self.rows[idx].x0 = x;
        self.cur_row = idx;
    }

    /// Append one run to the row opened by the last `start_row`.
    pub(crate) fn add_run(&mut self, value: i32, len: u32) {
        debug_assert!(value >= 0 && value as u32 <= self.alpha_max);
        self.rows[self.cur_row].runs.push(CoverageRun {
            value: value as u32,
            len,
        });
    }

    /// Iterate rows as `(pix_y, x_start, runs)`, top to bottom. Transparent
    /// rows yield an empty run slice.
    pub fn rows(&self) -> impl Iterator<Item = (i32, i32, &[CoverageRun])> {
        self.rows
            .iter()
            .enumerate()
            .map(move |(i, row)| (self.bbox_y0 + i as i32, row.x0, row.runs.as_slice()))
    }

    /// The runs of one pixel row, or `None` outside the bounding box.
    pub fn row(&self, pix_y: i32) -> Option<(i32, &[CoverageRun])> {
        if pix_y < self.bbox_y0 || pix_y >= self.bbox_y1 {
            return None;
        }
        let row = &self.rows[(pix_y - self.bbox_y0) as usize];
        Some((row.x0, row.runs.as_slice()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache() {
        let c = CoverageCache::empty(64);
        assert!(c.is_empty());
        assert_eq!(c.alpha_max(), 64);
        assert_eq!(c.rows().count(), 0);
        assert!(c.row(0).is_none());
    }

    #[test]
    fn test_writer_protocol() {
        let mut c = CoverageCache::new(2, 10, 6, 12, 16);
        c.start_row(10, 3);
        c.add_run(16, 2);
        c.add_run(8, 1);
        c.start_row(11, 2);
        c.add_run(4, 4);

        let (x0, runs) = c.row(10).unwrap();
        assert_eq!(x0, 3);
        assert_eq!(runs, &[CoverageRun { value: 16, len: 2 }, CoverageRun { value: 8, len: 1 }]);

        let (x0, runs) = c.row(11).unwrap();
        assert_eq!(x0, 2);
        assert_eq!(runs, &[CoverageRun { value: 4, len: 4 }]);

        assert!(c.row(9).is_none());
        assert!(c.row(12).is_none());
    }

    #[test]
    fn test_skipped_rows_are_transparent() {
        let mut c = CoverageCache::new(0, 0, 4, 3, 16);
        c.start_row(1, 0);
        c.add_run(16, 4);
        let rows: Vec<_> = c.rows().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].2.is_empty());
        assert_eq!(rows[1].2.len(), 1);
        assert!(rows[2].2.is_empty());
    }
}
