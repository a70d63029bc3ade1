//! # scanmask
//!
//! Scanline polygon rasterization with subpixel antialiasing. Paths made
//! of lines, quadratic and cubic Béziers are converted into a compact
//! run-length-encoded coverage grid that a renderer can blend with any
//! paint.
//!
//! ## Architecture
//!
//! The crate is a push-style pipeline; every stage implements
//! [`PathConsumer`] and forwards to the next:
//!
//! 1. **Dasher** (optional) — walks the dash pattern along the path's arc
//!    length and forwards only the "on" pieces
//! 2. **Renderer** — flattens curves with adaptive forward differencing,
//!    builds a scanline-indexed edge list, and sweeps it top to bottom
//! 3. **CoverageCache** — the output: one RLE coverage row per pixel row
//!
//! ## Example
//!
//! ```
//! use scanmask::{FillRule, PathConsumer, Renderer};
//!
//! let mut r = Renderer::new(0, 0, 16, 16, FillRule::NonZero, 3, 3);
//! r.move_to(2.0, 2.0);
//! r.line_to(14.0, 2.0);
//! r.line_to(14.0, 14.0);
//! r.line_to(2.0, 14.0);
//! r.close_path();
//! r.path_done();
//!
//! for (y, x0, runs) in r.coverage().rows() {
//!     for run in runs {
//!         // blend `run.len` pixels starting at (x0.., y) with coverage
//!         // run.value / alpha_max
//!         let _ = (y, x0, run.value);
//!     }
//! }
//! ```

// Foundation types
pub mod basics;
pub mod curve;
pub mod error;

// Path pipeline stages
pub mod dasher;
pub mod renderer;

// Output
pub mod cache;

pub use basics::{FillRule, PathConsumer};
pub use cache::{CoverageCache, CoverageRun};
pub use dasher::Dasher;
pub use error::Error;
pub use renderer::Renderer;
