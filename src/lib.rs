//! Deposition of triangular mass distributions onto regular histograms.
//!
//! Main features:
//!  - Exact integration of a triangular density over unit bins (1D)
//!  - Column-wise decomposition of 2D triangles into 1D deposits
//!  - Edge-function triangle rasterization with signed coverage
//!
#![deny(warnings)]

mod distribute;
mod distribute2d;
mod geometry;
mod grid;
mod kernel;
mod raster;
mod utils;

pub use distribute::{distribute_1d, Triangle1D};
pub use distribute2d::{distribute_2d, Triangle2D};
pub use geometry::{scalar_fmt, signed_area2, BBox, Point, Scalar, EPSILON, TOL};
pub use grid::{Grid, GridError, GridIter, GridMut, GridMutRef, GridOwned, GridRef, Shape};
pub use kernel::{
    bin_index, split_point, sweep, Clip, Footprint, Outcome, Side, Strip, StripSink,
};
pub use raster::{rasterize, RasterTriangle};
