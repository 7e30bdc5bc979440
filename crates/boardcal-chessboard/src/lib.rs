//! Fixed-size chessboard detector built on top of `boardcal-core`.
//!
//! Algorithm (graph-based, rotation and perspective tolerant):
//! 1. Filter strong ChESS corners.
//! 2. Estimate the grid orientation from nearest-neighbor edges (modulo 90°).
//! 3. For each corner, find up to 4 neighbors (right/left/up/down) in the
//!    grid-aligned frame within the spacing window; keep mutual edges only.
//! 4. BFS each connected component, assign integer coordinates (i, j).
//! 5. Pick the fully populated `width x height` window (either orientation)
//!    with the largest summed strength.
//! 6. Relabel it so rows run left to right and successive rows downwards.
//! 7. Optionally refine the corners to sub-pixel accuracy.

mod detector;
mod error;
mod geom;
mod gridgraph;
mod params;
mod subpix;

pub use detector::{ChessboardDetection, ChessboardDetector};
pub use error::ChessboardError;
pub use gridgraph::{GridGraph, NeighborDirection, NodeNeighbor};
pub use params::{ChessboardParams, GridGraphParams, SubPixParams};
pub use subpix::{refine_corner, refine_corners};
