use boardcal_core::PatternSize;
use serde::{Deserialize, Serialize};

use crate::ChessboardError;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    pub min_spacing_pix: f32,
    pub max_spacing_pix: f32,
    /// KD-tree candidates examined per corner.
    pub k_neighbors: usize,
    /// Maximal angle between an edge and the nearest grid axis.
    pub direction_tolerance_deg: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 5.0,
            max_spacing_pix: 250.0,
            k_neighbors: 8,
            direction_tolerance_deg: 30.0,
        }
    }
}

/// Iterative gradient-based corner refinement, 11x11 window by default.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubPixParams {
    pub enabled: bool,
    /// Half size of the search window (window side = 2 * half_window + 1).
    pub half_window: u32,
    pub max_iters: u32,
    /// Stop once a refinement step moves the corner less than this (pixels).
    pub epsilon: f32,
}

impl Default for SubPixParams {
    fn default() -> Self {
        Self {
            enabled: true,
            half_window: 5,
            max_iters: 100,
            epsilon: 0.15,
        }
    }
}

/// Parameters of the chessboard detector.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessboardParams {
    /// Expected inner-corner layout; detection only succeeds on a complete grid.
    pub pattern: PatternSize,

    /// Minimal corner strength to consider.
    pub min_strength: f32,

    /// Minimal number of candidate corners before grid assembly is attempted.
    /// The full pattern size is always required on top of this.
    pub min_corners: usize,

    pub graph: GridGraphParams,
    pub subpix: SubPixParams,
}

impl Default for ChessboardParams {
    fn default() -> Self {
        Self {
            pattern: PatternSize::default(),
            min_strength: 0.0,
            min_corners: 4,
            graph: GridGraphParams::default(),
            subpix: SubPixParams::default(),
        }
    }
}

impl ChessboardParams {
    pub fn for_pattern(pattern: PatternSize) -> Self {
        Self {
            pattern,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ChessboardError> {
        let PatternSize { width, height } = self.pattern;
        if width < 2 || height < 2 {
            return Err(ChessboardError::InvalidPattern { width, height });
        }
        let g = &self.graph;
        if !(g.min_spacing_pix >= 0.0 && g.max_spacing_pix > g.min_spacing_pix) {
            return Err(ChessboardError::InvalidSpacing {
                min: g.min_spacing_pix,
                max: g.max_spacing_pix,
            });
        }
        if g.k_neighbors == 0 {
            return Err(ChessboardError::InvalidParam("graph.k_neighbors must be >= 1"));
        }
        if !(0.0..45.0).contains(&g.direction_tolerance_deg) {
            return Err(ChessboardError::InvalidParam(
                "graph.direction_tolerance_deg must be in [0, 45)",
            ));
        }
        if self.subpix.enabled && self.subpix.half_window == 0 {
            return Err(ChessboardError::InvalidParam("subpix.half_window must be >= 1"));
        }
        Ok(())
    }
}
