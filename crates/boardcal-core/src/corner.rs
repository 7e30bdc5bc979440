use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// X-junction candidate, before any grid reasoning.
#[derive(Clone, Debug)]
pub struct Corner {
    pub position: Point2<f32>,

    /// Detector response; larger is more corner-like.
    pub strength: f32,
}

impl Corner {
    pub fn new(x: f32, y: f32, strength: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            strength,
        }
    }
}

/// Integer grid coordinates (i, j) in board space.
///
/// `i` runs along a board row (column index), `j` across rows (row index).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GridCoords {
    pub i: i32,
    pub j: i32,
}

/// A corner that is part of a detected board.
#[derive(Clone, Debug, Serialize)]
pub struct LabeledCorner {
    /// Pixel position.
    pub position: Point2<f32>,

    /// Integer grid coordinates, when the corner was assigned to the board lattice.
    pub grid: Option<GridCoords>,

    /// Detection confidence in [0, 1] (strength normalized by the strongest corner).
    pub confidence: f32,
}
