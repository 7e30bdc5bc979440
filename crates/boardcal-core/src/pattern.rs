use serde::{Deserialize, Serialize};

use crate::GridCoords;

/// Inner-corner layout of a checkerboard.
///
/// `width` is the number of inner corners along one board row, `height` the
/// number of rows. Corners are always enumerated row-major: index
/// `i` lives at column `i % width` of row `i / width`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternSize {
    pub width: usize,
    pub height: usize,
}

impl Default for PatternSize {
    fn default() -> Self {
        Self {
            width: 4,
            height: 6,
        }
    }
}

impl PatternSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total number of inner corners (`width * height`).
    pub const fn corner_count(&self) -> usize {
        self.width * self.height
    }

    /// Row-major index of the corner at `(col, row)`.
    #[inline]
    pub fn index_of(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    /// Grid coordinates of the corner with row-major index `index`.
    #[inline]
    pub fn grid_of(&self, index: usize) -> GridCoords {
        GridCoords {
            i: (index % self.width) as i32,
            j: (index / self.width) as i32,
        }
    }

    /// The same layout with rows and columns swapped.
    pub fn transposed(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}
