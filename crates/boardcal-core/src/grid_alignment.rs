use serde::{Deserialize, Serialize};

use crate::GridCoords;

/// Integer 2x2 transform on grid coordinates: `(i', j') = (a*i + b*j, c*i + d*j)`.
///
/// Board re-orientations (rotations, reflections, transposition) are the 8
/// elements of the dihedral group `D4`, listed in [`GRID_TRANSFORMS_D4`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTransform {
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
}

impl GridTransform {
    pub const fn new(a: i32, b: i32, c: i32, d: i32) -> Self {
        Self { a, b, c, d }
    }

    #[inline]
    pub fn apply(&self, i: i32, j: i32) -> [i32; 2] {
        [self.a * i + self.b * j, self.c * i + self.d * j]
    }

    /// True when the transform exchanges the row and column axes.
    pub fn swaps_axes(&self) -> bool {
        self.a == 0 && self.d == 0
    }
}

/// `dst = transform(src) + translation`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridAlignment {
    pub transform: GridTransform,
    pub translation: [i32; 2],
}

impl GridAlignment {
    /// Alignment that applies `transform` to the window
    /// `[min.i, min.i + extent.0) x [min.j, min.j + extent.1)` and shifts the
    /// result so it starts at `(0, 0)`.
    pub fn for_window(transform: GridTransform, min: GridCoords, extent: (i32, i32)) -> Self {
        let corners = [
            transform.apply(min.i, min.j),
            transform.apply(min.i + extent.0 - 1, min.j),
            transform.apply(min.i, min.j + extent.1 - 1),
            transform.apply(min.i + extent.0 - 1, min.j + extent.1 - 1),
        ];
        let tx = corners.iter().map(|c| c[0]).min().unwrap_or(0);
        let ty = corners.iter().map(|c| c[1]).min().unwrap_or(0);
        Self {
            transform,
            translation: [-tx, -ty],
        }
    }

    #[inline]
    pub fn map(&self, g: GridCoords) -> GridCoords {
        let [x, y] = self.transform.apply(g.i, g.j);
        GridCoords {
            i: x + self.translation[0],
            j: y + self.translation[1],
        }
    }
}

/// The 8 dihedral transforms `D4` on the integer grid.
pub const GRID_TRANSFORMS_D4: [GridTransform; 8] = [
    // rotations: 0°, 90°, 180°, 270°
    GridTransform::new(1, 0, 0, 1),
    GridTransform::new(0, 1, -1, 0),
    GridTransform::new(-1, 0, 0, -1),
    GridTransform::new(0, -1, 1, 0),
    // reflections
    GridTransform::new(-1, 0, 0, 1),
    GridTransform::new(1, 0, 0, -1),
    GridTransform::new(0, 1, 1, 0),
    GridTransform::new(0, -1, -1, 0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_alignment_maps_onto_origin() {
        let min = GridCoords { i: 3, j: -2 };
        for t in GRID_TRANSFORMS_D4 {
            let al = GridAlignment::for_window(t, min, (4, 6));
            let (w, h) = if t.swaps_axes() { (6, 4) } else { (4, 6) };
            for dj in 0..6 {
                for di in 0..4 {
                    let g = al.map(GridCoords {
                        i: min.i + di,
                        j: min.j + dj,
                    });
                    assert!((0..w).contains(&g.i) && (0..h).contains(&g.j), "{t:?} -> {g:?}");
                }
            }
        }
    }
}
