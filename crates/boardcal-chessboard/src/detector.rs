use std::collections::HashMap;

use crate::gridgraph::{assign_grid_coordinates, connected_components, GridGraph};
use crate::params::ChessboardParams;
use crate::subpix::refine_corners;
use crate::ChessboardError;
use boardcal_core::{
    Corner, GrayImageView, GridAlignment, GridCoords, LabeledCorner, PatternSize, GRID_TRANSFORMS_D4,
};
use log::{debug, info};
use nalgebra::{Point2, Vector2};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Result of running the detector on one image.
///
/// When `found` is true, `corners` holds exactly `pattern.corner_count()`
/// entries in row-major order: index `row * pattern.width + col`. Otherwise it
/// holds whatever partial grid was assembled (possibly nothing), unordered.
#[derive(Clone, Debug, Serialize)]
pub struct ChessboardDetection {
    pub found: bool,
    pub pattern: PatternSize,
    pub corners: Vec<LabeledCorner>,
}

impl ChessboardDetection {
    fn not_found(pattern: PatternSize, corners: Vec<LabeledCorner>) -> Self {
        Self {
            found: false,
            pattern,
            corners,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.found && self.corners.len() == self.pattern.corner_count()
    }

    pub fn image_points(&self) -> Vec<Point2<f32>> {
        self.corners.iter().map(|c| c.position).collect()
    }
}

/// Fully populated `width x height` lattice.
struct BoardWindow {
    min: GridCoords,
    extent: (i32, i32),
    score: f32,
}

/// Chessboard detector: ChESS corners in, ordered inner-corner grid out.
pub struct ChessboardDetector {
    pub params: ChessboardParams,
}

impl ChessboardDetector {
    pub fn new(params: ChessboardParams) -> Result<Self, ChessboardError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Detect the board and, when enabled, refine the corners against `image`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image, corners), fields(num_corners = corners.len()))
    )]
    pub fn detect(&self, image: &GrayImageView<'_>, corners: &[Corner]) -> ChessboardDetection {
        let mut detection = self.detect_from_corners(corners);
        if detection.found && self.params.subpix.enabled {
            let mut points = detection.image_points();
            refine_corners(image, &mut points, &self.params.subpix);
            for (c, p) in detection.corners.iter_mut().zip(points) {
                c.position = p;
            }
            debug!("refined {} corners to sub-pixel accuracy", detection.corners.len());
        }
        detection
    }

    /// Grid assembly only, no image access.
    pub fn detect_from_corners(&self, corners: &[Corner]) -> ChessboardDetection {
        let pattern = self.params.pattern;

        // 1. Filter by strength.
        let strong: Vec<Corner> = corners
            .iter()
            .filter(|c| c.strength >= self.params.min_strength)
            .cloned()
            .collect();

        info!(
            "found {} raw ChESS corners after strength filter",
            strong.len()
        );

        if strong.len() < self.params.min_corners.max(pattern.corner_count()) {
            return ChessboardDetection::not_found(pattern, Vec::new());
        }

        // 2. Neighbor graph in the grid-aligned frame.
        let Some(graph) = GridGraph::new(&strong, &self.params.graph) else {
            info!("failed to estimate grid orientation");
            return ChessboardDetection::not_found(pattern, Vec::new());
        };
        debug!("grid axis angle {:.1} deg", graph.axis_angle.to_degrees());

        let max_strength = strong
            .iter()
            .map(|c| c.strength)
            .fold(f32::MIN_POSITIVE, f32::max);

        // 3. Lattice per component; keep the best one that is exactly the board.
        let mut best: Option<(BoardWindow, HashMap<GridCoords, usize>)> = None;
        let mut largest_partial: Vec<usize> = Vec::new();

        for component in connected_components(&graph) {
            if component.len() > largest_partial.len() {
                largest_partial = component.clone();
            }
            if component.len() < pattern.corner_count() {
                continue;
            }

            let lattice = build_lattice(&graph, &component, &strong);
            if let Some(window) = board_window(&lattice, &strong, pattern) {
                if best.as_ref().is_none_or(|(b, _)| window.score > b.score) {
                    best = Some((window, lattice));
                }
            }
        }

        let Some((window, lattice)) = best else {
            info!(
                "no complete {}x{} grid (largest component: {} corners)",
                pattern.width,
                pattern.height,
                largest_partial.len()
            );
            let partial = largest_partial
                .iter()
                .map(|&idx| LabeledCorner {
                    position: strong[idx].position,
                    grid: None,
                    confidence: strong[idx].strength / max_strength,
                })
                .collect();
            return ChessboardDetection::not_found(pattern, partial);
        };

        // 4. Canonical ordering of the chosen window.
        let ordered = order_window(&window, &lattice, &strong, pattern);
        let corners = ordered
            .into_iter()
            .enumerate()
            .map(|(k, idx)| LabeledCorner {
                position: strong[idx].position,
                grid: Some(pattern.grid_of(k)),
                confidence: strong[idx].strength / max_strength,
            })
            .collect();

        info!("chessboard {}x{} found", pattern.width, pattern.height);
        ChessboardDetection {
            found: true,
            pattern,
            corners,
        }
    }
}

/// Grid coordinate -> corner index. Conflicting labels keep the stronger corner.
fn build_lattice(graph: &GridGraph, component: &[usize], corners: &[Corner]) -> HashMap<GridCoords, usize> {
    let mut lattice: HashMap<GridCoords, usize> = HashMap::new();
    for (idx, g) in assign_grid_coordinates(graph, component) {
        lattice
            .entry(g)
            .and_modify(|cur| {
                if corners[idx].strength > corners[*cur].strength {
                    *cur = idx;
                }
            })
            .or_insert(idx);
    }
    lattice
}

/// The lattice as a board: its extent must be exactly `width x height` (in
/// either orientation) with every cell populated. A larger board is rejected
/// rather than cropped.
fn board_window(
    lattice: &HashMap<GridCoords, usize>,
    corners: &[Corner],
    pattern: PatternSize,
) -> Option<BoardWindow> {
    let min_i = lattice.keys().map(|g| g.i).min()?;
    let max_i = lattice.keys().map(|g| g.i).max()?;
    let min_j = lattice.keys().map(|g| g.j).min()?;
    let max_j = lattice.keys().map(|g| g.j).max()?;

    let extent = (max_i - min_i + 1, max_j - min_j + 1);
    let (w, h) = (pattern.width as i32, pattern.height as i32);
    if extent != (w, h) && extent != (h, w) {
        debug!(
            "lattice extent {}x{} does not match {}x{}",
            extent.0, extent.1, pattern.width, pattern.height
        );
        return None;
    }
    // Keys are unique and inside the extent, so this means fully populated.
    if lattice.len() != pattern.corner_count() {
        return None;
    }

    Some(BoardWindow {
        min: GridCoords { i: min_i, j: min_j },
        extent,
        score: lattice.values().map(|&idx| corners[idx].strength).sum(),
    })
}

/// Pick the dihedral relabelling that maps the window onto
/// `pattern.width x pattern.height` with rows running left to right and
/// successive rows running downwards in the image.
fn order_window(
    window: &BoardWindow,
    lattice: &HashMap<GridCoords, usize>,
    corners: &[Corner],
    pattern: PatternSize,
) -> Vec<usize> {
    let (w, h) = (pattern.width as i32, pattern.height as i32);
    let mut best: Option<(f32, Vec<usize>)> = None;

    for transform in GRID_TRANSFORMS_D4 {
        let mapped_extent = if transform.swaps_axes() {
            (window.extent.1, window.extent.0)
        } else {
            window.extent
        };
        if mapped_extent != (w, h) {
            continue;
        }

        let alignment = GridAlignment::for_window(transform, window.min, window.extent);
        let mut ordered = vec![0usize; pattern.corner_count()];
        for dj in 0..window.extent.1 {
            for di in 0..window.extent.0 {
                let src = GridCoords {
                    i: window.min.i + di,
                    j: window.min.j + dj,
                };
                let dst = alignment.map(src);
                if let Some(&idx) = lattice.get(&src) {
                    ordered[pattern.index_of(dst.i as usize, dst.j as usize)] = idx;
                }
            }
        }

        let at = |col: usize, row: usize| corners[ordered[pattern.index_of(col, row)]].position;
        let along_row = unit(at(pattern.width - 1, 0) - at(0, 0));
        let across_rows = unit(at(0, pattern.height - 1) - at(0, 0));
        let score = along_row.x + across_rows.y;

        if best.as_ref().is_none_or(|(s, _)| score > *s) {
            best = Some((score, ordered));
        }
    }

    best.map(|(_, ordered)| ordered).unwrap_or_default()
}

fn unit(v: Vector2<f32>) -> Vector2<f32> {
    let n = v.norm();
    if n > f32::EPSILON {
        v / n
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SubPixParams;

    fn board_corners(pattern: PatternSize, origin: (f32, f32), step: f32, angle: f32) -> Vec<Corner> {
        let (s, c) = angle.sin_cos();
        let mut out = Vec::new();
        for r in 0..pattern.height {
            for col in 0..pattern.width {
                let (x, y) = (col as f32 * step, r as f32 * step);
                out.push(Corner::new(origin.0 + c * x - s * y, origin.1 + s * x + c * y, 1.0));
            }
        }
        out
    }

    fn detector(pattern: PatternSize) -> ChessboardDetector {
        let mut params = ChessboardParams::for_pattern(pattern);
        params.subpix = SubPixParams {
            enabled: false,
            ..SubPixParams::default()
        };
        ChessboardDetector::new(params).expect("valid params")
    }

    #[test]
    fn orders_rows_left_to_right_top_to_bottom() {
        let pattern = PatternSize::new(4, 6);
        let mut corners = board_corners(pattern, (50.0, 40.0), 30.0, 0.1);
        corners.reverse();
        let det = detector(pattern).detect_from_corners(&corners);
        assert!(det.is_complete());

        let pts = det.image_points();
        for row in 0..pattern.height {
            for col in 1..pattern.width {
                let k = pattern.index_of(col, row);
                assert!(pts[k].x > pts[k - 1].x, "row {row} not increasing in x");
            }
        }
        for row in 1..pattern.height {
            assert!(pts[pattern.index_of(0, row)].y > pts[pattern.index_of(0, row - 1)].y);
        }
        assert_eq!(det.corners[5].grid, Some(GridCoords { i: 1, j: 1 }));
    }

    #[test]
    fn transposed_layout_is_relabelled() {
        // A board lying on its side: 6 corners per image row, 4 rows.
        let pattern = PatternSize::new(4, 6);
        let corners = board_corners(pattern.transposed(), (30.0, 30.0), 25.0, -0.05);
        let det = detector(pattern).detect_from_corners(&corners);
        assert!(det.is_complete());
        assert_eq!(det.corners.len(), 24);
        let pts = det.image_points();
        let along_row = pts[3] - pts[0];
        let across = pts[pattern.index_of(0, 5)] - pts[0];
        assert!(along_row.norm() > 0.0 && across.norm() > 0.0);
        assert!(along_row.x.abs() + along_row.y.abs() > 70.0);
    }

    #[test]
    fn larger_board_is_not_found() {
        let pattern = PatternSize::new(4, 6);
        let corners = board_corners(PatternSize::new(7, 8), (20.0, 20.0), 20.0, 0.0);
        let det = detector(pattern).detect_from_corners(&corners);
        assert!(!det.found);
        assert!(!det.is_complete());
        // The assembled grid is still reported as a partial result.
        assert_eq!(det.corners.len(), 56);
        assert!(det.corners.iter().all(|c| c.grid.is_none()));
    }

    #[test]
    fn one_extra_row_is_not_found() {
        let pattern = PatternSize::new(4, 6);
        let corners = board_corners(PatternSize::new(4, 7), (40.0, 30.0), 25.0, 0.05);
        assert!(!detector(pattern).detect_from_corners(&corners).found);
    }

    #[test]
    fn found_flag_with_short_corner_list_is_incomplete() {
        let pattern = PatternSize::new(4, 6);
        let mut det = detector(pattern).detect_from_corners(&board_corners(pattern, (50.0, 40.0), 30.0, 0.0));
        assert!(det.is_complete());
        det.corners.pop();
        assert!(det.found);
        assert_eq!(det.corners.len(), 23);
        assert!(!det.is_complete());
    }

    #[test]
    fn missing_corner_is_not_found() {
        let pattern = PatternSize::new(4, 6);
        let mut corners = board_corners(pattern, (50.0, 40.0), 30.0, 0.0);
        corners.remove(9);
        let det = detector(pattern).detect_from_corners(&corners);
        assert!(!det.found);
        assert!(!det.is_complete());
    }

    #[test]
    fn empty_input_is_not_found() {
        let det = detector(PatternSize::new(4, 6)).detect_from_corners(&[]);
        assert!(!det.found);
        assert!(det.corners.is_empty());
    }

    #[test]
    fn weak_corners_are_ignored() {
        let pattern = PatternSize::new(4, 6);
        let corners = board_corners(pattern, (50.0, 40.0), 30.0, 0.0);
        let mut params = ChessboardParams::for_pattern(pattern);
        params.min_strength = 2.0;
        let det = ChessboardDetector::new(params).expect("valid").detect_from_corners(&corners);
        assert!(!det.found);
    }
}
