use std::collections::VecDeque;

use crate::geom::{grid_axis_angle, off_axis_angle, rotate_into_frame};
use crate::params::GridGraphParams;
use boardcal_core::{Corner, GridCoords};
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;

/// Direction of a neighbor in the grid-aligned frame (image `y` points down).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Right,
    Left,
    Up,
    Down,
}

impl NeighborDirection {
    pub fn opposite(self) -> Self {
        match self {
            NeighborDirection::Right => NeighborDirection::Left,
            NeighborDirection::Left => NeighborDirection::Right,
            NeighborDirection::Up => NeighborDirection::Down,
            NeighborDirection::Down => NeighborDirection::Up,
        }
    }

    /// Grid step `(di, dj)` taken when following this edge.
    pub fn step(self) -> (i32, i32) {
        match self {
            NeighborDirection::Right => (1, 0),
            NeighborDirection::Left => (-1, 0),
            NeighborDirection::Up => (0, -1),
            NeighborDirection::Down => (0, 1),
        }
    }

    fn slot(self) -> usize {
        match self {
            NeighborDirection::Right => 0,
            NeighborDirection::Left => 1,
            NeighborDirection::Up => 2,
            NeighborDirection::Down => 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    /// Angle to the grid axis (radians), lower is better.
    pub score: f32,
}

pub struct GridGraph {
    /// Grid axis orientation in the image, modulo π/2.
    pub axis_angle: f32,
    pub neighbors: Vec<Vec<NodeNeighbor>>, // For each node, list of neighbors
}

fn direction_in_frame(v: &Vector2<f32>) -> NeighborDirection {
    if v.x.abs() >= v.y.abs() {
        if v.x >= 0.0 {
            NeighborDirection::Right
        } else {
            NeighborDirection::Left
        }
    } else if v.y >= 0.0 {
        NeighborDirection::Down
    } else {
        NeighborDirection::Up
    }
}

fn build_tree(corners: &[Corner]) -> KdTree<f32, 2> {
    let coords = corners
        .iter()
        .map(|c| [c.position.x, c.position.y])
        .collect::<Vec<_>>();
    (&coords).into()
}

/// Candidates around corner `i` within the spacing window, nearest first.
fn candidates_within(
    tree: &KdTree<f32, 2>,
    corners: &[Corner],
    i: usize,
    params: &GridGraphParams,
) -> Vec<(usize, f32)> {
    let p = corners[i].position;
    let max_sq = params.max_spacing_pix * params.max_spacing_pix;
    let mut found: Vec<(usize, f32)> = tree
        .within_unsorted::<SquaredEuclidean>(&[p.x, p.y], max_sq)
        .into_iter()
        .map(|nn| (nn.item as usize, nn.distance.sqrt()))
        .filter(|&(j, d)| j != i && d >= params.min_spacing_pix)
        .collect();
    found.sort_by(|a, b| a.1.total_cmp(&b.1));
    found.truncate(params.k_neighbors);
    found
}

/// Grid orientation from each corner's nearest neighbor.
///
/// On a chessboard the nearest neighbor of an inner corner lies along a grid
/// axis (diagonal neighbors are √2 farther), so the quadruple-angle mean of
/// those edges gives the axis direction even under moderate perspective.
pub fn estimate_axis_angle(corners: &[Corner], params: &GridGraphParams) -> Option<f32> {
    let tree = build_tree(corners);
    let edges = (0..corners.len()).filter_map(|i| {
        candidates_within(&tree, corners, i, params)
            .first()
            .map(|&(j, _)| corners[j].position - corners[i].position)
    });
    grid_axis_angle(edges)
}

/// Keep at most one neighbor per direction: the nearest, then the best aligned.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> Vec<NodeNeighbor> {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates.into_iter() {
        let slot = &mut best[candidate.direction.slot()];
        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.distance < current.distance
                    || (candidate.distance == current.distance && candidate.score < current.score)
            }
        };
        if replace {
            *slot = Some(candidate);
        }
    }

    best.into_iter().flatten().collect()
}

impl GridGraph {
    /// Build the 4-connected neighbor graph, estimating the grid orientation
    /// first. Returns `None` when no grid orientation can be established.
    pub fn new(corners: &[Corner], params: &GridGraphParams) -> Option<Self> {
        let axis_angle = estimate_axis_angle(corners, params)?;
        Some(Self::with_axis(corners, params, axis_angle))
    }

    pub fn with_axis(corners: &[Corner], params: &GridGraphParams, axis_angle: f32) -> Self {
        let tree = build_tree(corners);
        let tolerance = params.direction_tolerance_deg.to_radians();

        let mut directed = Vec::with_capacity(corners.len());
        for (i, corner) in corners.iter().enumerate() {
            let mut node_neighbors = Vec::new();
            for (j, distance) in candidates_within(&tree, corners, i, params) {
                let d = corners[j].position - corner.position;
                let in_frame = rotate_into_frame(d, axis_angle);
                let score = off_axis_angle(in_frame);
                if score > tolerance {
                    continue;
                }
                node_neighbors.push(NodeNeighbor {
                    direction: direction_in_frame(&in_frame),
                    index: j,
                    distance,
                    score,
                });
            }
            directed.push(select_neighbors(node_neighbors));
        }

        // Only mutual edges survive: j must pick i back from the opposite side.
        let neighbors = directed
            .iter()
            .enumerate()
            .map(|(i, list)| {
                list.iter()
                    .filter(|n| {
                        directed[n.index]
                            .iter()
                            .any(|back| back.index == i && back.direction == n.direction.opposite())
                    })
                    .cloned()
                    .collect()
            })
            .collect();

        Self {
            axis_angle,
            neighbors,
        }
    }
}

pub fn connected_components(graph: &GridGraph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.neighbors.len()];
    let mut components = Vec::new();

    for start in 0..graph.neighbors.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);

            for neighbor in &graph.neighbors[node] {
                if !visited[neighbor.index] {
                    stack.push(neighbor.index);
                }
            }
        }

        components.push(component);
    }

    components
}

/// BFS over a component, giving every node integer grid coordinates relative
/// to the first node. Each node is labelled once, by the first path reaching it.
pub fn assign_grid_coordinates(graph: &GridGraph, component: &[usize]) -> Vec<(usize, GridCoords)> {
    let Some(&start) = component.first() else {
        return Vec::new();
    };

    let mut coords = Vec::with_capacity(component.len());
    let mut visited = vec![false; graph.neighbors.len()];
    let mut queue = VecDeque::new();
    queue.push_back((start, GridCoords { i: 0, j: 0 }));

    while let Some((node_idx, g)) = queue.pop_front() {
        if visited[node_idx] {
            continue;
        }
        visited[node_idx] = true;
        coords.push((node_idx, g));

        for neighbor in &graph.neighbors[node_idx] {
            if visited[neighbor.index] {
                continue;
            }
            let (di, dj) = neighbor.direction.step();
            queue.push_back((
                neighbor.index,
                GridCoords {
                    i: g.i + di,
                    j: g.j + dj,
                },
            ));
        }
    }

    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn grid(cols: usize, rows: usize, spacing: f32, angle: f32) -> Vec<Corner> {
        let (s, c) = angle.sin_cos();
        let mut corners = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let (x, y) = (i as f32 * spacing, j as f32 * spacing);
                corners.push(Corner::new(100.0 + c * x - s * y, 100.0 + s * x + c * y, 1.0));
            }
        }
        corners
    }

    fn neighbor_map(neighbors: &[NodeNeighbor]) -> HashMap<NeighborDirection, &NodeNeighbor> {
        neighbors.iter().map(|n| (n.direction, n)).collect()
    }

    #[test]
    fn finds_axis_neighbors_in_regular_grid() {
        let corners = grid(3, 3, 10.0, 0.0);
        let params = GridGraphParams {
            min_spacing_pix: 5.0,
            max_spacing_pix: 15.0,
            ..Default::default()
        };
        let graph = GridGraph::new(&corners, &params).expect("graph");
        let center = neighbor_map(&graph.neighbors[4]);
        assert_eq!(center.len(), 4);
        assert_eq!(center[&NeighborDirection::Right].index, 5);
        assert_eq!(center[&NeighborDirection::Left].index, 3);
        assert_eq!(center[&NeighborDirection::Up].index, 1);
        assert_eq!(center[&NeighborDirection::Down].index, 7);

        let corner = neighbor_map(&graph.neighbors[0]);
        assert_eq!(corner.len(), 2);
        assert!(corner.contains_key(&NeighborDirection::Right));
        assert!(corner.contains_key(&NeighborDirection::Down));
    }

    #[test]
    fn rotated_grid_gets_consistent_coordinates() {
        let (cols, rows) = (4, 6);
        let corners = grid(cols, rows, 20.0, 0.35);
        let graph = GridGraph::new(&corners, &GridGraphParams::default()).expect("graph");
        assert!((graph.axis_angle - 0.35).abs() < 1e-3);

        let components = connected_components(&graph);
        assert_eq!(components.len(), 1);
        let coords = assign_grid_coordinates(&graph, &components[0]);
        assert_eq!(coords.len(), cols * rows);

        let origin = coords.iter().find(|(n, _)| *n == 0).map(|(_, g)| *g).expect("origin");
        for (node, g) in coords {
            let (ci, cj) = ((node % cols) as i32, (node / cols) as i32);
            assert_eq!((g.i - origin.i, g.j - origin.j), (ci, cj), "node {node}");
        }
    }

    #[test]
    fn far_apart_clusters_split_into_components() {
        let mut corners = grid(2, 2, 10.0, 0.0);
        corners.extend(grid(2, 2, 10.0, 0.0).into_iter().map(|mut c| {
            c.position.x += 500.0;
            c
        }));
        let params = GridGraphParams {
            max_spacing_pix: 15.0,
            ..Default::default()
        };
        let graph = GridGraph::new(&corners, &params).expect("graph");
        let mut sizes: Vec<usize> = connected_components(&graph).iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![4, 4]);
    }

    #[test]
    fn diagonal_neighbors_are_not_linked() {
        let corners = vec![Corner::new(0.0, 0.0, 1.0), Corner::new(10.0, 10.0, 1.0)];
        let graph = GridGraph::with_axis(&corners, &GridGraphParams::default(), 0.0);
        assert!(graph.neighbors.iter().all(Vec::is_empty));
    }
}
