use rayon::prelude::*;
use serde::Serialize;

use crate::geometry::Point;
use crate::grid::ScalarGrid;

/// Walks the Bresenham line between `a` and `b` (both ends included) and
/// reports whether every cell is at or above `threshold`. Cells outside the
/// grid block the line.
///
/// The walk always starts from the lexicographically smaller endpoint, so the
/// answer does not depend on argument order.
pub fn has_direct_path(a: &Point, b: &Point, grid: &ScalarGrid, threshold: f32) -> bool {
    let (from, to) = if (a.x, a.y) <= (b.x, b.y) { (a, b) } else { (b, a) };

    let (mut x0, mut y0) = (from.x, from.y);
    let (x1, y1) = (to.x, to.y);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if !passable(grid, x0, y0, threshold) {
            return false;
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }

    true
}

#[inline]
fn passable(grid: &ScalarGrid, x: i32, y: i32, threshold: f32) -> bool {
    if x < 0 || y < 0 {
        return false;
    }
    matches!(grid.get(x as usize, y as usize), Some(v) if v >= threshold)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub to: usize,
    pub distance: f64,
}

/// Undirected line-of-sight graph over a point set. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct VisibilityGraph {
    adjacency: Vec<Vec<Neighbor>>,
}

impl VisibilityGraph {
    /// Tests every unordered pair in parallel, one task per outer index.
    pub fn build(points: &[Point], grid: &ScalarGrid, threshold: f32) -> Self {
        let n = points.len();

        let edges: Vec<(usize, usize, f64)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut local = Vec::new();
                for j in i + 1..n {
                    if has_direct_path(&points[i], &points[j], grid, threshold) {
                        local.push((i, j, points[i].distance_to(&points[j])));
                    }
                }
                local
            })
            .flatten_iter()
            .collect();

        let graph = Self::from_edges(n, edges);
        tracing::debug!(
            target: "railmapper::visibility",
            points = n,
            edges = graph.edge_count(),
            threshold,
            "visibility.graph.built"
        );
        graph
    }

    /// Inserts each edge in both directions. Self-loops and out-of-range
    /// indices are ignored.
    pub fn from_edges(node_count: usize, edges: impl IntoIterator<Item = (usize, usize, f64)>) -> Self {
        let mut adjacency = vec![Vec::new(); node_count];
        for (i, j, distance) in edges {
            if i == j || i >= node_count || j >= node_count {
                continue;
            }
            adjacency[i].push(Neighbor { to: j, distance });
            adjacency[j].push(Neighbor { to: i, distance });
        }
        VisibilityGraph { adjacency }
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn neighbors(&self, node: usize) -> &[Neighbor] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).iter().any(|n| n.to == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked_center_grid() -> ScalarGrid {
        let mut grid = ScalarGrid::filled(4, 4, 1.0);
        grid.set(2, 2, 0.0);
        grid
    }

    #[test]
    fn test_diagonal_blocked_by_low_cell() {
        let grid = blocked_center_grid();
        let a = Point::new(0, 0);
        let b = Point::new(3, 3);
        assert!(!has_direct_path(&a, &b, &grid, 0.5));
        assert!(!has_direct_path(&b, &a, &grid, 0.5));
    }

    #[test]
    fn test_clear_row_is_visible() {
        let grid = blocked_center_grid();
        assert!(has_direct_path(&Point::new(0, 0), &Point::new(3, 0), &grid, 0.5));
        assert!(has_direct_path(&Point::new(0, 3), &Point::new(3, 3), &grid, 0.5));
    }

    #[test]
    fn test_endpoint_below_threshold_blocks() {
        let grid = blocked_center_grid();
        assert!(!has_direct_path(&Point::new(2, 2), &Point::new(2, 2), &grid, 0.5));
        assert!(!has_direct_path(&Point::new(2, 0), &Point::new(2, 2), &grid, 0.5));
    }

    #[test]
    fn test_out_of_grid_blocks() {
        let grid = ScalarGrid::filled(4, 4, 1.0);
        assert!(!has_direct_path(&Point::new(0, 0), &Point::new(4, 0), &grid, 0.5));
        assert!(!has_direct_path(&Point::new(-1, 0), &Point::new(2, 0), &grid, 0.5));
    }

    #[test]
    fn test_visibility_is_symmetric() {
        // Scattered low cells so that some shallow lines pass and some do not
        let grid = ScalarGrid::from_fn(20, 20, |x, y| if (x * 7 + y * 3) % 11 == 0 { 0.0 } else { 1.0 });
        let points: Vec<Point> = (0..20)
            .map(|i| Point::new((i * 7) % 20, (i * 13) % 20))
            .collect();
        for a in &points {
            for b in &points {
                assert_eq!(
                    has_direct_path(a, b, &grid, 0.5),
                    has_direct_path(b, a, &grid, 0.5),
                    "asymmetric between {:?} and {:?}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_graph_is_symmetric_without_self_loops() {
        let grid = blocked_center_grid();
        let points = vec![
            Point::new(0, 0),
            Point::new(3, 3),
            Point::new(3, 0),
            Point::new(0, 3),
        ];
        let graph = VisibilityGraph::build(&points, &grid, 0.5);
        assert_eq!(graph.node_count(), 4);
        assert!(!graph.has_edge(0, 1));
        for i in 0..4 {
            assert!(!graph.has_edge(i, i));
            for n in graph.neighbors(i) {
                assert!(graph.has_edge(n.to, i));
                assert_eq!(n.distance, points[i].distance_to(&points[n.to]));
            }
        }
        assert!(graph.has_edge(0, 2));
        assert_eq!(graph.neighbors(0).len(), 2);
    }

    #[test]
    fn test_degenerate_inputs() {
        let grid = ScalarGrid::filled(4, 4, 1.0);
        assert_eq!(VisibilityGraph::build(&[], &grid, 0.5).node_count(), 0);
        let single = VisibilityGraph::build(&[Point::new(1, 1)], &grid, 0.5);
        assert_eq!(single.node_count(), 1);
        assert_eq!(single.edge_count(), 0);
        assert!(single.neighbors(5).is_empty());
    }

    #[test]
    fn test_from_edges_skips_invalid() {
        let graph = VisibilityGraph::from_edges(3, vec![(0, 1, 1.0), (1, 1, 0.0), (2, 9, 4.0)]);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge(1, 0));
    }
}
