//! Budget-constrained greedy tree growth over the visibility graph.
//!
//! Every settlement is tried as the root of a tree. From the root the cheapest
//! affordable frontier edge is committed until nothing affordable remains; the
//! root that ends up connecting the most settlements wins.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::grid::ScalarGrid;
use crate::visibility::VisibilityGraph;

/// Money parameters shared by the planner and the live game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Economy {
    pub initial_budget: f64,
    pub cost_per_km: f64,
    pub reward_per_city: f64,
}

impl Default for Economy {
    fn default() -> Self {
        Economy {
            initial_budget: 3_000_000.0,
            cost_per_km: 50_000.0,
            reward_per_city: 10_000.0,
        }
    }
}

impl Economy {
    /// Edge cost with the city reward netted in, floored at zero.
    pub fn net_cost(&self, distance: f64) -> f64 {
        (distance * self.cost_per_km - self.reward_per_city).max(0.0)
    }
}

/// Frontier entry. Orders by cost, then `from`, then `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateEdge {
    pub cost: f64,
    pub from: usize,
    pub to: usize,
}

impl Eq for CandidateEdge {}

impl Ord for CandidateEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.from.cmp(&other.from))
            .then_with(|| self.to.cmp(&other.to))
    }
}

impl PartialOrd for CandidateEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTree {
    /// `None` only for an empty point set.
    pub start: Option<usize>,
    pub edges: Vec<(usize, usize)>,
    /// Net cost committed, never above the initial budget.
    pub spent: f64,
}

impl PlannedTree {
    pub fn empty() -> Self {
        PlannedTree {
            start: None,
            edges: Vec::new(),
            spent: 0.0,
        }
    }

    /// Distinct settlements in the tree, start included. Every committed edge
    /// adds exactly one new node.
    pub fn node_count(&self) -> usize {
        match self.start {
            Some(_) => self.edges.len() + 1,
            None => 0,
        }
    }
}

/// Greedy tree growth from a single root.
pub fn grow_tree(start: usize, graph: &VisibilityGraph, economy: &Economy) -> PlannedTree {
    let mut connected = vec![false; graph.node_count()];
    let mut frontier = BinaryHeap::new();
    let mut edges = Vec::new();
    let mut budget = economy.initial_budget;

    if start >= connected.len() {
        return PlannedTree::empty();
    }
    connected[start] = true;

    for n in graph.neighbors(start) {
        frontier.push(Reverse(CandidateEdge {
            cost: economy.net_cost(n.distance),
            from: start,
            to: n.to,
        }));
    }

    while let Some(Reverse(candidate)) = frontier.pop() {
        if connected[candidate.to] || budget < candidate.cost {
            continue;
        }

        budget -= candidate.cost;
        connected[candidate.to] = true;
        edges.push((candidate.from, candidate.to));

        for n in graph.neighbors(candidate.to) {
            if !connected[n.to] {
                frontier.push(Reverse(CandidateEdge {
                    cost: economy.net_cost(n.distance),
                    from: candidate.to,
                    to: n.to,
                }));
            }
        }
    }

    PlannedTree {
        start: Some(start),
        edges,
        spent: economy.initial_budget - budget,
    }
}

/// Tries every root in parallel and keeps the tree with the most nodes.
///
/// Per-root results are combined with an order-preserving reduction that keeps
/// the left operand on ties, so the lowest root index wins deterministically.
pub fn best_tree_in(graph: &VisibilityGraph, economy: &Economy) -> PlannedTree {
    let best = (0..graph.node_count())
        .into_par_iter()
        .map(|start| grow_tree(start, graph, economy))
        .reduce_with(|best, candidate| {
            if candidate.node_count() > best.node_count() {
                candidate
            } else {
                best
            }
        })
        .unwrap_or_else(PlannedTree::empty);

    tracing::info!(
        target: "railmapper::planner",
        roots = graph.node_count(),
        start = ?best.start,
        nodes = best.node_count(),
        spent = best.spent,
        "planner.best_tree"
    );
    best
}

/// Builds the visibility graph for `points` and searches it.
pub fn build_best_tree(points: &[Point], grid: &ScalarGrid, threshold: f32, economy: &Economy) -> PlannedTree {
    let graph = VisibilityGraph::build(points, grid, threshold);
    best_tree_in(&graph, economy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn economy(budget: f64, cost_per_km: f64, reward: f64) -> Economy {
        Economy {
            initial_budget: budget,
            cost_per_km,
            reward_per_city: reward,
        }
    }

    /// Single component containing the start, no node reached twice.
    fn assert_is_tree(tree: &PlannedTree) {
        let start = tree.start.expect("tree has a start");
        let mut seen = HashSet::from([start]);
        for &(from, to) in &tree.edges {
            assert!(seen.contains(&from), "edge ({}, {}) not attached", from, to);
            assert!(seen.insert(to), "node {} reached twice", to);
        }
    }

    #[test]
    fn test_candidate_ordering() {
        let a = CandidateEdge { cost: 1.0, from: 2, to: 5 };
        let b = CandidateEdge { cost: 1.0, from: 1, to: 9 };
        let c = CandidateEdge { cost: 1.0, from: 1, to: 3 };
        let d = CandidateEdge { cost: 0.5, from: 7, to: 8 };
        let mut heap: BinaryHeap<_> = [a, b, c, d].into_iter().map(Reverse).collect();
        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|Reverse(e)| e)).collect();
        assert_eq!(order, vec![d, c, b, a]);
    }

    #[test]
    fn test_net_cost_floors_at_zero() {
        let econ = economy(0.0, 10.0, 100.0);
        assert_eq!(econ.net_cost(5.0), 0.0);
        assert_eq!(econ.net_cost(20.0), 100.0);
    }

    #[test]
    fn test_chain_respects_budget() {
        // 0 - 1 - 2 - 3, each link 10 long
        let graph = VisibilityGraph::from_edges(4, vec![(0, 1, 10.0), (1, 2, 10.0), (2, 3, 10.0)]);
        let econ = economy(250.0, 10.0, 0.0);
        let tree = grow_tree(0, &graph, &econ);
        assert_eq!(tree.edges, vec![(0, 1), (1, 2)]);
        assert_eq!(tree.spent, 200.0);
        assert_is_tree(&tree);
    }

    #[test]
    fn test_skips_unaffordable_and_takes_cheaper_later() {
        // From 0: expensive edge to 1, cheap edge to 2; 2 reaches 1 cheaply
        let graph = VisibilityGraph::from_edges(3, vec![(0, 1, 50.0), (0, 2, 5.0), (2, 1, 5.0)]);
        let econ = economy(100.0, 10.0, 0.0);
        let tree = grow_tree(0, &graph, &econ);
        assert_eq!(tree.edges, vec![(0, 2), (2, 1)]);
        assert_eq!(tree.spent, 100.0);
    }

    #[test]
    fn test_reward_makes_short_edges_free() {
        let graph = VisibilityGraph::from_edges(3, vec![(0, 1, 1.0), (1, 2, 1.0)]);
        let econ = economy(0.0, 10.0, 10.0);
        let tree = grow_tree(0, &graph, &econ);
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.spent, 0.0);
    }

    #[test]
    fn test_tie_break_by_from_then_to() {
        // Equal costs everywhere; frontier from 0 holds (0,1) and (0,2)
        let graph = VisibilityGraph::from_edges(3, vec![(0, 2, 1.0), (0, 1, 1.0)]);
        let econ = economy(1.0, 1.0, 0.0);
        let tree = grow_tree(0, &graph, &econ);
        assert_eq!(tree.edges, vec![(0, 1)]);
    }

    #[test]
    fn test_best_start_connects_most() {
        // 0 hangs off an expensive link; 1..3 form a cheap chain
        let graph = VisibilityGraph::from_edges(4, vec![(0, 1, 5.0), (1, 2, 1.0), (2, 3, 1.0)]);
        let econ = economy(2.0, 1.0, 0.0);
        assert_eq!(grow_tree(0, &graph, &econ).node_count(), 1);
        let best = best_tree_in(&graph, &econ);
        assert_eq!(best.start, Some(1));
        assert_eq!(best.node_count(), 3);
        assert_is_tree(&best);
    }

    #[test]
    fn test_ties_resolve_to_lowest_start() {
        // Two disjoint pairs, both fully connectable
        let graph = VisibilityGraph::from_edges(4, vec![(0, 1, 1.0), (2, 3, 1.0)]);
        let econ = economy(10.0, 1.0, 0.0);
        for _ in 0..10 {
            assert_eq!(best_tree_in(&graph, &econ).start, Some(0));
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let econ = Economy::default();
        let grid = ScalarGrid::filled(4, 4, 1.0);

        let empty = build_best_tree(&[], &grid, 0.5, &econ);
        assert_eq!(empty, PlannedTree::empty());
        assert_eq!(empty.node_count(), 0);

        let single = build_best_tree(&[Point::new(1, 1)], &grid, 0.5, &econ);
        assert_eq!(single.start, Some(0));
        assert!(single.edges.is_empty());

        assert_eq!(grow_tree(3, &VisibilityGraph::default(), &econ), PlannedTree::empty());
    }

    #[test]
    fn test_budget_invariant_on_generated_graph() {
        let grid = ScalarGrid::from_fn(30, 30, |x, y| if (x + 2 * y) % 9 == 0 { 0.0 } else { 1.0 });
        let points: Vec<Point> = (0..25)
            .map(|i| Point::new((i * 11) % 30, (i * 17) % 30))
            .collect();
        let econ = economy(120.0, 2.0, 5.0);
        let graph = VisibilityGraph::build(&points, &grid, 0.5);

        for start in 0..points.len() {
            let tree = grow_tree(start, &graph, &econ);
            assert!(tree.spent <= econ.initial_budget);
            let mut running = 0.0;
            for &(from, to) in &tree.edges {
                let distance = points[from].distance_to(&points[to]);
                running += econ.net_cost(distance);
                assert!(running <= econ.initial_budget + 1e-9);
                assert!(graph.has_edge(from, to));
            }
            assert_is_tree(&tree);
        }

        let best = best_tree_in(&graph, &econ);
        let max_nodes = (0..points.len())
            .map(|s| grow_tree(s, &graph, &econ).node_count())
            .max()
            .unwrap();
        assert_eq!(best.node_count(), max_nodes);
    }
}
