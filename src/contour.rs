use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::geometry::{simplify, Vertex};
use crate::grid::ScalarGrid;

/// Cell edges: 0 = top, 1 = right, 2 = bottom, 3 = left.
/// Index is the corner mask: bit 0 top-left, 1 top-right, 2 bottom-right,
/// 3 bottom-left. Saddles 5 and 10 use a fixed two-segment split.
const EDGE_TABLE: [&[(usize, usize)]; 16] = [
    &[],
    &[(3, 0)],
    &[(0, 1)],
    &[(3, 1)],
    &[(1, 2)],
    &[(3, 0), (1, 2)],
    &[(0, 2)],
    &[(3, 2)],
    &[(2, 3)],
    &[(2, 0)],
    &[(1, 3), (0, 2)],
    &[(1, 2)],
    &[(3, 1)],
    &[(0, 1)],
    &[(3, 0)],
    &[],
];

const EDGE_MID: [Vertex; 4] = [(0.5, 0.0), (1.0, 0.5), (0.5, 1.0), (0.0, 0.5)];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub level: f32,
    pub points: Vec<Vertex>,
}

impl Polyline {
    pub fn simplified(&self, epsilon: f64) -> Polyline {
        Polyline {
            level: self.level,
            points: simplify(&self.points, epsilon),
        }
    }
}

/// Marching squares over `grid`, one level after another.
///
/// Cells are classified only as the iterator is advanced. Clone the iterator
/// (or call this again) to walk the isolines a second time.
pub fn extract_contours<'a>(grid: &'a ScalarGrid, levels: &'a [f32]) -> Contours<'a> {
    Contours {
        grid,
        levels,
        level: 0,
        cell: 0,
        pending: &[],
        origin: (0, 0),
    }
}

#[derive(Debug, Clone)]
pub struct Contours<'a> {
    grid: &'a ScalarGrid,
    levels: &'a [f32],
    level: usize,
    cell: usize,
    pending: &'static [(usize, usize)],
    origin: (usize, usize),
}

impl<'a> Contours<'a> {
    fn case_index(&self, x: usize, y: usize, level: f32) -> usize {
        let g = self.grid;
        let mut mask = 0;
        if g.at(x, y) >= level {
            mask |= 1;
        }
        if g.at(x + 1, y) >= level {
            mask |= 2;
        }
        if g.at(x + 1, y + 1) >= level {
            mask |= 4;
        }
        if g.at(x, y + 1) >= level {
            mask |= 8;
        }
        mask
    }
}

impl<'a> Iterator for Contours<'a> {
    type Item = Polyline;

    fn next(&mut self) -> Option<Polyline> {
        let cols = self.grid.width.saturating_sub(1);
        let rows = self.grid.height.saturating_sub(1);

        loop {
            if let Some((&(ea, eb), rest)) = self.pending.split_first() {
                self.pending = rest;
                let (x, y) = (self.origin.0 as f32, self.origin.1 as f32);
                let p1 = (EDGE_MID[ea].0 + x, EDGE_MID[ea].1 + y);
                let p2 = (EDGE_MID[eb].0 + x, EDGE_MID[eb].1 + y);
                return Some(Polyline {
                    level: self.levels[self.level],
                    points: vec![p1, p2],
                });
            }

            if cols == 0 || rows == 0 || self.level >= self.levels.len() {
                return None;
            }

            if self.cell >= cols * rows {
                self.level += 1;
                self.cell = 0;
                continue;
            }

            let x = self.cell % cols;
            let y = self.cell / cols;
            self.cell += 1;

            let case = self.case_index(x, y, self.levels[self.level]);
            self.pending = EDGE_TABLE[case];
            self.origin = (x, y);
        }
    }
}

/// Joins per-cell segments that share endpoints into longer polylines.
/// Levels keep their input order; closed rings end on their first vertex.
pub fn link_segments(lines: impl IntoIterator<Item = Polyline>) -> Vec<Polyline> {
    let mut levels: Vec<(f32, Vec<(Vertex, Vertex)>)> = Vec::new();

    for line in lines {
        let segments = line.points.windows(2).map(|w| (w[0], w[1]));
        match levels.last_mut() {
            Some((level, group)) if *level == line.level => group.extend(segments),
            _ => levels.push((line.level, segments.collect())),
        }
    }

    levels
        .into_iter()
        .flat_map(|(level, segments)| stitch_level(level, &segments))
        .collect()
}

type VertexKey = (i64, i64);

// Isoline vertices sit on half-cell positions
fn vertex_key(v: Vertex) -> VertexKey {
    ((v.0 * 2.0).round() as i64, (v.1 * 2.0).round() as i64)
}

fn stitch_level(level: f32, segments: &[(Vertex, Vertex)]) -> Vec<Polyline> {
    let mut by_end: HashMap<VertexKey, Vec<usize>> = HashMap::new();
    for (i, (a, b)) in segments.iter().enumerate() {
        by_end.entry(vertex_key(*a)).or_default().push(i);
        by_end.entry(vertex_key(*b)).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut out = Vec::new();

    for i in 0..segments.len() {
        if used[i] {
            continue;
        }
        used[i] = true;

        let (head, tail) = segments[i];
        let mut chain = VecDeque::from([head, tail]);

        let mut end = tail;
        while let Some(next) = take_neighbor(end, segments, &by_end, &mut used) {
            chain.push_back(next);
            end = next;
        }
        let mut start = head;
        while let Some(prev) = take_neighbor(start, segments, &by_end, &mut used) {
            chain.push_front(prev);
            start = prev;
        }

        out.push(Polyline {
            level,
            points: chain.into(),
        });
    }

    out
}

fn take_neighbor(
    at: Vertex,
    segments: &[(Vertex, Vertex)],
    by_end: &HashMap<VertexKey, Vec<usize>>,
    used: &mut [bool],
) -> Option<Vertex> {
    let key = vertex_key(at);
    let idx = *by_end.get(&key)?.iter().find(|&&i| !used[i])?;
    used[idx] = true;
    let (a, b) = segments[idx];
    Some(if vertex_key(a) == key { b } else { a })
}
