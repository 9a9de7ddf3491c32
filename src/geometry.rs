use serde::{Deserialize, Serialize};

/// Integer grid coordinate of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    #[inline]
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point { x, y }
    }
}

/// Sub-cell position used by isolines.
pub type Vertex = (f32, f32);

/// Douglas-Peucker simplification. Endpoints are always kept; interior points
/// closer than `epsilon` to the chord are dropped.
pub fn simplify(points: &[Vertex], epsilon: f64) -> Vec<Vertex> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    // Explicit stack instead of recursion; long isolines can be deep
    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut index = first;
        for i in first + 1..last {
            let d = perpendicular_distance(points[i], points[first], points[last]);
            if d > max_dist {
                max_dist = d;
                index = i;
            }
        }

        if max_dist > epsilon {
            keep[index] = true;
            stack.push((first, index));
            stack.push((index, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

fn perpendicular_distance(p: Vertex, a: Vertex, b: Vertex) -> f64 {
    let (px, py) = (p.0 as f64, p.1 as f64);
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (bx, by) = (b.0 as f64, b.1 as f64);
    let dx = bx - ax;
    let dy = by - ay;
    let den = (dx * dx + dy * dy).sqrt();
    // Closed ring: measure from the shared endpoint
    if den == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    (dy * px - dx * py + bx * ay - by * ax).abs() / den
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(30, 40);
        assert_eq!(a.distance_to(&b), 50.0);
        assert_eq!(b.distance_to(&a), 50.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_simplify_straight_line() {
        let line: Vec<Vertex> = (0..10).map(|i| (i as f32, 0.0)).collect();
        assert_eq!(simplify(&line, 1.0), vec![(0.0, 0.0), (9.0, 0.0)]);
    }

    #[test]
    fn test_simplify_keeps_corner() {
        let line = vec![(0.0, 0.0), (5.0, 0.1), (10.0, 0.0), (10.0, 5.0), (10.0, 10.0)];
        let out = simplify(&line, 1.0);
        assert_eq!(out, vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
    }

    #[test]
    fn test_simplify_short_input_untouched() {
        let line = vec![(0.0, 0.0), (3.0, 4.0)];
        assert_eq!(simplify(&line, 1.0), line);
        assert!(simplify(&[], 1.0).is_empty());
    }

    #[test]
    fn test_simplify_closed_loop_keeps_shape() {
        let ring = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)];
        assert_eq!(simplify(&ring, 1.0), ring);

        let tiny = vec![(0.0, 0.0), (0.5, 0.0), (0.5, 0.5), (0.0, 0.0)];
        assert_eq!(simplify(&tiny, 1.0), vec![(0.0, 0.0), (0.0, 0.0)]);
    }
}
