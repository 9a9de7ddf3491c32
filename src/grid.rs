use serde::{Deserialize, Serialize};

/// Dense row-major grid of scalar samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarGrid {
    pub width: usize,
    pub height: usize,
    values: Vec<f32>,
}

impl ScalarGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        ScalarGrid {
            width,
            height,
            values: vec![value; width * height],
        }
    }

    /// Builds a grid from row-major values. Returns `None` when the length
    /// does not match `width * height`.
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Option<Self> {
        if values.len() != width * height {
            return None;
        }
        Some(ScalarGrid {
            width,
            height,
            values,
        })
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        ScalarGrid {
            width,
            height,
            values,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.values[y * self.width + x])
        } else {
            None
        }
    }

    /// Unchecked-by-contract access for hot loops; panics outside the grid.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.values[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.width && y < self.height {
            self.values[y * self.width + x] = value;
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        if self.values.is_empty() {
            return None;
        }
        let mut min_v = f32::MAX;
        let mut max_v = f32::MIN;
        for &v in &self.values {
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }
        Some((min_v, max_v))
    }

    /// Fraction of cells at or above `threshold`.
    pub fn coverage(&self, threshold: f32) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let above = self.values.iter().filter(|&&v| v >= threshold).count();
        above as f32 / self.values.len() as f32
    }
}
