use noise::NoiseFn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::gradient_noise::{FbmNoise3D, NoiseSettings, PerlinNoise3D};
use crate::grid::ScalarGrid;

/// Domain-warped cellular settings for the water mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaterSettings {
    pub frequency: f32,
    pub warp_amplitude: f32,
    pub threshold: f32,
}

impl Default for WaterSettings {
    fn default() -> Self {
        WaterSettings {
            frequency: 0.01,
            warp_amplitude: 1.5,
            threshold: 0.4,
        }
    }
}

/// Height field normalized to [0, 1].
pub fn generate_height(width: usize, height: usize, seed: u32, settings: &NoiseSettings) -> ScalarGrid {
    let grid = generate_fractal(width, height, seed, settings);
    tracing::debug!(
        target: "railmapper::terrain",
        width,
        height,
        seed,
        octaves = settings.octaves,
        "terrain.height.generated"
    );
    grid
}

/// Cloud cover normalized to [0, 1]. Same synthesis as height; callers pick
/// a different frequency.
pub fn generate_cloud(width: usize, height: usize, seed: u32, settings: &NoiseSettings) -> ScalarGrid {
    let grid = generate_fractal(width, height, seed, settings);
    tracing::debug!(
        target: "railmapper::terrain",
        width,
        height,
        seed,
        frequency = settings.frequency,
        "terrain.cloud.generated"
    );
    grid
}

fn generate_fractal(width: usize, height: usize, seed: u32, settings: &NoiseSettings) -> ScalarGrid {
    let mut grid = ScalarGrid::new(width, height);
    if grid.is_empty() {
        return grid;
    }

    let (min, max) = sample_rows(&mut grid, settings.frequency, || {
        FbmNoise3D::from_settings(seed, settings)
    });

    normalise(&mut grid, min, max);
    grid
}

/// Fills `grid` from a 3D sampler at `z = 0`, one sampler per worker, and
/// returns the range of the finite samples.
fn sample_rows<N, F>(grid: &mut ScalarGrid, frequency: f32, make_noise: F) -> (f32, f32)
where
    N: NoiseFn<f64, 3>,
    F: Fn() -> N + Sync + Send,
{
    let width = grid.width;
    let frequency = frequency as f64;

    let row_ranges: Vec<(f32, f32)> = grid
        .values_mut()
        .par_chunks_mut(width)
        .enumerate()
        .map_init(&make_noise, |noise, (y, row)| {
            let mut local_min = f32::MAX;
            let mut local_max = f32::MIN;
            for (x, cell) in row.iter_mut().enumerate() {
                let v = noise.get([x as f64 * frequency, y as f64 * frequency, 0.0]) as f32;
                *cell = v;
                if v.is_finite() {
                    local_min = local_min.min(v);
                    local_max = local_max.max(v);
                }
            }
            (local_min, local_max)
        })
        .collect();

    row_ranges
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &(row_lo, row_hi)| {
            (lo.min(row_lo), hi.max(row_hi))
        })
}

/// Rescales every cell to [0, 1]. A flat or non-finite range collapses the
/// grid to zero instead of dividing by zero; non-finite cells become 0.
fn normalise(grid: &mut ScalarGrid, min: f32, max: f32) {
    let range = max - min;
    let width = grid.width;

    if !(range > 0.0) || !range.is_finite() {
        tracing::warn!(
            target: "railmapper::terrain",
            min,
            max,
            "terrain.normalise.flat_field"
        );
        grid.values_mut().par_iter_mut().for_each(|v| *v = 0.0);
        return;
    }

    let range_inv = 1.0 / range;
    grid.values_mut()
        .par_chunks_mut(width)
        .for_each(|row| {
            for v in row.iter_mut() {
                *v = if v.is_finite() {
                    ((*v - min) * range_inv).clamp(0.0, 1.0)
                } else {
                    0.0
                };
            }
        });
}

/// Binary water mask: 0 where the warped cellular distance is below the
/// threshold, 1 elsewhere.
pub fn generate_water(width: usize, height: usize, seed: u32, settings: &WaterSettings) -> ScalarGrid {
    let mut grid = ScalarGrid::new(width, height);
    if grid.is_empty() {
        return grid;
    }

    let WaterSettings {
        frequency,
        warp_amplitude,
        threshold,
    } = *settings;

    grid.values_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each_init(
            || PerlinNoise3D::new(seed),
            |perlin, (y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let fx = x as f32 * frequency;
                    let fy = y as f32 * frequency;

                    let wx = perlin.sample(fx, fy, 0.0) * warp_amplitude;
                    let wy = perlin.sample(fx, fy, 1.0) * warp_amplitude;

                    let d = cellular_distance(fx + wx, fy + wy, seed);
                    *cell = if d < threshold { 0.0 } else { 1.0 };
                }
            },
        );

    tracing::debug!(
        target: "railmapper::terrain",
        width,
        height,
        seed,
        coverage = grid.coverage(0.5),
        "terrain.water.generated"
    );
    grid
}

/// Distance to the nearest jittered cell center in the 3x3 neighborhood.
fn cellular_distance(x: f32, y: f32, seed: u32) -> f32 {
    let xi = x.floor() as i32;
    let yi = y.floor() as i32;
    let mut min_dist_sq = f32::MAX;

    for dy in -1..=1 {
        for dx in -1..=1 {
            let cx = xi + dx;
            let cy = yi + dy;

            let px = cx as f32 + cell_hash(cx, cy, seed);
            let py = cy as f32 + cell_hash(cx, cy, seed ^ 0x00AB_CDEF);

            let ox = x - px;
            let oy = y - py;
            min_dist_sq = min_dist_sq.min(ox * ox + oy * oy);
        }
    }

    min_dist_sq.sqrt()
}

fn cell_hash(x: i32, y: i32, seed: u32) -> f32 {
    let mut h = (x.wrapping_mul(374_761_393).wrapping_add(y.wrapping_mul(668_265_263)) as u32) ^ seed;
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^= h >> 16;
    (h & 0x00FF_FFFF) as f32 / 0x0100_0000 as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> NoiseSettings {
        NoiseSettings {
            frequency: 0.05,
            octaves: 4,
            lacunarity: 2.0,
            gain: 0.5,
        }
    }

    #[test]
    fn test_height_is_normalised() {
        let grid = generate_height(64, 48, 42, &settings());
        let (min, max) = grid.min_max().unwrap();
        assert_eq!(min, 0.0);
        assert!((max - 1.0).abs() < 1e-6, "max was {}", max);
        assert!(grid.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_height_is_deterministic() {
        let a = generate_height(32, 32, 7, &settings());
        let b = generate_height(32, 32, 7, &settings());
        assert_eq!(a, b);
    }

    #[test]
    fn test_cloud_uses_its_own_frequency() {
        let mut cloud_settings = settings();
        cloud_settings.frequency *= 2.0;
        let height = generate_height(32, 32, 7, &settings());
        let cloud = generate_cloud(32, 32, 7, &cloud_settings);
        assert_ne!(height, cloud);
        let (min, max) = cloud.min_max().unwrap();
        assert_eq!(min, 0.0);
        assert!((max - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_field_falls_back_to_zero() {
        // Zero octaves sample a constant 0 everywhere
        let flat = NoiseSettings {
            octaves: 0,
            ..settings()
        };
        let grid = generate_height(16, 16, 1, &flat);
        assert!(grid.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_overflowing_octaves_stay_finite() {
        // Late octaves push the sample coordinates past f32::MAX
        let runaway = NoiseSettings {
            frequency: 0.3,
            octaves: 128,
            lacunarity: 2.0,
            gain: 0.5,
        };
        let grid = generate_height(8, 8, 42, &runaway);
        let bad = grid.values().iter().filter(|v| !v.is_finite()).count();
        assert_eq!(bad, 0, "non-finite cells: {} of 64", bad);
        assert!(grid.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    struct Ramp;

    impl NoiseFn<f64, 3> for Ramp {
        fn get(&self, point: [f64; 3]) -> f64 {
            point[0] + point[1] * 10.0
        }
    }

    #[test]
    fn test_sample_rows_accepts_any_noise_fn() {
        let mut grid = ScalarGrid::new(4, 2);
        let range = sample_rows(&mut grid, 1.0, || Ramp);
        assert_eq!(grid.values(), &[0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0]);
        assert_eq!(range, (0.0, 13.0));
    }

    #[test]
    fn test_normalise_zeroes_non_finite_cells() {
        let mut grid = ScalarGrid::from_values(4, 1, vec![0.0, f32::NAN, 2.0, f32::INFINITY]).unwrap();
        normalise(&mut grid, 0.0, 2.0);
        assert_eq!(grid.values(), &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_single_cell_grid_is_flat() {
        let grid = generate_height(1, 1, 3, &settings());
        assert_eq!(grid.values(), &[0.0]);
    }

    #[test]
    fn test_empty_grid() {
        let grid = generate_height(0, 10, 3, &settings());
        assert!(grid.is_empty());
        let water = generate_water(10, 0, 3, &WaterSettings::default());
        assert!(water.is_empty());
    }

    #[test]
    fn test_water_mask_is_binary_and_deterministic() {
        let ws = WaterSettings {
            frequency: 0.2,
            warp_amplitude: 0.5,
            threshold: 0.4,
        };
        let a = generate_water(40, 30, 43, &ws);
        let b = generate_water(40, 30, 43, &ws);
        assert_eq!(a, b);
        assert!(a.values().iter().all(|&v| v == 0.0 || v == 1.0));
        let coverage = a.coverage(0.5);
        assert!(coverage > 0.0 && coverage < 1.0, "coverage {}", coverage);
    }

    #[test]
    fn test_cell_hash_in_unit_range() {
        for x in -20..20 {
            for y in -20..20 {
                let h = cell_hash(x, y, 42);
                assert!((0.0..1.0).contains(&h));
            }
        }
    }

    #[test]
    fn test_cellular_distance_bounded() {
        // Nearest center is always within the 3x3 block
        for i in 0..200 {
            let x = i as f32 * 0.173 - 10.0;
            let y = i as f32 * 0.071;
            let d = cellular_distance(x, y, 9);
            assert!(d >= 0.0 && d <= 2.0f32.sqrt() * 1.5);
        }
    }
}
