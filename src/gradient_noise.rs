use noise::NoiseFn;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TABLE_SIZE: usize = 256;

/// Seeded 3D gradient noise over a shuffled permutation table.
///
/// The table is built once and never mutated, so one instance can be shared
/// by reference or cloned into each worker.
#[derive(Debug, Clone)]
pub struct PerlinNoise3D {
    perm: Vec<usize>,
    mask: usize,
}

impl PerlinNoise3D {
    pub fn new(seed: u32) -> Self {
        Self::with_table_size(seed, DEFAULT_TABLE_SIZE)
    }

    /// Table sizes that are not a power of two are rounded up to the next one
    /// so lattice coordinates can be wrapped with a mask.
    pub fn with_table_size(seed: u32, table_size: usize) -> Self {
        let size = table_size.max(2).next_power_of_two();
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);

        let mut source: Vec<usize> = (0..size).collect();
        source.shuffle(&mut rng);

        // Doubled so `perm[perm[x] + y]` never needs a second wrap
        let perm = (0..size * 2).map(|i| source[i & (size - 1)]).collect();

        PerlinNoise3D {
            perm,
            mask: size - 1,
        }
    }

    pub fn table_size(&self) -> usize {
        self.mask + 1
    }

    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let xi = (x.floor() as i32 as usize) & self.mask;
        let yi = (y.floor() as i32 as usize) & self.mask;
        let zi = (z.floor() as i32 as usize) & self.mask;

        let xf = x - x.floor();
        let yf = y - y.floor();
        let zf = z - z.floor();

        let u = fade(xf);
        let v = fade(yf);
        let w = fade(zf);

        let p = &self.perm;
        let a = p[xi] + yi;
        let b = p[xi + 1] + yi;

        let aaa = p[p[a] + zi];
        let aba = p[p[a + 1] + zi];
        let aab = p[p[a] + zi + 1];
        let abb = p[p[a + 1] + zi + 1];
        let baa = p[p[b] + zi];
        let bba = p[p[b + 1] + zi];
        let bab = p[p[b] + zi + 1];
        let bbb = p[p[b + 1] + zi + 1];

        let x1 = lerp(grad(aaa, xf, yf, zf), grad(baa, xf - 1.0, yf, zf), u);
        let x2 = lerp(grad(aba, xf, yf - 1.0, zf), grad(bba, xf - 1.0, yf - 1.0, zf), u);
        let near = lerp(x1, x2, v);

        let x1 = lerp(grad(aab, xf, yf, zf - 1.0), grad(bab, xf - 1.0, yf, zf - 1.0), u);
        let x2 = lerp(
            grad(abb, xf, yf - 1.0, zf - 1.0),
            grad(bbb, xf - 1.0, yf - 1.0, zf - 1.0),
            u,
        );
        let far = lerp(x1, x2, v);

        lerp(near, far, w)
    }
}

impl NoiseFn<f64, 3> for PerlinNoise3D {
    fn get(&self, point: [f64; 3]) -> f64 {
        self.sample(point[0] as f32, point[1] as f32, point[2] as f32) as f64
    }
}

/// Octave parameters for fractal noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub frequency: f32,
    pub octaves: u32,
    pub lacunarity: f32,
    pub gain: f32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        NoiseSettings {
            frequency: 0.008,
            octaves: 4,
            lacunarity: 1.4,
            gain: 0.55,
        }
    }
}

/// Fractal Brownian motion over [`PerlinNoise3D`].
#[derive(Debug, Clone)]
pub struct FbmNoise3D {
    base: PerlinNoise3D,
    octaves: u32,
    lacunarity: f32,
    gain: f32,
}

impl FbmNoise3D {
    pub fn new(seed: u32, octaves: u32, lacunarity: f32, gain: f32) -> Self {
        FbmNoise3D {
            base: PerlinNoise3D::new(seed),
            octaves,
            lacunarity,
            gain,
        }
    }

    pub fn from_settings(seed: u32, settings: &NoiseSettings) -> Self {
        Self::new(seed, settings.octaves, settings.lacunarity, settings.gain)
    }

    /// Weighted octave sum divided by the total weight, so the result stays
    /// in the base sampler's range for any octave count.
    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut sum = 0.0;
        let mut norm = 0.0;

        for _ in 0..self.octaves {
            sum += self.base.sample(x * frequency, y * frequency, z * frequency) * amplitude;
            norm += amplitude;
            frequency *= self.lacunarity;
            amplitude *= self.gain;
        }

        if norm > 0.0 {
            sum / norm
        } else {
            0.0
        }
    }
}

impl NoiseFn<f64, 3> for FbmNoise3D {
    fn get(&self, point: [f64; 3]) -> f64 {
        self.sample(point[0] as f32, point[1] as f32, point[2] as f32) as f64
    }
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

fn grad(hash: usize, x: f32, y: f32, z: f32) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    let u = if h & 1 == 0 { u } else { -u };
    let v = if h & 2 == 0 { v } else { -v };
    u + v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_is_deterministic() {
        let a = PerlinNoise3D::new(42);
        let b = PerlinNoise3D::new(42);
        for i in 0..50 {
            let x = i as f32 * 0.37;
            let y = i as f32 * 0.11 - 3.0;
            let z = 0.5;
            assert_eq!(a.sample(x, y, z), b.sample(x, y, z));
            assert_eq!(a.sample(x, y, z), a.sample(x, y, z));
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = PerlinNoise3D::new(1);
        let b = PerlinNoise3D::new(2);
        let differs = (0..100).any(|i| {
            let x = i as f32 * 0.173;
            a.sample(x, x * 0.5, 0.25) != b.sample(x, x * 0.5, 0.25)
        });
        assert!(differs);
    }

    #[test]
    fn test_sample_is_zero_on_lattice_points() {
        let noise = PerlinNoise3D::new(7);
        for x in -3..3 {
            for y in -3..3 {
                assert_eq!(noise.sample(x as f32, y as f32, 0.0), 0.0);
            }
        }
    }

    #[test]
    fn test_sample_stays_in_range() {
        let noise = PerlinNoise3D::new(99);
        for i in 0..2000 {
            let x = i as f32 * 0.0731 - 40.0;
            let y = i as f32 * 0.0413;
            let z = (i % 7) as f32 * 0.3;
            let v = noise.sample(x, y, z);
            assert!(v.is_finite());
            assert!((-1.5..=1.5).contains(&v), "sample {} out of range", v);
        }
    }

    #[test]
    fn test_table_size_rounds_to_power_of_two() {
        assert_eq!(PerlinNoise3D::with_table_size(1, 256).table_size(), 256);
        assert_eq!(PerlinNoise3D::with_table_size(1, 100).table_size(), 128);
        assert_eq!(PerlinNoise3D::with_table_size(1, 0).table_size(), 2);
    }

    #[test]
    fn test_permutation_is_a_shuffle() {
        let noise = PerlinNoise3D::with_table_size(5, 64);
        let mut first: Vec<usize> = noise.perm[..64].to_vec();
        assert_eq!(&noise.perm[..64], &noise.perm[64..]);
        first.sort_unstable();
        assert_eq!(first, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn test_fbm_zero_octaves_is_zero() {
        let fbm = FbmNoise3D::new(3, 0, 2.0, 0.5);
        assert_eq!(fbm.sample(1.3, 4.7, 0.0), 0.0);
    }

    #[test]
    fn test_fbm_single_octave_matches_base() {
        let fbm = FbmNoise3D::new(11, 1, 2.0, 0.5);
        let base = PerlinNoise3D::new(11);
        assert_eq!(fbm.sample(2.25, 0.75, 0.0), base.sample(2.25, 0.75, 0.0));
    }

    #[test]
    fn test_fbm_stays_bounded() {
        let fbm = FbmNoise3D::new(8, 9, 2.0, 0.5);
        for i in 0..500 {
            let x = i as f32 * 0.091;
            let v = fbm.sample(x, x * 0.7, 0.0);
            assert!(v.abs() <= 1.5);
        }
    }

    #[test]
    fn test_noise_fn_matches_sample() {
        let fbm = FbmNoise3D::from_settings(21, &NoiseSettings::default());
        let expected = fbm.sample(0.5, 1.25, 0.0) as f64;
        assert_eq!(fbm.get([0.5, 1.25, 0.0]), expected);
    }
}
