use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MapperError, MapperResult};
use crate::gradient_noise::NoiseSettings;
use crate::planner::Economy;
use crate::terrain::WaterSettings;

/// Largest grid side accepted by `validate`.
pub const MAX_GRID_SIDE: usize = 4096;

/// Everything needed to generate one world. Missing JSON fields fall back to
/// the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub width: usize,
    pub height: usize,
    pub seed: u32,
    pub height_noise: NoiseSettings,
    pub cloud_noise: NoiseSettings,
    pub water: WaterSettings,
    /// Added to `seed` for the water mask.
    pub water_seed_offset: u32,
    pub city_count: usize,
    pub threshold: f32,
    pub contour_levels: Vec<f32>,
    pub px_per_cell: u32,
    pub economy: Economy,
}

impl Default for MapConfig {
    fn default() -> Self {
        let height_noise = NoiseSettings::default();
        MapConfig {
            width: 600,
            height: 400,
            seed: 42,
            cloud_noise: NoiseSettings {
                frequency: height_noise.frequency * 2.0,
                ..height_noise
            },
            height_noise,
            water: WaterSettings::default(),
            water_seed_offset: 1,
            city_count: 450,
            threshold: 0.44,
            contour_levels: vec![0.4, 0.44],
            px_per_cell: 4,
            economy: Economy::default(),
        }
    }
}

impl MapConfig {
    /// Reads a JSON config from disk and validates it.
    pub fn load(path: impl AsRef<Path>) -> MapperResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: MapConfig = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!(
            target: "railmapper::config",
            path = %path.as_ref().display(),
            width = config.width,
            height = config.height,
            seed = config.seed,
            "config.loaded"
        );
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> MapperResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn water_seed(&self) -> u32 {
        self.seed.wrapping_add(self.water_seed_offset)
    }

    pub fn validate(&self) -> MapperResult<()> {
        if self.width == 0 || self.height == 0 {
            return invalid("grid width and height must be positive");
        }
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return invalid(format!("grid sides must not exceed {}", MAX_GRID_SIDE));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return invalid("threshold must lie in [0, 1]");
        }
        if self.px_per_cell == 0 || self.px_per_cell > 32 {
            return invalid("pxPerCell must lie in [1, 32]");
        }
        if self.contour_levels.iter().any(|l| !l.is_finite()) {
            return invalid("contour levels must be finite");
        }
        // Isolines are stitched per level value
        for (i, level) in self.contour_levels.iter().enumerate() {
            if self.contour_levels[..i].contains(level) {
                return invalid(format!("contour level {} is listed twice", level));
            }
        }
        let extent = self.width.max(self.height) as f32;
        for (name, noise) in [("heightNoise", &self.height_noise), ("cloudNoise", &self.cloud_noise)] {
            if !(noise.frequency.is_finite() && noise.frequency > 0.0) {
                return invalid(format!("{}.frequency must be positive", name));
            }
            if !noise.lacunarity.is_finite() || !noise.gain.is_finite() {
                return invalid(format!("{} lacunarity and gain must be finite", name));
            }
            let last_octave = noise.octaves.saturating_sub(1).min(i32::MAX as u32) as i32;
            let reach = noise.frequency * noise.lacunarity.abs().powi(last_octave) * extent;
            if !reach.is_finite() {
                return invalid(format!("{} octaves overflow the sample range", name));
            }
        }
        let water = &self.water;
        if !(water.frequency.is_finite() && water.frequency > 0.0) {
            return invalid("water.frequency must be positive");
        }
        if !water.warp_amplitude.is_finite() || !water.threshold.is_finite() {
            return invalid("water warpAmplitude and threshold must be finite");
        }
        if !(water.frequency * extent).is_finite() {
            return invalid("water.frequency overflows the sample range");
        }
        let econ = &self.economy;
        if [econ.initial_budget, econ.cost_per_km, econ.reward_per_city]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return invalid("economy values must be finite and non-negative");
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> MapperResult<()> {
    Err(MapperError::InvalidConfig { reason: reason.into() })
}
