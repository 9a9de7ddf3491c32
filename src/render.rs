use std::path::Path;

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::error::MapperResult;
use crate::geometry::Point;
use crate::grid::ScalarGrid;
use crate::world::World;

const LOWLAND: Rgba<u8> = Rgba([0, 0, 0, 0]);
const PLATEAU: Rgba<u8> = Rgba([0xD8, 0xC9, 0xA5, 0xFF]);
const HIGHLAND_OPTIONS: [Rgba<u8>; 3] = [
    Rgba([0x61, 0x5C, 0x4B, 0xFF]),
    Rgba([0x75, 0x6F, 0x58, 0xFF]),
    Rgba([0xA4, 0x9A, 0x76, 0xFF]),
];

const PAPER: Rgba<u8> = Rgba([0xF4, 0xEF, 0xE1, 0xFF]);
const WATER: Rgba<u8> = Rgba([0x6F, 0x9F, 0xC0, 0xA0]);
const RAIL: Rgba<u8> = Rgba([0x42, 0x3B, 0x35, 0xFF]);
const CITY: Rgba<u8> = Rgba([0x00, 0x80, 0x00, 0xFF]);
const START_CITY: Rgba<u8> = Rgba([0xFF, 0xD7, 0x00, 0xFF]);

pub const CLOUD_MAX_OPACITY: f32 = 0.3;
pub const CLOUD_THRESHOLD: f32 = 0.45;

/// One colour per band. Two levels use the fixed lowland/plateau/highland
/// triple; other counts interpolate along it.
pub fn band_colors(level_count: usize, seed: u32) -> Vec<Rgba<u8>> {
    let highland = HIGHLAND_OPTIONS[seed as usize % HIGHLAND_OPTIONS.len()];
    let control = [LOWLAND, PLATEAU, highland];
    if level_count == 2 {
        return control.to_vec();
    }

    let bands = level_count + 1;
    let segments = control.len() - 1;
    (0..bands)
        .map(|i| {
            let t = if bands > 1 { i as f32 / (bands - 1) as f32 } else { 0.0 };
            let pos = t * segments as f32;
            let idx = (pos as usize).min(segments - 1);
            let local = pos - idx as f32;
            let (c0, c1) = (control[idx], control[idx + 1]);
            let mut out = [0u8; 4];
            for ch in 0..4 {
                let a = c0[ch] as f32;
                let b = c1[ch] as f32;
                out[ch] = (a + (b - a) * local) as u8;
            }
            Rgba(out)
        })
        .collect()
}

fn band_index(value: f32, levels: &[f32]) -> usize {
    levels.iter().position(|&l| value < l).unwrap_or(levels.len())
}

fn fill_cells(grid: &ScalarGrid, px: u32, mut color_at: impl FnMut(f32) -> Option<Rgba<u8>>) -> RgbaImage {
    let mut img = RgbaImage::new(grid.width as u32 * px, grid.height as u32 * px);
    for y in 0..grid.height {
        for x in 0..grid.width {
            let Some(color) = color_at(grid.at(x, y)) else {
                continue;
            };
            for dy in 0..px {
                for dx in 0..px {
                    img.put_pixel(x as u32 * px + dx, y as u32 * px + dy, color);
                }
            }
        }
    }
    img
}

/// Height bands, `px` pixels per cell. The lowest band is transparent.
pub fn render_height(grid: &ScalarGrid, levels: &[f32], px: u32, seed: u32) -> RgbaImage {
    let colors = band_colors(levels.len(), seed);
    fill_cells(grid, px, |v| Some(colors[band_index(v, levels)]))
}

/// Tints cells whose mask value is below 0.5.
pub fn render_water(mask: &ScalarGrid, px: u32) -> RgbaImage {
    fill_cells(mask, px, |v| (v < 0.5).then_some(WATER))
}

/// White haze above `threshold`, opacity rising to `max_opacity` at 1.0.
pub fn render_cloud(grid: &ScalarGrid, px: u32, max_opacity: f32, threshold: f32) -> RgbaImage {
    fill_cells(grid, px, |v| {
        if v <= threshold || threshold >= 1.0 {
            return None;
        }
        let normalized = (v - threshold) / (1.0 - threshold);
        let alpha = (normalized * max_opacity * 255.0).clamp(0.0, 255.0) as u8;
        Some(Rgba([255, 255, 255, alpha]))
    })
}

fn cell_center(p: &Point, px: u32) -> (f32, f32) {
    let half = px as f32 * 0.5;
    (p.x as f32 * px as f32 + half, p.y as f32 * px as f32 + half)
}

/// Rail links as line segments, settlements as dots; `start` in gold.
pub fn draw_network(img: &mut RgbaImage, cities: &[Point], links: &[(usize, usize)], start: Option<usize>, px: u32) {
    for &(from, to) in links {
        let (Some(a), Some(b)) = (cities.get(from), cities.get(to)) else {
            continue;
        };
        draw_line_segment_mut(img, cell_center(a, px), cell_center(b, px), RAIL);
    }

    let radius = (px as i32 / 2).max(1);
    for (i, p) in cities.iter().enumerate() {
        let (cx, cy) = cell_center(p, px);
        let color = if Some(i) == start { START_CITY } else { CITY };
        draw_filled_circle_mut(img, (cx as i32, cy as i32), radius, color);
    }
}

/// Paper, height bands, water, clouds, then `links` on top.
pub fn compose(world: &World, links: &[(usize, usize)], start: Option<usize>) -> RgbaImage {
    let config = world.config();
    let px = config.px_per_cell;
    let height = world.height();

    let mut img = RgbaImage::from_pixel(height.width as u32 * px, height.height as u32 * px, PAPER);
    imageops::overlay(&mut img, &render_height(height, &config.contour_levels, px, config.seed), 0, 0);
    imageops::overlay(&mut img, &render_water(world.water(), px), 0, 0);
    imageops::overlay(
        &mut img,
        &render_cloud(world.cloud(), px, CLOUD_MAX_OPACITY, CLOUD_THRESHOLD),
        0,
        0,
    );
    draw_network(&mut img, world.cities(), links, start, px);

    tracing::debug!(
        target: "railmapper::render",
        width = img.width(),
        height = img.height(),
        links = links.len(),
        "render.composed"
    );
    img
}

pub fn save_png(img: &RgbaImage, path: impl AsRef<Path>) -> MapperResult<()> {
    img.save(path.as_ref())?;
    Ok(())
}
