use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::geometry::Point;
use crate::grid::ScalarGrid;

const NAME_PREFIXES: [&str; 15] = [
    "Novi", "Green", "River", "Stone", "High", "Lake", "Silver", "Red", "Wind", "Bright", "Oak", "Wolf",
    "Sun", "Moon", "Star",
];

const NAME_SUFFIXES: [&str; 15] = [
    "dale", "ford", "ville", "burg", "port", "ton", "haven", "crest", "wood", "helm", "mouth", "field",
    "bridge", "peak", "grove",
];

/// Picks `count` settlement sites among cells at or above `threshold`.
///
/// Candidates are gathered in x-then-y order and shuffled with a seeded RNG,
/// so the same grid and seed always give the same sites and names.
pub fn generate_points(grid: &ScalarGrid, seed: u32, count: usize, threshold: f32) -> (Vec<Point>, Vec<String>) {
    let mut candidates: Vec<Point> = (0..grid.width)
        .into_par_iter()
        .flat_map_iter(|x| {
            (0..grid.height)
                .filter(move |&y| grid.at(x, y) >= threshold)
                .map(move |y| Point::new(x as i32, y as i32))
        })
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    candidates.shuffle(&mut rng);
    candidates.truncate(count);

    let names: Vec<String> = candidates
        .par_iter()
        .map(|p| city_name(seed, p.x, p.y))
        .collect();

    tracing::debug!(
        target: "railmapper::cities",
        requested = count,
        placed = candidates.len(),
        threshold,
        "cities.placed"
    );

    (candidates, names)
}

/// Two-part name derived only from the seed and the site.
pub fn city_name(seed: u32, x: i32, y: i32) -> String {
    let h = ((seed as i32).wrapping_mul(31) ^ x.wrapping_mul(17) ^ y.wrapping_mul(13)) & 0x7FFF_FFFF;
    let mut rng = ChaCha8Rng::seed_from_u64(h as u64);
    let prefix = NAME_PREFIXES[rng.gen_range(0..NAME_PREFIXES.len())];
    let suffix = NAME_SUFFIXES[rng.gen_range(0..NAME_SUFFIXES.len())];
    format!("{}{}", prefix, suffix)
}
