//! Procedural terrain and rail network planning.
//!
//! A seed drives fractal noise into height, cloud and water grids. Settlements
//! are scattered over high ground, linked by line of sight, and either planned
//! greedily under a budget ([`planner`]) or built edge by edge by a player
//! ([`game`]). [`render`] and [`svg`] export the result.

pub mod cities;
pub mod config;
pub mod contour;
pub mod error;
pub mod game;
pub mod geometry;
pub mod gradient_noise;
pub mod grid;
pub mod planner;
pub mod render;
pub mod svg;
pub mod terrain;
pub mod visibility;
pub mod world;

pub use config::MapConfig;
pub use error::{MapperError, MapperResult};
pub use game::{ConnectOutcome, GameState, RejectReason};
pub use geometry::Point;
pub use grid::ScalarGrid;
pub use planner::{build_best_tree, Economy, PlannedTree};
pub use world::World;
