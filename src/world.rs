use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::cities::generate_points;
use crate::config::MapConfig;
use crate::contour::{extract_contours, Contours};
use crate::error::MapperResult;
use crate::game::GameState;
use crate::geometry::Point;
use crate::grid::ScalarGrid;
use crate::planner::{best_tree_in, PlannedTree};
use crate::terrain::{generate_cloud, generate_height, generate_water};
use crate::visibility::VisibilityGraph;

/// One generated map: the three layers, the settlements on it and their
/// line-of-sight graph. Immutable after `generate`.
#[derive(Debug)]
pub struct World {
    config: MapConfig,
    height: Arc<ScalarGrid>,
    cloud: ScalarGrid,
    water: ScalarGrid,
    cities: Arc<Vec<Point>>,
    names: Vec<String>,
    graph: Arc<VisibilityGraph>,
    best_route: OnceLock<PlannedTree>,
}

impl World {
    pub fn generate(config: &MapConfig) -> MapperResult<Self> {
        config.validate()?;
        let (w, h) = (config.width, config.height);

        let (height, (cloud, water)) = rayon::join(
            || generate_height(w, h, config.seed, &config.height_noise),
            || {
                rayon::join(
                    || generate_cloud(w, h, config.seed, &config.cloud_noise),
                    || generate_water(w, h, config.water_seed(), &config.water),
                )
            },
        );

        let (cities, names) = generate_points(&height, config.seed, config.city_count, config.threshold);
        let graph = VisibilityGraph::build(&cities, &height, config.threshold);

        tracing::info!(
            target: "railmapper::world",
            width = w,
            height = h,
            seed = config.seed,
            cities = cities.len(),
            edges = graph.edge_count(),
            "world.generated"
        );

        Ok(World {
            config: config.clone(),
            height: Arc::new(height),
            cloud,
            water,
            cities: Arc::new(cities),
            names,
            graph: Arc::new(graph),
            best_route: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn height(&self) -> &ScalarGrid {
        &self.height
    }

    pub fn cloud(&self) -> &ScalarGrid {
        &self.cloud
    }

    pub fn water(&self) -> &ScalarGrid {
        &self.water
    }

    pub fn cities(&self) -> &[Point] {
        &self.cities
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn graph(&self) -> &VisibilityGraph {
        &self.graph
    }

    /// Planner result for this map; searched on first use.
    pub fn best_route(&self) -> &PlannedTree {
        self.best_route
            .get_or_init(|| best_tree_in(&self.graph, &self.config.economy))
    }

    /// Fresh game over this map's settlements with the full initial budget.
    pub fn new_game(&self) -> GameState {
        GameState::new(
            Arc::clone(&self.height),
            Arc::clone(&self.cities),
            self.config.economy,
            self.config.threshold,
        )
    }

    pub fn contours(&self) -> Contours<'_> {
        extract_contours(&self.height, &self.config.contour_levels)
    }

    pub fn report(&self) -> CitiesReport {
        let route = self.best_route();
        let cities = self
            .cities
            .iter()
            .zip(&self.names)
            .enumerate()
            .map(|(index, (p, name))| CityEntry {
                x: p.x,
                y: p.y,
                name: name.clone(),
                index,
            })
            .collect();

        CitiesReport {
            cities,
            threshold: self.config.threshold,
            cost_per_km: self.config.economy.cost_per_km,
            budget: self.config.economy.initial_budget,
            reward_per_city: self.config.economy.reward_per_city,
            best_route: RouteReport {
                start_idx: route.start,
                connections: route
                    .edges
                    .iter()
                    .map(|&(from, to)| LinkEntry { from, to })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitiesReport {
    pub cities: Vec<CityEntry>,
    pub threshold: f32,
    pub cost_per_km: f64,
    pub budget: f64,
    pub reward_per_city: f64,
    pub best_route: RouteReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityEntry {
    pub x: i32,
    pub y: i32,
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteReport {
    pub start_idx: Option<usize>,
    pub connections: Vec<LinkEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkEntry {
    pub from: usize,
    pub to: usize,
}
