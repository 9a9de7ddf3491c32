use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point;
use crate::grid::ScalarGrid;
use crate::planner::Economy;
use crate::visibility::has_direct_path;

/// Why a connection attempt was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    #[error("index-out-of-range")]
    IndexOutOfRange,
    #[error("already-connected")]
    AlreadyConnected,
    #[error("unreachable")]
    Unreachable,
    #[error("no-budget")]
    NoBudget,
    #[error("blocked-by-relief")]
    BlockedByRelief,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{reason}")]
pub struct Rejection {
    pub reason: RejectReason,
    /// Known once the distance has been priced.
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Connection {
    pub from: usize,
    pub to: usize,
    pub cost: f64,
    pub reward_nodes: u32,
}

/// Flat record of one attempt, as handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOutcome {
    pub success: bool,
    pub cost: Option<f64>,
    pub reason: Option<RejectReason>,
    pub new_budget: f64,
}

impl ConnectOutcome {
    pub fn new(result: &Result<Connection, Rejection>, new_budget: f64) -> Self {
        match result {
            Ok(conn) => ConnectOutcome {
                success: true,
                cost: Some(conn.cost),
                reason: None,
                new_budget,
            },
            Err(rejection) => ConnectOutcome {
                success: false,
                cost: rejection.cost,
                reason: Some(rejection.reason),
                new_budget,
            },
        }
    }
}

/// A player's rail network under construction.
///
/// Edges are added one at a time through [`GameState::try_connect`]; each
/// must extend the existing network from exactly one connected endpoint, be
/// affordable at full cost, and have line of sight over the height grid.
/// Mutation needs `&mut self`; wrap the state in a lock to share it.
#[derive(Debug, Clone)]
pub struct GameState {
    height: Arc<ScalarGrid>,
    cities: Arc<Vec<Point>>,
    economy: Economy,
    threshold: f32,
    budget: f64,
    connected: HashSet<usize>,
    links: Vec<(usize, usize)>,
}

impl GameState {
    pub fn new(height: Arc<ScalarGrid>, cities: Arc<Vec<Point>>, economy: Economy, threshold: f32) -> Self {
        GameState {
            height,
            cities,
            budget: economy.initial_budget,
            economy,
            threshold,
            connected: HashSet::new(),
            links: Vec::new(),
        }
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    pub fn connections(&self) -> &[(usize, usize)] {
        &self.links
    }

    pub fn is_connected(&self, city: usize) -> bool {
        self.connected.contains(&city)
    }

    pub fn connected_count(&self) -> usize {
        self.connected.len()
    }

    pub fn cities(&self) -> &[Point] {
        &self.cities
    }

    pub fn try_connect(&mut self, from: usize, to: usize) -> Result<Connection, Rejection> {
        let result = self.validate_and_commit(from, to);
        match &result {
            Ok(conn) => tracing::debug!(
                target: "railmapper::game",
                from,
                to,
                cost = conn.cost,
                reward_nodes = conn.reward_nodes,
                budget = self.budget,
                "game.connect.accepted"
            ),
            Err(rejection) => tracing::debug!(
                target: "railmapper::game",
                from,
                to,
                reason = %rejection.reason,
                cost = ?rejection.cost,
                "game.connect.rejected"
            ),
        }
        result
    }

    fn validate_and_commit(&mut self, from: usize, to: usize) -> Result<Connection, Rejection> {
        let reject = |reason: RejectReason, cost: Option<f64>| -> Result<Connection, Rejection> {
            Err(Rejection { reason, cost })
        };

        let n = self.cities.len();
        if from >= n || to >= n || from == to {
            return reject(RejectReason::IndexOutOfRange, None);
        }

        if self
            .links
            .iter()
            .any(|&link| link == (from, to) || link == (to, from))
        {
            return reject(RejectReason::AlreadyConnected, None);
        }

        let graph_empty = self.connected.is_empty();
        let from_in = self.connected.contains(&from);
        let to_in = self.connected.contains(&to);

        if !graph_empty && !(from_in ^ to_in) {
            return reject(RejectReason::Unreachable, None);
        }

        let a = &self.cities[from];
        let b = &self.cities[to];
        let cost = a.distance_to(b) * self.economy.cost_per_km;
        if cost > self.budget {
            return reject(RejectReason::NoBudget, Some(cost));
        }

        if !has_direct_path(a, b, &self.height, self.threshold) {
            return reject(RejectReason::BlockedByRelief, Some(cost));
        }

        let reward_nodes = if graph_empty {
            1
        } else {
            u32::from(!from_in) + u32::from(!to_in)
        };

        self.budget -= cost;
        self.budget += reward_nodes as f64 * self.economy.reward_per_city;
        self.links.push((from, to));
        self.connected.insert(from);
        self.connected.insert(to);

        Ok(Connection {
            from,
            to,
            cost,
            reward_nodes,
        })
    }
}
