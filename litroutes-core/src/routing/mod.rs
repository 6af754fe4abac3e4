//! Time-optimal and danger-optimal path finding, and route formatting.

pub(crate) mod dijkstra;
pub mod export;
pub mod external;
pub mod formatter;
pub mod path;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use export::{lights_geojson, network_geojson};
pub use external::{OsrmService, TurnByTurnService, reconcile_path};
pub use formatter::{FormattedRoute, format_route};
pub use path::{PathFinder, RouteResult, find_route};

use crate::{Error, model::StreetEdge};

/// Optimization criterion of a route query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Minimize free-flow travel time
    Time,
    /// Minimize `length * (1 + danger / 100)`
    Danger,
}

impl Criterion {
    /// Edge weight under this criterion
    pub fn weight(self, edge: &StreetEdge) -> f64 {
        match self {
            Criterion::Time => edge.travel_time_s,
            Criterion::Danger => edge.danger_weight(),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Time => f.write_str("time"),
            Criterion::Danger => f.write_str("danger"),
        }
    }
}

impl FromStr for Criterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" | "fastest" => Ok(Criterion::Time),
            "danger" | "safest" => Ok(Criterion::Danger),
            other => Err(Error::InvalidData(format!("unknown criterion '{other}'"))),
        }
    }
}
