//! Turn-by-turn routing service used for time-optimal paths.

use std::time::Duration;

use itertools::Itertools;
use petgraph::{
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
};
use serde::Deserialize;

use super::dijkstra::shortest_path;
use crate::{DataSourceError, model::LatLon, model::SafetyGraph};

/// External router returning the time-optimal geometry between two points
pub trait TurnByTurnService: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error if the service is unreachable or has no route.
    fn route(&self, from: LatLon, to: LatLon) -> Result<Vec<LatLon>, DataSourceError>;
}

/// OSRM HTTP route service (`/route/v1/driving`)
#[derive(Debug, Clone)]
pub struct OsrmService {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

impl OsrmService {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataSourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataSourceError::unreachable("osrm", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, from: LatLon, to: LatLon) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, from.lon, from.lat, to.lon, to.lat
        )
    }
}

impl TurnByTurnService for OsrmService {
    fn name(&self) -> &str {
        "osrm"
    }

    fn route(&self, from: LatLon, to: LatLon) -> Result<Vec<LatLon>, DataSourceError> {
        let response: OsrmResponse = self
            .client
            .get(self.url(from, to))
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| DataSourceError::unreachable(self.name(), e))?
            .json()
            .map_err(|e| DataSourceError::malformed(self.name(), e))?;

        if response.code != "Ok" {
            return Err(DataSourceError::malformed(
                self.name(),
                format!("response code {}", response.code),
            ));
        }
        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| DataSourceError::malformed(self.name(), "no routes in response"))?;

        Ok(route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lon, lat]| LatLon::new(lat, lon))
            .collect())
    }
}

/// Map an external route geometry onto graph edges.
///
/// Coordinates inside the service area are snapped to their nearest nodes and
/// consecutive waypoints are joined by the fastest direct edge, or by a local
/// time-optimal path when no direct edge exists. Returns `None` when two
/// waypoints cannot be joined.
pub fn reconcile_path(
    graph: &SafetyGraph,
    start: NodeIndex,
    end: NodeIndex,
    coordinates: &[LatLon],
) -> Option<Vec<EdgeIndex>> {
    let bbox = graph.bbox();
    let snapped = coordinates
        .iter()
        .filter(|c| c.is_finite() && bbox.contains(c.lat, c.lon))
        .filter_map(|c| graph.nearest_node(c.lat, c.lon));

    let waypoints: Vec<NodeIndex> = std::iter::once(start)
        .chain(snapped)
        .chain(std::iter::once(end))
        .dedup()
        .collect();

    let mut path = Vec::new();
    for (&from, &to) in waypoints.iter().tuple_windows() {
        let direct = graph
            .graph
            .edges_connecting(from, to)
            .min_by(|a, b| {
                a.weight()
                    .travel_time_s
                    .total_cmp(&b.weight().travel_time_s)
                    .then(a.id().cmp(&b.id()))
            })
            .map(|edge| edge.id());

        match direct {
            Some(edge) => path.push(edge),
            None => path.extend(shortest_path(graph, from, to, |e| e.travel_time_s)?),
        }
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osrm_url_is_lon_lat_ordered() {
        let service = OsrmService::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            service.url(LatLon::new(35.35, -82.47), LatLon::new(35.36, -82.46)),
            "http://localhost:5000/route/v1/driving/-82.47,35.35;-82.46,35.36?overview=full&geometries=geojson"
        );
    }

    #[test]
    fn osrm_response_parses() {
        let response: OsrmResponse = serde_json::from_str(
            r#"{"code": "Ok", "routes": [{"geometry": {"type": "LineString",
                "coordinates": [[-82.47, 35.35], [-82.46, 35.36]]}, "duration": 60.0}]}"#,
        )
        .unwrap();
        assert_eq!(response.routes[0].geometry.coordinates[1], [-82.46, 35.36]);
    }
}
