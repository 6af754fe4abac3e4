use geo::{Coord, LineString};
use geojson::{Feature, Geometry, Value as GeoJsonValue};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use super::{Criterion, RouteResult};
use crate::{Error, Meters, NodeId, Seconds, model::SafetyGraph};

/// Route geometry and metrics ready for an outer encoder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedRoute {
    pub criterion: Criterion,
    /// Route vertices as `[lat, lon]`
    pub coordinates: Vec<[f64; 2]>,
    pub node_ids: Vec<NodeId>,
    pub distance_m: Meters,
    pub travel_time_s: Seconds,
    pub danger_score: f64,
    /// Average speed over the route, 0 for an empty route
    pub avg_speed_kmh: f64,
    pub external: bool,
}

/// Concatenate the edge geometries of `route` in path order.
///
/// The vertex shared by consecutive edges appears once. An empty route is the
/// single coordinate of its start node.
pub fn format_route(graph: &SafetyGraph, route: &RouteResult) -> FormattedRoute {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for edge in route.edges.iter().filter_map(|&idx| graph.edge(idx)) {
        let mut vertices = edge.geometry.coords().copied();
        if let (Some(last), Some(first)) = (coords.last(), edge.geometry.0.first())
            && last == first
        {
            vertices.next();
        }
        coords.extend(vertices);
    }
    if coords.is_empty()
        && let Some(start) = route.nodes.first().and_then(|&idx| graph.node(idx))
    {
        coords.push(start.geometry.0);
    }

    let avg_speed_kmh = if route.travel_time_s > 0.0 {
        route.distance_m / route.travel_time_s * 3.6
    } else {
        0.0
    };

    FormattedRoute {
        criterion: route.criterion,
        coordinates: coords.iter().map(|c| [c.y, c.x]).collect(),
        node_ids: route
            .nodes
            .iter()
            .filter_map(|&idx| graph.node_id(idx))
            .collect(),
        distance_m: route.distance_m,
        travel_time_s: route.travel_time_s,
        danger_score: route.danger_score,
        avg_speed_kmh,
        external: route.external,
    }
}

impl FormattedRoute {
    /// Vertices as a `geo` line (x = lon, y = lat)
    pub fn line_string(&self) -> LineString<f64> {
        self.coordinates
            .iter()
            .map(|&[lat, lon]| Coord { x: lon, y: lat })
            .collect()
    }

    /// GeoJSON `LineString` feature carrying the route metrics as properties
    pub fn to_feature(&self) -> Result<Feature, Error> {
        let geometry = Geometry::new(GeoJsonValue::from(&self.line_string()));

        let properties = json!({
            "criterion": self.criterion,
            "distance_m": self.distance_m,
            "travel_time_s": self.travel_time_s,
            "danger_score": self.danger_score,
            "avg_speed_kmh": self.avg_speed_kmh,
            "node_ids": self.node_ids,
            "external": self.external,
        });
        let JsonValue::Object(properties) = properties else {
            return Err(Error::GeoJsonError("route properties are not an object".into()));
        };

        Ok(Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
    }
}
