//! GeoJSON export of the attributed network and its streetlights.

use geo::{Coord, LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry};
use log::debug;
use petgraph::visit::EdgeRef;
use serde_json::{Map, Value as JsonValue};

use crate::{Error, model::SafetyGraph, model::StreetEdge};

const LITE_DECIMALS: f64 = 1e5;

fn round_coord(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (c.x * LITE_DECIMALS).round() / LITE_DECIMALS,
        y: (c.y * LITE_DECIMALS).round() / LITE_DECIMALS,
    }
}

fn edge_properties(edge: &StreetEdge) -> Result<Map<String, JsonValue>, Error> {
    let mut properties = Map::new();
    properties.insert("from".to_string(), edge.from.into());
    properties.insert("to".to_string(), edge.to.into());
    properties.insert("name".to_string(), edge.name.clone().into());
    properties.insert("highway".to_string(), edge.highway.clone().into());
    properties.insert("length_m".to_string(), edge.length_m.into());
    properties.insert("travel_time_s".to_string(), edge.travel_time_s.into());
    let safety =
        serde_json::to_value(&edge.safety).map_err(|e| Error::GeoJsonError(e.to_string()))?;
    if let JsonValue::Object(safety) = safety {
        properties.extend(safety);
    }
    properties.insert(
        "danger_per_length".to_string(),
        edge.danger_per_length().into(),
    );
    Ok(properties)
}

/// Every street segment as a `LineString` feature with its safety attributes.
///
/// A two-way street is exported once. With `max_edges` set, only about that
/// many evenly spaced segments are kept and their coordinates are rounded to
/// five decimals.
pub fn network_geojson(
    graph: &SafetyGraph,
    max_edges: Option<usize>,
) -> Result<FeatureCollection, Error> {
    let segments: Vec<_> = graph
        .graph
        .edge_references()
        .filter(|edge| {
            let reverse = graph.graph.find_edge(edge.target(), edge.source());
            edge.source() < edge.target() || reverse.is_none()
        })
        .collect();

    let step = match max_edges {
        Some(max) if max > 0 && segments.len() > max => segments.len().div_ceil(max),
        Some(0) => return Err(Error::InvalidData("max_edges must be positive".into())),
        _ => 1,
    };
    let lite = max_edges.is_some();

    let features = segments
        .iter()
        .step_by(step)
        .map(|edge| {
            let weight = edge.weight();
            let line: LineString<f64> = if lite {
                weight.geometry.coords().copied().map(round_coord).collect()
            } else {
                weight.geometry.clone()
            };
            Ok(Feature {
                bbox: None,
                geometry: Some(Geometry::new((&line).into())),
                id: None,
                properties: Some(edge_properties(weight)?),
                foreign_members: None,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    debug!(
        "Exported {} of {} street segments",
        features.len(),
        segments.len()
    );
    Ok(FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    })
}

/// Streetlights of the graph as `Point` features
pub fn lights_geojson(graph: &SafetyGraph) -> FeatureCollection {
    let features = graph
        .lights()
        .iter()
        .map(|light| {
            let point = Point::from(light.to_coord());
            Feature {
                bbox: None,
                geometry: Some(Geometry::new((&point).into())),
                id: None,
                properties: None,
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}
