//! GeoJSON file sources for offline graph builds.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use geo::{Geometry, MultiPolygon};
use geojson::{Feature, GeoJson};
use hashbrown::HashMap;
use log::{debug, trace};
use serde_json::{Map, Value as JsonValue};

use super::{
    raw_types::{LandUseZone, RawEdge, RawNode, RawStreetNetwork, StreetLight},
    sources::DataSource,
};
use crate::{DataSourceError, NodeId, model::BBox, model::LatLon};

/// Revision string of a file: path, size and modification time
fn file_revision(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
                .unwrap_or_default();
            format!("{}:{}:{modified}", path.display(), meta.len())
        }
        Err(_) => format!("{}:missing", path.display()),
    }
}

fn read_features(path: &Path, source_name: &str) -> Result<Vec<Feature>, DataSourceError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        DataSourceError::unreachable(source_name, format!("{}: {e}", path.display()))
    })?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| DataSourceError::malformed(source_name, e))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(DataSourceError::malformed(
            source_name,
            "expected a Feature or FeatureCollection",
        )),
    }
}

fn geometry_of(feature: &Feature) -> Option<Geometry<f64>> {
    feature
        .geometry
        .clone()
        .and_then(|geometry| Geometry::<f64>::try_from(geometry).ok())
}

fn property<'a>(props: Option<&'a Map<String, JsonValue>>, keys: &[&str]) -> Option<&'a JsonValue> {
    let props = props?;
    keys.iter()
        .filter_map(|key| props.get(*key))
        .find(|value| !value.is_null())
}

fn as_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Array(values) => values.iter().find_map(as_f64),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn as_node_id(value: &JsonValue) -> Option<NodeId> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strings of a scalar-or-array property
fn as_strings(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::String(s) => vec![s.clone()],
        JsonValue::Number(n) => vec![n.to_string()],
        JsonValue::Array(values) => values.iter().flat_map(as_strings).collect(),
        _ => Vec::new(),
    }
}

fn as_bool(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => matches!(s.to_ascii_lowercase().as_str(), "yes" | "true" | "1"),
        JsonValue::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Street network from a GeoJSON file.
///
/// Edges are `LineString` features carrying `u`/`v` (or `from`/`to`) node ids
/// and optional `length`, `highway`, `maxspeed`, `speed_kph`, `name` and
/// `oneway` properties. Nodes are `Point` features with an `id`; nodes without
/// one are taken from the edge endpoints.
#[derive(Debug, Clone)]
pub struct StreetFileSource {
    path: PathBuf,
}

impl StreetFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, features: &[Feature], bbox: &BBox) -> RawStreetNetwork {
        let mut nodes: HashMap<NodeId, RawNode> = HashMap::new();
        let mut edges = Vec::new();

        for feature in features {
            let props = feature.properties.as_ref();
            match geometry_of(feature) {
                Some(Geometry::Point(point)) => {
                    if let Some(id) = property(props, &["id", "osmid"]).and_then(as_node_id) {
                        nodes.insert(
                            id,
                            RawNode {
                                id,
                                lat: point.y(),
                                lon: point.x(),
                            },
                        );
                    }
                }
                Some(Geometry::LineString(line)) => {
                    let (Some(from), Some(to)) = (
                        property(props, &["u", "from"]).and_then(as_node_id),
                        property(props, &["v", "to"]).and_then(as_node_id),
                    ) else {
                        trace!("Skipping street feature without endpoint ids");
                        continue;
                    };
                    for (id, coord) in [(from, line.0.first()), (to, line.0.last())] {
                        if let Some(coord) = coord {
                            nodes.entry(id).or_insert(RawNode {
                                id,
                                lat: coord.y,
                                lon: coord.x,
                            });
                        }
                    }
                    edges.push(RawEdge {
                        from,
                        to,
                        geometry: (line.0.len() >= 2).then_some(line),
                        length_m: property(props, &["length", "length_m"]).and_then(as_f64),
                        highway: property(props, &["highway"])
                            .map(as_strings)
                            .unwrap_or_default(),
                        maxspeed: property(props, &["maxspeed"])
                            .map(as_strings)
                            .and_then(|speeds| speeds.into_iter().next()),
                        speed_kph: property(props, &["speed_kph"]).and_then(as_f64),
                        name: property(props, &["name"])
                            .map(as_strings)
                            .and_then(|names| names.into_iter().next()),
                        oneway: property(props, &["oneway"]).is_some_and(as_bool),
                    });
                }
                _ => trace!("Skipping street feature with unsupported geometry"),
            }
        }

        let inside = |id: &NodeId| {
            nodes
                .get(id)
                .is_some_and(|node| bbox.contains(node.lat, node.lon))
        };
        edges.retain(|edge| inside(&edge.from) && inside(&edge.to));

        let mut used: Vec<NodeId> = edges.iter().flat_map(|e| [e.from, e.to]).collect();
        used.sort_unstable();
        used.dedup();
        let nodes = used
            .into_iter()
            .filter_map(|id| nodes.remove(&id))
            .collect();

        RawStreetNetwork { nodes, edges }
    }
}

impl DataSource for StreetFileSource {
    type Output = RawStreetNetwork;

    fn name(&self) -> &str {
        "streets"
    }

    fn revision(&self) -> String {
        file_revision(&self.path)
    }

    fn fetch(&self, bbox: &BBox) -> Result<RawStreetNetwork, DataSourceError> {
        let features = read_features(&self.path, self.name())?;
        let network = self.parse(&features, bbox);
        debug!(
            "Read {} nodes and {} edges from {}",
            network.nodes.len(),
            network.edges.len(),
            self.path.display()
        );
        Ok(network)
    }
}

/// Streetlights from `Point` / `MultiPoint` features of a GeoJSON file
#[derive(Debug, Clone)]
pub struct LightFileSource {
    path: PathBuf,
}

impl LightFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for LightFileSource {
    type Output = Vec<StreetLight>;

    fn name(&self) -> &str {
        "lights"
    }

    fn revision(&self) -> String {
        file_revision(&self.path)
    }

    fn fetch(&self, bbox: &BBox) -> Result<Vec<StreetLight>, DataSourceError> {
        let features = read_features(&self.path, self.name())?;
        let lights: Vec<StreetLight> = features
            .iter()
            .filter_map(geometry_of)
            .flat_map(|geometry| match geometry {
                Geometry::Point(point) => vec![point],
                Geometry::MultiPoint(points) => points.0,
                _ => Vec::new(),
            })
            .map(|point| LatLon::new(point.y(), point.x()))
            .filter(|light| bbox.contains(light.lat, light.lon))
            .collect();
        debug!("Read {} lights from {}", lights.len(), self.path.display());
        Ok(lights)
    }
}

/// Land-use zones from `Polygon` / `MultiPolygon` features with a label property
#[derive(Debug, Clone)]
pub struct LandUseFileSource {
    path: PathBuf,
}

impl LandUseFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for LandUseFileSource {
    type Output = Vec<LandUseZone>;

    fn name(&self) -> &str {
        "land_use"
    }

    fn revision(&self) -> String {
        file_revision(&self.path)
    }

    fn fetch(&self, bbox: &BBox) -> Result<Vec<LandUseZone>, DataSourceError> {
        let features = read_features(&self.path, self.name())?;
        let zones: Vec<LandUseZone> = features
            .iter()
            .filter_map(|feature| {
                let label = property(
                    feature.properties.as_ref(),
                    &["label", "landuse", "land_use", "class"],
                )
                .map(as_strings)?
                .into_iter()
                .next()?;
                let geometry = match geometry_of(feature)? {
                    Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
                    Geometry::MultiPolygon(polygons) => polygons,
                    _ => return None,
                };
                LandUseZone::new(label, geometry)
            })
            .filter(|zone| bbox.intersects_rect(&zone.bounds))
            .collect();
        debug!("Read {} land-use zones from {}", zones.len(), self.path.display());
        Ok(zones)
    }
}
