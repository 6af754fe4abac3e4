//! Raw records returned by the data sources, before scoring.

use geo::{Coord, LineString, MultiPolygon, Rect};

use crate::{NodeId, model::LatLon};

/// Street-network node as delivered by the source
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

impl RawNode {
    pub fn coord(&self) -> Coord<f64> {
        LatLon::new(self.lat, self.lon).to_coord()
    }
}

/// Street-network edge as delivered by the source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEdge {
    pub from: NodeId,
    pub to: NodeId,
    /// Vertices from `from` to `to`; a straight line is assumed when absent
    pub geometry: Option<LineString<f64>>,
    /// Length in meters; recomputed from the geometry when absent
    pub length_m: Option<f64>,
    /// One or more `highway` tags
    pub highway: Vec<String>,
    /// Raw `maxspeed` tag
    pub maxspeed: Option<String>,
    /// Imputed speed in km/h, preferred over `maxspeed`
    pub speed_kph: Option<f64>,
    pub name: Option<String>,
    pub oneway: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStreetNetwork {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}

impl RawStreetNetwork {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.edges.is_empty()
    }
}

/// A fixed lighting fixture
pub type StreetLight = LatLon;

/// Land-use polygon with its category label
#[derive(Debug, Clone, PartialEq)]
pub struct LandUseZone {
    pub label: String,
    pub geometry: MultiPolygon<f64>,
    pub bounds: Rect<f64>,
}

impl LandUseZone {
    /// Returns `None` for an empty geometry
    pub fn new(label: impl Into<String>, geometry: MultiPolygon<f64>) -> Option<Self> {
        use geo::BoundingRect;

        let bounds = geometry.bounding_rect()?;
        Some(Self {
            label: label.into(),
            geometry,
            bounds,
        })
    }
}

/// Everything the builder needs for one bounding box
#[derive(Debug, Clone, Default)]
pub struct RawAttributes {
    pub streets: RawStreetNetwork,
    pub lights: Vec<StreetLight>,
    pub land_use: Vec<LandUseZone>,
    /// Auxiliary sources that failed and were replaced by empty data
    pub missing: Vec<String>,
}

impl RawAttributes {
    pub fn is_degraded(&self) -> bool {
        !self.missing.is_empty()
    }
}
