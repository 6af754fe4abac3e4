//! Shared fixtures: a four-node square around a lit western detour.
//!
//! ```text
//!        N (1)
//!      /  |  \
//!   W (3) |   E (4)
//!      \  |  /
//!        S (2)
//! ```
//!
//! N-S is an unlit 60 km/h primary road, the western sides are lit
//! residential streets and the eastern sides unlit secondary roads.

#![allow(dead_code)]

use std::sync::Arc;

use litroutes_core::{
    AttributeLoader, BBox, GraphCache, LatLon, LoaderConfig, SafetyGraphBuilder, ScoringParams,
    loading::{MemorySource, RawEdge, RawNode, RawStreetNetwork, StreetLight},
};

pub const N: LatLon = LatLon {
    lat: 35.3590,
    lon: -82.4700,
};
pub const S: LatLon = LatLon {
    lat: 35.3500,
    lon: -82.4700,
};
pub const W: LatLon = LatLon {
    lat: 35.3545,
    lon: -82.4733,
};
pub const E: LatLon = LatLon {
    lat: 35.3545,
    lon: -82.4600,
};

pub fn square_bbox() -> BBox {
    BBox::new(35.3600, 35.3490, -82.4590, -82.4750).unwrap()
}

fn node(id: i64, at: LatLon) -> RawNode {
    RawNode {
        id,
        lat: at.lat,
        lon: at.lon,
    }
}

fn street(from: i64, to: i64, length_m: f64, highway: &str, speed_kph: f64) -> RawEdge {
    RawEdge {
        from,
        to,
        length_m: Some(length_m),
        highway: vec![highway.to_string()],
        speed_kph: Some(speed_kph),
        ..RawEdge::default()
    }
}

/// The square with each western side `west_side_m` long
pub fn square_network(west_side_m: f64) -> RawStreetNetwork {
    RawStreetNetwork {
        nodes: vec![node(1, N), node(2, S), node(3, W), node(4, E)],
        edges: vec![
            street(1, 2, 1000.0, "primary", 60.0),
            street(1, 3, west_side_m, "residential", 36.0),
            street(3, 2, west_side_m, "residential", 36.0),
            street(1, 4, 1100.0, "secondary", 45.0),
            street(4, 2, 1100.0, "secondary", 45.0),
        ],
    }
}

/// One light at the middle of each western side
pub fn square_lights() -> Vec<StreetLight> {
    vec![
        LatLon::new(35.35675, -82.47165),
        LatLon::new(35.35225, -82.47165),
    ]
}

pub fn square_loader(west_side_m: f64) -> AttributeLoader {
    AttributeLoader::new(
        Arc::new(MemorySource::new("streets", "square", square_network(west_side_m))),
        LoaderConfig::default(),
    )
    .with_lights(Arc::new(MemorySource::new("lights", "square", square_lights())))
}

pub fn square_builder(west_side_m: f64) -> SafetyGraphBuilder {
    SafetyGraphBuilder::new(square_loader(west_side_m), ScoringParams::default())
}

pub fn square_cache(west_side_m: f64) -> GraphCache {
    GraphCache::new(Arc::new(square_builder(west_side_m)))
}
