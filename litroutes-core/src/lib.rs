//! Safety-weighted routing over an attributed street network.
//!
//! The crate builds a road graph whose edges carry a bounded danger score
//! (lighting, curvature, road class, land use, speed), caches built graphs
//! per service area, snaps coordinates onto the graph and compares the
//! time-optimal route with the danger-optimal one.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod geomath;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;
pub mod scoring;
pub mod snapping;

pub use cache::{GraphCache, GraphProvider, SnapshotStore};
pub use config::{CacheConfig, EngineConfig, LoaderConfig, SourcesConfig};
pub use engine::{GraphSummary, RouteComparison, RouteEngine, RouteRequest};
pub use error::{BoundSide, DataSourceError, Endpoint, Error, NoPathError, OutOfBoundsError};
pub use loading::{AttributeLoader, SafetyGraphBuilder, build_safety_graph};
pub use model::{BBox, BBoxKey, LatLon, SafetyGraph, StreetEdge, StreetNode};
pub use routing::{Criterion, FormattedRoute, PathFinder, RouteResult, find_route, format_route};
pub use scoring::{EdgeSafety, ScoringParams, score_edge};
pub use snapping::snap;

/// Identifier of a street-network node, as issued by the street-network source
pub type NodeId = i64;
/// Distance in meters
pub type Meters = f64;
/// Duration in seconds
pub type Seconds = f64;
