// Re-export key components
pub use crate::cache::{CacheEntry, CacheStatus, GraphCache, GraphProvider, SnapshotStore};
pub use crate::config::{CacheConfig, EngineConfig, LoaderConfig, SourcesConfig};
pub use crate::engine::{GraphSummary, RouteComparison, RouteEngine, RouteRequest};
pub use crate::loading::{AttributeLoader, DataSource, MemorySource, SafetyGraphBuilder};
pub use crate::model::{BBox, LatLon, SafetyGraph, StreetEdge, StreetNode};
pub use crate::routing::{Criterion, FormattedRoute, PathFinder, RouteResult, format_route};
pub use crate::scoring::{EdgeSafety, ScoringParams};
pub use crate::snapping::snap;

// Core error types
pub use crate::error::{DataSourceError, Error, NoPathError, OutOfBoundsError};

// Units
pub use crate::Meters;
pub use crate::NodeId;
pub use crate::Seconds;
