//! Data model of the safety-weighted street network
//!
//! Contains the service-area bounding box and the attributed street graph.

pub mod bbox;
pub mod streets;

pub use bbox::{BBox, BBoxKey, LatLon};
pub use streets::{IndexedPoint, SafetyGraph, StreetEdge, StreetNode};
