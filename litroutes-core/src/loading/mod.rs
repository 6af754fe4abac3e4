//! This module is responsible for loading street, light and land-use data
//! and building the attributed safety graph.

mod attribution;
mod builder;
pub mod duke;
pub mod files;
mod loader;
pub mod raw_types;
pub mod sources;

pub use attribution::{LandUseIndex, LightIndex};
pub use builder::{SafetyGraphBuilder, build_safety_graph};
pub use duke::{DUKE_LIGHTS_URL, DukeLightSource};
pub use files::{LandUseFileSource, LightFileSource, StreetFileSource};
pub use loader::AttributeLoader;
pub use raw_types::{LandUseZone, RawAttributes, RawEdge, RawNode, RawStreetNetwork, StreetLight};
pub use sources::{DataSource, LandUseSource, LightSource, MemorySource, StreetSource};
