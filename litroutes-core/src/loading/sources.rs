//! Data-source abstraction used by the attribute loader.

use std::sync::Arc;

use super::raw_types::{LandUseZone, RawStreetNetwork, StreetLight};
use crate::{DataSourceError, model::BBox};

/// External provider of raw data for a bounding box.
///
/// Implementations block; the loader runs each one on its own thread and
/// bounds the wait.
pub trait DataSource: Send + Sync {
    type Output: Send + 'static;

    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Content version of the data behind this source.
    ///
    /// Part of the persisted-graph fingerprint: a change forces a rebuild.
    fn revision(&self) -> String {
        String::new()
    }

    /// # Errors
    ///
    /// Returns an error if the source is unreachable or its answer cannot be used.
    fn fetch(&self, bbox: &BBox) -> Result<Self::Output, DataSourceError>;
}

pub type StreetSource = Arc<dyn DataSource<Output = RawStreetNetwork>>;
pub type LightSource = Arc<dyn DataSource<Output = Vec<StreetLight>>>;
pub type LandUseSource = Arc<dyn DataSource<Output = Vec<LandUseZone>>>;

/// Source serving preloaded data regardless of the requested box
#[derive(Debug, Clone)]
pub struct MemorySource<T> {
    name: String,
    revision: String,
    data: T,
}

impl<T> MemorySource<T> {
    pub fn new(name: impl Into<String>, revision: impl Into<String>, data: T) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
            data,
        }
    }
}

impl<T> DataSource for MemorySource<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn revision(&self) -> String {
        self.revision.clone()
    }

    fn fetch(&self, _bbox: &BBox) -> Result<T, DataSourceError> {
        Ok(self.data.clone())
    }
}
