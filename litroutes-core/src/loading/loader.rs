//! Concurrent, deadline-bounded acquisition of the raw build inputs.

use std::{
    sync::{Arc, mpsc},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use super::{
    raw_types::RawAttributes,
    sources::{DataSource, LandUseSource, LightSource, StreetSource},
};
use crate::{DataSourceError, Error, config::LoaderConfig, model::BBox};

type Pending<T> = mpsc::Receiver<Result<T, DataSourceError>>;

/// Fetches streets, lights and land use for a bounding box
#[derive(Clone)]
pub struct AttributeLoader {
    streets: StreetSource,
    lights: Option<LightSource>,
    land_use: Option<LandUseSource>,
    config: LoaderConfig,
}

impl AttributeLoader {
    pub fn new(streets: StreetSource, config: LoaderConfig) -> Self {
        Self {
            streets,
            lights: None,
            land_use: None,
            config,
        }
    }

    #[must_use]
    pub fn with_lights(mut self, lights: LightSource) -> Self {
        self.lights = Some(lights);
        self
    }

    #[must_use]
    pub fn with_land_use(mut self, land_use: LandUseSource) -> Self {
        self.land_use = Some(land_use);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Names and revisions of all configured sources
    pub fn revision(&self) -> String {
        let mut parts = vec![format!("{}={}", self.streets.name(), self.streets.revision())];
        if let Some(lights) = &self.lights {
            parts.push(format!("{}={}", lights.name(), lights.revision()));
        }
        if let Some(land_use) = &self.land_use {
            parts.push(format!("{}={}", land_use.name(), land_use.revision()));
        }
        parts.join(";")
    }

    /// Fetch all inputs for `bbox`, each source on its own thread.
    ///
    /// All sources share one deadline. A source that misses it is reported as
    /// timed out; its thread is left to finish on its own.
    ///
    /// # Errors
    ///
    /// Fails when the street source fails or returns nothing, and when an
    /// auxiliary source fails while `require_auxiliary` is set.
    pub fn load(&self, bbox: &BBox) -> Result<RawAttributes, Error> {
        let timeout = self.config.timeout();
        let deadline = Instant::now() + timeout;
        info!("Fetching street, light and land-use data for {bbox}");

        let streets_rx = spawn_fetch(Arc::clone(&self.streets), *bbox);
        let lights_rx = self
            .lights
            .as_ref()
            .map(|source| (source.name().to_string(), spawn_fetch(Arc::clone(source), *bbox)));
        let land_rx = self
            .land_use
            .as_ref()
            .map(|source| (source.name().to_string(), spawn_fetch(Arc::clone(source), *bbox)));

        let streets = await_fetch(self.streets.name(), &streets_rx, deadline, timeout)?;
        if streets.is_empty() {
            return Err(DataSourceError::Empty {
                source_name: self.streets.name().to_string(),
                bbox_key: bbox.key().to_string(),
            }
            .into());
        }
        debug!(
            "Street source returned {} nodes and {} edges",
            streets.nodes.len(),
            streets.edges.len()
        );

        let mut missing = Vec::new();
        let lights = match lights_rx {
            Some((name, rx)) => {
                self.auxiliary(await_fetch(&name, &rx, deadline, timeout), &mut missing)?
            }
            None => Vec::new(),
        };
        let land_use = match land_rx {
            Some((name, rx)) => {
                self.auxiliary(await_fetch(&name, &rx, deadline, timeout), &mut missing)?
            }
            None => Vec::new(),
        };

        Ok(RawAttributes {
            streets,
            lights,
            land_use,
            missing,
        })
    }

    fn auxiliary<T: Default>(
        &self,
        result: Result<T, DataSourceError>,
        missing: &mut Vec<String>,
    ) -> Result<T, Error> {
        match result {
            Ok(data) => Ok(data),
            Err(err) if self.config.require_auxiliary => Err(err.into()),
            Err(err) => {
                warn!("{err}; continuing without it, graph will be marked degraded");
                missing.push(err.source_name().to_string());
                Ok(T::default())
            }
        }
    }
}

fn spawn_fetch<T: Send + 'static>(
    source: Arc<dyn DataSource<Output = T>>,
    bbox: BBox,
) -> Pending<T> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may be gone after a timeout
        let _ = tx.send(source.fetch(&bbox));
    });
    rx
}

fn await_fetch<T>(
    name: &str,
    rx: &Pending<T>,
    deadline: Instant,
    timeout: Duration,
) -> Result<T, DataSourceError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(DataSourceError::Timeout {
            source_name: name.to_string(),
            timeout,
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(DataSourceError::unreachable(
            name,
            "fetch thread terminated without an answer",
        )),
    }
}
