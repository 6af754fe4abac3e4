//! Route engine: the cache-backed entry point that snaps request coordinates
//! and compares the fastest route with the safest one.

use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use log::{debug, info};
use serde::Serialize;

use crate::{
    Endpoint, Error, NodeId,
    cache::{CacheEntry, CacheStatus, GraphCache, GraphOrigin, SnapshotStore},
    config::EngineConfig,
    loading::{
        AttributeLoader, DukeLightSource, LandUseFileSource, LightFileSource, SafetyGraphBuilder,
        StreetFileSource,
    },
    model::{BBox, LatLon, SafetyGraph},
    routing::{
        Criterion, FormattedRoute, OsrmService, PathFinder, TurnByTurnService, format_route,
        lights_geojson, network_geojson,
    },
    snapping::snap_endpoint,
};

/// One routing query between two coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub start: LatLon,
    pub end: LatLon,
    pub criterion: Criterion,
}

/// The fastest and the safest route between the same two points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteComparison {
    pub start_node: NodeId,
    pub end_node: NodeId,
    pub fastest: FormattedRoute,
    pub safest: FormattedRoute,
}

/// Aggregate figures of the current graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub bbox_key: String,
    pub nodes: usize,
    pub edges: usize,
    pub lights: usize,
    /// Edges with at least one light
    pub lit_edges: usize,
    pub mean_danger: f64,
    pub degraded: bool,
    pub built_at: DateTime<Utc>,
    pub origin: GraphOrigin,
}

/// Routing service over the configured service area
pub struct RouteEngine {
    config: EngineConfig,
    cache: Arc<GraphCache>,
    external: Option<Arc<dyn TurnByTurnService>>,
}

impl RouteEngine {
    /// Engine over an existing cache; the cache may be shared with other engines
    pub fn new(config: EngineConfig, cache: Arc<GraphCache>) -> Self {
        Self {
            config,
            cache,
            external: None,
        }
    }

    /// Delegate time-optimal routes to `service`
    #[must_use]
    pub fn with_external(mut self, service: Arc<dyn TurnByTurnService>) -> Self {
        self.external = Some(service);
        self
    }

    /// Wire sources, cache and turn-by-turn service from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no street source is
    /// configured, or an HTTP client cannot be created.
    pub fn from_config(config: EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        let sources = &config.sources;
        let timeout = config.loader.timeout();

        let streets = sources
            .streets
            .as_ref()
            .ok_or_else(|| Error::Config("no street network source configured".into()))?;
        let mut loader =
            AttributeLoader::new(Arc::new(StreetFileSource::new(streets)), config.loader.clone());

        if let Some(path) = &sources.lights {
            loader = loader.with_lights(Arc::new(LightFileSource::new(path)));
        } else if let Some(url) = sources.lights_url.as_deref().filter(|url| !url.is_empty()) {
            loader = loader.with_lights(Arc::new(DukeLightSource::new(url, timeout)?));
        }
        if let Some(path) = &sources.land_use {
            loader = loader.with_land_use(Arc::new(LandUseFileSource::new(path)));
        }

        let builder = SafetyGraphBuilder::new(loader, config.scoring.clone());
        let mut cache = GraphCache::new(Arc::new(builder));
        if let Some(dir) = &config.cache.persist_dir {
            cache = cache.with_store(SnapshotStore::new(dir));
        }

        let mut engine = Self::new(config.clone(), Arc::new(cache));
        if let Some(url) = &config.sources.osrm_url {
            engine = engine.with_external(Arc::new(OsrmService::new(url.as_str(), timeout)?));
        }
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bbox(&self) -> &BBox {
        &self.config.bbox
    }

    pub fn cache(&self) -> &Arc<GraphCache> {
        &self.cache
    }

    /// Cache entry of the service area, building the graph on first use
    ///
    /// # Errors
    ///
    /// Returns the build error.
    pub fn entry(&self) -> Result<CacheEntry, Error> {
        self.cache.get_or_build(&self.config.bbox)
    }

    /// # Errors
    ///
    /// Returns the build error.
    pub fn graph(&self) -> Result<Arc<SafetyGraph>, Error> {
        Ok(self.entry()?.graph)
    }

    fn finder<'a>(&'a self, graph: &'a SafetyGraph) -> PathFinder<'a> {
        match &self.external {
            Some(service) => PathFinder::new(graph).with_external(service.as_ref()),
            None => PathFinder::new(graph),
        }
    }

    fn snap_pair(
        graph: &SafetyGraph,
        start: LatLon,
        end: LatLon,
    ) -> Result<(NodeId, NodeId), Error> {
        let start_node = snap_endpoint(graph, start.lat, start.lon, Endpoint::Start)?;
        let end_node = snap_endpoint(graph, end.lat, end.lon, Endpoint::End)?;
        debug!(
            "Snapped ({}, {}) -> {start_node} and ({}, {}) -> {end_node}",
            start.lat, start.lon, end.lat, end.lon
        );
        Ok((start_node, end_node))
    }

    /// Route for a single criterion
    ///
    /// # Errors
    ///
    /// Returns snapping errors, [`Error::NoPath`] or the build error.
    pub fn route(&self, request: &RouteRequest) -> Result<FormattedRoute, Error> {
        let graph = self.graph()?;
        let (start, end) = Self::snap_pair(&graph, request.start, request.end)?;
        let route = self.finder(&graph).find(start, end, request.criterion)?;
        Ok(format_route(&graph, &route))
    }

    /// Fastest and safest routes between two coordinates
    ///
    /// # Errors
    ///
    /// Returns snapping errors, [`Error::NoPath`] or the build error.
    pub fn compare(&self, start: LatLon, end: LatLon) -> Result<RouteComparison, Error> {
        let graph = self.graph()?;
        let started = Instant::now();
        let (start_node, end_node) = Self::snap_pair(&graph, start, end)?;

        let finder = self.finder(&graph);
        let fastest = finder.find(start_node, end_node, Criterion::Time)?;
        let safest = finder.find(start_node, end_node, Criterion::Danger)?;
        info!(
            "Routes {start_node} -> {end_node}: fastest {:.0} m / {:.0} s / danger {:.1}, \
             safest {:.0} m / {:.0} s / danger {:.1} ({:.1?})",
            fastest.distance_m,
            fastest.travel_time_s,
            fastest.danger_score,
            safest.distance_m,
            safest.travel_time_s,
            safest.danger_score,
            started.elapsed()
        );

        Ok(RouteComparison {
            start_node,
            end_node,
            fastest: format_route(&graph, &fastest),
            safest: format_route(&graph, &safest),
        })
    }

    /// # Errors
    ///
    /// Returns the build error.
    pub fn summary(&self) -> Result<GraphSummary, Error> {
        let entry = self.entry()?;
        let graph = &entry.graph;

        let (lit_edges, danger_sum) = graph.edges().fold((0, 0.0), |(lit, sum), edge| {
            (
                lit + usize::from(edge.safety.light_count > 0),
                sum + edge.danger_score(),
            )
        });
        let mean_danger = if graph.edge_count() > 0 {
            danger_sum / graph.edge_count() as f64
        } else {
            0.0
        };

        Ok(GraphSummary {
            bbox_key: graph.bbox().key().to_string(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            lights: graph.lights().len(),
            lit_edges,
            mean_danger,
            degraded: graph.is_degraded(),
            built_at: entry.built_at,
            origin: entry.origin,
        })
    }

    /// Network as GeoJSON, sampled down to about `max_edges` segments when set
    ///
    /// # Errors
    ///
    /// Returns the build error or a GeoJSON encoding error.
    pub fn network_geojson(&self, max_edges: Option<usize>) -> Result<FeatureCollection, Error> {
        let graph = self.graph()?;
        network_geojson(&graph, max_edges)
    }

    /// # Errors
    ///
    /// Returns the build error.
    pub fn lights_geojson(&self) -> Result<FeatureCollection, Error> {
        let graph = self.graph()?;
        Ok(lights_geojson(&graph))
    }

    /// Drop the cached graph of the service area; the next query rebuilds it
    pub fn invalidate(&self) -> bool {
        self.cache.invalidate(&self.config.bbox)
    }

    pub fn cache_status(&self) -> Vec<CacheStatus> {
        self.cache.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn street_source_is_required() {
        let Err(err) = RouteEngine::from_config(EngineConfig::default()) else {
            panic!("expected a configuration error");
        };
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn configured_engine_starts_cold() {
        let mut config = EngineConfig::default();
        config.sources.streets = Some("streets.geojson".into());
        config.sources.lights_url = Some("http://localhost:9/lights".into());

        let engine = RouteEngine::from_config(config).unwrap();
        assert!(engine.cache_status().is_empty());
        assert!(!engine.invalidate());
    }
}
