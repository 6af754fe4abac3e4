use std::path::PathBuf;

use litroutes_core::{cache::GraphOrigin, prelude::*};
use pyo3::{
    prelude::*,
    types::{PyDict, PyList},
};

use crate::errors::to_py_err;

fn route_to_py<'py>(py: Python<'py>, route: &FormattedRoute) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("criterion", route.criterion.to_string())?;
    dict.set_item("coordinates", route.coordinates.clone())?;
    dict.set_item("node_ids", route.node_ids.clone())?;
    dict.set_item("distance_m", route.distance_m)?;
    dict.set_item("travel_time_s", route.travel_time_s)?;
    dict.set_item("danger_score", route.danger_score)?;
    dict.set_item("avg_speed_kmh", route.avg_speed_kmh)?;
    dict.set_item("external", route.external)?;
    Ok(dict)
}

fn summary_to_py<'py>(py: Python<'py>, summary: &GraphSummary) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("bbox_key", &summary.bbox_key)?;
    dict.set_item("nodes", summary.nodes)?;
    dict.set_item("edges", summary.edges)?;
    dict.set_item("lights", summary.lights)?;
    dict.set_item("lit_edges", summary.lit_edges)?;
    dict.set_item("mean_danger", summary.mean_danger)?;
    dict.set_item("degraded", summary.degraded)?;
    dict.set_item("built_at", summary.built_at.to_rfc3339())?;
    Ok(dict)
}

fn json_err(err: serde_json::Error) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("GeoJSON encoding failed: {err}"))
}

/// RoutingEngine
///
/// Compares the fastest route between two points with the safest one over a
/// street network scored for lighting, curvature, road class, land use and
/// speed. The network is built on first use and cached for the process.
///
/// Example:
///
/// .. code-block:: python
///
///     engine = RoutingEngine(streets="streets.geojson", lights="lights.geojson")
///     routes = engine.find_routes(35.359, -82.470, 35.350, -82.470)
///     routes["safest"]["danger_score"]
#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pyclass)]
#[pyclass(name = "RoutingEngine", frozen)]
pub struct PyRoutingEngine {
    engine: RouteEngine,
}

#[cfg_attr(feature = "stubgen", pyo3_stub_gen::derive::gen_stub_pymethods)]
#[pymethods]
impl PyRoutingEngine {
    /// Create an engine from a TOML configuration file and/or explicit sources.
    ///
    /// Explicit arguments override the matching configuration entries.
    /// ``bbox`` is ``(north, south, east, west)`` in decimal degrees.
    #[new]
    #[pyo3(signature = (
        config_path=None,
        streets=None,
        lights=None,
        lights_url=None,
        land_use=None,
        osrm_url=None,
        persist_dir=None,
        bbox=None
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config_path: Option<PathBuf>,
        streets: Option<PathBuf>,
        lights: Option<PathBuf>,
        lights_url: Option<String>,
        land_use: Option<PathBuf>,
        osrm_url: Option<String>,
        persist_dir: Option<PathBuf>,
        bbox: Option<(f64, f64, f64, f64)>,
    ) -> PyResult<Self> {
        let mut config = match config_path {
            Some(path) => EngineConfig::from_file(path).map_err(to_py_err)?,
            None => EngineConfig::default(),
        };

        let sources = &mut config.sources;
        sources.streets = streets.or(sources.streets.take());
        sources.lights = lights.or(sources.lights.take());
        sources.lights_url = lights_url.or(sources.lights_url.take());
        sources.land_use = land_use.or(sources.land_use.take());
        sources.osrm_url = osrm_url.or(sources.osrm_url.take());
        config.cache.persist_dir = persist_dir.or(config.cache.persist_dir.take());
        if let Some((north, south, east, west)) = bbox {
            config.bbox = BBox::new(north, south, east, west).map_err(to_py_err)?;
        }

        let engine = RouteEngine::from_config(config).map_err(to_py_err)?;
        Ok(Self { engine })
    }

    /// Build (or restore) the network now and return its summary.
    ///
    /// The GIL is released while the network is built.
    pub fn warm<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let summary = py.detach(|| self.engine.summary()).map_err(to_py_err)?;
        summary_to_py(py, &summary)
    }

    /// Summary of the network, building it if needed
    pub fn summary<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        self.warm(py)
    }

    /// Fastest and safest routes between two coordinates.
    ///
    /// Returns a dict with ``fastest`` and ``safest`` routes and the snapped
    /// ``start_node`` and ``end_node``. Raises ``OutOfBoundsError`` for
    /// points outside the service area and ``NoRouteError`` when the points
    /// are not connected.
    pub fn find_routes<'py>(
        &self,
        py: Python<'py>,
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
    ) -> PyResult<Bound<'py, PyDict>> {
        let comparison = py
            .detach(|| {
                self.engine.compare(
                    LatLon::new(start_lat, start_lon),
                    LatLon::new(end_lat, end_lon),
                )
            })
            .map_err(to_py_err)?;

        let dict = PyDict::new(py);
        dict.set_item("start_node", comparison.start_node)?;
        dict.set_item("end_node", comparison.end_node)?;
        dict.set_item("fastest", route_to_py(py, &comparison.fastest)?)?;
        dict.set_item("safest", route_to_py(py, &comparison.safest)?)?;
        Ok(dict)
    }

    /// Single route for ``criterion`` (``"time"``/``"fastest"`` or ``"danger"``/``"safest"``)
    #[pyo3(signature = (start_lat, start_lon, end_lat, end_lon, criterion="danger"))]
    pub fn route<'py>(
        &self,
        py: Python<'py>,
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
        criterion: &str,
    ) -> PyResult<Bound<'py, PyDict>> {
        let criterion: Criterion = criterion.parse().map_err(to_py_err)?;
        let request = RouteRequest {
            start: LatLon::new(start_lat, start_lon),
            end: LatLon::new(end_lat, end_lon),
            criterion,
        };
        let route = py
            .detach(|| self.engine.route(&request))
            .map_err(to_py_err)?;
        route_to_py(py, &route)
    }

    /// Route as a GeoJSON Feature string
    #[pyo3(signature = (start_lat, start_lon, end_lat, end_lon, criterion="danger"))]
    pub fn route_geojson(
        &self,
        py: Python<'_>,
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
        criterion: &str,
    ) -> PyResult<String> {
        let criterion: Criterion = criterion.parse().map_err(to_py_err)?;
        let request = RouteRequest {
            start: LatLon::new(start_lat, start_lon),
            end: LatLon::new(end_lat, end_lon),
            criterion,
        };
        let feature = py
            .detach(|| self.engine.route(&request)?.to_feature())
            .map_err(to_py_err)?;
        serde_json::to_string(&feature).map_err(json_err)
    }

    /// Street network as a GeoJSON FeatureCollection string.
    ///
    /// With ``lite`` set, only about ``max_edges`` segments are exported and
    /// coordinates are rounded to five decimals.
    #[pyo3(signature = (lite=false, max_edges=2000))]
    pub fn graph_geojson(&self, py: Python<'_>, lite: bool, max_edges: usize) -> PyResult<String> {
        let collection = py
            .detach(|| self.engine.network_geojson(lite.then_some(max_edges)))
            .map_err(to_py_err)?;
        serde_json::to_string(&collection).map_err(json_err)
    }

    /// Streetlights as a GeoJSON FeatureCollection string
    pub fn lights_geojson(&self, py: Python<'_>) -> PyResult<String> {
        let collection = py
            .detach(|| self.engine.lights_geojson())
            .map_err(to_py_err)?;
        serde_json::to_string(&collection).map_err(json_err)
    }

    /// State of every cached network
    pub fn cache_info<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let entries = PyList::empty(py);
        for status in self.engine.cache_status() {
            let dict = PyDict::new(py);
            dict.set_item("bbox_key", &status.bbox_key)?;
            dict.set_item("building", status.building)?;
            dict.set_item("built_at", status.built_at.map(|t| t.to_rfc3339()))?;
            dict.set_item(
                "origin",
                status.origin.map(GraphOrigin::as_str),
            )?;
            dict.set_item("nodes", status.nodes)?;
            dict.set_item("edges", status.edges)?;
            dict.set_item("degraded", status.degraded)?;
            entries.append(dict)?;
        }
        Ok(entries)
    }

    /// Drop the cached network (and its persisted copy); returns whether one was cached
    pub fn invalidate(&self) -> bool {
        self.engine.invalidate()
    }

    fn __repr__(&self) -> String {
        format!("RoutingEngine(bbox={})", self.engine.bbox())
    }
}
