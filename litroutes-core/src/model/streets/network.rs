//! Attributed street graph with its node spatial index

use hashbrown::HashMap;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rstar::{PointDistance, RTree, primitives::GeomWithData};

use super::components::{StreetEdge, StreetNode};
use crate::{
    NodeId,
    geomath::LocalProjection,
    model::{BBox, LatLon},
};

/// Projected node position tagged with its graph index
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Immutable street graph of one service area.
///
/// Built once, then shared read-only between concurrent queries.
#[derive(Debug, Clone)]
pub struct SafetyGraph {
    pub(crate) graph: DiGraph<StreetNode, StreetEdge>,
    pub(crate) rtree: RTree<IndexedPoint>,
    node_lookup: HashMap<NodeId, NodeIndex>,
    projection: LocalProjection,
    bbox: BBox,
    lights: Vec<LatLon>,
    degraded: bool,
}

impl SafetyGraph {
    /// Wrap a built graph and index its nodes.
    ///
    /// `lights` is kept only as a renderable point set. `degraded` marks a graph
    /// built without some auxiliary source.
    pub fn new(
        bbox: BBox,
        graph: DiGraph<StreetNode, StreetEdge>,
        lights: Vec<LatLon>,
        degraded: bool,
    ) -> Self {
        let centre = bbox.centre();
        let projection = LocalProjection::new(centre.lat, centre.lon);

        let points = graph
            .node_indices()
            .map(|idx| IndexedPoint::new(projection.project(graph[idx].geometry.0), idx))
            .collect();
        let node_lookup = graph
            .node_indices()
            .map(|idx| (graph[idx].id, idx))
            .collect();

        Self {
            graph,
            rtree: RTree::bulk_load(points),
            node_lookup,
            projection,
            bbox,
            lights,
            degraded,
        }
    }

    pub fn graph(&self) -> &DiGraph<StreetNode, StreetEdge> {
        &self.graph
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn projection(&self) -> &LocalProjection {
        &self.projection
    }

    pub fn lights(&self) -> &[LatLon] {
        &self.lights
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&StreetNode> {
        self.graph.node_weight(idx)
    }

    pub fn edge(&self, idx: EdgeIndex) -> Option<&StreetEdge> {
        self.graph.edge_weight(idx)
    }

    /// Graph index of a source node id
    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_lookup.get(&id).copied()
    }

    /// Source id of a graph node
    pub fn node_id(&self, idx: NodeIndex) -> Option<NodeId> {
        self.graph.node_weight(idx).map(|node| node.id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StreetNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &StreetEdge> {
        self.graph.edge_weights()
    }

    /// Nearest node in projected meters, using the spatial index.
    ///
    /// Among equidistant nodes the lowest index wins.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Option<NodeIndex> {
        let query = self.projection.project(LatLon::new(lat, lon).to_coord());
        let mut candidates = self.rtree.nearest_neighbor_iter(&query);

        let first = candidates.next()?;
        let best_distance = first.distance_2(&query);
        let best = candidates
            .take_while(|point| point.distance_2(&query) <= best_distance)
            .map(|point| point.data)
            .fold(first.data, NodeIndex::min);
        Some(best)
    }

    /// Nearest node by linear scan, same metric and tie-break as [`Self::nearest_node`]
    pub fn nearest_node_linear(&self, lat: f64, lon: f64) -> Option<NodeIndex> {
        let query = self.projection.project(LatLon::new(lat, lon).to_coord());

        self.graph
            .node_indices()
            .map(|idx| {
                let [x, y] = self.projection.project(self.graph[idx].geometry.0);
                let distance_2 = (x - query[0]).powi(2) + (y - query[1]).powi(2);
                (distance_2, idx)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, idx)| idx)
    }
}
