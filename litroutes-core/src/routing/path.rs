use log::{debug, warn};
use petgraph::graph::{EdgeIndex, NodeIndex};

use super::{Criterion, dijkstra::shortest_path, external::TurnByTurnService, reconcile_path};
use crate::{Error, Meters, NodeId, NoPathError, Seconds, model::SafetyGraph, model::StreetEdge};

/// A computed path with its aggregate metrics
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub criterion: Criterion,
    /// Visited nodes, start first; a single node for an empty route
    pub nodes: Vec<NodeIndex>,
    pub edges: Vec<EdgeIndex>,
    pub distance_m: Meters,
    pub travel_time_s: Seconds,
    /// Length-weighted average edge danger, in `[0, 150]`
    pub danger_score: f64,
    /// Path taken from the turn-by-turn service rather than computed locally
    pub external: bool,
}

impl RouteResult {
    /// Aggregate a path given as consecutive edges leaving `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge index is unknown or the edges do not chain.
    pub fn from_edges(
        graph: &SafetyGraph,
        criterion: Criterion,
        start: NodeIndex,
        edges: Vec<EdgeIndex>,
    ) -> Result<Self, Error> {
        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(start);
        let mut weights = Vec::with_capacity(edges.len());

        for &idx in &edges {
            let (from, to) = graph
                .graph
                .edge_endpoints(idx)
                .ok_or_else(|| Error::InvalidData(format!("unknown edge {}", idx.index())))?;
            if nodes.last() != Some(&from) {
                return Err(Error::InvalidData(format!(
                    "edge {} does not continue the path",
                    idx.index()
                )));
            }
            nodes.push(to);
            weights.push(&graph.graph[idx]);
        }

        Ok(Self {
            criterion,
            nodes,
            distance_m: weights.iter().map(|e| e.length_m).sum(),
            travel_time_s: weights.iter().map(|e| e.travel_time_s).sum(),
            danger_score: aggregate_danger(weights.iter().copied()),
            edges,
            external: false,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Length-weighted average of edge danger.
///
/// Equals `sum(danger_per_length * length * length) / sum(length)`, i.e. every
/// edge's danger weighted by its length. Zero-length edges carry no weight and
/// an empty or zero-length path scores 0.
pub fn aggregate_danger<'a>(edges: impl IntoIterator<Item = &'a StreetEdge>) -> f64 {
    let (weighted, length) = edges
        .into_iter()
        .filter_map(|edge| {
            edge.danger_per_length()
                .map(|per_m| (per_m * edge.length_m * edge.length_m, edge.length_m))
        })
        .fold((0.0, 0.0), |(w, l), (dw, dl)| (w + dw, l + dl));

    if length > 0.0 { weighted / length } else { 0.0 }
}

/// Shortest path between two node ids on `graph` under `criterion`.
///
/// # Errors
///
/// Returns [`Error::UnknownNode`] for ids not in the graph and
/// [`Error::NoPath`] when `end` is unreachable from `start`.
pub fn find_route(
    graph: &SafetyGraph,
    start: NodeId,
    end: NodeId,
    criterion: Criterion,
) -> Result<RouteResult, Error> {
    let start_idx = graph.node_index(start).ok_or(Error::UnknownNode(start))?;
    let end_idx = graph.node_index(end).ok_or(Error::UnknownNode(end))?;

    let edges = shortest_path(graph, start_idx, end_idx, |edge| criterion.weight(edge)).ok_or(
        NoPathError {
            from: start,
            to: end,
            criterion,
        },
    )?;
    RouteResult::from_edges(graph, criterion, start_idx, edges)
}

/// Path finder over one graph, optionally delegating time-optimal routes
pub struct PathFinder<'a> {
    graph: &'a SafetyGraph,
    external: Option<&'a dyn TurnByTurnService>,
}

impl<'a> PathFinder<'a> {
    pub fn new(graph: &'a SafetyGraph) -> Self {
        Self {
            graph,
            external: None,
        }
    }

    /// Take time-optimal paths from `service`, recomputing their metrics locally
    #[must_use]
    pub fn with_external(mut self, service: &'a dyn TurnByTurnService) -> Self {
        self.external = Some(service);
        self
    }

    /// # Errors
    ///
    /// See [`find_route`].
    pub fn find(
        &self,
        start: NodeId,
        end: NodeId,
        criterion: Criterion,
    ) -> Result<RouteResult, Error> {
        if criterion == Criterion::Time
            && start != end
            && let Some(service) = self.external
        {
            match self.find_external(service, start, end) {
                Ok(Some(route)) => return Ok(route),
                Ok(None) => warn!(
                    "{} route from {start} to {end} does not fit the local graph; \
                     using local route",
                    service.name()
                ),
                Err(e) => warn!("{e}; using local route"),
            }
        }
        find_route(self.graph, start, end, criterion)
    }

    fn find_external(
        &self,
        service: &dyn TurnByTurnService,
        start: NodeId,
        end: NodeId,
    ) -> Result<Option<RouteResult>, Error> {
        let (Some(start_idx), Some(end_idx)) =
            (self.graph.node_index(start), self.graph.node_index(end))
        else {
            return Ok(None);
        };
        let (Some(from), Some(to)) = (self.graph.node(start_idx), self.graph.node(end_idx)) else {
            return Ok(None);
        };

        let coordinates = service.route(from.lat_lon(), to.lat_lon())?;
        debug!(
            "{} returned {} coordinates for {start} -> {end}",
            service.name(),
            coordinates.len()
        );
        let Some(edges) = reconcile_path(self.graph, start_idx, end_idx, &coordinates) else {
            return Ok(None);
        };

        let mut route = RouteResult::from_edges(self.graph, Criterion::Time, start_idx, edges)?;
        route.external = true;
        Ok(Some(route))
    }
}
