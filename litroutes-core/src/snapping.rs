//! Coordinate snapping onto the graph, with service-area validation.

use log::trace;
use petgraph::graph::NodeIndex;

use crate::{Endpoint, Error, NodeId, model::SafetyGraph};

fn snap_with(
    graph: &SafetyGraph,
    lat: f64,
    lon: f64,
    nearest: impl Fn(&SafetyGraph, f64, f64) -> Option<NodeIndex>,
) -> Result<NodeId, Error> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(Error::InvalidCoordinate { lat, lon });
    }
    graph.bbox().check(lat, lon)?;

    let idx = nearest(graph, lat, lon).ok_or(Error::NoPointsFound)?;
    let id = graph.node_id(idx).ok_or(Error::NoPointsFound)?;
    trace!("Snapped ({lat}, {lon}) to node {id}");
    Ok(id)
}

/// Nearest graph node to a coordinate inside the service area.
///
/// # Errors
///
/// Returns [`Error::InvalidCoordinate`] for non-finite input,
/// [`Error::OutOfBounds`] outside the graph's bounding box (its boundary is
/// inside) and [`Error::NoPointsFound`] for a graph without nodes.
pub fn snap(graph: &SafetyGraph, lat: f64, lon: f64) -> Result<NodeId, Error> {
    snap_with(graph, lat, lon, SafetyGraph::nearest_node)
}

/// [`snap`] by linear scan instead of the spatial index
///
/// # Errors
///
/// See [`snap`].
pub fn snap_linear(graph: &SafetyGraph, lat: f64, lon: f64) -> Result<NodeId, Error> {
    snap_with(graph, lat, lon, SafetyGraph::nearest_node_linear)
}

/// [`snap`] for a route endpoint; bounds errors name the endpoint
///
/// # Errors
///
/// See [`snap`].
pub fn snap_endpoint(
    graph: &SafetyGraph,
    lat: f64,
    lon: f64,
    endpoint: Endpoint,
) -> Result<NodeId, Error> {
    snap(graph, lat, lon).map_err(|e| match e {
        Error::OutOfBounds(err) => Error::OutOfBounds(err.at(endpoint)),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use geo::point;
    use petgraph::graph::DiGraph;

    use super::*;
    use crate::{BoundSide, model::BBox, model::StreetNode};

    fn bbox() -> BBox {
        BBox::new(35.40, 35.30, -82.40, -82.50).unwrap()
    }

    /// 11 x 11 node lattice covering the box, ids row by row
    fn lattice() -> SafetyGraph {
        let mut graph = DiGraph::new();
        for row in 0..11 {
            for col in 0..11 {
                graph.add_node(StreetNode {
                    id: row * 11 + col,
                    geometry: point! {
                        x: -82.50 + col as f64 * 0.01,
                        y: 35.30 + row as f64 * 0.01,
                    },
                });
            }
        }
        SafetyGraph::new(bbox(), graph, vec![], false)
    }

    #[test]
    fn snaps_to_nearest_node() {
        let graph = lattice();
        // just north-east of the node at row 3, col 4
        assert_eq!(snap(&graph, 35.3312, -82.4589).unwrap(), 37);
    }

    #[test]
    fn index_agrees_with_linear_scan() {
        let graph = lattice();
        for i in 0..200 {
            let lat = 35.30 + (i as f64 * 0.000_731) % 0.1;
            let lon = -82.50 + (i as f64 * 0.001_377) % 0.1;
            assert_eq!(
                snap(&graph, lat, lon).unwrap(),
                snap_linear(&graph, lat, lon).unwrap(),
                "disagreement at ({lat}, {lon})"
            );
        }
    }

    #[test]
    fn boundary_is_inside() {
        let graph = lattice();
        assert_eq!(snap(&graph, 35.40, -82.50).unwrap(), 110);
        assert_eq!(snap(&graph, 35.30, -82.40).unwrap(), 10);
    }

    #[test]
    fn outside_points_fail_with_side() {
        let graph = lattice();
        let result = snap_endpoint(&graph, 36.35, -82.45, Endpoint::End);
        let Err(Error::OutOfBounds(err)) = result else {
            panic!("expected an out-of-bounds error");
        };
        assert_eq!(err.side, BoundSide::North);
        assert_eq!(err.limit, 35.40);
        assert_eq!(err.endpoint, Some(Endpoint::End));

        let Err(Error::OutOfBounds(err)) = snap(&graph, 35.35, -82.51) else {
            panic!("expected an out-of-bounds error");
        };
        assert_eq!(err.side, BoundSide::West);
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let graph = lattice();
        assert!(matches!(
            snap(&graph, f64::NAN, -82.45),
            Err(Error::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn empty_graph_has_nothing_to_snap_to() {
        let graph = SafetyGraph::new(bbox(), DiGraph::new(), vec![], false);
        assert!(matches!(snap(&graph, 35.35, -82.45), Err(Error::NoPointsFound)));
    }
}
