use geo::{Coord, LineString};
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use log::{debug, info, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;

use super::{
    attribution::{LandUseIndex, LightIndex},
    loader::AttributeLoader,
    raw_types::{RawAttributes, RawEdge, RawNode},
};
use crate::{
    DataSourceError, Error, NodeId, SafetyGraph,
    cache::{GraphProvider, SCHEMA_VERSION, fingerprint},
    geomath::{LocalProjection, line_length_m},
    model::{BBox, StreetEdge, StreetNode},
    scoring::{EdgeContext, RoadClass, ScoringParams, parse_maxspeed, score_edge},
};

/// Loads raw attributes for a bounding box and turns them into a [`SafetyGraph`]
#[derive(Clone)]
pub struct SafetyGraphBuilder {
    loader: AttributeLoader,
    params: ScoringParams,
}

impl SafetyGraphBuilder {
    pub fn new(loader: AttributeLoader, params: ScoringParams) -> Self {
        Self { loader, params }
    }

    pub fn loader(&self) -> &AttributeLoader {
        &self.loader
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }
}

impl GraphProvider for SafetyGraphBuilder {
    fn build(&self, bbox: &BBox) -> Result<SafetyGraph, Error> {
        let raw = self.loader.load(bbox)?;
        build_safety_graph(bbox, raw, &self.params, self.loader.config().light_buffer_m)
    }

    fn fingerprint(&self, bbox: &BBox) -> String {
        let params = serde_json::to_string(&self.params).unwrap_or_default();
        fingerprint(&[
            &SCHEMA_VERSION.to_string(),
            bbox.key().as_str(),
            &params,
            &self.loader.revision(),
            &self.loader.config().light_buffer_m.to_string(),
        ])
    }
}

/// Street segment with resolved geometry, length and speed, before scoring
struct PreparedEdge<'a> {
    raw: &'a RawEdge,
    geometry: LineString<f64>,
    length_m: f64,
    speed_kph: f64,
    road_class: RoadClass,
    highway: Option<String>,
}

/// Build the attributed graph from raw data.
///
/// Every raw edge is scored exactly once; two-way streets get a reversed twin
/// sharing the same safety attributes. Node indices follow ascending node id.
///
/// # Errors
///
/// Returns [`DataSourceError::Empty`] if no edge connects two known nodes.
pub fn build_safety_graph(
    bbox: &BBox,
    raw: RawAttributes,
    params: &ScoringParams,
    light_buffer_m: f64,
) -> Result<SafetyGraph, Error> {
    let degraded = raw.is_degraded();
    let RawAttributes {
        streets,
        lights,
        land_use,
        ..
    } = raw;

    let nodes: HashMap<NodeId, &RawNode> = streets
        .nodes
        .iter()
        .filter(|node| node.lat.is_finite() && node.lon.is_finite())
        .map(|node| (node.id, node))
        .collect();

    let (edges, orphans): (Vec<&RawEdge>, Vec<&RawEdge>) = streets
        .edges
        .iter()
        .partition(|edge| nodes.contains_key(&edge.from) && nodes.contains_key(&edge.to));
    if !orphans.is_empty() {
        warn!(
            "Skipped {} edges referencing unknown nodes (e.g. {} -> {})",
            orphans.len(),
            orphans[0].from,
            orphans[0].to
        );
    }
    if edges.is_empty() {
        return Err(DataSourceError::Empty {
            source_name: "streets".into(),
            bbox_key: bbox.key().to_string(),
        }
        .into());
    }

    // Only nodes touched by an edge, in ascending id order
    let mut graph = DiGraph::with_capacity(nodes.len(), edges.len() * 2);
    let node_indices: HashMap<NodeId, NodeIndex> = edges
        .iter()
        .flat_map(|edge| [edge.from, edge.to])
        .sorted_unstable()
        .dedup()
        .map(|id| {
            let node = nodes[&id];
            let idx = graph.add_node(StreetNode {
                id,
                geometry: node.coord().into(),
            });
            (id, idx)
        })
        .collect();

    let centre = bbox.centre();
    let light_index = LightIndex::new(
        &lights,
        LocalProjection::new(centre.lat, centre.lon),
        light_buffer_m,
    );
    let land_index = LandUseIndex::new(&land_use);

    let scored: Vec<StreetEdge> = edges
        .par_iter()
        .map(|raw| prepare_edge(raw, nodes[&raw.from].coord(), nodes[&raw.to].coord()))
        .map(|edge| {
            let safety = score_edge(
                &EdgeContext {
                    geometry: &edge.geometry,
                    length_m: edge.length_m,
                    speed_kph: edge.speed_kph,
                    road_class: edge.road_class,
                    light_count: light_index.count_near(&edge.geometry),
                    land_label: land_index.dominant_label(&edge.geometry),
                },
                params,
            );
            StreetEdge {
                from: edge.raw.from,
                to: edge.raw.to,
                travel_time_s: edge.length_m / (edge.speed_kph / 3.6),
                geometry: edge.geometry,
                length_m: edge.length_m,
                speed_kph: edge.speed_kph,
                highway: edge.highway,
                name: edge.raw.name.clone(),
                safety,
            }
        })
        .collect();

    // Sources that list both directions of a street already carry the twin
    let listed: HashSet<(NodeId, NodeId)> = edges.iter().map(|e| (e.from, e.to)).collect();
    for (raw, edge) in edges.iter().zip(scored) {
        let (from, to) = (node_indices[&raw.from], node_indices[&raw.to]);
        let two_way = !raw.oneway && !listed.contains(&(raw.to, raw.from));
        let twin = two_way.then(|| reversed(&edge));
        graph.add_edge(from, to, edge);
        if let Some(twin) = twin {
            graph.add_edge(to, from, twin);
        }
    }

    let lit = graph
        .edge_weights()
        .filter(|edge| edge.safety.light_count > 0)
        .count();
    info!(
        "Built safety graph for {bbox}: {} nodes, {} edges ({lit} lit), {} lights, {} land-use zones",
        graph.node_count(),
        graph.edge_count(),
        lights.len(),
        land_use.len()
    );
    if degraded {
        warn!("Graph for {bbox} is degraded: some auxiliary data was unavailable");
    }

    // Source parsing leaves large freed allocations behind; hand the tail of
    // the heap back to the system.
    //
    // # Safety
    //
    // Only compiled for linux with glibc, where malloc_trim is available.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe {
        if libc::malloc_trim(0) == 0 {
            debug!("No heap memory was released by malloc_trim");
        } else {
            debug!("Trimmed unused heap memory");
        }
    }

    Ok(SafetyGraph::new(*bbox, graph, lights, degraded))
}

fn prepare_edge(raw: &RawEdge, from: Coord<f64>, to: Coord<f64>) -> PreparedEdge<'_> {
    let geometry = raw
        .geometry
        .clone()
        .filter(|line| line.0.len() >= 2)
        .unwrap_or_else(|| LineString::new(vec![from, to]));
    let length_m = raw
        .length_m
        .filter(|length| length.is_finite() && *length >= 0.0)
        .unwrap_or_else(|| line_length_m(&geometry));

    let (road_class, highway) = match RoadClass::safest_of(raw.highway.iter().map(String::as_str)) {
        Some((class, tag)) => (class, Some(tag.to_string())),
        None => (RoadClass::Unknown, raw.highway.first().cloned()),
    };
    let speed_kph = raw
        .speed_kph
        .filter(|speed| speed.is_finite() && *speed > 0.0)
        .or_else(|| raw.maxspeed.as_deref().and_then(parse_maxspeed))
        .unwrap_or_else(|| road_class.default_speed_kph());

    PreparedEdge {
        raw,
        geometry,
        length_m,
        speed_kph,
        road_class,
        highway,
    }
}

fn reversed(edge: &StreetEdge) -> StreetEdge {
    let mut geometry = edge.geometry.clone();
    geometry.0.reverse();
    StreetEdge {
        from: edge.to,
        to: edge.from,
        geometry,
        ..edge.clone()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::line_string;

    use super::*;
    use crate::{loading::raw_types::RawStreetNetwork, model::LatLon};

    fn bbox() -> BBox {
        BBox::new(35.42, 35.28, -82.40, -82.55).unwrap()
    }

    fn node(id: NodeId, lat: f64, lon: f64) -> RawNode {
        RawNode { id, lat, lon }
    }

    fn raw() -> RawAttributes {
        RawAttributes {
            streets: RawStreetNetwork {
                nodes: vec![
                    node(30, 35.350, -82.460),
                    node(10, 35.350, -82.470),
                    node(20, 35.359, -82.470),
                    node(99, 35.300, -82.500),
                ],
                edges: vec![
                    RawEdge {
                        from: 10,
                        to: 20,
                        length_m: Some(1000.0),
                        highway: vec!["primary".into()],
                        speed_kph: Some(60.0),
                        ..RawEdge::default()
                    },
                    RawEdge {
                        from: 10,
                        to: 30,
                        geometry: Some(line_string![
                            (x: -82.470, y: 35.350),
                            (x: -82.465, y: 35.351),
                            (x: -82.460, y: 35.350),
                        ]),
                        highway: vec!["residential_link".into(), "bogus".into()],
                        maxspeed: Some("25 mph".into()),
                        oneway: true,
                        ..RawEdge::default()
                    },
                    RawEdge {
                        from: 20,
                        to: 77,
                        ..RawEdge::default()
                    },
                ],
            },
            lights: vec![LatLon::new(35.3505, -82.4675)],
            ..RawAttributes::default()
        }
    }

    #[test]
    fn listed_reverse_edges_are_not_twinned_again() {
        let mut raw = raw();
        raw.streets.edges.push(RawEdge {
            from: 20,
            to: 10,
            length_m: Some(1000.0),
            highway: vec!["primary".into()],
            speed_kph: Some(60.0),
            ..RawEdge::default()
        });
        let graph = build_safety_graph(&bbox(), raw, &ScoringParams::default(), 15.0).unwrap();

        // 10->20 and 20->10 as listed, 10->30 one way
        assert_eq!(graph.edge_count(), 3);
        let ten = graph.node_index(10).unwrap();
        let twenty = graph.node_index(20).unwrap();
        assert_eq!(graph.graph().edges_connecting(ten, twenty).count(), 1);
        assert_eq!(graph.graph().edges_connecting(twenty, ten).count(), 1);
    }

    #[test]
    fn builds_nodes_in_id_order_and_twins_two_way_edges() {
        let graph = build_safety_graph(&bbox(), raw(), &ScoringParams::default(), 15.0).unwrap();

        let ids: Vec<NodeId> = graph.nodes().map(|n| n.id).collect();
        assert_eq!(ids, [10, 20, 30]);
        // 10-20 both ways, 10->30 one way, 20->77 dropped
        assert_eq!(graph.edge_count(), 3);
        assert!(!graph.is_degraded());

        let ten = graph.node_index(10).unwrap();
        let twenty = graph.node_index(20).unwrap();
        let forward = graph.graph().find_edge(ten, twenty).unwrap();
        let backward = graph.graph().find_edge(twenty, ten).unwrap();
        let (forward, backward) = (&graph.graph()[forward], &graph.graph()[backward]);
        assert_eq!(forward.safety, backward.safety);
        assert_eq!((backward.from, backward.to), (20, 10));
        assert_eq!(backward.geometry.0.first(), forward.geometry.0.last());
        assert!(graph.graph().find_edge(graph.node_index(30).unwrap(), ten).is_none());
    }

    #[test]
    fn derives_length_speed_and_class() {
        let graph = build_safety_graph(&bbox(), raw(), &ScoringParams::default(), 15.0).unwrap();
        let ten = graph.node_index(10).unwrap();

        let edge_to = |id: NodeId| {
            let idx = graph.graph().find_edge(ten, graph.node_index(id).unwrap()).unwrap();
            &graph.graph()[idx]
        };

        let primary = edge_to(20);
        assert_abs_diff_eq!(primary.length_m, 1000.0);
        assert_abs_diff_eq!(primary.travel_time_s, 60.0, epsilon = 1e-9);
        assert_abs_diff_eq!(primary.danger_score(), 143.0, epsilon = 1e-9);

        let side = edge_to(30);
        assert_eq!(side.highway.as_deref(), Some("residential_link"));
        assert_abs_diff_eq!(side.speed_kph, 25.0 * 1.609_344, epsilon = 1e-9);
        assert_abs_diff_eq!(side.length_m, line_length_m(&side.geometry));
        assert_eq!(side.safety.light_count, 1);
        assert_abs_diff_eq!(side.safety.highway_risk, 0.3);
    }

    #[test]
    fn rebuilding_is_identical() {
        let params = ScoringParams::default();
        let a = build_safety_graph(&bbox(), raw(), &params, 15.0).unwrap();
        let b = build_safety_graph(&bbox(), raw(), &params, 15.0).unwrap();
        assert_eq!(a.edges().collect::<Vec<_>>(), b.edges().collect::<Vec<_>>());
        assert_eq!(a.nodes().collect::<Vec<_>>(), b.nodes().collect::<Vec<_>>());
    }

    #[test]
    fn no_usable_edges_is_empty() {
        let mut raw = raw();
        raw.streets.edges.clear();
        raw.streets.edges.push(RawEdge {
            from: 1,
            to: 2,
            ..RawEdge::default()
        });
        let err = build_safety_graph(&bbox(), raw, &ScoringParams::default(), 15.0).unwrap_err();
        assert!(matches!(err, Error::DataSource(DataSourceError::Empty { .. })));
    }
}
