mod state;

use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet, hash_map::Entry};
use petgraph::{
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use self::state::State;
use crate::model::{SafetyGraph, StreetEdge};

/// Dijkstra's algorithm from `start` to `target` over non-negative weights.
///
/// Returns the edges of the cheapest path, empty when `start == target`, or
/// `None` when `target` is unreachable. Ties are broken towards lower node
/// indices, both in settling order and in predecessor choice, so equal
/// queries on an unchanged graph return the same path.
pub(crate) fn shortest_path<W>(
    graph: &SafetyGraph,
    start: NodeIndex,
    target: NodeIndex,
    weight: W,
) -> Option<Vec<EdgeIndex>>
where
    W: Fn(&StreetEdge) -> f64,
{
    if start == target {
        return Some(Vec::new());
    }

    let estimated_nodes = graph.node_count().min(4096);
    let mut distances: HashMap<NodeIndex, f64> = HashMap::with_capacity(estimated_nodes);
    let mut predecessors: HashMap<NodeIndex, EdgeIndex> = HashMap::with_capacity(estimated_nodes);
    let mut settled: HashSet<NodeIndex> = HashSet::with_capacity(estimated_nodes);
    let mut heap = BinaryHeap::with_capacity(estimated_nodes / 4);

    heap.push(State {
        cost: 0.0,
        node: start,
    });
    distances.insert(start, 0.0);

    while let Some(State { cost, node }) = heap.pop() {
        if node == target {
            break;
        }
        if !settled.insert(node) {
            continue;
        }

        for edge in graph.graph.edges(node) {
            let next = edge.target();
            if settled.contains(&next) {
                continue;
            }
            let next_cost = cost + weight(edge.weight()).max(0.0);

            match distances.entry(next) {
                Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    predecessors.insert(next, edge.id());
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                }
                Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        predecessors.insert(next, edge.id());
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                    } else if next_cost == *entry.get()
                        && let Some(current) = predecessors.get_mut(&next)
                        && prefer(graph, edge.id(), *current)
                    {
                        *current = edge.id();
                    }
                }
            }
        }
    }

    if !distances.contains_key(&target) {
        return None;
    }

    let mut path = Vec::new();
    let mut node = target;
    while node != start {
        let edge = *predecessors.get(&node)?;
        path.push(edge);
        node = graph.graph.edge_endpoints(edge)?.0;
        if path.len() > graph.edge_count() {
            return None;
        }
    }
    path.reverse();
    Some(path)
}

/// Among equal-cost predecessor edges prefer the lower source node, then the lower edge
fn prefer(graph: &SafetyGraph, candidate: EdgeIndex, current: EdgeIndex) -> bool {
    let source = |edge| graph.graph.edge_endpoints(edge).map(|(from, _)| from);
    (source(candidate), candidate) < (source(current), current)
}

#[cfg(test)]
mod tests {
    use geo::{line_string, point};
    use petgraph::graph::DiGraph;

    use super::*;
    use crate::{
        NodeId,
        model::{BBox, StreetNode},
        scoring::EdgeSafety,
    };

    fn edge(from: NodeId, to: NodeId, length_m: f64) -> StreetEdge {
        StreetEdge {
            from,
            to,
            geometry: line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 0.001)],
            length_m,
            travel_time_s: length_m,
            speed_kph: 3.6,
            highway: None,
            name: None,
            safety: EdgeSafety {
                light_count: 0,
                curvature_score: 1.0,
                darkness_score: 1.0,
                highway_risk: 1.0,
                land_risk: 0.6,
                land_label: "Unknown".into(),
                danger_score: 0.0,
            },
        }
    }

    /// Diamond 1 -> {2, 3} -> 4 with equal costs on both branches, plus an isolated node 5
    fn diamond(extra_via_3: f64) -> SafetyGraph {
        let mut graph = DiGraph::new();
        let ids: Vec<NodeIndex> = (1..=5)
            .map(|id| {
                graph.add_node(StreetNode {
                    id,
                    geometry: point! { x: 0.0, y: 0.0 },
                })
            })
            .collect();
        // insert the branch through 3 first so edge order does not decide the tie
        graph.add_edge(ids[0], ids[2], edge(1, 3, 10.0));
        graph.add_edge(ids[2], ids[3], edge(3, 4, 10.0 + extra_via_3));
        graph.add_edge(ids[0], ids[1], edge(1, 2, 10.0));
        graph.add_edge(ids[1], ids[3], edge(2, 4, 10.0));
        SafetyGraph::new(BBox::new(1.0, -1.0, 1.0, -1.0).unwrap(), graph, vec![], false)
    }

    fn via(graph: &SafetyGraph, path: &[EdgeIndex]) -> Vec<NodeId> {
        path.iter().map(|e| graph.edge(*e).unwrap().to).collect()
    }

    #[test]
    fn equal_cost_tie_goes_to_lower_node() {
        let graph = diamond(0.0);
        let (start, end) = (NodeIndex::new(0), NodeIndex::new(3));
        let path = shortest_path(&graph, start, end, |e| e.length_m).unwrap();
        assert_eq!(via(&graph, &path), [2, 4]);

        for _ in 0..10 {
            assert_eq!(shortest_path(&graph, start, end, |e| e.length_m).unwrap(), path);
        }
    }

    #[test]
    fn cheaper_branch_wins_over_tie_break() {
        let graph = diamond(-5.0);
        let path =
            shortest_path(&graph, NodeIndex::new(0), NodeIndex::new(3), |e| e.length_m).unwrap();
        assert_eq!(via(&graph, &path), [3, 4]);
    }

    #[test]
    fn same_node_is_an_empty_path() {
        let graph = diamond(0.0);
        let path = shortest_path(&graph, NodeIndex::new(1), NodeIndex::new(1), |e| e.length_m);
        assert_eq!(path, Some(vec![]));
    }

    #[test]
    fn unreachable_target_is_none() {
        let graph = diamond(0.0);
        let length = |e: &StreetEdge| e.length_m;
        assert!(shortest_path(&graph, NodeIndex::new(0), NodeIndex::new(4), length).is_none());
        // edges are directed
        assert!(shortest_path(&graph, NodeIndex::new(3), NodeIndex::new(0), length).is_none());
    }
}
