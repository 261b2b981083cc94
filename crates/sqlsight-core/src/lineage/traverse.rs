//! Breadth-first lineage traversal.

use std::collections::{HashSet, VecDeque};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::graph::LineageGraph;
use crate::types::{LineageEdge, LineageEdgeKind, LineageNode};

/// Traversal bounds and filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TraversalOptions {
    /// Hop limit; `None` walks until the frontier is exhausted. The
    /// visited set makes cyclic graphs terminate either way.
    pub max_depth: Option<usize>,
    /// Drop external placeholder nodes from seed and frontier alike.
    pub exclude_external: bool,
}

/// Ordered traversal outcome. The seed node is never part of `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Traversal {
    pub nodes: Vec<LineageNode>,
    /// Edges crossed while discovering `nodes`, oriented as stored.
    pub edges: Vec<LineageEdge>,
    pub depth_reached: usize,
}

impl Traversal {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            depth_reached: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Upstream,
    Downstream,
}

/// BFS discovery order with per-node depth, shared by the public
/// traversals and the impact analyzer.
pub(crate) fn walk(
    graph: &LineageGraph,
    start: &str,
    direction: Direction,
    options: &TraversalOptions,
) -> (Vec<(String, usize)>, Vec<LineageEdge>, usize) {
    let Some(seed) = graph.node(start) else {
        return (Vec::new(), Vec::new(), 0);
    };
    if options.exclude_external && seed.is_external() {
        return (Vec::new(), Vec::new(), 0);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start);
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((start.to_string(), 0));

    let mut order = Vec::new();
    let mut edges = Vec::new();
    let mut depth_reached = 0;

    while let Some((current, depth)) = queue.pop_front() {
        if let Some(max) = options.max_depth {
            if depth >= max {
                continue;
            }
        }
        let neighbors = match direction {
            Direction::Upstream => graph.incoming(&current),
            Direction::Downstream => graph.outgoing(&current),
        };
        for neighbor in neighbors {
            if visited.contains(neighbor.as_str()) {
                continue;
            }
            let Some(node) = graph.node(neighbor) else {
                continue;
            };
            if options.exclude_external && node.is_external() {
                continue;
            }
            let crossed = match direction {
                Direction::Upstream => graph.edge_between(neighbor, &current),
                Direction::Downstream => graph.edge_between(&current, neighbor),
            };
            // Containment edges model table -> column ownership, not data
            // flow; column tracing resolves ownership itself.
            if crossed.map(|e| e.kind) == Some(LineageEdgeKind::Contains) {
                continue;
            }
            visited.insert(node.id.as_str());
            let next_depth = depth + 1;
            depth_reached = depth_reached.max(next_depth);
            order.push((neighbor.clone(), next_depth));
            if let Some(edge) = crossed {
                edges.push(edge.clone());
            }
            queue.push_back((neighbor.clone(), next_depth));
        }
    }

    (order, edges, depth_reached)
}

fn materialize(
    graph: &LineageGraph,
    (order, edges, depth_reached): (Vec<(String, usize)>, Vec<LineageEdge>, usize),
) -> Traversal {
    let nodes = order
        .iter()
        .filter_map(|(id, _)| graph.node(id).cloned())
        .collect();
    Traversal {
        nodes,
        edges,
        depth_reached,
    }
}

impl LineageGraph {
    /// Everything the given node reads from, directly or transitively.
    pub fn upstream(&self, node_id: &str, options: &TraversalOptions) -> Traversal {
        if !self.contains_node(node_id) {
            return Traversal::empty();
        }
        materialize(self, walk(self, node_id, Direction::Upstream, options))
    }

    /// Everything that reads from the given node.
    pub fn downstream(&self, node_id: &str, options: &TraversalOptions) -> Traversal {
        if !self.contains_node(node_id) {
            return Traversal::empty();
        }
        materialize(self, walk(self, node_id, Direction::Downstream, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineageEdge, LineageEdgeKind, LineageNode, LineageNodeKind};

    fn chain_graph() -> LineageGraph {
        // raw -> staging -> marts -> report
        let mut graph = LineageGraph::new();
        for name in ["raw", "staging", "marts", "report"] {
            graph.add_node(LineageNode::new(LineageNodeKind::Table, name, name));
        }
        for (a, b) in [("raw", "staging"), ("staging", "marts"), ("marts", "report")] {
            graph.add_edge(LineageEdge::new(
                format!("table:{a}"),
                format!("table:{b}"),
                LineageEdgeKind::Direct,
            ));
        }
        graph
    }

    #[test]
    fn downstream_walks_the_full_chain() {
        let graph = chain_graph();
        let traversal = graph.downstream("table:raw", &TraversalOptions::default());
        let names: Vec<_> = traversal.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["staging", "marts", "report"]);
        assert_eq!(traversal.depth_reached, 3);
        assert_eq!(traversal.edges.len(), 3);
    }

    #[test]
    fn upstream_never_includes_the_seed() {
        let graph = chain_graph();
        let traversal = graph.upstream("table:marts", &TraversalOptions::default());
        let names: Vec<_> = traversal.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["staging", "raw"]);
        assert!(!names.contains(&"marts"));
    }

    #[test]
    fn depth_limit_cuts_the_frontier() {
        let graph = chain_graph();
        let traversal = graph.downstream(
            "table:raw",
            &TraversalOptions {
                max_depth: Some(1),
                ..TraversalOptions::default()
            },
        );
        assert_eq!(traversal.nodes.len(), 1);
        assert_eq!(traversal.depth_reached, 1);
    }

    #[test]
    fn cycles_terminate() {
        let mut graph = chain_graph();
        graph.add_edge(LineageEdge::new(
            "table:report",
            "table:raw",
            LineageEdgeKind::Direct,
        ));
        let traversal = graph.downstream("table:raw", &TraversalOptions::default());
        // raw is the seed and reappears in the cycle, but is not revisited.
        assert_eq!(traversal.nodes.len(), 3);
    }

    #[test]
    fn exclude_external_filters_seed_and_frontier() {
        let mut graph = chain_graph();
        graph.add_node(LineageNode::new(LineageNodeKind::External, "feed", "feed"));
        graph.add_edge(LineageEdge::new(
            "external:feed",
            "table:raw",
            LineageEdgeKind::Direct,
        ));
        let options = TraversalOptions {
            exclude_external: true,
            ..TraversalOptions::default()
        };
        let upstream = graph.upstream("table:raw", &options);
        assert!(upstream.nodes.is_empty());
        let from_external = graph.downstream("external:feed", &options);
        assert!(from_external.nodes.is_empty());
    }

    #[test]
    fn containment_edges_are_not_data_flow() {
        let mut graph = chain_graph();
        graph.add_node(LineageNode::new(
            LineageNodeKind::Column,
            "raw.id",
            "id",
        ));
        graph.add_edge(LineageEdge::new(
            "table:raw",
            "column:raw.id",
            LineageEdgeKind::Contains,
        ));
        let traversal = graph.downstream("table:raw", &TraversalOptions::default());
        let names: Vec<_> = traversal.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["staging", "marts", "report"]);
    }

    #[test]
    fn unknown_seed_is_empty() {
        let graph = chain_graph();
        let traversal = graph.downstream("table:missing", &TraversalOptions::default());
        assert!(traversal.nodes.is_empty());
        assert_eq!(traversal.depth_reached, 0);
    }

    #[test]
    fn diamond_visits_once() {
        // a -> b, a -> c, b -> d, c -> d
        let mut graph = LineageGraph::new();
        for name in ["a", "b", "c", "d"] {
            graph.add_node(LineageNode::new(LineageNodeKind::Table, name, name));
        }
        for (s, t) in [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")] {
            graph.add_edge(LineageEdge::new(
                format!("table:{s}"),
                format!("table:{t}"),
                LineageEdgeKind::Direct,
            ));
        }
        let traversal = graph.downstream("table:a", &TraversalOptions::default());
        assert_eq!(traversal.nodes.len(), 3);
        assert_eq!(traversal.depth_reached, 2);
    }
}
