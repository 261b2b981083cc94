//! Column-level lineage tracing.
//!
//! Column nodes connect to the table graph through their owning table,
//! so a trace walks from the column up to its table and then along the
//! table-level flow edges in both directions.

use schemars::JsonSchema;
use serde::Serialize;

use super::graph::LineageGraph;
use super::traverse::TraversalOptions;
use crate::types::lineage::node_id;
use crate::types::workspace::qualified_key;
use crate::types::{LineageEdge, LineageNode, LineageNodeKind};

/// One direction of a column trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineagePath {
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
    pub depth: usize,
}

/// Upstream and downstream paths for one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnTrace {
    /// Resolved column node id, empty when the column is unknown.
    pub column_id: String,
    pub upstream: LineagePath,
    pub downstream: LineagePath,
}

/// Traces a column through the workspace. `table` accepts either a bare
/// or `schema.table` name; an unknown column yields empty paths rather
/// than an error.
pub fn trace_column(graph: &LineageGraph, table: &str, column: &str) -> ColumnTrace {
    let Some((column_id, parent_id)) = resolve_column(graph, table, column) else {
        return ColumnTrace::default();
    };

    let options = TraversalOptions::default();
    let upstream = path_from(graph.upstream(&parent_id, &options));
    let downstream = path_from(graph.downstream(&parent_id, &options));

    ColumnTrace {
        column_id,
        upstream,
        downstream,
    }
}

fn resolve_column(graph: &LineageGraph, table: &str, column: &str) -> Option<(String, String)> {
    let (schema, bare) = match table.split_once('.') {
        Some((schema, bare)) => (Some(schema), bare),
        None => (None, table),
    };
    let candidates = [
        format!("{}.{}", qualified_key(schema, bare), column.to_lowercase()),
        format!("{}.{}", qualified_key(None, bare), column.to_lowercase()),
    ];
    for key in candidates {
        let id = node_id(LineageNodeKind::Column, &key);
        if let Some(node) = graph.node(&id) {
            let parent = node.parent_id.clone()?;
            return Some((id, parent));
        }
    }
    None
}

fn path_from(traversal: super::traverse::Traversal) -> LineagePath {
    LineagePath {
        nodes: traversal.nodes,
        edges: traversal.edges,
        depth: traversal.depth_reached,
    }
}
