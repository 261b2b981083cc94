//! Workspace lineage graph: storage, adjacency, and the three-pass
//! builder over a workspace index.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::types::lineage::node_id;
use crate::types::workspace::qualified_key;
use crate::types::{
    ColumnInfo, FileAnalysis, LineageEdge, LineageEdgeKind, LineageGraphOptions, LineageNode,
    LineageNodeKind, ReferenceKind, SchemaObjectKind, TableReference, WorkspaceIndex,
};

/// Directed lineage graph over the whole workspace.
///
/// Nodes keep insertion order, so a rebuild over the same index yields
/// byte-identical output. Adjacency lists are maintained on insert;
/// lookups never scan the full edge set.
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    nodes: Vec<LineageNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<LineageEdge>,
    edge_index: HashMap<String, usize>,
    outgoing: HashMap<String, Vec<String>>,
    incoming: HashMap<String, Vec<String>>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node unless its id is already present (first definition
    /// wins). Returns whether the node was inserted.
    pub fn add_node(&mut self, node: LineageNode) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Inserts an edge unless it is a self-loop or a duplicate id.
    pub fn add_edge(&mut self, edge: LineageEdge) -> bool {
        if edge.source_id == edge.target_id || self.edge_index.contains_key(&edge.id) {
            return false;
        }
        self.outgoing
            .entry(edge.source_id.clone())
            .or_default()
            .push(edge.target_id.clone());
        self.incoming
            .entry(edge.target_id.clone())
            .or_default()
            .push(edge.source_id.clone());
        self.edge_index.insert(edge.id.clone(), self.edges.len());
        self.edges.push(edge);
        true
    }

    pub fn node(&self, id: &str) -> Option<&LineageNode> {
        self.node_index.get(id).map(|i| &self.nodes[*i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn nodes(&self) -> &[LineageNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LineageEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Target ids of edges leaving `id`.
    pub fn outgoing(&self, id: &str) -> &[String] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Source ids of edges entering `id`.
    pub fn incoming(&self, id: &str) -> &[String] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_between(&self, source_id: &str, target_id: &str) -> Option<&LineageEdge> {
        let id = format!("{source_id}->{target_id}");
        self.edge_index.get(&id).map(|i| &self.edges[*i])
    }

    /// Case-insensitive substring search over node names.
    pub fn search(&self, query: &str) -> Vec<&LineageNode> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.nodes
            .iter()
            .filter(|n| n.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Resolves a qualified key to a defined table/view node, falling
    /// back from `schema.table` to the bare table name.
    pub(crate) fn resolve_defined(&self, key: &str) -> Option<String> {
        for kind in [LineageNodeKind::Table, LineageNodeKind::View] {
            let id = node_id(kind, key);
            if self.contains_node(&id) {
                return Some(id);
            }
        }
        if let Some((_, bare)) = key.rsplit_once('.') {
            for kind in [LineageNodeKind::Table, LineageNodeKind::View] {
                let id = node_id(kind, bare);
                if self.contains_node(&id) {
                    return Some(id);
                }
            }
        }
        None
    }
}

/// Three-pass graph builder. Options choose whether external
/// placeholders and column nodes appear.
#[derive(Debug, Clone, Default)]
pub struct LineageGraphBuilder {
    options: LineageGraphOptions,
}

impl LineageGraphBuilder {
    pub fn new(options: LineageGraphOptions) -> Self {
        Self { options }
    }

    pub fn build(&self, index: &WorkspaceIndex) -> LineageGraph {
        let mut graph = LineageGraph::new();

        // Pass 1: definition nodes, first definition wins.
        for analysis in index.values() {
            for definition in &analysis.definitions {
                let kind = match definition.kind {
                    SchemaObjectKind::Table => LineageNodeKind::Table,
                    SchemaObjectKind::View => LineageNodeKind::View,
                };
                let key = definition.qualified_key();
                let mut node = LineageNode::new(kind, &key, &definition.name);
                node.file_path = Some(definition.file_path.clone());
                node.line_number = Some(definition.line_number);
                if let Some(schema) = &definition.schema {
                    node.metadata.insert("schema".to_string(), schema.clone());
                }
                graph.add_node(node);
            }
        }

        // Pass 2: column nodes and containment edges.
        if self.options.include_columns {
            for analysis in index.values() {
                for definition in &analysis.definitions {
                    let Some(parent_id) = graph.resolve_defined(&definition.qualified_key())
                    else {
                        continue;
                    };
                    // Columns attach only to the winning definition.
                    if graph.node(&parent_id).and_then(|n| n.file_path.as_deref())
                        != Some(definition.file_path.as_str())
                    {
                        continue;
                    }
                    for (ordinal, column) in definition.columns.iter().enumerate() {
                        let key =
                            format!("{}.{}", definition.qualified_key(), column.name.to_lowercase());
                        let mut node =
                            LineageNode::new(LineageNodeKind::Column, &key, &column.name);
                        node.file_path = Some(definition.file_path.clone());
                        node.parent_id = Some(parent_id.clone());
                        node.column_info = Some(ColumnInfo {
                            data_type: column.data_type.clone(),
                            ordinal,
                        });
                        if graph.add_node(node) {
                            graph.add_edge(LineageEdge::new(
                                parent_id.clone(),
                                node_id(LineageNodeKind::Column, &key),
                                LineageEdgeKind::Contains,
                            ));
                        }
                    }
                }
            }
        }

        // Pass 3: flow edges, scoped per statement within each file.
        for (path, analysis) in index {
            self.connect_file(&mut graph, path, analysis);
        }

        #[cfg(feature = "tracing")]
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "lineage graph built"
        );

        graph
    }

    fn connect_file(&self, graph: &mut LineageGraph, path: &str, analysis: &FileAnalysis) {
        if analysis
            .references
            .iter()
            .any(|r| r.table_name.trim().is_empty())
        {
            #[cfg(feature = "tracing")]
            warn!(file = path, "skipping file with malformed references");
            return;
        }

        let mut groups: BTreeMap<Option<usize>, Vec<&TableReference>> = BTreeMap::new();
        for reference in &analysis.references {
            groups
                .entry(reference.statement_index)
                .or_default()
                .push(reference);
        }

        for (scope, references) in groups {
            // Input keys remember whether any contributing reference was
            // a join, which colors the resulting edges.
            let mut input_keys: BTreeMap<String, bool> = BTreeMap::new();
            let mut output_keys: BTreeSet<String> = BTreeSet::new();
            for reference in &references {
                let key = reference.qualified_key();
                if reference.kind.is_input() {
                    let joined = input_keys.entry(key).or_insert(false);
                    *joined |= reference.kind == ReferenceKind::Join;
                } else if reference.kind.is_output() {
                    output_keys.insert(key);
                }
            }

            // A file that reads sources while defining objects feeds
            // those definitions (CREATE TABLE ... AS SELECT and friends).
            if !input_keys.is_empty() {
                for definition in &analysis.definitions {
                    if definition.statement_index == scope {
                        output_keys.insert(definition.qualified_key());
                    }
                }
            }

            // A key on both sides is a self-reference within the scope;
            // it joins neither partition.
            let both: Vec<String> = input_keys
                .keys()
                .filter(|k| output_keys.contains(*k))
                .cloned()
                .collect();
            for key in &both {
                input_keys.remove(key);
                output_keys.remove(key);
            }

            let mut created_external: HashSet<String> = HashSet::new();
            for (input_key, joined) in &input_keys {
                let Some(source) =
                    self.resolve_node(graph, input_key, &mut created_external)
                else {
                    continue;
                };
                for output_key in &output_keys {
                    let Some(target) =
                        self.resolve_node(graph, output_key, &mut created_external)
                    else {
                        continue;
                    };
                    if source == target {
                        continue;
                    }
                    let kind = if *joined {
                        LineageEdgeKind::Join
                    } else {
                        LineageEdgeKind::Direct
                    };
                    let mut edge = LineageEdge::new(source.clone(), target, kind);
                    edge.metadata.insert("file".to_string(), path.to_string());
                    edge.metadata
                        .insert("inputs".to_string(), input_keys.len().to_string());
                    edge.metadata
                        .insert("outputs".to_string(), output_keys.len().to_string());
                    graph.add_edge(edge);
                }
            }
        }
    }

    fn resolve_node(
        &self,
        graph: &mut LineageGraph,
        key: &str,
        created_external: &mut HashSet<String>,
    ) -> Option<String> {
        if let Some(id) = graph.resolve_defined(key) {
            return Some(id);
        }
        if !self.options.include_external {
            return None;
        }
        let id = node_id(LineageNodeKind::External, key);
        if created_external.insert(id.clone()) && !graph.contains_node(&id) {
            let name = key.rsplit('.').next().unwrap_or(key).to_string();
            graph.add_node(LineageNode::new(LineageNodeKind::External, key, name));
        }
        Some(id)
    }
}

/// Builds a lineage graph with default options.
pub fn build_lineage_graph(index: &WorkspaceIndex) -> LineageGraph {
    LineageGraphBuilder::default().build(index)
}

/// Convenience key helper for callers addressing nodes by table name.
pub fn table_key(schema: Option<&str>, name: &str) -> String {
    qualified_key(schema, name)
}
