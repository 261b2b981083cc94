//! Workspace-wide lineage graph shapes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a lineage-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LineageNodeKind {
    Table,
    View,
    Column,
    Cte,
    /// Referenced object with no definition anywhere in the workspace.
    External,
}

impl LineageNodeKind {
    pub(crate) fn id_prefix(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Column => "column",
            Self::Cte => "cte",
            Self::External => "external",
        }
    }
}

/// Column metadata carried on column nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// 0-based position in the declared column list.
    pub ordinal: usize,
}

/// A node of the workspace lineage graph.
///
/// `id` derives deterministically from the kind and the case-insensitive
/// qualified key, so repeated definitions of one object collapse to one
/// node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineageNode {
    pub id: String,
    pub kind: LineageNodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Owning table/view node for column nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_info: Option<ColumnInfo>,
}

impl LineageNode {
    pub fn new(kind: LineageNodeKind, qualified_key: &str, name: impl Into<String>) -> Self {
        Self {
            id: node_id(kind, qualified_key),
            kind,
            name: name.into(),
            file_path: None,
            line_number: None,
            metadata: BTreeMap::new(),
            parent_id: None,
            column_info: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.kind == LineageNodeKind::External
    }
}

/// Deterministic node id: `kind:qualified_key` (key already lower-cased).
pub(crate) fn node_id(kind: LineageNodeKind, qualified_key: &str) -> String {
    format!("{}:{}", kind.id_prefix(), qualified_key)
}

/// Kind of a lineage edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LineageEdgeKind {
    /// Data flows from source into target.
    Direct,
    /// Source participates in a join feeding the target.
    Join,
    /// Table/view -> column ownership.
    Contains,
}

/// A directed edge of the lineage graph.
///
/// `id` is `"{source_id}->{target_id}"`; edges are de-duplicated on it and
/// never self-looping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineageEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: LineageEdgeKind,
    /// Originating file and input/output counts of the statement scope
    /// that produced the edge.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl LineageEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, kind: LineageEdgeKind) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        Self {
            id: format!("{source_id}->{target_id}"),
            source_id,
            target_id,
            kind,
            metadata: BTreeMap::new(),
        }
    }
}

/// Options for the lineage graph build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LineageGraphOptions {
    /// Create placeholder nodes for references with no definition.
    pub include_external: bool,
    /// Create column nodes and `contains` edges from definitions.
    pub include_columns: bool,
}

impl Default for LineageGraphOptions {
    fn default() -> Self {
        Self {
            include_external: true,
            include_columns: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_kind_prefixed() {
        assert_eq!(node_id(LineageNodeKind::Table, "sales.orders"), "table:sales.orders");
        assert_eq!(node_id(LineageNodeKind::Column, "orders.id"), "column:orders.id");
    }

    #[test]
    fn edge_id_concatenates_endpoints() {
        let edge = LineageEdge::new("table:a", "table:b", LineageEdgeKind::Direct);
        assert_eq!(edge.id, "table:a->table:b");
    }
}
