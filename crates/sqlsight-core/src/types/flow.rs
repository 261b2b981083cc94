//! Per-statement flow graph shapes: nodes, edges, hints, column lineage,
//! and the per-statement / batch result envelopes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::common::QueryStats;

/// Hard cap on the `details` list carried by a node.
pub(crate) const MAX_NODE_DETAILS: usize = 10;

/// Kind of a flow-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlowNodeKind {
    Table,
    Filter,
    Join,
    Aggregate,
    Sort,
    Limit,
    Select,
    Result,
    Cte,
    Union,
    Subquery,
    Window,
    Case,
}

/// Width/height hints consumed by the external layout collaborator.
///
/// Purely structural; the engine never reads coordinates back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeDimensions {
    pub width: u32,
    pub height: u32,
}

/// One window function call surfaced on a `window` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowFunctionInfo {
    /// Function name, upper-cased (e.g. `ROW_NUMBER`).
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// True when an explicit frame clause (ROWS/RANGE) is present.
    #[serde(default)]
    pub has_frame: bool,
}

/// One aggregate call surfaced on an `aggregate` detail node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFunctionInfo {
    /// Function name, upper-cased (e.g. `SUM`).
    pub function: String,
    /// Rendered argument expression.
    pub argument: String,
    pub distinct: bool,
}

/// One WHEN/THEN branch surfaced on a `case` detail node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseBranchInfo {
    pub condition: String,
    pub result: String,
}

/// One visual/semantic unit of a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Unique within the statement graph.
    pub id: String,
    pub kind: FlowNodeKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Bounded supplementary lines (at most 10).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// 1-indexed line within the statement; offset-adjusted by the batch
    /// analyzer to document coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<NodeDimensions>,
    /// Internal mini-graph for CTE/subquery nodes (one nesting level).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FlowNode>,
    /// True when `children` carries an expanded sub-graph.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expanded: bool,
    /// Free-form category tag, e.g. `derived` for subquery tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub window_functions: Vec<WindowFunctionInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregate_functions: Vec<AggregateFunctionInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub case_branches: Vec<CaseBranchInfo>,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, kind: FlowNodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            description: None,
            details: Vec::new(),
            source_line: None,
            end_line: None,
            dimensions: None,
            children: Vec::new(),
            expanded: false,
            category: None,
            window_functions: Vec::new(),
            aggregate_functions: Vec::new(),
            case_branches: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends detail lines, silently truncating past the cap.
    pub fn with_details<I, S>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for detail in details {
            if self.details.len() >= MAX_NODE_DETAILS {
                break;
            }
            self.details.push(detail.into());
        }
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Which clause produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClauseType {
    From,
    Join,
    Where,
    #[serde(rename = "group by")]
    GroupBy,
    Having,
    Window,
    Case,
    Select,
    #[serde(rename = "order by")]
    OrderBy,
    Limit,
    Union,
    Insert,
}

/// Directed edge between two nodes of the same statement graph.
///
/// Cross-statement edges never exist; the batch analyzer keeps each
/// statement's graph self-contained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause_type: Option<ClauseType>,
}

/// Advisory hint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HintKind {
    Warning,
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HintSeverity {
    Low,
    Medium,
    High,
}

/// Heuristic optimization hint. Advisory only: hints never block graph
/// construction, and several may fire for one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationHint {
    pub kind: HintKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<HintSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

/// One resolved source feeding an output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSource {
    pub table: String,
    pub column: String,
    /// Flow-graph node id of the source table.
    pub node_id: String,
}

/// Column-level lineage for one output column of the projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLineage {
    pub output_column: String,
    pub sources: Vec<ColumnSource>,
}

/// Full analysis output for one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<FlowNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<FlowEdge>,
    pub stats: QueryStats,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<OptimizationHint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_lineage: Vec<ColumnLineage>,
    /// Table name -> number of times it is referenced in the statement.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub table_usage: BTreeMap<String, usize>,
    /// Set when the upstream parser rejected the statement; the other
    /// fields are then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatementResult {
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            stats: QueryStats::default(),
            hints: Vec::new(),
            column_lineage: Vec::new(),
            table_usage: BTreeMap::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One statement inside a batch, with its position in the original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatement {
    pub result: StatementResult,
    /// 1-indexed, inclusive line range in the original document.
    pub start_line: usize,
    pub end_line: usize,
}

/// Ordered per-statement results plus aggregated statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub statements: Vec<BatchStatement>,
    /// Counter sums across statements; complexity derives from the
    /// *average* per-statement score, not the sum.
    pub stats: QueryStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_capped_at_ten() {
        let node = FlowNode::new("n1", FlowNodeKind::Table, "users")
            .with_details((0..20).map(|i| format!("d{i}")));
        assert_eq!(node.details.len(), MAX_NODE_DETAILS);
    }

    #[test]
    fn node_serializes_camel_case_and_skips_empties() {
        let node = FlowNode::new("n1", FlowNodeKind::Filter, "WHERE");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "filter");
        assert!(json.get("sourceLine").is_none());
        assert!(json.get("children").is_none());
        assert!(json.get("expanded").is_none());
    }

    #[test]
    fn error_result_has_no_graph() {
        let result = StatementResult::from_error("boom");
        assert!(result.is_error());
        assert!(result.nodes.is_empty());
        assert_eq!(result.stats, QueryStats::default());
    }
}
