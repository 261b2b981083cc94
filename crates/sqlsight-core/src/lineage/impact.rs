//! Change impact analysis over the lineage graph.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::graph::LineageGraph;
use super::traverse::{walk, Direction, TraversalOptions};
use crate::types::LineageNodeKind;

/// What is about to happen to the target object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modify,
    Rename,
    Drop,
}

/// Escalating severity scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ImpactSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactSeverity {
    fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }

    fn relax(self) -> Self {
        match self {
            Self::Low | Self::Medium => Self::Low,
            Self::High => Self::Medium,
            Self::Critical => Self::High,
        }
    }
}

/// One downstream object affected by the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactedObject {
    pub node_id: String,
    pub name: String,
    pub kind: LineageNodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Hops from the changed object.
    pub depth: usize,
    pub severity: ImpactSeverity,
    /// Why this object is affected, e.g. "reads from orders via etl.sql".
    pub reason: String,
}

/// Counts by kind across all impacted objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub tables: usize,
    pub views: usize,
    pub columns: usize,
    pub externals: usize,
    /// Distinct files containing impacted objects.
    pub files: usize,
}

/// Full impact report for one proposed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    pub change_type: ChangeKind,
    /// Node id of the object being changed.
    pub target: String,
    pub severity: ImpactSeverity,
    pub summary: ImpactSummary,
    /// Objects one hop downstream.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_impacts: Vec<ImpactedObject>,
    /// Objects two or more hops downstream.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitive_impacts: Vec<ImpactedObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Walks everything downstream of `target_id` and grades the blast
/// radius. An unknown target yields an empty low-severity report.
pub fn analyze_impact(graph: &LineageGraph, target_id: &str, change: ChangeKind) -> ImpactReport {
    let (order, _, _) = walk(
        graph,
        target_id,
        Direction::Downstream,
        &TraversalOptions::default(),
    );

    let direct_severity = match change {
        ChangeKind::Drop => ImpactSeverity::High,
        ChangeKind::Rename | ChangeKind::Modify => ImpactSeverity::Medium,
    };

    let target_name = graph
        .node(target_id)
        .map(|n| n.name.clone())
        .unwrap_or_else(|| target_id.to_string());

    let mut summary = ImpactSummary::default();
    let mut files: BTreeSet<String> = BTreeSet::new();
    let mut direct_impacts = Vec::new();
    let mut transitive_impacts = Vec::new();

    for (node_id, depth) in &order {
        let Some(node) = graph.node(node_id) else {
            continue;
        };
        match node.kind {
            LineageNodeKind::Table => summary.tables += 1,
            LineageNodeKind::View => summary.views += 1,
            LineageNodeKind::Column => summary.columns += 1,
            LineageNodeKind::External => summary.externals += 1,
            LineageNodeKind::Cte => {}
        }
        if let Some(file) = &node.file_path {
            files.insert(file.clone());
        }
        let severity = if *depth == 1 {
            direct_severity
        } else {
            direct_severity.relax()
        };
        let reason = if *depth == 1 {
            match graph
                .edge_between(target_id, node_id)
                .and_then(|e| e.metadata.get("file"))
            {
                Some(file) => format!("reads from {target_name} via {file}"),
                None => format!("reads from {target_name}"),
            }
        } else {
            format!("transitively depends on {target_name} at depth {depth}")
        };
        let impacted = ImpactedObject {
            node_id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            file_path: node.file_path.clone(),
            depth: *depth,
            severity,
            reason,
        };
        if *depth == 1 {
            direct_impacts.push(impacted);
        } else {
            transitive_impacts.push(impacted);
        }
    }
    summary.files = files.len();

    let severity = overall_severity(
        change,
        direct_impacts.len() + transitive_impacts.len(),
        summary.files,
        !transitive_impacts.is_empty(),
    );
    let suggestions = build_suggestions(change, &direct_impacts, &transitive_impacts, &summary);

    ImpactReport {
        change_type: change,
        target: target_id.to_string(),
        severity,
        summary,
        direct_impacts,
        transitive_impacts,
        suggestions,
        generated_at: Utc::now(),
    }
}

fn overall_severity(
    change: ChangeKind,
    affected: usize,
    files: usize,
    has_transitive: bool,
) -> ImpactSeverity {
    if affected == 0 {
        return ImpactSeverity::Low;
    }
    let mut severity = match change {
        ChangeKind::Drop => ImpactSeverity::High,
        ChangeKind::Rename | ChangeKind::Modify => ImpactSeverity::Medium,
    };
    if files > 1 {
        severity = severity.escalate();
    }
    if has_transitive {
        severity = severity.escalate();
    }
    severity
}

fn build_suggestions(
    change: ChangeKind,
    direct: &[ImpactedObject],
    transitive: &[ImpactedObject],
    summary: &ImpactSummary,
) -> Vec<String> {
    let affected = direct.len() + transitive.len();
    let mut suggestions = Vec::new();
    if affected == 0 {
        suggestions.push("No downstream dependents found".to_string());
        return suggestions;
    }
    match change {
        ChangeKind::Drop => suggestions.push(format!(
            "Update or remove {affected} dependent object(s) before dropping"
        )),
        ChangeKind::Rename => suggestions.push(format!(
            "Update {affected} reference(s) to use the new name"
        )),
        ChangeKind::Modify => suggestions.push(format!(
            "Review {affected} dependent object(s) for compatibility"
        )),
    }
    if summary.files > 1 {
        suggestions.push(format!(
            "Coordinate the change across {} files",
            summary.files
        ));
    }
    if !transitive.is_empty() {
        suggestions.push(format!(
            "{} object(s) are affected only transitively; verify their refresh order",
            transitive.len()
        ));
    }
    suggestions
}
