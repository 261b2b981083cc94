//! Per-statement walk state.
//!
//! All mutable state for one statement's walk lives in [`WalkContext`] and
//! is threaded through the recursive walk explicitly; nothing is
//! process-wide, so statements can be analyzed concurrently.

use crate::types::{
    ClauseType, FlowEdge, FlowNode, FlowNodeKind, OptimizationHint, QueryStats,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Walk state for a single statement.
pub(crate) struct WalkContext {
    next_node: usize,
    next_edge: usize,
    pub(crate) nodes: Vec<FlowNode>,
    pub(crate) edges: Vec<FlowEdge>,
    pub(crate) stats: QueryStats,
    pub(crate) hints: Vec<OptimizationHint>,
    /// Alias -> table name, built from the FROM clause.
    pub(crate) aliases: HashMap<String, String>,
    /// Tables in scope, in FROM order: (table name, node id).
    pub(crate) tables_in_scope: Vec<(String, String)>,
    /// CTE name -> node id, so FROM references resolve to the CTE node.
    pub(crate) cte_nodes: HashMap<String, String>,
    /// Table name -> reference count across the statement.
    pub(crate) table_usage: BTreeMap<String, usize>,
    /// Node ids whose output has not yet been consumed by a later stage.
    pub(crate) pending_outputs: Vec<String>,
    /// Lines already bound to a node, per keyword class.
    pub(crate) claimed_lines: HashSet<(FlowNodeKind, usize)>,
    /// Set when the projection contains a bare `*`.
    pub(crate) select_star: bool,
    /// Set when the query carries LIMIT/FETCH.
    pub(crate) has_limit: bool,
    /// Set when the statement has a WHERE clause (any level).
    pub(crate) has_where: bool,
}

impl WalkContext {
    pub(crate) fn new() -> Self {
        Self {
            next_node: 0,
            next_edge: 0,
            nodes: Vec::new(),
            edges: Vec::new(),
            stats: QueryStats::default(),
            hints: Vec::new(),
            aliases: HashMap::new(),
            tables_in_scope: Vec::new(),
            cte_nodes: HashMap::new(),
            table_usage: BTreeMap::new(),
            pending_outputs: Vec::new(),
            claimed_lines: HashSet::new(),
            select_star: false,
            has_limit: false,
            has_where: false,
        }
    }

    pub(crate) fn next_node_id(&mut self) -> String {
        let id = format!("node_{}", self.next_node);
        self.next_node += 1;
        id
    }

    /// Adds a node and returns its id.
    pub(crate) fn add_node(&mut self, node: FlowNode) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub(crate) fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        label: Option<String>,
        clause_type: Option<ClauseType>,
    ) {
        let id = format!("edge_{}", self.next_edge);
        self.next_edge += 1;
        self.edges.push(FlowEdge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            label,
            clause_type,
        });
    }

    /// Wires every pending output into `target`, then makes `target` the
    /// sole pending output. Stages that were omitted in the SQL simply
    /// never consume, so no dangling edges appear.
    pub(crate) fn advance_to(&mut self, target: &str, clause_type: Option<ClauseType>) {
        let sources = std::mem::take(&mut self.pending_outputs);
        for source in &sources {
            self.add_edge(source, target, None, clause_type);
        }
        self.pending_outputs.push(target.to_string());
    }

    /// Registers a real table in scope and counts the reference.
    pub(crate) fn register_table(&mut self, name: &str, node_id: &str, alias: Option<&str>) {
        self.register_derived(name, node_id, alias);
        *self.table_usage.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Registers a CTE or subquery alias for reference resolution only;
    /// the usage map tracks real relations, not derived names.
    pub(crate) fn register_derived(&mut self, name: &str, node_id: &str, alias: Option<&str>) {
        self.tables_in_scope
            .push((name.to_string(), node_id.to_string()));
        if let Some(alias) = alias {
            self.aliases.insert(alias.to_string(), name.to_string());
        }
    }

    /// Resolves a qualifier (alias or table name) to a table in scope.
    pub(crate) fn resolve_table(&self, qualifier: &str) -> Option<(String, String)> {
        let name = self
            .aliases
            .get(qualifier)
            .cloned()
            .unwrap_or_else(|| qualifier.to_string());
        self.tables_in_scope
            .iter()
            .find(|(table, _)| table.eq_ignore_ascii_case(&name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FlowNodeKind;

    #[test]
    fn node_ids_are_sequential() {
        let mut ctx = WalkContext::new();
        assert_eq!(ctx.next_node_id(), "node_0");
        assert_eq!(ctx.next_node_id(), "node_1");
    }

    #[test]
    fn advance_consumes_all_pending_outputs() {
        let mut ctx = WalkContext::new();
        let a = ctx.next_node_id();
        let b = ctx.next_node_id();
        ctx.add_node(FlowNode::new(&a, FlowNodeKind::Table, "a"));
        ctx.add_node(FlowNode::new(&b, FlowNodeKind::Table, "b"));
        ctx.pending_outputs = vec![a.clone(), b.clone()];

        let sel = ctx.next_node_id();
        ctx.add_node(FlowNode::new(&sel, FlowNodeKind::Select, "SELECT"));
        ctx.advance_to(&sel, None);

        assert_eq!(ctx.edges.len(), 2);
        assert_eq!(ctx.pending_outputs, vec![sel]);
    }

    #[test]
    fn alias_resolution_falls_back_to_table_name() {
        let mut ctx = WalkContext::new();
        ctx.register_table("orders", "node_0", Some("o"));
        assert_eq!(
            ctx.resolve_table("o"),
            Some(("orders".to_string(), "node_0".to_string()))
        );
        assert_eq!(
            ctx.resolve_table("ORDERS"),
            Some(("orders".to_string(), "node_0".to_string()))
        );
        assert_eq!(ctx.resolve_table("missing"), None);
    }
}
