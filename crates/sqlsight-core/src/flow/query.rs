//! SELECT pipeline walk: FROM sources, joins, stage nodes, set
//! operations, and CTE/derived-table mini-graphs.

use sqlparser::ast::{
    GroupByExpr, Join, JoinConstraint, JoinOperator, LimitClause, OrderByKind, Query, Select,
    SelectItem, SetExpr, SetOperator, SetQuantifier, TableFactor, TableWithJoins,
};

use super::context::WalkContext;
use super::expression::{
    count_subqueries, find_aggregates, find_case_branches, find_windows, render_expr,
    split_conditions, truncate_display,
};
use crate::types::{ClauseType, FlowNode, FlowNodeKind};

/// Children cap for CTE/derived-table mini-graphs.
const MAX_SUMMARY_CHILDREN: usize = 5;

/// Walks one query. With `terminal` set, a result node closes the
/// pipeline; otherwise the caller consumes the pending output.
pub(crate) fn walk_query(ctx: &mut WalkContext, query: &Query, terminal: bool) -> Option<String> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            ctx.stats.ctes += 1;
            let name = cte.alias.name.value.clone();
            let children = summarize_query(ctx, &cte.query);
            let id = ctx.next_node_id();
            let mut node = FlowNode::new(&id, FlowNodeKind::Cte, &name)
                .with_description("common table expression");
            node.expanded = !children.is_empty();
            node.children = children;
            ctx.add_node(node);
            ctx.cte_nodes.insert(name.to_lowercase(), id);
        }
    }

    walk_set_expr(ctx, &query.body);

    if let Some(order_by) = &query.order_by {
        if let OrderByKind::Expressions(exprs) = &order_by.kind {
            if !exprs.is_empty() {
                let id = ctx.next_node_id();
                let node = FlowNode::new(&id, FlowNodeKind::Sort, "ORDER BY")
                    .with_details(exprs.iter().map(|e| render_expr(&e.expr)));
                ctx.add_node(node);
                ctx.advance_to(&id, Some(ClauseType::OrderBy));
            }
        }
    }

    if let Some(limit_text) = limit_display(query) {
        ctx.has_limit = true;
        let id = ctx.next_node_id();
        let node =
            FlowNode::new(&id, FlowNodeKind::Limit, "LIMIT").with_description(limit_text);
        ctx.add_node(node);
        ctx.advance_to(&id, Some(ClauseType::Limit));
    }

    if terminal {
        let id = ctx.next_node_id();
        ctx.add_node(FlowNode::new(&id, FlowNodeKind::Result, "Result"));
        ctx.advance_to(&id, None);
        return Some(id);
    }
    ctx.pending_outputs.last().cloned()
}

/// Rendered LIMIT/FETCH text, `None` when neither is present.
fn limit_display(query: &Query) -> Option<String> {
    match &query.limit_clause {
        Some(LimitClause::LimitOffset {
            limit: Some(limit), ..
        }) => Some(limit.to_string()),
        Some(LimitClause::OffsetCommaLimit { limit, .. }) => Some(limit.to_string()),
        _ => query.fetch.as_ref().map(|fetch| fetch.to_string()),
    }
}

fn walk_set_expr(ctx: &mut WalkContext, body: &SetExpr) {
    match body {
        SetExpr::Select(select) => walk_select(ctx, select),
        SetExpr::Query(query) => {
            walk_query(ctx, query, false);
        }
        SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            walk_set_expr(ctx, left);
            let left_outputs = std::mem::take(&mut ctx.pending_outputs);
            walk_set_expr(ctx, right);
            let right_outputs = std::mem::take(&mut ctx.pending_outputs);

            ctx.stats.unions += 1;
            let id = ctx.next_node_id();
            ctx.add_node(FlowNode::new(
                &id,
                FlowNodeKind::Union,
                set_operation_label(*op, *set_quantifier),
            ));
            for source in left_outputs.iter().chain(right_outputs.iter()) {
                ctx.add_edge(source, &id, None, Some(ClauseType::Union));
            }
            ctx.pending_outputs.push(id);
        }
        SetExpr::Values(values) => {
            let id = ctx.next_node_id();
            let node = FlowNode::new(&id, FlowNodeKind::Select, "VALUES")
                .with_description(format!("{} row(s)", values.rows.len()));
            ctx.add_node(node);
            ctx.pending_outputs.push(id);
        }
        // Statement bodies (INSERT/UPDATE/... as set expressions) are rare
        // dialect corners; surface them as an opaque stage.
        other => {
            let id = ctx.next_node_id();
            let node = FlowNode::new(
                &id,
                FlowNodeKind::Select,
                truncate_display(&other.to_string(), 40),
            );
            ctx.add_node(node);
            ctx.pending_outputs.push(id);
        }
    }
}

fn set_operation_label(op: SetOperator, quantifier: SetQuantifier) -> String {
    let name = match op {
        SetOperator::Union => "UNION",
        SetOperator::Intersect => "INTERSECT",
        SetOperator::Except => "EXCEPT",
        SetOperator::Minus => "MINUS",
    };
    match quantifier {
        SetQuantifier::All => format!("{name} ALL"),
        SetQuantifier::Distinct => format!("{name} DISTINCT"),
        _ => name.to_string(),
    }
}

fn walk_select(ctx: &mut WalkContext, select: &Select) {
    for table_with_joins in &select.from {
        walk_table_with_joins(ctx, table_with_joins);
    }

    if let Some(selection) = &select.selection {
        ctx.has_where = true;
        let leaves = split_conditions(selection);
        ctx.stats.conditions += leaves.len();
        ctx.stats.subqueries += count_subqueries(selection);
        let id = ctx.next_node_id();
        let node = FlowNode::new(&id, FlowNodeKind::Filter, "WHERE")
            .with_description(render_expr(selection))
            .with_details(leaves.iter().map(|e| render_expr(e)));
        ctx.add_node(node);
        ctx.advance_to(&id, Some(ClauseType::Where));
    }

    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) if !exprs.is_empty() => {
            let id = ctx.next_node_id();
            let node = FlowNode::new(&id, FlowNodeKind::Aggregate, "GROUP BY")
                .with_details(exprs.iter().map(render_expr));
            ctx.add_node(node);
            ctx.advance_to(&id, Some(ClauseType::GroupBy));
        }
        GroupByExpr::All(_) => {
            let id = ctx.next_node_id();
            ctx.add_node(FlowNode::new(&id, FlowNodeKind::Aggregate, "GROUP BY ALL"));
            ctx.advance_to(&id, Some(ClauseType::GroupBy));
        }
        _ => {}
    }

    if let Some(having) = &select.having {
        let leaves = split_conditions(having);
        ctx.stats.conditions += leaves.len();
        ctx.stats.subqueries += count_subqueries(having);
        let id = ctx.next_node_id();
        let node = FlowNode::new(&id, FlowNodeKind::Filter, "HAVING")
            .with_description(render_expr(having))
            .with_details(leaves.iter().map(|e| render_expr(e)));
        ctx.add_node(node);
        ctx.advance_to(&id, Some(ClauseType::Having));
    }

    let mut aggregates = Vec::new();
    let mut windows = Vec::new();
    let mut case_branches = Vec::new();
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                find_aggregates(expr, &mut aggregates);
                find_windows(expr, &mut windows);
                find_case_branches(expr, &mut case_branches);
                ctx.stats.subqueries += count_subqueries(expr);
            }
            SelectItem::Wildcard(_) => ctx.select_star = true,
            SelectItem::QualifiedWildcard(..) => {}
        }
    }

    if !aggregates.is_empty() {
        ctx.stats.aggregations += aggregates.len();
        let id = ctx.next_node_id();
        let mut node = FlowNode::new(&id, FlowNodeKind::Aggregate, "Aggregates").with_details(
            aggregates
                .iter()
                .map(|agg| format!("{}({})", agg.function, agg.argument)),
        );
        node.aggregate_functions = aggregates;
        ctx.add_node(node);
        ctx.advance_to(&id, Some(ClauseType::GroupBy));
    }

    if !case_branches.is_empty() {
        let id = ctx.next_node_id();
        let mut node = FlowNode::new(&id, FlowNodeKind::Case, "CASE")
            .with_description(format!("{} branch(es)", case_branches.len()));
        node.case_branches = case_branches;
        ctx.add_node(node);
        ctx.advance_to(&id, Some(ClauseType::Case));
    }

    if !windows.is_empty() {
        ctx.stats.window_functions += windows.len();
        let id = ctx.next_node_id();
        let mut node = FlowNode::new(&id, FlowNodeKind::Window, "Window functions")
            .with_details(windows.iter().map(|w| w.function.clone()));
        node.window_functions = windows;
        ctx.add_node(node);
        ctx.advance_to(&id, Some(ClauseType::Window));
    }

    let id = ctx.next_node_id();
    let node = FlowNode::new(&id, FlowNodeKind::Select, "SELECT").with_details(
        select
            .projection
            .iter()
            .map(|item| truncate_display(&item.to_string(), 60)),
    );
    ctx.add_node(node);
    ctx.advance_to(&id, Some(ClauseType::Select));
}

pub(crate) fn walk_table_with_joins(ctx: &mut WalkContext, table_with_joins: &TableWithJoins) {
    walk_table_factor(ctx, &table_with_joins.relation);
    for join in &table_with_joins.joins {
        walk_join(ctx, join);
    }
}

fn walk_join(ctx: &mut WalkContext, join: &Join) {
    walk_table_factor(ctx, &join.relation);
    ctx.stats.joins += 1;

    let id = ctx.next_node_id();
    let mut node = FlowNode::new(&id, FlowNodeKind::Join, join_label(&join.join_operator));
    match join_constraint(&join.join_operator) {
        Some(JoinConstraint::On(expr)) => {
            ctx.stats.conditions += split_conditions(expr).len();
            node = node.with_description(format!("ON {}", render_expr(expr)));
        }
        Some(JoinConstraint::Using(columns)) => {
            let list = columns
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            node = node.with_description(format!("USING ({list})"));
        }
        Some(JoinConstraint::Natural) => {
            node = node.with_description("NATURAL");
        }
        _ => {}
    }
    ctx.add_node(node);
    // Left input is the chain built so far, right input the table just
    // walked; both sit in pending_outputs.
    ctx.advance_to(&id, Some(ClauseType::Join));
}

fn join_label(op: &JoinOperator) -> &'static str {
    match op {
        JoinOperator::Join(_) | JoinOperator::Inner(_) => "INNER JOIN",
        JoinOperator::Left(_) | JoinOperator::LeftOuter(_) => "LEFT JOIN",
        JoinOperator::Right(_) | JoinOperator::RightOuter(_) => "RIGHT JOIN",
        JoinOperator::FullOuter(_) => "FULL OUTER JOIN",
        JoinOperator::CrossJoin(_) => "CROSS JOIN",
        JoinOperator::Semi(_) | JoinOperator::LeftSemi(_) => "LEFT SEMI JOIN",
        JoinOperator::RightSemi(_) => "RIGHT SEMI JOIN",
        JoinOperator::Anti(_) | JoinOperator::LeftAnti(_) => "LEFT ANTI JOIN",
        JoinOperator::RightAnti(_) => "RIGHT ANTI JOIN",
        JoinOperator::StraightJoin(_) => "STRAIGHT JOIN",
        JoinOperator::AsOf { .. } => "ASOF JOIN",
        JoinOperator::CrossApply => "CROSS APPLY",
        JoinOperator::OuterApply => "OUTER APPLY",
    }
}

fn join_constraint(op: &JoinOperator) -> Option<&JoinConstraint> {
    match op {
        JoinOperator::Join(c)
        | JoinOperator::Inner(c)
        | JoinOperator::Left(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::Right(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c)
        | JoinOperator::CrossJoin(c)
        | JoinOperator::Semi(c)
        | JoinOperator::LeftSemi(c)
        | JoinOperator::RightSemi(c)
        | JoinOperator::Anti(c)
        | JoinOperator::LeftAnti(c)
        | JoinOperator::RightAnti(c)
        | JoinOperator::StraightJoin(c) => Some(c),
        JoinOperator::AsOf { constraint, .. } => Some(constraint),
        JoinOperator::CrossApply | JoinOperator::OuterApply => None,
    }
}

pub(crate) fn walk_table_factor(ctx: &mut WalkContext, factor: &TableFactor) {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let table_name = name.to_string();
            let alias_name = alias.as_ref().map(|a| a.name.value.clone());
            // A FROM item naming a CTE routes through the CTE node
            // instead of minting a fresh table node.
            if let Some(cte_id) = ctx.cte_nodes.get(&table_name.to_lowercase()).cloned() {
                ctx.register_derived(&table_name, &cte_id, alias_name.as_deref());
                ctx.pending_outputs.push(cte_id);
                return;
            }
            ctx.stats.tables += 1;
            let id = ctx.next_node_id();
            let mut node = FlowNode::new(&id, FlowNodeKind::Table, &table_name);
            if let Some(alias_name) = &alias_name {
                node = node.with_description(format!("AS {alias_name}"));
            }
            ctx.add_node(node);
            ctx.register_table(&table_name, &id, alias_name.as_deref());
            ctx.pending_outputs.push(id);
        }
        TableFactor::Derived {
            subquery, alias, ..
        } => {
            ctx.stats.subqueries += 1;
            let label = alias
                .as_ref()
                .map(|a| a.name.value.clone())
                .unwrap_or_else(|| "subquery".to_string());
            let children = summarize_query(ctx, subquery);
            let id = ctx.next_node_id();
            let mut node = FlowNode::new(&id, FlowNodeKind::Subquery, &label)
                .with_category("derived");
            node.expanded = !children.is_empty();
            node.children = children;
            ctx.add_node(node);
            ctx.register_derived(&label, &id, None);
            ctx.pending_outputs.push(id);
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => walk_table_with_joins(ctx, table_with_joins),
        other => {
            // UNNEST, table functions, PIVOT and friends: keep them
            // visible as opaque sources.
            let id = ctx.next_node_id();
            ctx.add_node(FlowNode::new(
                &id,
                FlowNodeKind::Table,
                truncate_display(&other.to_string(), 40),
            ));
            ctx.pending_outputs.push(id);
        }
    }
}

/// One-level mini-graph for CTE and derived-table bodies: source tables,
/// then the stages that are present, capped at five children. Inner
/// tables contribute to the usage map but not to the statement stats.
fn summarize_query(ctx: &mut WalkContext, query: &Query) -> Vec<FlowNode> {
    let mut children = Vec::new();
    let SetExpr::Select(select) = query.body.as_ref() else {
        return children;
    };

    for table_with_joins in &select.from {
        if let TableFactor::Table { name, .. } = &table_with_joins.relation {
            let table_name = name.to_string();
            *ctx.table_usage.entry(table_name.clone()).or_insert(0) += 1;
            let id = ctx.next_node_id();
            children.push(FlowNode::new(&id, FlowNodeKind::Table, table_name));
        }
        for join in &table_with_joins.joins {
            if let TableFactor::Table { name, .. } = &join.relation {
                let table_name = name.to_string();
                *ctx.table_usage.entry(table_name.clone()).or_insert(0) += 1;
                let id = ctx.next_node_id();
                children.push(FlowNode::new(&id, FlowNodeKind::Table, table_name));
            }
        }
    }

    if let Some(selection) = &select.selection {
        let id = ctx.next_node_id();
        children.push(
            FlowNode::new(&id, FlowNodeKind::Filter, "WHERE")
                .with_description(render_expr(selection)),
        );
    }

    if matches!(&select.group_by, GroupByExpr::Expressions(exprs, _) if !exprs.is_empty()) {
        let id = ctx.next_node_id();
        children.push(FlowNode::new(&id, FlowNodeKind::Aggregate, "GROUP BY"));
    }

    let id = ctx.next_node_id();
    children.push(
        FlowNode::new(&id, FlowNodeKind::Select, "SELECT").with_details(
            select
                .projection
                .iter()
                .map(|item| truncate_display(&item.to_string(), 60)),
        ),
    );

    children.truncate(MAX_SUMMARY_CHILDREN);
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_sql_with_dialect;
    use crate::types::Dialect;
    use sqlparser::ast::Statement;

    fn walk(sql: &str) -> WalkContext {
        let statements = parse_sql_with_dialect(sql, Dialect::Generic).unwrap();
        let Statement::Query(query) = statements.into_iter().next().unwrap() else {
            panic!("not a query");
        };
        let mut ctx = WalkContext::new();
        walk_query(&mut ctx, &query, true);
        ctx
    }

    fn kinds(ctx: &WalkContext) -> Vec<FlowNodeKind> {
        ctx.nodes.iter().map(|n| n.kind).collect()
    }

    #[test]
    fn simple_filtered_select_builds_linear_pipeline() {
        let ctx = walk("SELECT id, name FROM users WHERE active = 1");
        assert_eq!(
            kinds(&ctx),
            vec![
                FlowNodeKind::Table,
                FlowNodeKind::Filter,
                FlowNodeKind::Select,
                FlowNodeKind::Result,
            ]
        );
        // Single path: each stage has exactly one incoming edge.
        assert_eq!(ctx.edges.len(), 3);
        assert_eq!(ctx.stats.tables, 1);
        assert_eq!(ctx.stats.conditions, 1);
    }

    #[test]
    fn join_wires_left_chain_and_right_table() {
        let ctx = walk(
            "SELECT * FROM orders o JOIN customers c ON o.customer_id = c.id WHERE o.total > 10",
        );
        assert_eq!(ctx.stats.joins, 1);
        assert_eq!(ctx.stats.tables, 2);
        // ON condition plus WHERE condition.
        assert_eq!(ctx.stats.conditions, 2);
        let join = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Join)
            .unwrap();
        let incoming: Vec<_> = ctx.edges.iter().filter(|e| e.target == join.id).collect();
        assert_eq!(incoming.len(), 2);
    }

    #[test]
    fn comma_tables_all_feed_next_stage() {
        let ctx = walk("SELECT * FROM a, b");
        let select = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Select)
            .unwrap();
        let incoming: Vec<_> = ctx.edges.iter().filter(|e| e.target == select.id).collect();
        assert_eq!(incoming.len(), 2);
        assert_eq!(ctx.stats.joins, 0);
    }

    #[test]
    fn union_joins_both_branch_outputs() {
        let ctx = walk("SELECT id FROM a UNION ALL SELECT id FROM b ORDER BY id");
        assert_eq!(ctx.stats.unions, 1);
        let union = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Union)
            .unwrap();
        assert_eq!(union.label, "UNION ALL");
        let incoming: Vec<_> = ctx.edges.iter().filter(|e| e.target == union.id).collect();
        assert_eq!(incoming.len(), 2);
        // ORDER BY applies after the union.
        assert!(kinds(&ctx).contains(&FlowNodeKind::Sort));
    }

    #[test]
    fn cte_reference_reuses_cte_node() {
        let ctx = walk("WITH recent AS (SELECT * FROM events WHERE ts > 0) SELECT * FROM recent");
        assert_eq!(ctx.stats.ctes, 1);
        // No extra table node for the CTE reference.
        assert_eq!(ctx.stats.tables, 0);
        let cte = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Cte)
            .unwrap();
        assert!(cte.expanded);
        assert!(!cte.children.is_empty());
        assert!(ctx.edges.iter().any(|e| e.source == cte.id));
    }

    #[test]
    fn derived_table_is_expanded_with_category() {
        let ctx = walk("SELECT * FROM (SELECT id FROM base WHERE x = 1) d");
        assert_eq!(ctx.stats.subqueries, 1);
        let sub = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Subquery)
            .unwrap();
        assert_eq!(sub.label, "d");
        assert_eq!(sub.category.as_deref(), Some("derived"));
        assert!(sub.expanded);
    }

    #[test]
    fn usage_map_tracks_real_relations_only() {
        let ctx = walk(
            "WITH w AS (SELECT * FROM base) SELECT * FROM w JOIN (SELECT id FROM t1) d ON w.id = d.id",
        );
        assert_eq!(ctx.table_usage.get("base"), Some(&1));
        assert_eq!(ctx.table_usage.get("t1"), Some(&1));
        // CTE and derived-table names resolve in scope but are not
        // counted next to real tables.
        assert!(!ctx.table_usage.contains_key("w"));
        assert!(!ctx.table_usage.contains_key("d"));
        assert!(ctx.resolve_table("w").is_some());
        assert!(ctx.resolve_table("d").is_some());
    }

    #[test]
    fn group_by_and_having_stage_order() {
        let ctx = walk(
            "SELECT dept, COUNT(*) FROM emp WHERE active = 1 GROUP BY dept HAVING COUNT(*) > 5 ORDER BY dept LIMIT 10",
        );
        let ks = kinds(&ctx);
        let pos = |k: FlowNodeKind| ks.iter().position(|x| *x == k).unwrap();
        assert!(pos(FlowNodeKind::Filter) < pos(FlowNodeKind::Aggregate));
        assert!(pos(FlowNodeKind::Sort) < pos(FlowNodeKind::Limit));
        assert!(pos(FlowNodeKind::Limit) < pos(FlowNodeKind::Result));
        assert_eq!(ctx.stats.aggregations, 1);
        assert!(ctx.has_limit);
    }

    #[test]
    fn scalar_subquery_counts_without_node() {
        let ctx = walk("SELECT (SELECT MAX(id) FROM other) FROM t");
        assert_eq!(ctx.stats.subqueries, 1);
        assert!(!kinds(&ctx).contains(&FlowNodeKind::Subquery));
    }

    #[test]
    fn window_node_carries_function_info() {
        let ctx = walk("SELECT ROW_NUMBER() OVER (PARTITION BY dept ORDER BY salary) FROM emp");
        assert_eq!(ctx.stats.window_functions, 1);
        let window = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Window)
            .unwrap();
        assert_eq!(window.window_functions[0].function, "ROW_NUMBER");
    }
}
