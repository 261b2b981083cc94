//! Statement dispatch: SELECT statements get the full pipeline walk,
//! write statements get a result node fed by their targets and sources.

use sqlparser::ast::{
    Delete, FromTable, Insert, Statement, TableFactor, TableObject, UpdateTableFromKind,
};

use super::context::WalkContext;
use super::expression::{count_subqueries, split_conditions, truncate_display};
use super::query::{walk_query, walk_table_factor, walk_table_with_joins};
use crate::types::{ClauseType, FlowNode, FlowNodeKind};

/// Coarse statement family, used by the hint pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatementShape {
    Select,
    Update,
    Delete,
    Other,
}

pub(crate) fn walk_statement(ctx: &mut WalkContext, statement: &Statement) -> StatementShape {
    match statement {
        Statement::Query(query) => {
            walk_query(ctx, query, true);
            StatementShape::Select
        }
        Statement::Insert(insert) => {
            walk_insert(ctx, insert);
            StatementShape::Other
        }
        Statement::Update {
            table,
            from,
            selection,
            ..
        } => {
            if let Some(from) = from {
                let (UpdateTableFromKind::BeforeSet(tables)
                | UpdateTableFromKind::AfterSet(tables)) = from;
                for table_with_joins in tables {
                    walk_table_with_joins(ctx, table_with_joins);
                }
            }
            record_selection(ctx, selection.as_ref());
            let result = result_node(ctx, "UPDATE");
            if let Some(name) = factor_name(&table.relation) {
                wire_target(ctx, &name, &result);
            }
            StatementShape::Update
        }
        Statement::Delete(delete) => {
            walk_delete(ctx, delete);
            StatementShape::Delete
        }
        Statement::CreateTable(create) => {
            let source = create
                .query
                .as_ref()
                .and_then(|query| walk_query(ctx, query, false));
            ctx.pending_outputs.clear();
            let result = result_node(ctx, "CREATE TABLE");
            if let Some(source) = source {
                ctx.add_edge(&source, &result, None, Some(ClauseType::Insert));
            }
            wire_target(ctx, &create.name.to_string(), &result);
            StatementShape::Other
        }
        Statement::CreateView { name, query, .. } => {
            let source = walk_query(ctx, query, false);
            ctx.pending_outputs.clear();
            let result = result_node(ctx, "CREATE VIEW");
            if let Some(source) = source {
                ctx.add_edge(&source, &result, None, Some(ClauseType::Insert));
            }
            wire_target(ctx, &name.to_string(), &result);
            StatementShape::Other
        }
        Statement::Merge {
            table,
            source,
            on,
            ..
        } => {
            walk_table_factor(ctx, source);
            ctx.stats.conditions += split_conditions(on).len();
            let result = result_node(ctx, "MERGE");
            if let Some(name) = factor_name(table) {
                wire_target(ctx, &name, &result);
            }
            StatementShape::Other
        }
        Statement::Drop { names, .. } => {
            let result = result_node(ctx, "DROP");
            for name in names {
                wire_target(ctx, &name.to_string(), &result);
            }
            StatementShape::Other
        }
        other => {
            result_node(ctx, statement_label(other));
            StatementShape::Other
        }
    }
}

fn walk_insert(ctx: &mut WalkContext, insert: &Insert) {
    let source = insert
        .source
        .as_ref()
        .and_then(|query| walk_query(ctx, query, false));
    ctx.pending_outputs.clear();
    let result = result_node(ctx, "INSERT");
    if let Some(source) = source {
        ctx.add_edge(&source, &result, None, Some(ClauseType::Insert));
    }
    if let TableObject::TableName(name) = &insert.table {
        wire_target(ctx, &name.to_string(), &result);
    }
}

fn walk_delete(ctx: &mut WalkContext, delete: &Delete) {
    if let Some(using) = &delete.using {
        for table_with_joins in using {
            walk_table_with_joins(ctx, table_with_joins);
        }
    }
    record_selection(ctx, delete.selection.as_ref());
    let result = result_node(ctx, "DELETE");
    let (FromTable::WithFromKeyword(from) | FromTable::WithoutKeyword(from)) = &delete.from;
    for table_with_joins in from {
        if let Some(name) = factor_name(&table_with_joins.relation) {
            wire_target(ctx, &name, &result);
        }
    }
    // Multi-table DELETE lists extra targets before FROM.
    for name in &delete.tables {
        wire_target(ctx, &name.to_string(), &result);
    }
}

fn record_selection(ctx: &mut WalkContext, selection: Option<&sqlparser::ast::Expr>) {
    if let Some(selection) = selection {
        ctx.has_where = true;
        ctx.stats.conditions += split_conditions(selection).len();
        ctx.stats.subqueries += count_subqueries(selection);
    }
}

/// Emits the statement's terminal node, consuming any pending sources.
fn result_node(ctx: &mut WalkContext, label: impl Into<String>) -> String {
    let id = ctx.next_node_id();
    ctx.add_node(FlowNode::new(&id, FlowNodeKind::Result, label));
    ctx.advance_to(&id, None);
    id
}

/// Table node for a write target, wired target -> result ("rows written
/// into").
fn wire_target(ctx: &mut WalkContext, table_name: &str, result_id: &str) {
    ctx.stats.tables += 1;
    let id = ctx.next_node_id();
    ctx.add_node(FlowNode::new(&id, FlowNodeKind::Table, table_name));
    ctx.register_table(table_name, &id, None);
    ctx.add_edge(&id, result_id, None, Some(ClauseType::Insert));
}

fn factor_name(factor: &TableFactor) -> Option<String> {
    match factor {
        TableFactor::Table { name, .. } => Some(name.to_string()),
        _ => None,
    }
}

fn statement_label(statement: &Statement) -> String {
    let rendered = statement.to_string();
    let keyword = rendered
        .split_whitespace()
        .next()
        .unwrap_or("STATEMENT")
        .to_uppercase();
    truncate_display(&keyword, 30)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_sql_with_dialect;
    use crate::types::Dialect;

    fn walk(sql: &str) -> (WalkContext, StatementShape) {
        let statements = parse_sql_with_dialect(sql, Dialect::Generic).unwrap();
        let statement = statements.into_iter().next().unwrap();
        let mut ctx = WalkContext::new();
        let shape = walk_statement(&mut ctx, &statement);
        (ctx, shape)
    }

    #[test]
    fn update_emits_result_and_target() {
        let (ctx, shape) = walk("UPDATE users SET active = 0 WHERE last_login < '2020-01-01'");
        assert_eq!(shape, StatementShape::Update);
        assert!(ctx.has_where);
        assert_eq!(ctx.stats.tables, 1);
        let result = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Result)
            .unwrap();
        assert_eq!(result.label, "UPDATE");
        let table = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Table)
            .unwrap();
        // Rows flow into the written table's result.
        assert!(ctx
            .edges
            .iter()
            .any(|e| e.source == table.id && e.target == result.id));
    }

    #[test]
    fn delete_without_where_has_no_conditions() {
        let (ctx, shape) = walk("DELETE FROM sessions");
        assert_eq!(shape, StatementShape::Delete);
        assert!(!ctx.has_where);
        assert_eq!(ctx.stats.conditions, 0);
        assert_eq!(ctx.table_usage.get("sessions"), Some(&1));
    }

    #[test]
    fn insert_select_walks_the_source_query() {
        let (ctx, _) = walk(
            "INSERT INTO archive_orders SELECT * FROM orders WHERE created_at < '2024-01-01'",
        );
        assert_eq!(ctx.stats.tables, 2);
        assert_eq!(ctx.stats.conditions, 1);
        let result = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Result)
            .unwrap();
        assert_eq!(result.label, "INSERT");
        // Source pipeline and target table both feed the result.
        let incoming = ctx.edges.iter().filter(|e| e.target == result.id).count();
        assert_eq!(incoming, 2);
    }

    #[test]
    fn ctas_connects_query_to_result() {
        let (ctx, _) = walk("CREATE TABLE t2 AS SELECT id FROM t1");
        let result = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Result)
            .unwrap();
        assert_eq!(result.label, "CREATE TABLE");
        assert_eq!(ctx.stats.tables, 2);
        assert_eq!(ctx.edges.iter().filter(|e| e.target == result.id).count(), 2);
    }

    #[test]
    fn drop_lists_every_named_object() {
        let (ctx, _) = walk("DROP TABLE a, b");
        assert_eq!(ctx.stats.tables, 2);
        let result = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Result)
            .unwrap();
        assert_eq!(result.label, "DROP");
        assert_eq!(ctx.edges.iter().filter(|e| e.target == result.id).count(), 2);
    }
}
