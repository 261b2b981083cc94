//! Best-effort column lineage for the top-level projection.
//!
//! Qualified references resolve through the alias map; bare references
//! attribute only when a single table is in scope; guessing across
//! several candidates would fabricate lineage.

use sqlparser::ast::{Expr, Select, SelectItem, SetExpr, Statement};

use super::context::WalkContext;
use super::expression::{collect_column_refs, render_expr, truncate_display};
use crate::types::{ColumnLineage, ColumnSource};

pub(crate) fn build(ctx: &WalkContext, statement: &Statement) -> Vec<ColumnLineage> {
    let Statement::Query(query) = statement else {
        return Vec::new();
    };
    let SetExpr::Select(select) = query.body.as_ref() else {
        return Vec::new();
    };
    build_from_select(ctx, select)
}

fn build_from_select(ctx: &WalkContext, select: &Select) -> Vec<ColumnLineage> {
    let mut lineage = Vec::new();
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                lineage.push(ColumnLineage {
                    output_column: output_name(expr),
                    sources: expr_sources(ctx, expr),
                });
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                lineage.push(ColumnLineage {
                    output_column: alias.value.clone(),
                    sources: expr_sources(ctx, expr),
                });
            }
            SelectItem::Wildcard(_) => {
                // `*` fans out to every table in scope.
                let sources = ctx
                    .tables_in_scope
                    .iter()
                    .map(|(table, node_id)| ColumnSource {
                        table: table.clone(),
                        column: "*".to_string(),
                        node_id: node_id.clone(),
                    })
                    .collect();
                lineage.push(ColumnLineage {
                    output_column: "*".to_string(),
                    sources,
                });
            }
            SelectItem::QualifiedWildcard(name, _) => {
                let qualifier = name.to_string();
                let sources = ctx
                    .resolve_table(&qualifier)
                    .map(|(table, node_id)| {
                        vec![ColumnSource {
                            table,
                            column: "*".to_string(),
                            node_id,
                        }]
                    })
                    .unwrap_or_default();
                lineage.push(ColumnLineage {
                    output_column: format!("{qualifier}.*"),
                    sources,
                });
            }
        }
    }
    lineage
}

fn expr_sources(ctx: &WalkContext, expr: &Expr) -> Vec<ColumnSource> {
    let mut refs = Vec::new();
    collect_column_refs(expr, &mut refs);
    let mut sources = Vec::new();
    for column_ref in refs {
        let resolved = match &column_ref.table {
            Some(qualifier) => ctx.resolve_table(qualifier),
            None if ctx.tables_in_scope.len() == 1 => Some(ctx.tables_in_scope[0].clone()),
            None => None,
        };
        if let Some((table, node_id)) = resolved {
            let source = ColumnSource {
                table,
                column: column_ref.column,
                node_id,
            };
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
    }
    sources
}

fn output_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|p| p.value.clone())
            .unwrap_or_else(|| render_expr(expr)),
        _ => truncate_display(&expr.to_string(), 60),
    }
}
