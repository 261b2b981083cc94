//! Per-statement flow-graph construction.
//!
//! [`analyze_statement`] turns one statement into a [`StatementResult`]:
//! nodes and edges for the execution pipeline, structural statistics,
//! heuristic hints, and best-effort column lineage. Parse failures come
//! back as an error-carrying result rather than a hard failure, so batch
//! callers keep their per-statement alignment.

pub mod batch;
mod column_lineage;
mod context;
mod expression;
mod hints;
mod layout;
mod lines;
mod query;
mod statements;
mod stats;

use sqlparser::ast::Statement;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::parser::parse_sql_with_dialect;
use crate::types::{Dialect, StatementResult};
use context::WalkContext;

/// Analyzes a single SQL statement. Text with several statements keeps
/// only the first; use [`batch::analyze_batch`] for documents.
pub fn analyze_statement(sql: &str, dialect: Dialect) -> StatementResult {
    let parsed = match parse_sql_with_dialect(sql, dialect) {
        Ok(parsed) => parsed,
        Err(err) => return StatementResult::from_error(err.to_string()),
    };
    let Some(statement) = parsed.into_iter().next() else {
        return StatementResult::from_error("empty statement");
    };
    analyze_parsed(sql, &statement)
}

fn analyze_parsed(sql: &str, statement: &Statement) -> StatementResult {
    let mut ctx = WalkContext::new();
    let shape = statements::walk_statement(&mut ctx, statement);
    hints::collect_hints(&mut ctx, shape);
    stats::finalize(&mut ctx.stats);
    let column_lineage = column_lineage::build(&ctx, statement);
    lines::assign_line_numbers(sql, &mut ctx);
    layout::assign_dimensions(&mut ctx.nodes);

    #[cfg(feature = "tracing")]
    debug!(
        nodes = ctx.nodes.len(),
        edges = ctx.edges.len(),
        score = ctx.stats.complexity_score,
        "statement analyzed"
    );

    StatementResult {
        nodes: ctx.nodes,
        edges: ctx.edges,
        stats: ctx.stats,
        hints: ctx.hints,
        column_lineage,
        table_usage: ctx.table_usage,
        error: None,
    }
}
