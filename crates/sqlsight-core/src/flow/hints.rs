//! Post-walk heuristics. Each check is independent and several may fire
//! for one statement; none of them ever blocks graph construction.

use super::context::WalkContext;
use super::statements::StatementShape;
use crate::types::{HintKind, HintSeverity, OptimizationHint};

const MANY_JOINS: usize = 5;
const MANY_SUBQUERIES: usize = 3;

pub(crate) fn collect_hints(ctx: &mut WalkContext, shape: StatementShape) {
    if ctx.select_star {
        ctx.hints.push(OptimizationHint {
            kind: HintKind::Warning,
            message: "SELECT * retrieves every column of the source tables".to_string(),
            suggestion: Some("List only the columns the consumer needs".to_string()),
            severity: Some(HintSeverity::Low),
            node_id: None,
        });
    }

    if shape == StatementShape::Select && ctx.stats.tables > 0 && !ctx.has_limit {
        ctx.hints.push(OptimizationHint {
            kind: HintKind::Info,
            message: "Query has no LIMIT clause".to_string(),
            suggestion: Some("Add a LIMIT when exploring large tables".to_string()),
            severity: Some(HintSeverity::Low),
            node_id: None,
        });
    }

    if matches!(shape, StatementShape::Update | StatementShape::Delete) && !ctx.has_where {
        let verb = if shape == StatementShape::Update {
            "UPDATE"
        } else {
            "DELETE"
        };
        ctx.hints.push(OptimizationHint {
            kind: HintKind::Error,
            message: format!("{verb} without WHERE clause affects ALL rows"),
            suggestion: Some("Add a WHERE clause to restrict the affected rows".to_string()),
            severity: Some(HintSeverity::High),
            node_id: None,
        });
    }

    if ctx.stats.joins > MANY_JOINS {
        ctx.hints.push(OptimizationHint {
            kind: HintKind::Warning,
            message: format!("Statement performs {} joins", ctx.stats.joins),
            suggestion: Some(
                "Consider staging intermediate results or pre-joining in a view".to_string(),
            ),
            severity: Some(HintSeverity::Medium),
            node_id: None,
        });
    }

    if ctx.stats.subqueries > MANY_SUBQUERIES {
        ctx.hints.push(OptimizationHint {
            kind: HintKind::Warning,
            message: format!("Statement nests {} subqueries", ctx.stats.subqueries),
            suggestion: Some("Consider rewriting subqueries as CTEs or joins".to_string()),
            severity: Some(HintSeverity::Medium),
            node_id: None,
        });
    }

    if shape == StatementShape::Select
        && ctx.stats.tables > 1
        && ctx.stats.joins == 0
        && ctx.stats.conditions == 0
    {
        ctx.hints.push(OptimizationHint {
            kind: HintKind::Error,
            message: "Comma-separated tables without a join condition produce a Cartesian product"
                .to_string(),
            suggestion: Some("Add explicit JOIN ... ON clauses".to_string()),
            severity: Some(HintSeverity::High),
            node_id: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueryStats;

    fn ctx_with(stats: QueryStats) -> WalkContext {
        let mut ctx = WalkContext::new();
        ctx.stats = stats;
        ctx
    }

    #[test]
    fn update_without_where_is_an_error() {
        let mut ctx = ctx_with(QueryStats::default());
        collect_hints(&mut ctx, StatementShape::Update);
        let hint = ctx
            .hints
            .iter()
            .find(|h| h.kind == HintKind::Error)
            .unwrap();
        assert!(hint.message.contains("without WHERE clause"));
        assert!(hint.message.contains("affects ALL rows"));
        assert_eq!(hint.severity, Some(HintSeverity::High));
    }

    #[test]
    fn update_with_where_passes_clean() {
        let mut ctx = ctx_with(QueryStats::default());
        ctx.has_where = true;
        collect_hints(&mut ctx, StatementShape::Update);
        assert!(ctx.hints.is_empty());
    }

    #[test]
    fn cartesian_product_fires_only_without_conditions() {
        let mut ctx = ctx_with(QueryStats {
            tables: 2,
            ..QueryStats::default()
        });
        collect_hints(&mut ctx, StatementShape::Select);
        assert!(ctx
            .hints
            .iter()
            .any(|h| h.message.contains("Cartesian product")));

        let mut filtered = ctx_with(QueryStats {
            tables: 2,
            conditions: 1,
            ..QueryStats::default()
        });
        filtered.has_where = true;
        filtered.has_limit = true;
        collect_hints(&mut filtered, StatementShape::Select);
        assert!(filtered.hints.is_empty());
    }

    #[test]
    fn several_hints_can_stack() {
        let mut ctx = ctx_with(QueryStats {
            tables: 2,
            ..QueryStats::default()
        });
        ctx.select_star = true;
        collect_hints(&mut ctx, StatementShape::Select);
        // SELECT *, missing LIMIT and Cartesian product all fire.
        assert_eq!(ctx.hints.len(), 3);
    }

    #[test]
    fn join_and_subquery_volume_warn() {
        let mut ctx = ctx_with(QueryStats {
            tables: 7,
            joins: 6,
            subqueries: 4,
            conditions: 6,
            ..QueryStats::default()
        });
        ctx.has_limit = true;
        collect_hints(&mut ctx, StatementShape::Select);
        assert_eq!(
            ctx.hints
                .iter()
                .filter(|h| h.kind == HintKind::Warning)
                .count(),
            2
        );
    }
}
