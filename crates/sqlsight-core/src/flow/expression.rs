//! Depth-bounded expression scanning: column references, condition
//! counting, aggregate/window/CASE detection, subquery counting.

use crate::types::{AggregateFunctionInfo, CaseBranchInfo, WindowFunctionInfo};
use sqlparser::ast::{
    self, Expr, FunctionArg, FunctionArgExpr, WindowType,
};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Recursion cap for pathological expression nesting. Deeper subtrees are
/// summarized rather than walked.
pub(crate) const MAX_EXPR_DEPTH: usize = 100;

const AGGREGATE_FUNCTIONS: &[&str] = &[
    "avg",
    "count",
    "max",
    "min",
    "sum",
    "array_agg",
    "string_agg",
    "group_concat",
    "listagg",
    "bool_and",
    "bool_or",
    "bit_and",
    "bit_or",
    "stddev",
    "stddev_pop",
    "stddev_samp",
    "variance",
    "var_pop",
    "var_samp",
    "median",
    "percentile_cont",
    "percentile_disc",
    "approx_count_distinct",
    "any_value",
];

pub(crate) fn is_aggregate_function(name: &str) -> bool {
    AGGREGATE_FUNCTIONS
        .iter()
        .any(|agg| name.eq_ignore_ascii_case(agg))
}

/// An unresolved column reference lifted out of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnRef {
    pub(crate) table: Option<String>,
    pub(crate) column: String,
}

/// Renders an expression for labels/details, truncated for display.
pub(crate) fn render_expr(expr: &Expr) -> String {
    let text = expr.to_string();
    truncate_display(&text, 80)
}

pub(crate) fn truncate_display(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{prefix}\u{2026}")
    }
}

/// Splits a predicate on top-level AND into its leaf conditions.
pub(crate) fn split_conditions(expr: &Expr) -> Vec<&Expr> {
    let mut leaves = Vec::new();
    collect_and_leaves(expr, &mut leaves, 0);
    leaves
}

fn collect_and_leaves<'a>(expr: &'a Expr, leaves: &mut Vec<&'a Expr>, depth: usize) {
    if depth > MAX_EXPR_DEPTH {
        leaves.push(expr);
        return;
    }
    match expr {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::And,
            right,
        } => {
            collect_and_leaves(left, leaves, depth + 1);
            collect_and_leaves(right, leaves, depth + 1);
        }
        Expr::Nested(inner) => collect_and_leaves(inner, leaves, depth + 1),
        _ => leaves.push(expr),
    }
}

/// Collects column references from an expression subtree.
pub(crate) fn collect_column_refs(expr: &Expr, refs: &mut Vec<ColumnRef>) {
    collect_column_refs_inner(expr, refs, 0);
}

fn collect_column_refs_inner(expr: &Expr, refs: &mut Vec<ColumnRef>, depth: usize) {
    if depth > MAX_EXPR_DEPTH {
        #[cfg(feature = "tracing")]
        debug!(depth, "max expression depth reached while collecting columns");
        return;
    }
    let next = depth + 1;
    match expr {
        Expr::Identifier(ident) => refs.push(ColumnRef {
            table: None,
            column: ident.value.clone(),
        }),
        Expr::CompoundIdentifier(parts) => {
            if parts.len() >= 2 {
                let table = parts[..parts.len() - 1]
                    .iter()
                    .map(|i| i.value.as_str())
                    .collect::<Vec<_>>()
                    .join(".");
                refs.push(ColumnRef {
                    table: Some(table),
                    column: parts[parts.len() - 1].value.clone(),
                });
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            collect_column_refs_inner(left, refs, next);
            collect_column_refs_inner(right, refs, next);
        }
        Expr::UnaryOp { expr, .. }
        | Expr::Nested(expr)
        | Expr::Cast { expr, .. }
        | Expr::Extract { expr, .. } => collect_column_refs_inner(expr, refs, next),
        Expr::Function(func) => {
            if let ast::FunctionArguments::List(arg_list) = &func.args {
                for arg in &arg_list.args {
                    if let Some(e) = function_arg_expr(arg) {
                        collect_column_refs_inner(e, refs, next);
                    }
                }
            }
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(op) = operand {
                collect_column_refs_inner(op, refs, next);
            }
            for case_when in conditions {
                collect_column_refs_inner(&case_when.condition, refs, next);
                collect_column_refs_inner(&case_when.result, refs, next);
            }
            if let Some(el) = else_result {
                collect_column_refs_inner(el, refs, next);
            }
        }
        Expr::InList { expr, list, .. } => {
            collect_column_refs_inner(expr, refs, next);
            for item in list {
                collect_column_refs_inner(item, refs, next);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            collect_column_refs_inner(expr, refs, next);
            collect_column_refs_inner(low, refs, next);
            collect_column_refs_inner(high, refs, next);
        }
        Expr::IsNull(e)
        | Expr::IsNotNull(e)
        | Expr::IsTrue(e)
        | Expr::IsNotTrue(e)
        | Expr::IsFalse(e)
        | Expr::IsNotFalse(e) => collect_column_refs_inner(e, refs, next),
        Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
            collect_column_refs_inner(expr, refs, next);
            collect_column_refs_inner(pattern, refs, next);
        }
        Expr::Tuple(exprs) => {
            for e in exprs {
                collect_column_refs_inner(e, refs, next);
            }
        }
        // Subquery columns belong to the subquery's own scope.
        Expr::Subquery(_) | Expr::InSubquery { .. } | Expr::Exists { .. } => {}
        _ => {}
    }
}

/// Counts scalar/IN/EXISTS subqueries inside an expression.
pub(crate) fn count_subqueries(expr: &Expr) -> usize {
    count_subqueries_inner(expr, 0)
}

fn count_subqueries_inner(expr: &Expr, depth: usize) -> usize {
    if depth > MAX_EXPR_DEPTH {
        return 0;
    }
    let next = depth + 1;
    match expr {
        Expr::Subquery(_) | Expr::InSubquery { .. } | Expr::Exists { .. } => 1,
        Expr::BinaryOp { left, right, .. } => {
            count_subqueries_inner(left, next) + count_subqueries_inner(right, next)
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) | Expr::Cast { expr, .. } => {
            count_subqueries_inner(expr, next)
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            let mut total = operand
                .as_deref()
                .map_or(0, |op| count_subqueries_inner(op, next));
            for case_when in conditions {
                total += count_subqueries_inner(&case_when.condition, next);
                total += count_subqueries_inner(&case_when.result, next);
            }
            if let Some(el) = else_result {
                total += count_subqueries_inner(el, next);
            }
            total
        }
        Expr::InList { expr, list, .. } => {
            let mut total = count_subqueries_inner(expr, next);
            for item in list {
                total += count_subqueries_inner(item, next);
            }
            total
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            count_subqueries_inner(expr, next)
                + count_subqueries_inner(low, next)
                + count_subqueries_inner(high, next)
        }
        Expr::Function(func) => match &func.args {
            ast::FunctionArguments::Subquery(_) => 1,
            ast::FunctionArguments::List(arg_list) => arg_list
                .args
                .iter()
                .filter_map(function_arg_expr)
                .map(|e| count_subqueries_inner(e, next))
                .sum(),
            ast::FunctionArguments::None => 0,
        },
        _ => 0,
    }
}

/// Finds aggregate calls (no OVER clause) in an expression.
pub(crate) fn find_aggregates(expr: &Expr, found: &mut Vec<AggregateFunctionInfo>) {
    find_aggregates_inner(expr, found, 0);
}

fn find_aggregates_inner(expr: &Expr, found: &mut Vec<AggregateFunctionInfo>, depth: usize) {
    if depth > MAX_EXPR_DEPTH {
        return;
    }
    let next = depth + 1;
    match expr {
        Expr::Function(func) => {
            let name = func.name.to_string();
            if func.over.is_none() && is_aggregate_function(&name) {
                let distinct = matches!(
                    &func.args,
                    ast::FunctionArguments::List(args)
                        if args.duplicate_treatment == Some(ast::DuplicateTreatment::Distinct)
                );
                found.push(AggregateFunctionInfo {
                    function: name.to_uppercase(),
                    argument: render_function_args(&func.args),
                    distinct,
                });
            } else if let ast::FunctionArguments::List(arg_list) = &func.args {
                for arg in &arg_list.args {
                    if let Some(e) = function_arg_expr(arg) {
                        find_aggregates_inner(e, found, next);
                    }
                }
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            find_aggregates_inner(left, found, next);
            find_aggregates_inner(right, found, next);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) | Expr::Cast { expr, .. } => {
            find_aggregates_inner(expr, found, next);
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(op) = operand {
                find_aggregates_inner(op, found, next);
            }
            for case_when in conditions {
                find_aggregates_inner(&case_when.condition, found, next);
                find_aggregates_inner(&case_when.result, found, next);
            }
            if let Some(el) = else_result {
                find_aggregates_inner(el, found, next);
            }
        }
        _ => {}
    }
}

/// Finds window function calls (with OVER) in an expression.
pub(crate) fn find_windows(expr: &Expr, found: &mut Vec<WindowFunctionInfo>) {
    find_windows_inner(expr, found, 0);
}

fn find_windows_inner(expr: &Expr, found: &mut Vec<WindowFunctionInfo>, depth: usize) {
    if depth > MAX_EXPR_DEPTH {
        return;
    }
    let next = depth + 1;
    match expr {
        Expr::Function(func) => {
            if let Some(over) = &func.over {
                let mut info = WindowFunctionInfo {
                    function: func.name.to_string().to_uppercase(),
                    partition_by: None,
                    order_by: None,
                    has_frame: false,
                };
                if let WindowType::WindowSpec(spec) = over {
                    if !spec.partition_by.is_empty() {
                        info.partition_by = Some(
                            spec.partition_by
                                .iter()
                                .map(|e| e.to_string())
                                .collect::<Vec<_>>()
                                .join(", "),
                        );
                    }
                    if !spec.order_by.is_empty() {
                        info.order_by = Some(
                            spec.order_by
                                .iter()
                                .map(|e| e.to_string())
                                .collect::<Vec<_>>()
                                .join(", "),
                        );
                    }
                    info.has_frame = spec.window_frame.is_some();
                }
                found.push(info);
            } else if let ast::FunctionArguments::List(arg_list) = &func.args {
                for arg in &arg_list.args {
                    if let Some(e) = function_arg_expr(arg) {
                        find_windows_inner(e, found, next);
                    }
                }
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            find_windows_inner(left, found, next);
            find_windows_inner(right, found, next);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) | Expr::Cast { expr, .. } => {
            find_windows_inner(expr, found, next);
        }
        _ => {}
    }
}

/// Extracts WHEN/THEN branches (plus ELSE) from top-level CASE expressions.
pub(crate) fn find_case_branches(expr: &Expr, found: &mut Vec<CaseBranchInfo>) {
    find_case_branches_inner(expr, found, 0);
}

fn find_case_branches_inner(expr: &Expr, found: &mut Vec<CaseBranchInfo>, depth: usize) {
    if depth > MAX_EXPR_DEPTH {
        return;
    }
    let next = depth + 1;
    match expr {
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            for case_when in conditions {
                let condition = match operand {
                    Some(op) => format!("{} = {}", render_expr(op), render_expr(&case_when.condition)),
                    None => render_expr(&case_when.condition),
                };
                found.push(CaseBranchInfo {
                    condition,
                    result: render_expr(&case_when.result),
                });
            }
            if let Some(el) = else_result {
                found.push(CaseBranchInfo {
                    condition: "ELSE".to_string(),
                    result: render_expr(el),
                });
            }
        }
        Expr::Nested(inner) | Expr::Cast { expr: inner, .. } => {
            find_case_branches_inner(inner, found, next);
        }
        Expr::BinaryOp { left, right, .. } => {
            find_case_branches_inner(left, found, next);
            find_case_branches_inner(right, found, next);
        }
        _ => {}
    }
}

fn function_arg_expr(arg: &FunctionArg) -> Option<&Expr> {
    match arg {
        FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Some(e),
        FunctionArg::Named {
            arg: FunctionArgExpr::Expr(e),
            ..
        } => Some(e),
        FunctionArg::ExprNamed {
            arg: FunctionArgExpr::Expr(e),
            ..
        } => Some(e),
        _ => None,
    }
}

fn render_function_args(args: &ast::FunctionArguments) -> String {
    match args {
        ast::FunctionArguments::List(arg_list) => arg_list
            .args
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        ast::FunctionArguments::Subquery(_) => "(subquery)".to_string(),
        ast::FunctionArguments::None => String::new(),
    }
}
