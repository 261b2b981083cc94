//! Multi-statement input: splitting, per-statement analysis, and line
//! offset reconstruction.

use super::analyze_statement;
use super::stats;
use crate::error::ValidationError;
use crate::types::{AnalyzeOptions, BatchResult, BatchStatement, ComplexityLevel, Dialect, QueryStats};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Longest statement-prefix used to relocate a statement in the source.
const LOCATE_PREFIX_LEN: usize = 30;

/// Splits SQL text on top-level semicolons.
///
/// Quote state tracks `'` and `"` (doubled quotes toggle twice and come
/// out right); semicolons inside parentheses belong to the enclosing
/// statement. Backslash escapes are not interpreted. Empty fragments are
/// dropped, so a trailing semicolon yields no phantom statement.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut paren_depth = 0usize;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' if !in_single && !in_double => paren_depth += 1,
            ')' if !in_single && !in_double => paren_depth = paren_depth.saturating_sub(1),
            ';' if !in_single && !in_double && paren_depth == 0 => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    statements.push(trimmed.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    statements
}

/// Splits and analyzes a document. Limits are enforced before any
/// parsing; one broken statement never sinks its neighbors.
pub fn analyze_batch(
    sql: &str,
    dialect: Dialect,
    options: &AnalyzeOptions,
) -> Result<BatchResult, ValidationError> {
    if sql.len() > options.max_query_size {
        return Err(ValidationError::SizeLimit {
            actual: sql.len(),
            limit: options.max_query_size,
        });
    }
    let texts = split_statements(sql);
    if texts.len() > options.max_query_count {
        return Err(ValidationError::QueryCountLimit {
            actual: texts.len(),
            limit: options.max_query_count,
        });
    }

    #[cfg(feature = "tracing")]
    debug!(statements = texts.len(), "analyzing batch");

    let source_lines: Vec<&str> = sql.lines().collect();
    let mut search_from = 0usize;
    let mut statements = Vec::with_capacity(texts.len());
    let mut aggregate = QueryStats::default();
    let mut score_total = 0usize;

    for text in &texts {
        let mut result = analyze_statement(text, dialect);

        let start_line = locate_statement(&source_lines, search_from, text)
            .unwrap_or(search_from.saturating_add(1));
        let line_count = text.lines().count().max(1);
        let end_line = start_line + line_count - 1;
        search_from = end_line;

        // Node lines were computed against the isolated statement text;
        // shift them to document coordinates.
        let offset = start_line.saturating_sub(1);
        for node in &mut result.nodes {
            if let Some(line) = node.source_line.as_mut() {
                *line += offset;
            }
            if let Some(line) = node.end_line.as_mut() {
                *line += offset;
            }
        }

        aggregate.tables += result.stats.tables;
        aggregate.joins += result.stats.joins;
        aggregate.subqueries += result.stats.subqueries;
        aggregate.ctes += result.stats.ctes;
        aggregate.aggregations += result.stats.aggregations;
        aggregate.window_functions += result.stats.window_functions;
        aggregate.unions += result.stats.unions;
        aggregate.conditions += result.stats.conditions;
        score_total += result.stats.complexity_score;

        statements.push(BatchStatement {
            result,
            start_line,
            end_line,
        });
    }

    if statements.is_empty() {
        stats::finalize(&mut aggregate);
    } else {
        aggregate.complexity_score = score_total;
        // Batch category reflects the typical statement, not the sum.
        aggregate.complexity = ComplexityLevel::from_score(score_total / statements.len());
    }

    Ok(BatchResult {
        statements,
        stats: aggregate,
    })
}

/// 1-indexed document line where a statement starts, found by scanning
/// forward from the previous statement's end for a short prefix of the
/// statement's first line.
fn locate_statement(source_lines: &[&str], search_from: usize, text: &str) -> Option<usize> {
    let first_line = text.lines().next()?.trim();
    let prefix: String = first_line.chars().take(LOCATE_PREFIX_LEN).collect();
    if prefix.is_empty() {
        return None;
    }
    source_lines
        .iter()
        .enumerate()
        .skip(search_from)
        .find(|(_, line)| line.contains(prefix.as_str()))
        .map(|(i, _)| i + 1)
}
