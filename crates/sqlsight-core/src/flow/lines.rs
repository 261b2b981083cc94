//! Source-line attribution for top-level nodes.
//!
//! The parser does not expose token positions, so each node is bound to
//! the nearest raw-text line carrying its leading keyword. Repeating
//! keywords (joins, filters, tables) claim lines so two nodes of the
//! same class never collapse onto one line.

use super::context::WalkContext;
use crate::types::FlowNodeKind;

pub(crate) fn assign_line_numbers(sql: &str, ctx: &mut WalkContext) {
    let lines: Vec<String> = sql.lines().map(|l| l.to_uppercase()).collect();
    if lines.is_empty() {
        return;
    }
    for index in 0..ctx.nodes.len() {
        let Some(keyword) = node_keyword(&ctx.nodes[index]) else {
            continue;
        };
        let kind = ctx.nodes[index].kind;
        let found = lines.iter().enumerate().find_map(|(i, line)| {
            let line_number = i + 1;
            if line.contains(&keyword) && !ctx.claimed_lines.contains(&(kind, line_number)) {
                Some(line_number)
            } else {
                None
            }
        });
        if let Some(line_number) = found {
            ctx.claimed_lines.insert((kind, line_number));
            ctx.nodes[index].source_line = Some(line_number);
        }
    }
}

/// Upper-cased search keyword per node kind. Result nodes are synthetic
/// and stay unbound.
fn node_keyword(node: &crate::types::FlowNode) -> Option<String> {
    let keyword = match node.kind {
        FlowNodeKind::Table => node.label.to_uppercase(),
        FlowNodeKind::Join => "JOIN".to_string(),
        FlowNodeKind::Filter => node.label.to_uppercase(),
        FlowNodeKind::Aggregate => match node.label.as_str() {
            "Aggregates" => node
                .aggregate_functions
                .first()
                .map(|agg| agg.function.clone())?,
            _ => "GROUP BY".to_string(),
        },
        FlowNodeKind::Sort => "ORDER BY".to_string(),
        FlowNodeKind::Limit => "LIMIT".to_string(),
        FlowNodeKind::Select => "SELECT".to_string(),
        FlowNodeKind::Cte => node.label.to_uppercase(),
        FlowNodeKind::Union => node
            .label
            .split_whitespace()
            .next()
            .unwrap_or("UNION")
            .to_string(),
        FlowNodeKind::Subquery => "SELECT".to_string(),
        FlowNodeKind::Window => "OVER".to_string(),
        FlowNodeKind::Case => "CASE".to_string(),
        FlowNodeKind::Result => return None,
    };
    Some(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::statements::walk_statement;
    use crate::parser::parse_sql_with_dialect;
    use crate::types::Dialect;

    fn analyzed(sql: &str) -> WalkContext {
        let statements = parse_sql_with_dialect(sql, Dialect::Generic).unwrap();
        let statement = statements.into_iter().next().unwrap();
        let mut ctx = WalkContext::new();
        walk_statement(&mut ctx, &statement);
        assign_line_numbers(sql, &mut ctx);
        ctx
    }

    #[test]
    fn stages_bind_to_their_clause_lines() {
        let sql = "SELECT id\nFROM users\nWHERE active = 1\nORDER BY id";
        let ctx = analyzed(sql);
        let line_of = |kind: FlowNodeKind| {
            ctx.nodes
                .iter()
                .find(|n| n.kind == kind)
                .and_then(|n| n.source_line)
        };
        assert_eq!(line_of(FlowNodeKind::Table), Some(2));
        assert_eq!(line_of(FlowNodeKind::Filter), Some(3));
        assert_eq!(line_of(FlowNodeKind::Sort), Some(4));
        assert_eq!(line_of(FlowNodeKind::Select), Some(1));
    }

    #[test]
    fn repeated_joins_claim_distinct_lines() {
        let sql = "SELECT *\nFROM a\nJOIN b ON a.id = b.id\nJOIN c ON b.id = c.id";
        let ctx = analyzed(sql);
        let join_lines: Vec<_> = ctx
            .nodes
            .iter()
            .filter(|n| n.kind == FlowNodeKind::Join)
            .map(|n| n.source_line)
            .collect();
        assert_eq!(join_lines, vec![Some(3), Some(4)]);
    }

    #[test]
    fn unmatched_nodes_stay_unbound() {
        let ctx = analyzed("SELECT 1");
        let result = ctx
            .nodes
            .iter()
            .find(|n| n.kind == FlowNodeKind::Result)
            .unwrap();
        assert_eq!(result.source_line, None);
    }
}
