use sqlsight_core::{
    analyze_batch, analyze_statement, AnalyzeOptions, ComplexityLevel, Dialect, FlowNodeKind,
    HintKind, HintSeverity,
};

fn kinds(result: &sqlsight_core::StatementResult) -> Vec<FlowNodeKind> {
    result.nodes.iter().map(|n| n.kind).collect()
}

#[test]
fn simple_select_flows_table_filter_select_result() {
    let result = analyze_statement("SELECT id, name FROM users WHERE active = 1", Dialect::Generic);
    assert!(!result.is_error());
    assert_eq!(
        kinds(&result),
        vec![
            FlowNodeKind::Table,
            FlowNodeKind::Filter,
            FlowNodeKind::Select,
            FlowNodeKind::Result,
        ]
    );
    assert_eq!(result.stats.tables, 1);
    assert_eq!(result.stats.conditions, 1);
    assert_eq!(result.stats.complexity, ComplexityLevel::Simple);

    // Single linear path.
    for window in result.nodes.windows(2) {
        assert!(result
            .edges
            .iter()
            .any(|e| e.source == window[0].id && e.target == window[1].id));
    }
}

#[test]
fn node_ids_are_unique_and_edges_resolve() {
    let result = analyze_statement(
        "WITH recent AS (SELECT * FROM events WHERE ts > 0) \
         SELECT r.id, COUNT(*) FROM recent r JOIN users u ON r.user_id = u.id \
         GROUP BY r.id HAVING COUNT(*) > 2 ORDER BY r.id LIMIT 50",
        Dialect::Generic,
    );
    assert!(!result.is_error());
    let mut ids: Vec<_> = result.nodes.iter().map(|n| n.id.as_str()).collect();
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    assert_eq!(ids.len(), before, "duplicate node ids");
    for edge in &result.edges {
        assert!(result.nodes.iter().any(|n| n.id == edge.source));
        assert!(result.nodes.iter().any(|n| n.id == edge.target));
    }
}

#[test]
fn cartesian_product_raises_error_hint() {
    let result = analyze_statement("SELECT * FROM a, b", Dialect::Generic);
    let cartesian = result
        .hints
        .iter()
        .find(|h| h.message.contains("Cartesian product"))
        .expect("cartesian hint");
    assert_eq!(cartesian.kind, HintKind::Error);
    assert_eq!(cartesian.severity, Some(HintSeverity::High));
    // SELECT * and missing LIMIT fire alongside it.
    assert_eq!(result.hints.len(), 3);
}

#[test]
fn update_without_where_is_flagged_delete_with_where_is_not() {
    let update = analyze_statement("UPDATE accounts SET frozen = 1", Dialect::Generic);
    assert!(update
        .hints
        .iter()
        .any(|h| h.kind == HintKind::Error
            && h.message.contains("without WHERE clause")
            && h.message.contains("affects ALL rows")));

    let delete = analyze_statement("DELETE FROM accounts WHERE id = 3", Dialect::Generic);
    assert!(delete.hints.iter().all(|h| h.kind != HintKind::Error));
}

#[test]
fn complexity_grows_with_structure() {
    let simple = analyze_statement("SELECT id FROM t", Dialect::Generic);
    let moderate = analyze_statement(
        "SELECT a.id, b.x FROM a JOIN b ON a.id = b.id JOIN c ON b.id = c.id WHERE a.y = 1",
        Dialect::Generic,
    );
    let complex = analyze_statement(
        "WITH w AS (SELECT * FROM base WHERE k = 1) \
         SELECT dept, SUM(x), ROW_NUMBER() OVER (ORDER BY dept) \
         FROM w JOIN d ON w.id = d.id JOIN e ON d.id = e.id \
         WHERE z IN (SELECT z FROM f) GROUP BY dept \
         UNION ALL SELECT dept, 0, 0 FROM g",
        Dialect::Generic,
    );
    assert!(simple.stats.complexity_score < moderate.stats.complexity_score);
    assert!(moderate.stats.complexity_score < complex.stats.complexity_score);
    assert_eq!(simple.stats.complexity, ComplexityLevel::Simple);
    assert!(moderate.stats.complexity >= ComplexityLevel::Moderate);
}

#[test]
fn table_usage_counts_every_reference() {
    let result = analyze_statement(
        "SELECT * FROM orders o JOIN orders p ON o.id = p.parent_id",
        Dialect::Generic,
    );
    assert_eq!(result.table_usage.get("orders"), Some(&2));
    assert_eq!(result.stats.tables, 2);
}

#[test]
fn dialect_specific_sql_analyzes() {
    let result = analyze_statement(
        "SELECT payload::text FROM events WHERE payload IS NOT NULL",
        Dialect::Postgres,
    );
    assert!(!result.is_error());
    assert_eq!(result.stats.tables, 1);
}

#[test]
fn batch_keeps_per_statement_alignment() {
    let sql = "SELECT id FROM users;\nUPDATE users SET x = 1;\nBROKEN SYNTAX HERE;\nSELECT 2";
    let batch = analyze_batch(sql, Dialect::Generic, &AnalyzeOptions::default()).unwrap();
    assert_eq!(batch.statements.len(), 4);
    assert!(!batch.statements[0].result.is_error());
    assert!(!batch.statements[1].result.is_error());
    assert!(batch.statements[2].result.is_error());
    assert!(!batch.statements[3].result.is_error());
    // Line ranges are document-relative and ordered.
    assert_eq!(batch.statements[0].start_line, 1);
    assert_eq!(batch.statements[1].start_line, 2);
    assert_eq!(batch.statements[2].start_line, 3);
}

#[test]
fn column_lineage_tracks_aliases() {
    let result = analyze_statement(
        "SELECT o.total AS amount, c.name FROM orders o JOIN customers c ON o.cid = c.id",
        Dialect::Generic,
    );
    let amount = result
        .column_lineage
        .iter()
        .find(|l| l.output_column == "amount")
        .unwrap();
    assert_eq!(amount.sources[0].table, "orders");
    assert_eq!(amount.sources[0].column, "total");
    // The node id points back into the flow graph.
    assert!(result.nodes.iter().any(|n| n.id == amount.sources[0].node_id));
}
