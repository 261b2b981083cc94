pub mod error;
pub mod flow;
pub mod lineage;
pub mod parser;
pub mod types;

// Re-export main entry points
pub use error::{ParseError, ParseErrorKind, ValidationError};
pub use flow::batch::{analyze_batch, split_statements};
pub use flow::analyze_statement;
pub use lineage::{
    analyze_impact, build_lineage_graph, trace_column, ChangeKind, ColumnTrace, ImpactReport,
    ImpactSeverity, ImpactSummary, ImpactedObject, LineageGraph, LineageGraphBuilder,
    LineagePath, LineageSession, Traversal, TraversalOptions,
};
pub use parser::parse_sql_with_dialect;

// Re-export wire types explicitly
pub use types::{
    AggregateFunctionInfo,
    AnalyzeOptions,
    BatchResult,
    BatchStatement,
    CaseBranchInfo,
    ClauseType,
    ColumnDef,
    ColumnInfo,
    ColumnLineage,
    ColumnSource,
    ComplexityLevel,
    Dialect,
    FileAnalysis,
    FlowEdge,
    FlowNode,
    FlowNodeKind,
    HintKind,
    HintSeverity,
    LineageEdge,
    LineageEdgeKind,
    LineageGraphOptions,
    LineageNode,
    LineageNodeKind,
    NodeDimensions,
    OptimizationHint,
    QueryStats,
    ReferenceKind,
    SchemaObject,
    SchemaObjectKind,
    StatementResult,
    TableReference,
    WindowFunctionInfo,
    WorkspaceIndex,
};
