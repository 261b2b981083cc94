//! Wire types exchanged with the host.
//!
//! Everything here is part of the de facto wire format: hosts pattern-match
//! on these field names, so shapes stay structurally stable. All types
//! serialize as `camelCase` JSON and carry `JsonSchema` derives for typed
//! host bindings.

mod common;
mod flow;
pub(crate) mod lineage;
mod request;
pub(crate) mod workspace;

pub use common::{ComplexityLevel, QueryStats};
pub use flow::{
    AggregateFunctionInfo, BatchResult, BatchStatement, CaseBranchInfo, ClauseType, ColumnLineage,
    ColumnSource, FlowEdge, FlowNode, FlowNodeKind, HintKind, HintSeverity, NodeDimensions,
    OptimizationHint, StatementResult, WindowFunctionInfo,
};
pub use lineage::{
    ColumnInfo, LineageEdge, LineageEdgeKind, LineageGraphOptions, LineageNode, LineageNodeKind,
};
pub use request::{AnalyzeOptions, Dialect};
pub use workspace::{
    ColumnDef, FileAnalysis, ReferenceKind, SchemaObject, SchemaObjectKind, TableReference,
    WorkspaceIndex,
};
