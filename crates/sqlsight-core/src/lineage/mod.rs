//! Workspace-wide lineage: graph construction from a file index,
//! traversal, change-impact reports, column tracing, and the shared
//! session that serializes rebuilds.

mod column;
mod graph;
mod impact;
mod session;
mod traverse;

pub use column::{trace_column, ColumnTrace, LineagePath};
pub use graph::{build_lineage_graph, table_key, LineageGraph, LineageGraphBuilder};
pub use impact::{analyze_impact, ChangeKind, ImpactReport, ImpactSeverity, ImpactSummary, ImpactedObject};
pub use session::LineageSession;
pub use traverse::{Traversal, TraversalOptions};
