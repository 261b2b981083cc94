//! Workspace index shapes supplied by the external definition/reference
//! extractor: per file, the schema objects it defines and the tables it
//! references.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a defined schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchemaObjectKind {
    Table,
    View,
}

/// A declared column on a table/view definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// A table or view definition discovered in a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub kind: SchemaObjectKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnDef>,
    pub file_path: String,
    /// 1-indexed line of the definition.
    pub line_number: usize,
    /// Which statement of the file defined this object. Used for
    /// per-statement edge scoping during the lineage build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_index: Option<usize>,
    /// Original definition text, when the extractor kept it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl SchemaObject {
    /// Case-insensitive `schema.name` (or bare `name`) identity key.
    pub fn qualified_key(&self) -> String {
        qualified_key(self.schema.as_deref(), &self.name)
    }
}

/// How a table reference is used inside a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Select,
    Join,
    Insert,
    Update,
    Delete,
    Subquery,
    Cte,
}

impl ReferenceKind {
    /// Reference kinds that read from a table.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Select | Self::Join | Self::Subquery)
    }

    /// Reference kinds that write into a table.
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}

/// A table reference discovered in a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub kind: ReferenceKind,
    pub file_path: String,
    pub line_number: usize,
    /// Which statement of the file contains this reference. References
    /// from different statements never produce edges between each other.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_index: Option<usize>,
}

impl TableReference {
    pub fn qualified_key(&self) -> String {
        qualified_key(self.schema.as_deref(), &self.table_name)
    }
}

/// Everything the extractor found in one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<SchemaObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<TableReference>,
}

/// File path -> extracted analysis. Ordered so rebuilds are deterministic.
pub type WorkspaceIndex = BTreeMap<String, FileAnalysis>;

/// Case-normalized `schema.name` or bare `name` key.
pub(crate) fn qualified_key(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(s) if !s.is_empty() => format!("{}.{}", s.to_lowercase(), name.to_lowercase()),
        _ => name.to_lowercase(),
    }
}
