//! Statement statistics and the derived complexity classification.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structural counters for one statement (or an aggregated batch).
///
/// Counters are incremented at the point each construct is emitted during
/// the walk; there is no post-hoc recount, so the stats always agree with
/// the node set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    /// Distinct source/target table nodes emitted.
    pub tables: usize,
    /// JOIN operations.
    pub joins: usize,
    /// Derived tables and expression subqueries.
    pub subqueries: usize,
    /// Common table expressions.
    pub ctes: usize,
    /// Aggregate function calls in the projection.
    pub aggregations: usize,
    /// Window function calls.
    pub window_functions: usize,
    /// Set operations (UNION/INTERSECT/EXCEPT).
    pub unions: usize,
    /// Filter conditions across WHERE/HAVING/ON.
    pub conditions: usize,
    /// Weighted sum of the counters above.
    pub complexity_score: usize,
    /// Category derived from the score.
    pub complexity: ComplexityLevel,
}

/// Four-level complexity category.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    #[default]
    Simple,
    Moderate,
    Complex,
    #[serde(rename = "very complex")]
    VeryComplex,
}

impl ComplexityLevel {
    /// Category thresholds: < 5 simple, < 15 moderate, < 30 complex.
    pub fn from_score(score: usize) -> Self {
        if score < 5 {
            Self::Simple
        } else if score < 15 {
            Self::Moderate
        } else if score < 30 {
            Self::Complex
        } else {
            Self::VeryComplex
        }
    }
}
