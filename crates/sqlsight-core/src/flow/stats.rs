//! Complexity scoring over the raw walk counters.

use crate::types::{ComplexityLevel, QueryStats};

const TABLE_WEIGHT: usize = 1;
const JOIN_WEIGHT: usize = 2;
const SUBQUERY_WEIGHT: usize = 3;
const CTE_WEIGHT: usize = 2;
const AGGREGATION_WEIGHT: usize = 2;
const WINDOW_WEIGHT: usize = 2;
const UNION_WEIGHT: usize = 2;
const CONDITION_WEIGHT: usize = 1;

/// Derives the weighted score and category from the counters.
///
/// Every weight is positive, so adding any feature can only raise the
/// score.
pub(crate) fn finalize(stats: &mut QueryStats) {
    stats.complexity_score = stats.tables * TABLE_WEIGHT
        + stats.joins * JOIN_WEIGHT
        + stats.subqueries * SUBQUERY_WEIGHT
        + stats.ctes * CTE_WEIGHT
        + stats.aggregations * AGGREGATION_WEIGHT
        + stats.window_functions * WINDOW_WEIGHT
        + stats.unions * UNION_WEIGHT
        + stats.conditions * CONDITION_WEIGHT;
    stats.complexity = ComplexityLevel::from_score(stats.complexity_score);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_table_single_condition_is_simple() {
        let mut stats = QueryStats {
            tables: 1,
            conditions: 1,
            ..QueryStats::default()
        };
        finalize(&mut stats);
        assert_eq!(stats.complexity_score, 2);
        assert_eq!(stats.complexity, ComplexityLevel::Simple);
    }

    #[test]
    fn joins_and_subqueries_weigh_more_than_tables() {
        let mut stats = QueryStats {
            tables: 3,
            joins: 2,
            subqueries: 2,
            ..QueryStats::default()
        };
        finalize(&mut stats);
        assert_eq!(stats.complexity_score, 13);
        assert_eq!(stats.complexity, ComplexityLevel::Moderate);
    }

    #[test]
    fn adding_a_feature_never_lowers_the_score() {
        let mut base = QueryStats {
            tables: 2,
            joins: 1,
            ..QueryStats::default()
        };
        finalize(&mut base);
        let mut richer = base.clone();
        richer.window_functions += 1;
        finalize(&mut richer);
        assert!(richer.complexity_score > base.complexity_score);
    }
}
