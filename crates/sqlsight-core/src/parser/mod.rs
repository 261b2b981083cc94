//! Thin boundary around the upstream SQL parser.

use crate::error::ParseError;
use crate::types::Dialect;
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Parses SQL text with the selected dialect.
///
/// When the generic dialect fails on text that shows Postgres-only
/// operators (`::` casts, JSON arrows, `?` containment), a Postgres retry
/// is attempted before surfacing the original error; warehouse SQL is
/// commonly pasted with a generic dialect selected.
pub fn parse_sql_with_dialect(sql: &str, dialect: Dialect) -> Result<Vec<Statement>, ParseError> {
    let upstream = dialect.to_sqlparser_dialect();
    match Parser::parse_sql(upstream.as_ref(), sql) {
        Ok(statements) => Ok(statements),
        Err(primary) => {
            if matches!(dialect, Dialect::Generic) && looks_like_postgres_syntax(sql) {
                let postgres = PostgreSqlDialect {};
                if let Ok(statements) = Parser::parse_sql(&postgres, sql) {
                    return Ok(statements);
                }
            }
            Err(ParseError::from(primary).with_dialect(dialect))
        }
    }
}

fn looks_like_postgres_syntax(sql: &str) -> bool {
    sql.contains("::") || sql.contains("->") || sql.contains("?|") || sql.contains("?&")
}
