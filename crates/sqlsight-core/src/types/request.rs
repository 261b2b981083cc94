//! Analysis inputs: dialect selection and pre-flight limits.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SQL dialect, passed through unchanged to the upstream parser.
///
/// Dialects without a dedicated upstream grammar map to the closest one:
/// MariaDB parses with the MySQL grammar, Athena and Trino with the
/// generic grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Generic,
    Mysql,
    Mariadb,
    Postgres,
    Mssql,
    Sqlite,
    Snowflake,
    Bigquery,
    Hive,
    Redshift,
    Athena,
    Trino,
}

impl Dialect {
    pub fn to_sqlparser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        use sqlparser::dialect::{
            BigQueryDialect, GenericDialect, HiveDialect, MsSqlDialect, MySqlDialect,
            PostgreSqlDialect, RedshiftSqlDialect, SQLiteDialect, SnowflakeDialect,
        };
        match self {
            Self::Generic | Self::Athena | Self::Trino => Box::new(GenericDialect {}),
            Self::Mysql | Self::Mariadb => Box::new(MySqlDialect {}),
            Self::Postgres => Box::new(PostgreSqlDialect {}),
            Self::Mssql => Box::new(MsSqlDialect {}),
            Self::Sqlite => Box::new(SQLiteDialect {}),
            Self::Snowflake => Box::new(SnowflakeDialect {}),
            Self::Bigquery => Box::new(BigQueryDialect {}),
            Self::Hive => Box::new(HiveDialect {}),
            Self::Redshift => Box::new(RedshiftSqlDialect {}),
        }
    }
}

/// Pre-flight limits applied before any statement is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeOptions {
    /// Maximum input size in bytes.
    pub max_query_size: usize,
    /// Maximum number of statements per batch.
    pub max_query_count: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            max_query_size: 500_000,
            max_query_count: 200,
        }
    }
}
