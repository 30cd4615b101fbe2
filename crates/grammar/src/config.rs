use crate::{
    error::GrammarError,
    query::{QueryGrammar, mysql::MySqlQueryGrammar, postgres::PostgresQueryGrammar},
    schema::{SchemaGrammar, mysql::MySqlSchemaGrammar, postgres::PostgresSchemaGrammar},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SqlDialect {
    #[default]
    MySql,
    Postgres,
}

impl FromStr for SqlDialect {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "pg" | "pgsql" | "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            other => Err(GrammarError::UnknownDialect(other.to_string())),
        }
    }
}

impl TryFrom<String> for SqlDialect {
    type Error = GrammarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::MySql => write!(f, "mysql"),
            SqlDialect::Postgres => write!(f, "postgres"),
        }
    }
}

/// Selects and configures the grammars once, at startup. The grammars it
/// builds are immutable and can be shared across threads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    pub dialect: SqlDialect,
    /// Prepended to every table name and qualifier.
    pub table_prefix: String,
    /// MySQL table defaults for `create table`.
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub engine: Option<String>,
}

impl GrammarConfig {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = prefix.to_string();
        self
    }

    pub fn query_grammar(&self) -> Box<dyn QueryGrammar> {
        info!(
            dialect = %self.dialect,
            table_prefix = %self.table_prefix,
            "Building query grammar"
        );
        match self.dialect {
            SqlDialect::MySql => Box::new(MySqlQueryGrammar::new(self.table_prefix.clone())),
            SqlDialect::Postgres => Box::new(PostgresQueryGrammar::new(self.table_prefix.clone())),
        }
    }

    pub fn schema_grammar(&self) -> Box<dyn SchemaGrammar> {
        info!(
            dialect = %self.dialect,
            table_prefix = %self.table_prefix,
            "Building schema grammar"
        );
        match self.dialect {
            SqlDialect::MySql => Box::new(
                MySqlSchemaGrammar::new(self.table_prefix.clone()).with_table_options(
                    self.charset.clone(),
                    self.collation.clone(),
                    self.engine.clone(),
                ),
            ),
            SqlDialect::Postgres => Box::new(PostgresSchemaGrammar::new(self.table_prefix.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GrammarConfig, SqlDialect};
    use crate::error::GrammarError;

    #[test]
    fn test_parse_dialect() {
        assert_eq!("MySQL".parse::<SqlDialect>().unwrap(), SqlDialect::MySql);
        assert_eq!("PostgreSQL".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
        assert_eq!(" pgsql ".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
        assert!(matches!(
            "sqlite".parse::<SqlDialect>(),
            Err(GrammarError::UnknownDialect(name)) if name == "sqlite"
        ));
    }

    #[test]
    fn test_from_json() {
        let config = GrammarConfig::from_json(
            r#"{"dialect": "Postgres", "table_prefix": "app_", "engine": "InnoDB"}"#,
        )
        .unwrap();
        assert_eq!(config.dialect, SqlDialect::Postgres);
        assert_eq!(config.table_prefix, "app_");
        assert_eq!(config.engine.as_deref(), Some("InnoDB"));
        assert!(config.charset.is_none());

        let defaults = GrammarConfig::from_json("{}").unwrap();
        assert_eq!(defaults, GrammarConfig::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_dialect() {
        let err = GrammarConfig::from_json(r#"{"dialect": "oracle"}"#).unwrap_err();
        assert!(matches!(err, GrammarError::Config(_)));
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_grammar_selection() {
        let config = GrammarConfig::new(SqlDialect::Postgres).with_table_prefix("app_");
        let query = config.query_grammar();
        let schema = config.schema_grammar();
        assert_eq!(query.name(), "PostgreSQL");
        assert_eq!(schema.name(), "PostgreSQL");
        assert_eq!(query.wrapper().table_prefix(), "app_");

        assert_eq!(GrammarConfig::default().query_grammar().name(), "MySQL");
    }
}
