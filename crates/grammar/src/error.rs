use thiserror::Error;

/// Errors raised while compiling a query or a blueprint.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// The operator is not in the dialect's whitelist.
    #[error("Invalid operator for {dialect}: {operator}")]
    InvalidOperator {
        dialect: &'static str,
        operator: String,
    },

    /// The dialect has no rendition of the requested statement.
    #[error("{feature} is not supported by {dialect}")]
    Unsupported {
        dialect: &'static str,
        feature: &'static str,
    },

    /// A statement that needs a target table was given none.
    #[error("Missing table for {0} statement")]
    MissingTable(&'static str),

    /// A statement that writes rows was given none.
    #[error("No rows given for {0} statement")]
    MissingRows(&'static str),

    /// A command needs a full column definition that was not supplied.
    #[error("Missing column definition for: {0}")]
    MissingDefinition(String),

    /// A table option that is spelled out in the SQL is not a bare word.
    #[error("Invalid {kind}: {value}")]
    InvalidOption { kind: &'static str, value: String },

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
