//! Dialect-aware SQL grammars. A `QueryGrammar` turns a `model::query::Query`
//! into SQL text with ordered bindings; a `SchemaGrammar` turns a
//! `model::schema::blueprint::Blueprint` into DDL statements. MySQL and
//! PostgreSQL renditions of both are provided, selected through
//! `config::GrammarConfig`.

pub mod config;
pub mod error;
pub mod query;
pub mod schema;
pub mod wrapper;


pub use config::{GrammarConfig, SqlDialect};
pub use error::GrammarError;
pub use query::{CompiledQuery, QueryGrammar};
pub use schema::SchemaGrammar;
