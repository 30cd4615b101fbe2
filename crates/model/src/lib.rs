//! Plain-data representations of queries and table blueprints, consumed by
//! the grammars in the `grammar` crate.

pub mod core;
pub mod macros;
pub mod query;
pub mod schema;
