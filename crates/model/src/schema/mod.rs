//! The structured description of a table that the schema grammars compile.

pub mod blueprint;
pub mod column;
