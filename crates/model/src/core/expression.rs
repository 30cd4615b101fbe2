//! Identifier and operand types shared by queries and blueprints.
//!
//! `Expression` is the only way to put untyped SQL text into a statement.
//! Everything else is either a quoted identifier or a bound parameter.

use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trusted raw SQL. Emitted verbatim, never quoted and never parameterized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expression {
    raw: String,
}

impl Expression {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { raw: sql.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A table or column reference.
///
/// `Name` may be dotted (`orders.id`) and may carry an alias (`orders as o`);
/// the grammar quotes every part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ident {
    Name(String),
    Raw(Expression),
}

impl Ident {
    pub fn raw(sql: impl Into<String>) -> Self {
        Ident::Raw(Expression::new(sql))
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::Name(name.to_string())
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Ident::Name(name)
    }
}

impl From<Expression> for Ident {
    fn from(expr: Expression) -> Self {
        Ident::Raw(expr)
    }
}

/// The right-hand side of a predicate, an assignment or a column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Raw(Expression),
    Value(Value),
}

impl Operand {
    pub fn raw(sql: impl Into<String>) -> Self {
        Operand::Raw(Expression::new(sql))
    }
}

impl From<Expression> for Operand {
    fn from(expr: Expression) -> Self {
        Operand::Raw(expr)
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Value(value.into())
                }
            }
        )*
    };
}

operand_from_value!(Value, i64, i32, u64, f64, bool, &str, String, serde_json::Value);
