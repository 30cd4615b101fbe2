//! Where and having clause entries.

use crate::{
    core::{
        expression::{Expression, Ident, Operand},
        value::Value,
    },
    query::Query,
};
use serde::{Deserialize, Serialize};

/// The connective that joins a clause to the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boolean {
    #[default]
    And,
    Or,
}

impl Boolean {
    pub fn as_str(&self) -> &'static str {
        match self {
            Boolean::And => "and",
            Boolean::Or => "or",
        }
    }
}

/// Part of a temporal column compared by a date-part predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePart {
    Date,
    Time,
    Day,
    Month,
    Year,
}

impl DatePart {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePart::Date => "date",
            DatePart::Time => "time",
            DatePart::Day => "day",
            DatePart::Month => "month",
            DatePart::Year => "year",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Where {
    #[serde(default)]
    pub boolean: Boolean,
    #[serde(flatten)]
    pub kind: WhereKind,
}

/// Every predicate shape the grammars know how to compile.
///
/// Deserializing an unknown `type` tag fails, so a malformed clause is
/// rejected when the query is built rather than when it is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WhereKind {
    Basic {
        column: Ident,
        operator: String,
        value: Operand,
    },
    Column {
        first: Ident,
        operator: String,
        second: Ident,
    },
    In {
        column: Ident,
        values: Vec<Operand>,
    },
    NotIn {
        column: Ident,
        values: Vec<Operand>,
    },
    InSub {
        column: Ident,
        query: Box<Query>,
    },
    NotInSub {
        column: Ident,
        query: Box<Query>,
    },
    Null {
        column: Ident,
    },
    NotNull {
        column: Ident,
    },
    Between {
        column: Ident,
        values: [Operand; 2],
        #[serde(default)]
        not: bool,
    },
    Exists {
        query: Box<Query>,
    },
    NotExists {
        query: Box<Query>,
    },
    Nested {
        wheres: Vec<Where>,
    },
    Raw {
        sql: Expression,
        #[serde(default)]
        bindings: Vec<Value>,
    },
    DatePart {
        part: DatePart,
        column: Ident,
        operator: String,
        value: Operand,
    },
    JsonContains {
        column: Ident,
        value: serde_json::Value,
        #[serde(default)]
        not: bool,
    },
    JsonLength {
        column: Ident,
        operator: String,
        value: Operand,
    },
}

impl Where {
    pub fn and(kind: WhereKind) -> Self {
        Self {
            boolean: Boolean::And,
            kind,
        }
    }

    pub fn or(kind: WhereKind) -> Self {
        Self {
            boolean: Boolean::Or,
            kind,
        }
    }

    pub fn basic(column: impl Into<Ident>, operator: &str, value: impl Into<Operand>) -> Self {
        Self::and(WhereKind::Basic {
            column: column.into(),
            operator: operator.to_string(),
            value: value.into(),
        })
    }

    pub fn column(first: impl Into<Ident>, operator: &str, second: impl Into<Ident>) -> Self {
        Self::and(WhereKind::Column {
            first: first.into(),
            operator: operator.to_string(),
            second: second.into(),
        })
    }

    pub fn raw(sql: &str, bindings: Vec<Value>) -> Self {
        Self::and(WhereKind::Raw {
            sql: Expression::new(sql),
            bindings,
        })
    }

    /// Switches the connective to `or`.
    pub fn or_else(mut self) -> Self {
        self.boolean = Boolean::Or;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Having {
    #[serde(default)]
    pub boolean: Boolean,
    #[serde(flatten)]
    pub kind: HavingKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HavingKind {
    Basic {
        column: Ident,
        operator: String,
        value: Operand,
    },
    Raw {
        sql: Expression,
        #[serde(default)]
        bindings: Vec<Value>,
    },
}

impl Having {
    pub fn basic(column: impl Into<Ident>, operator: &str, value: impl Into<Operand>) -> Self {
        Self {
            boolean: Boolean::And,
            kind: HavingKind::Basic {
                column: column.into(),
                operator: operator.to_string(),
                value: value.into(),
            },
        }
    }

    pub fn raw(sql: &str, bindings: Vec<Value>) -> Self {
        Self {
            boolean: Boolean::And,
            kind: HavingKind::Raw {
                sql: Expression::new(sql),
                bindings,
            },
        }
    }

    pub fn or_else(mut self) -> Self {
        self.boolean = Boolean::Or;
        self
    }
}
