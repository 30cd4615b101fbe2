//! The structured description of a query that the grammars compile.

use crate::core::expression::{Ident, Operand};
use clause::{Having, Where, WhereKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod clause;

/// Column/value pairs of an inserted row or of an update's `set` list.
/// Keys iterate in sorted order, so rows with the same keys line up.
pub type Row = BTreeMap<String, Operand>;

/// One entry of an upsert's update list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpsertUpdate {
    /// Reuse the value the insert would have written.
    Inserted(String),
    Set { column: String, value: Operand },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Selected columns; `None` selects `*`.
    pub columns: Option<Vec<Ident>>,
    pub distinct: bool,
    pub aggregate: Option<Aggregate>,
    pub from: Option<Ident>,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub groups: Vec<Ident>,
    pub havings: Vec<Having>,
    pub orders: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub lock: Option<Lock>,
    pub unions: Vec<Union>,
    pub union_orders: Vec<Order>,
    pub union_limit: Option<u64>,
    pub union_offset: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub columns: Vec<Ident>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Cross => "cross",
        }
    }
}

/// A joined table with its own private predicate list (`on ...`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    #[serde(default)]
    pub kind: JoinKind,
    pub table: Ident,
    #[serde(default)]
    pub wheres: Vec<Where>,
}

impl Join {
    pub fn new(kind: JoinKind, table: impl Into<Ident>) -> Self {
        Self {
            kind,
            table: table.into(),
            wheres: Vec::new(),
        }
    }

    /// Adds an `on first <op> second` column comparison.
    pub fn on(mut self, first: impl Into<Ident>, operator: &str, second: impl Into<Ident>) -> Self {
        self.wheres.push(Where::column(first, operator, second));
        self
    }

    pub fn or_on(mut self, first: impl Into<Ident>, operator: &str, second: impl Into<Ident>) -> Self {
        self.wheres
            .push(Where::column(first, operator, second).or_else());
        self
    }

    /// Adds an arbitrary predicate to the join condition.
    pub fn where_clause(mut self, clause: Where) -> Self {
        self.wheres.push(clause);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDir {
    #[default]
    Asc,
    Desc,
}

impl OrderDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDir::Asc => "asc",
            OrderDir::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub column: Ident,
    #[serde(default)]
    pub direction: OrderDir,
}

/// Row locking requested for a select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lock {
    /// `for update`
    Exclusive,
    /// The dialect's shared lock.
    Shared,
    Raw(crate::core::expression::Expression),
}

impl From<bool> for Lock {
    fn from(exclusive: bool) -> Self {
        if exclusive { Lock::Exclusive } else { Lock::Shared }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Union {
    pub query: Box<Query>,
    #[serde(default)]
    pub all: bool,
}

impl Query {
    pub fn table(table: impl Into<Ident>) -> Self {
        Self {
            from: Some(table.into()),
            ..Default::default()
        }
    }

    pub fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn aggregate<I, C>(mut self, function: AggregateFunction, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        self.aggregate = Some(Aggregate {
            function,
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn where_clause(mut self, clause: Where) -> Self {
        self.wheres.push(clause);
        self
    }

    pub fn where_kind(self, kind: WhereKind) -> Self {
        self.where_clause(Where::and(kind))
    }

    pub fn group_by(mut self, column: impl Into<Ident>) -> Self {
        self.groups.push(column.into());
        self
    }

    pub fn having(mut self, clause: Having) -> Self {
        self.havings.push(clause);
        self
    }

    pub fn order_by(mut self, column: impl Into<Ident>, direction: OrderDir) -> Self {
        self.orders.push(Order {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn lock(mut self, lock: impl Into<Lock>) -> Self {
        self.lock = Some(lock.into());
        self
    }

    pub fn union(mut self, query: Query, all: bool) -> Self {
        self.unions.push(Union {
            query: Box::new(query),
            all,
        });
        self
    }
}
