//! Compiles a structured `Query` into SQL text plus ordered bindings.
//!
//! `QueryGrammar` carries the shared clause-compilation algorithm as default
//! methods; each dialect supplies quoting, its operator whitelist and the
//! pieces whose syntax is not portable (limit/offset, locks, joined
//! update/delete, date-part and JSON predicates, upserts).

use crate::{error::GrammarError, wrapper::Wrapper};
use model::{
    core::{
        expression::{Ident, Operand},
        value::Value,
    },
    query::{
        Lock, Order, Query, Row, Union, UpsertUpdate,
        clause::{Boolean, DatePart, Having, HavingKind, Where, WhereKind},
    },
};
use std::collections::HashSet;
use tracing::debug;

pub mod mysql;
pub mod postgres;

/// SQL text and the values for its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl CompiledQuery {
    pub fn new(sql: String, bindings: Vec<Value>) -> Self {
        Self { sql, bindings }
    }

    /// A statement that binds nothing.
    pub fn unbound(sql: String) -> Self {
        Self {
            sql,
            bindings: Vec::new(),
        }
    }
}

/// Bindings produced by the clauses of an update, kept apart so the dialect
/// can order them after the `set` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBindings {
    pub join: Vec<Value>,
    pub wheres: Vec<Value>,
}

pub trait QueryGrammar: Send + Sync {
    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> &'static str;

    fn wrapper(&self) -> &Wrapper;

    /// The only comparison operators accepted from callers.
    fn operators(&self) -> &HashSet<&'static str>;

    fn compile_limit(&self, query: &Query) -> String;

    fn compile_offset(&self, query: &Query) -> String;

    fn shared_lock(&self) -> &'static str;

    fn compile_date_part(
        &self,
        part: DatePart,
        column: &Ident,
        operator: &str,
        value: &Operand,
        bindings: &mut Vec<Value>,
    ) -> Result<String, GrammarError>;

    fn compile_json_contains(
        &self,
        column: &Ident,
        value: &serde_json::Value,
        not: bool,
        bindings: &mut Vec<Value>,
    ) -> String;

    fn compile_json_length(
        &self,
        column: &Ident,
        operator: &str,
        value: &Operand,
        bindings: &mut Vec<Value>,
    ) -> Result<String, GrammarError>;

    fn compile_truncate(&self, query: &Query) -> Result<Vec<CompiledQuery>, GrammarError>;

    /// Orders the bindings of an update to match its placeholders.
    fn prepare_bindings_for_update(&self, bindings: UpdateBindings, values: Vec<Value>) -> Vec<Value> {
        let mut prepared = bindings.join;
        prepared.extend(values);
        prepared.extend(bindings.wheres);
        prepared
    }

    fn compile_select(&self, query: &Query) -> Result<CompiledQuery, GrammarError> {
        let mut bindings = Vec::new();
        let sql = self.compile_select_sql(query, &mut bindings)?;
        debug!(
            dialect = self.name(),
            bindings = bindings.len(),
            "Compiled select: {sql}"
        );
        Ok(CompiledQuery::new(sql, bindings))
    }

    /// Compiles a select into `sql`, appending its bindings. Nested selects
    /// (sub-queries, unions, exists) go through here.
    fn compile_select_sql(&self, query: &Query, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        if !query.unions.is_empty() && query.aggregate.is_some() {
            return self.compile_union_aggregate(query, bindings);
        }

        let mut sql = self.compile_components(query, bindings)?;
        if !query.unions.is_empty() {
            sql = format!(
                "{} {}",
                self.wrap_union(&sql),
                self.compile_unions(query, bindings)?
            );
        }
        Ok(sql)
    }

    /// Compiles the fixed component sequence and joins the non-empty parts.
    fn compile_components(&self, query: &Query, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        let components = [
            self.compile_aggregate(query),
            self.compile_columns(query),
            self.compile_from(query),
            self.compile_joins(query, bindings)?,
            self.compile_wheres(query, bindings)?,
            self.compile_groups(query),
            self.compile_havings(query, bindings)?,
            self.compile_orders(&query.orders),
            query.limit.map(|_| self.compile_limit(query)).unwrap_or_default(),
            query.offset.map(|_| self.compile_offset(query)).unwrap_or_default(),
            self.compile_lock(query),
        ];
        Ok(concatenate(&components))
    }

    fn compile_aggregate(&self, query: &Query) -> String {
        let Some(aggregate) = &query.aggregate else {
            return String::new();
        };
        let mut column = self.wrapper().columnize(&aggregate.columns);
        if column.is_empty() {
            column = "*".to_string();
        }
        if query.distinct && column != "*" {
            column = format!("distinct {column}");
        }
        format!(
            "select {}({}) as aggregate",
            aggregate.function.as_str(),
            column
        )
    }

    fn compile_columns(&self, query: &Query) -> String {
        // The aggregate, when present, already is the select list.
        if query.aggregate.is_some() {
            return String::new();
        }
        let select = if query.distinct { "select distinct" } else { "select" };
        match &query.columns {
            Some(columns) if !columns.is_empty() => {
                format!("{} {}", select, self.wrapper().columnize(columns))
            }
            _ => format!("{select} *"),
        }
    }

    fn compile_from(&self, query: &Query) -> String {
        query
            .from
            .as_ref()
            .map(|table| format!("from {}", self.wrapper().wrap_table(table)))
            .unwrap_or_default()
    }

    fn compile_joins(&self, query: &Query, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        let mut joins = Vec::with_capacity(query.joins.len());
        for join in &query.joins {
            let on = self.compile_where_list(&join.wheres, "on", bindings)?;
            let sql = format!(
                "{} join {} {}",
                join.kind.as_str(),
                self.wrapper().wrap_table(&join.table),
                on
            );
            joins.push(sql.trim_end().to_string());
        }
        Ok(joins.join(" "))
    }

    fn compile_wheres(&self, query: &Query, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        self.compile_where_list(&query.wheres, "where", bindings)
    }

    /// `<keyword> <conditions>`, or an empty string when there are none.
    fn compile_where_list(
        &self,
        wheres: &[Where],
        keyword: &str,
        bindings: &mut Vec<Value>,
    ) -> Result<String, GrammarError> {
        let conditions = self.compile_conditions(wheres, bindings)?;
        if conditions.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{keyword} {conditions}"))
    }

    /// Compiles the clauses and joins them with their connectives. The first
    /// clause's connective is dropped.
    fn compile_conditions(&self, wheres: &[Where], bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        Ok(join_conditions(self.compile_condition_parts(wheres, bindings)?))
    }

    /// Each non-empty clause paired with its connective, in order.
    fn compile_condition_parts(
        &self,
        wheres: &[Where],
        bindings: &mut Vec<Value>,
    ) -> Result<Vec<(Boolean, String)>, GrammarError> {
        let mut parts = Vec::with_capacity(wheres.len());
        for clause in wheres {
            let sql = self.compile_where(clause, bindings)?;
            if !sql.is_empty() {
                parts.push((clause.boolean, sql));
            }
        }
        Ok(parts)
    }

    fn compile_where(&self, clause: &Where, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        let w = self.wrapper();
        let sql = match &clause.kind {
            WhereKind::Basic {
                column,
                operator,
                value,
            } => {
                let operator = self.compile_operator(operator)?;
                format!("{} {} {}", w.wrap(column), operator, w.parameter(value, bindings))
            }
            WhereKind::Column {
                first,
                operator,
                second,
            } => {
                let operator = self.compile_operator(operator)?;
                format!("{} {} {}", w.wrap(first), operator, w.wrap(second))
            }
            WhereKind::In { column, values } => {
                if values.is_empty() {
                    "0 = 1".to_string()
                } else {
                    format!("{} in ({})", w.wrap(column), w.parameterize(values, bindings))
                }
            }
            WhereKind::NotIn { column, values } => {
                if values.is_empty() {
                    "1 = 1".to_string()
                } else {
                    format!(
                        "{} not in ({})",
                        w.wrap(column),
                        w.parameterize(values, bindings)
                    )
                }
            }
            WhereKind::InSub { column, query } => format!(
                "{} in ({})",
                w.wrap(column),
                self.compile_select_sql(query, bindings)?
            ),
            WhereKind::NotInSub { column, query } => format!(
                "{} not in ({})",
                w.wrap(column),
                self.compile_select_sql(query, bindings)?
            ),
            WhereKind::Null { column } => format!("{} is null", w.wrap(column)),
            WhereKind::NotNull { column } => format!("{} is not null", w.wrap(column)),
            WhereKind::Between { column, values, not } => {
                let between = if *not { "not between" } else { "between" };
                let [low, high] = values;
                format!(
                    "{} {} {} and {}",
                    w.wrap(column),
                    between,
                    w.parameter(low, bindings),
                    w.parameter(high, bindings)
                )
            }
            WhereKind::Exists { query } => {
                format!("exists ({})", self.compile_select_sql(query, bindings)?)
            }
            WhereKind::NotExists { query } => {
                format!("not exists ({})", self.compile_select_sql(query, bindings)?)
            }
            WhereKind::Nested { wheres } => {
                let conditions = self.compile_conditions(wheres, bindings)?;
                if conditions.is_empty() {
                    String::new()
                } else {
                    format!("({conditions})")
                }
            }
            // Trusted as-is: the caller vouches for raw fragments.
            WhereKind::Raw {
                sql,
                bindings: raw_bindings,
            } => {
                bindings.extend(raw_bindings.iter().cloned());
                sql.as_str().to_string()
            }
            WhereKind::DatePart {
                part,
                column,
                operator,
                value,
            } => self.compile_date_part(*part, column, operator, value, bindings)?,
            WhereKind::JsonContains { column, value, not } => {
                self.compile_json_contains(column, value, *not, bindings)
            }
            WhereKind::JsonLength {
                column,
                operator,
                value,
            } => self.compile_json_length(column, operator, value, bindings)?,
        };
        Ok(sql)
    }

    /// Checks `operator` against the whitelist. A `?` inside an operator is
    /// doubled so it cannot be mistaken for a placeholder.
    fn compile_operator(&self, operator: &str) -> Result<String, GrammarError> {
        let normalized = operator.trim().to_lowercase();
        if !self.operators().contains(normalized.as_str()) {
            return Err(GrammarError::InvalidOperator {
                dialect: self.name(),
                operator: operator.to_string(),
            });
        }
        Ok(normalized.replace('?', "??"))
    }

    fn compile_groups(&self, query: &Query) -> String {
        if query.groups.is_empty() {
            return String::new();
        }
        format!("group by {}", self.wrapper().columnize(&query.groups))
    }

    fn compile_havings(&self, query: &Query, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        if query.havings.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(query.havings.len());
        for having in &query.havings {
            parts.push((having.boolean, self.compile_having(having, bindings)?));
        }
        Ok(format!("having {}", join_conditions(parts)))
    }

    fn compile_having(&self, having: &Having, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        let w = self.wrapper();
        Ok(match &having.kind {
            HavingKind::Basic {
                column,
                operator,
                value,
            } => {
                let operator = self.compile_operator(operator)?;
                format!("{} {} {}", w.wrap(column), operator, w.parameter(value, bindings))
            }
            HavingKind::Raw {
                sql,
                bindings: raw_bindings,
            } => {
                bindings.extend(raw_bindings.iter().cloned());
                sql.as_str().to_string()
            }
        })
    }

    fn compile_orders(&self, orders: &[Order]) -> String {
        if orders.is_empty() {
            return String::new();
        }
        let orders = orders
            .iter()
            .map(|o| format!("{} {}", self.wrapper().wrap(&o.column), o.direction.as_str()))
            .collect::<Vec<_>>();
        format!("order by {}", orders.join(", "))
    }

    fn compile_lock(&self, query: &Query) -> String {
        match &query.lock {
            None => String::new(),
            Some(Lock::Exclusive) => "for update".to_string(),
            Some(Lock::Shared) => self.shared_lock().to_string(),
            Some(Lock::Raw(expr)) => expr.as_str().to_string(),
        }
    }

    fn compile_unions(&self, query: &Query, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        let mut parts = Vec::with_capacity(query.unions.len() + 3);
        for union in &query.unions {
            parts.push(self.compile_union(union, bindings)?);
        }
        parts.push(self.compile_orders(&query.union_orders));

        // The union bounds follow the same dialect rules as a plain select.
        let bounds = Query {
            limit: query.union_limit,
            offset: query.union_offset,
            ..Default::default()
        };
        parts.push(self.compile_limit(&bounds));
        parts.push(self.compile_offset(&bounds));
        Ok(concatenate(&parts))
    }

    fn compile_union(&self, union: &Union, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        let conjunction = if union.all { "union all" } else { "union" };
        let sql = self.compile_select_sql(&union.query, bindings)?;
        Ok(format!("{} {}", conjunction, self.wrap_union(&sql)))
    }

    fn wrap_union(&self, sql: &str) -> String {
        sql.to_string()
    }

    /// Aggregates over the union as a whole by selecting from it.
    fn compile_union_aggregate(&self, query: &Query, bindings: &mut Vec<Value>) -> Result<String, GrammarError> {
        let aggregate = self.compile_aggregate(query);
        let mut inner = query.clone();
        inner.aggregate = None;
        Ok(format!(
            "{} from ({}) as {}",
            aggregate,
            self.compile_select_sql(&inner, bindings)?,
            self.wrapper().wrap_table_str("temp_table")
        ))
    }

    fn compile_exists(&self, query: &Query) -> Result<CompiledQuery, GrammarError> {
        let mut bindings = Vec::new();
        let select = self.compile_select_sql(query, &mut bindings)?;
        let sql = format!(
            "select exists({}) as {}",
            select,
            self.wrapper().wrap_value("exists")
        );
        Ok(CompiledQuery::new(sql, bindings))
    }

    /// Multi-row insert. Columns come from the first row; the other rows are
    /// expected to carry the same keys.
    fn compile_insert(&self, query: &Query, rows: &[Row]) -> Result<CompiledQuery, GrammarError> {
        let table = self.target_table(query, "insert")?;
        let mut bindings = Vec::new();

        let sql = match rows.first() {
            None => format!("insert into {table} default values"),
            Some(first) if first.is_empty() => format!("insert into {table} default values"),
            Some(first) => {
                let columns = first
                    .keys()
                    .map(|c| self.wrapper().wrap_str(c))
                    .collect::<Vec<_>>()
                    .join(", ");
                let parameters = rows
                    .iter()
                    .map(|row| format!("({})", self.wrapper().parameterize(row.values(), &mut bindings)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("insert into {table} ({columns}) values {parameters}")
            }
        };

        debug!(
            dialect = self.name(),
            rows = rows.len(),
            bindings = bindings.len(),
            "Compiled insert: {sql}"
        );
        Ok(CompiledQuery::new(sql, bindings))
    }

    /// `insert into <table> (<columns>) <select>`.
    fn compile_insert_using(
        &self,
        query: &Query,
        columns: &[Ident],
        source: &Query,
    ) -> Result<CompiledQuery, GrammarError> {
        let table = self.target_table(query, "insert")?;
        let mut bindings = Vec::new();
        let select = self.compile_select_sql(source, &mut bindings)?;
        let sql = format!(
            "insert into {} ({}) {}",
            table,
            self.wrapper().columnize(columns),
            select
        );
        Ok(CompiledQuery::new(sql, bindings))
    }

    fn compile_insert_or_ignore(&self, _query: &Query, _rows: &[Row]) -> Result<CompiledQuery, GrammarError> {
        Err(GrammarError::Unsupported {
            dialect: self.name(),
            feature: "insert or ignore",
        })
    }

    /// An insert whose generated key the caller wants back. `sequence` names
    /// the key column.
    fn compile_insert_get_id(
        &self,
        query: &Query,
        row: &Row,
        _sequence: Option<&str>,
    ) -> Result<CompiledQuery, GrammarError> {
        self.compile_insert(query, std::slice::from_ref(row))
    }

    fn compile_upsert(
        &self,
        _query: &Query,
        _rows: &[Row],
        _unique_by: &[String],
        _update: &[UpsertUpdate],
    ) -> Result<CompiledQuery, GrammarError> {
        Err(GrammarError::Unsupported {
            dialect: self.name(),
            feature: "upsert",
        })
    }

    fn compile_update(&self, query: &Query, values: &Row) -> Result<CompiledQuery, GrammarError> {
        let table = self.target_table(query, "update")?;

        let mut update_bindings = UpdateBindings::default();
        let joins = self.compile_joins(query, &mut update_bindings.join)?;
        let mut value_bindings = Vec::new();
        let columns = self.compile_update_columns(values, &mut value_bindings);
        let wheres = self.compile_wheres(query, &mut update_bindings.wheres)?;

        let sql = concatenate(&[
            format!("update {table}"),
            joins,
            format!("set {columns}"),
            wheres,
        ]);
        let bindings = self.prepare_bindings_for_update(update_bindings, value_bindings);
        debug!(
            dialect = self.name(),
            bindings = bindings.len(),
            "Compiled update: {sql}"
        );
        Ok(CompiledQuery::new(sql, bindings))
    }

    fn compile_update_columns(&self, values: &Row, bindings: &mut Vec<Value>) -> String {
        values
            .iter()
            .map(|(column, value)| {
                format!(
                    "{} = {}",
                    self.wrapper().wrap_str(column),
                    self.wrapper().parameter(value, bindings)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn compile_delete(&self, query: &Query) -> Result<CompiledQuery, GrammarError> {
        let table = self.target_table(query, "delete")?;
        let mut bindings = Vec::new();
        let wheres = self.compile_wheres(query, &mut bindings)?;
        let sql = concatenate(&[format!("delete from {table}"), wheres]);
        debug!(
            dialect = self.name(),
            bindings = bindings.len(),
            "Compiled delete: {sql}"
        );
        Ok(CompiledQuery::new(sql, bindings))
    }

    /// The wrapped `from` table of a statement that requires one.
    fn target_table(&self, query: &Query, statement: &'static str) -> Result<String, GrammarError> {
        query
            .from
            .as_ref()
            .map(|table| self.wrapper().wrap_table(table))
            .ok_or(GrammarError::MissingTable(statement))
    }
}

/// Joins the non-empty fragments with single spaces.
pub fn concatenate(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins conditions with their connectives, leaving out the connective of
/// the first one.
pub fn join_conditions(parts: Vec<(Boolean, String)>) -> String {
    let mut sql = String::new();
    for (i, (boolean, condition)) in parts.into_iter().enumerate() {
        if i > 0 {
            sql.push(' ');
            sql.push_str(boolean.as_str());
            sql.push(' ');
        }
        sql.push_str(&condition);
    }
    sql
}
