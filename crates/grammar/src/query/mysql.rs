//! MySQL rendition of the query grammar.

use crate::{
    error::GrammarError,
    query::{CompiledQuery, QueryGrammar, UpdateBindings, concatenate},
    wrapper::Wrapper,
};
use lazy_static::lazy_static;
use model::{
    core::{
        expression::{Ident, Operand},
        value::Value,
    },
    query::{Query, Row, UpsertUpdate, clause::DatePart},
};
use std::collections::HashSet;
use tracing::debug;

/// MySQL has no "offset without limit"; the largest unsigned BIGINT stands in.
pub const MAX_LIMIT: u64 = 18446744073709551615;

lazy_static! {
    static ref MYSQL_OPERATORS: HashSet<&'static str> = [
        "=", "<", ">", "<=", ">=", "<>", "!=", "<=>",
        "like", "like binary", "not like",
        "&", "|", "^", "<<", ">>",
        "rlike", "not rlike", "regexp", "not regexp",
        "sounds like",
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Clone)]
pub struct MySqlQueryGrammar {
    wrapper: Wrapper,
}

impl MySqlQueryGrammar {
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            wrapper: Wrapper::backtick(table_prefix),
        }
    }
}

impl Default for MySqlQueryGrammar {
    fn default() -> Self {
        Self::new("")
    }
}

impl QueryGrammar for MySqlQueryGrammar {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn wrapper(&self) -> &Wrapper {
        &self.wrapper
    }

    fn operators(&self) -> &HashSet<&'static str> {
        &MYSQL_OPERATORS
    }

    fn compile_limit(&self, query: &Query) -> String {
        query
            .limit
            .map(|limit| format!("limit {limit}"))
            .unwrap_or_default()
    }

    fn compile_offset(&self, query: &Query) -> String {
        let Some(offset) = query.offset else {
            return String::new();
        };
        if query.limit.is_some() {
            format!("offset {offset}")
        } else {
            format!("limit {MAX_LIMIT} offset {offset}")
        }
    }

    fn shared_lock(&self) -> &'static str {
        "lock in share mode"
    }

    fn wrap_union(&self, sql: &str) -> String {
        format!("({sql})")
    }

    fn compile_date_part(
        &self,
        part: DatePart,
        column: &Ident,
        operator: &str,
        value: &Operand,
        bindings: &mut Vec<Value>,
    ) -> Result<String, GrammarError> {
        let operator = self.compile_operator(operator)?;
        Ok(format!(
            "{}({}) {} {}",
            part.as_str(),
            self.wrapper.wrap(column),
            operator,
            self.wrapper.parameter(value, bindings)
        ))
    }

    fn compile_json_contains(
        &self,
        column: &Ident,
        value: &serde_json::Value,
        not: bool,
        bindings: &mut Vec<Value>,
    ) -> String {
        bindings.push(Value::Json(value.clone()));
        let not = if not { "not " } else { "" };
        format!("{}json_contains({}, ?)", not, self.wrapper.wrap(column))
    }

    fn compile_json_length(
        &self,
        column: &Ident,
        operator: &str,
        value: &Operand,
        bindings: &mut Vec<Value>,
    ) -> Result<String, GrammarError> {
        let operator = self.compile_operator(operator)?;
        Ok(format!(
            "json_length({}) {} {}",
            self.wrapper.wrap(column),
            operator,
            self.wrapper.parameter(value, bindings)
        ))
    }

    fn compile_truncate(&self, query: &Query) -> Result<Vec<CompiledQuery>, GrammarError> {
        let table = self.target_table(query, "truncate")?;
        Ok(vec![CompiledQuery::unbound(format!("truncate table {table}"))])
    }

    fn compile_insert_or_ignore(&self, query: &Query, rows: &[Row]) -> Result<CompiledQuery, GrammarError> {
        let insert = self.compile_insert(query, rows)?;
        let sql = insert.sql.replacen("insert", "insert ignore", 1);
        Ok(CompiledQuery::new(sql, insert.bindings))
    }

    fn compile_upsert(
        &self,
        query: &Query,
        rows: &[Row],
        _unique_by: &[String],
        update: &[UpsertUpdate],
    ) -> Result<CompiledQuery, GrammarError> {
        if rows.first().is_none_or(|row| row.is_empty()) {
            return Err(GrammarError::MissingRows("upsert"));
        }
        // Nothing to update on conflict: a plain insert.
        if update.is_empty() {
            return self.compile_insert(query, rows);
        }

        let CompiledQuery { sql, mut bindings } = self.compile_insert(query, rows)?;

        let mut assignments = Vec::with_capacity(update.len());
        for entry in update {
            let assignment = match entry {
                UpsertUpdate::Inserted(column) => {
                    let column = self.wrapper.wrap_str(column);
                    format!("{column} = values({column})")
                }
                UpsertUpdate::Set { column, value } => format!(
                    "{} = {}",
                    self.wrapper.wrap_str(column),
                    self.wrapper.parameter(value, &mut bindings)
                ),
            };
            assignments.push(assignment);
        }

        let sql = format!("{} on duplicate key update {}", sql, assignments.join(", "));
        debug!(
            dialect = self.name(),
            bindings = bindings.len(),
            "Compiled upsert: {sql}"
        );
        Ok(CompiledQuery::new(sql, bindings))
    }

    /// Joined updates use MySQL's multi-table syntax; single-table updates
    /// may carry `order by` and `limit`.
    fn compile_update(&self, query: &Query, values: &Row) -> Result<CompiledQuery, GrammarError> {
        let table = self.target_table(query, "update")?;

        let mut update_bindings = UpdateBindings::default();
        let joins = self.compile_joins(query, &mut update_bindings.join)?;
        let mut value_bindings = Vec::new();
        let columns = self.compile_update_columns(values, &mut value_bindings);
        let wheres = self.compile_wheres(query, &mut update_bindings.wheres)?;

        let mut parts = vec![format!("update {table}"), joins, format!("set {columns}"), wheres];
        if query.joins.is_empty() {
            parts.push(self.compile_orders(&query.orders));
            parts.push(self.compile_limit(query));
        }

        let sql = concatenate(&parts);
        let bindings = self.prepare_bindings_for_update(update_bindings, value_bindings);
        debug!(
            dialect = self.name(),
            bindings = bindings.len(),
            "Compiled update: {sql}"
        );
        Ok(CompiledQuery::new(sql, bindings))
    }

    fn compile_delete(&self, query: &Query) -> Result<CompiledQuery, GrammarError> {
        let table = self.target_table(query, "delete")?;
        let mut bindings = Vec::new();

        let sql = if query.joins.is_empty() {
            let wheres = self.compile_wheres(query, &mut bindings)?;
            concatenate(&[
                format!("delete from {table}"),
                wheres,
                self.compile_orders(&query.orders),
                self.compile_limit(query),
            ])
        } else {
            // `delete <alias> from <table> <joins>` removes rows of the base table only.
            let alias = query
                .from
                .as_ref()
                .map(|t| self.wrapper.table_alias(t))
                .unwrap_or_default();
            let joins = self.compile_joins(query, &mut bindings)?;
            let wheres = self.compile_wheres(query, &mut bindings)?;
            concatenate(&[format!("delete {alias} from {table}"), joins, wheres])
        };

        debug!(
            dialect = self.name(),
            bindings = bindings.len(),
            "Compiled delete: {sql}"
        );
        Ok(CompiledQuery::new(sql, bindings))
    }
}
