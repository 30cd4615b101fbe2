use crate::{
    error::GrammarError,
    query::{CompiledQuery, QueryGrammar, UpdateBindings, concatenate, join_conditions},
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
use tracing::{debug, warn};

lazy_static! {
    static ref POSTGRES_OPERATORS: HashSet<&'static str> = [
        "=", "<", ">", "<=", ">=", "<>", "!=",
        "like", "not like", "between", "ilike", "not ilike",
        "~", "&", "|", "#", "<<", ">>", "<<=", ">>=",
        "&&", "@>", "<@", "?", "?|", "?&", "||", "-", "@?", "@@", "#-",
        "is distinct from", "is not distinct from",
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Clone)]
pub struct PostgresQueryGrammar {
    wrapper: Wrapper,
}

impl PostgresQueryGrammar {
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            wrapper: Wrapper::double_quote(table_prefix),
        }
    }

    /// `from`/`using` list of a joined update or delete.
    fn compile_join_tables(&self, query: &Query) -> String {
        query
            .joins
            .iter()
            .map(|join| self.wrapper.wrap_table(&join.table))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The trailing `where` of a joined update or delete: the base predicates
    /// followed by every join predicate. Join predicates keep their
    /// connectives unless they open the list.
    fn compile_join_wheres(
        &self,
        query: &Query,
        base: &mut Vec<Value>,
        join: &mut Vec<Value>,
    ) -> Result<String, GrammarError> {
        let mut parts = self.compile_condition_parts(&query.wheres, base)?;
        for j in &query.joins {
            parts.extend(self.compile_condition_parts(&j.wheres, join)?);
        }
        let conditions = join_conditions(parts);

        if conditions.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("where {conditions}"))
        }
    }
}

impl Default for PostgresQueryGrammar {
    fn default() -> Self {
        Self::new("")
    }
}

impl QueryGrammar for PostgresQueryGrammar {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn wrapper(&self) -> &Wrapper {
        &self.wrapper
    }

    fn operators(&self) -> &HashSet<&'static str> {
        &POSTGRES_OPERATORS
    }

    fn compile_limit(&self, query: &Query) -> String {
        query
            .limit
            .map(|limit| format!("limit {limit}"))
            .unwrap_or_default()
    }

    fn compile_offset(&self, query: &Query) -> String {
        query
            .offset
            .map(|offset| format!("offset {offset}"))
            .unwrap_or_default()
    }

    fn shared_lock(&self) -> &'static str {
        "for share"
    }

    /// Update bindings follow the textual order `set`, base `where`, then the
    /// join predicates folded in after it.
    fn prepare_bindings_for_update(&self, bindings: UpdateBindings, values: Vec<Value>) -> Vec<Value> {
        let mut prepared = values;
        prepared.extend(bindings.wheres);
        prepared.extend(bindings.join);
        prepared
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
        let column = self.wrapper.wrap(column);
        let lhs = match part {
            DatePart::Date => format!("{column}::date"),
            DatePart::Time => format!("{column}::time"),
            DatePart::Day | DatePart::Month | DatePart::Year => {
                format!("extract({} from {})", part.as_str(), column)
            }
        };
        Ok(format!(
            "{} {} {}",
            lhs,
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
        format!("{}({})::jsonb @> ?", not, self.wrapper.wrap(column))
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
            "jsonb_array_length(({})::jsonb) {} {}",
            self.wrapper.wrap(column),
            operator,
            self.wrapper.parameter(value, bindings)
        ))
    }

    fn compile_truncate(&self, query: &Query) -> Result<Vec<CompiledQuery>, GrammarError> {
        let table = self.target_table(query, "truncate")?;
        Ok(vec![CompiledQuery::unbound(format!(
            "truncate {table} restart identity"
        ))])
    }

    fn compile_insert_or_ignore(&self, query: &Query, rows: &[Row]) -> Result<CompiledQuery, GrammarError> {
        let insert = self.compile_insert(query, rows)?;
        Ok(CompiledQuery::new(
            format!("{} on conflict do nothing", insert.sql),
            insert.bindings,
        ))
    }

    fn compile_insert_get_id(
        &self,
        query: &Query,
        row: &Row,
        sequence: Option<&str>,
    ) -> Result<CompiledQuery, GrammarError> {
        let insert = self.compile_insert(query, std::slice::from_ref(row))?;
        let sql = format!(
            "{} returning {}",
            insert.sql,
            self.wrapper.wrap_str(sequence.unwrap_or("id"))
        );
        Ok(CompiledQuery::new(sql, insert.bindings))
    }

    fn compile_upsert(
        &self,
        query: &Query,
        _rows: &[Row],
        _unique_by: &[String],
        _update: &[UpsertUpdate],
    ) -> Result<CompiledQuery, GrammarError> {
        warn!(
            dialect = self.name(),
            table = ?query.from,
            "Upsert requested but has no PostgreSQL rendition"
        );
        Err(GrammarError::Unsupported {
            dialect: self.name(),
            feature: "upsert",
        })
    }

    fn compile_update(&self, query: &Query, values: &Row) -> Result<CompiledQuery, GrammarError> {
        let table = self.target_table(query, "update")?;

        let mut update_bindings = UpdateBindings::default();
        let mut value_bindings = Vec::new();
        let columns = self.compile_update_columns(values, &mut value_bindings);

        let sql = if query.joins.is_empty() {
            let wheres = self.compile_wheres(query, &mut update_bindings.wheres)?;
            concatenate(&[format!("update {table}"), format!("set {columns}"), wheres])
        } else {
            let from = self.compile_join_tables(query);
            let wheres = self.compile_join_wheres(
                query,
                &mut update_bindings.wheres,
                &mut update_bindings.join,
            )?;
            concatenate(&[
                format!("update {table}"),
                format!("set {columns}"),
                format!("from {from}"),
                wheres,
            ])
        };

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
            concatenate(&[format!("delete from {table}"), wheres])
        } else {
            let using = self.compile_join_tables(query);
            let mut join_bindings = Vec::new();
            let wheres = self.compile_join_wheres(query, &mut bindings, &mut join_bindings)?;
            bindings.extend(join_bindings);
            concatenate(&[format!("delete from {table}"), format!("using {using}"), wheres])
        };

        debug!(
            dialect = self.name(),
            bindings = bindings.len(),
            "Compiled delete: {sql}"
        );
        Ok(CompiledQuery::new(sql, bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::PostgresQueryGrammar;
    use crate::{error::GrammarError, query::QueryGrammar};
    use model::{
        core::{expression::Operand, value::Value},
        query::{
            AggregateFunction, Join, JoinKind, Query, Row, UpsertUpdate,
            clause::{DatePart, Where, WhereKind},
        },
    };
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Operand::Value(v.clone())))
            .collect()
    }

    fn orders_join() -> Join {
        Join::new(JoinKind::Inner, "orders")
            .on("users.id", "=", "orders.user_id")
            .where_clause(Where::basic("orders.total", ">", 50))
    }

    #[test]
    fn test_select_quotes_and_limits() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("orders")
            .select(["id", "o.total as t"])
            .where_clause(Where::basic("status", "=", "paid"))
            .offset(20)
            .lock(false);

        let compiled = grammar.compile_select(&query).unwrap();
        assert_eq!(
            compiled.sql,
            r#"select "id", "o"."total" as "t" from "orders" where "status" = ? offset 20 for share"#
        );
        assert_eq!(compiled.bindings, vec![Value::String("paid".to_string())]);
    }

    #[test]
    fn test_question_mark_operators_are_escaped() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("docs")
            .where_clause(Where::basic("tags", "?", "rust"))
            .where_clause(Where::basic("tags", "?|", json!(["a", "b"])).or_else());

        let compiled = grammar.compile_select(&query).unwrap();
        assert_eq!(
            compiled.sql,
            r#"select * from "docs" where "tags" ?? ? or "tags" ??| ?"#
        );
        assert_eq!(compiled.bindings.len(), 2);
    }

    #[test]
    fn test_mysql_only_operator_is_rejected() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("users").where_clause(Where::basic("name", "sounds like", "x"));
        let err = grammar.compile_select(&query).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidOperator { dialect: "PostgreSQL", .. }));
    }

    #[test]
    fn test_date_part_predicates() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("events")
            .where_kind(WhereKind::DatePart {
                part: DatePart::Time,
                column: "at".into(),
                operator: ">=".to_string(),
                value: "09:00".into(),
            })
            .where_kind(WhereKind::DatePart {
                part: DatePart::Month,
                column: "at".into(),
                operator: "=".to_string(),
                value: 12.into(),
            });

        assert_eq!(
            grammar.compile_select(&query).unwrap().sql,
            r#"select * from "events" where "at"::time >= ? and extract(month from "at") = ?"#
        );
    }

    #[test]
    fn test_json_predicates() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("users")
            .where_kind(WhereKind::JsonContains {
                column: "options".into(),
                value: json!({"lang": "en"}),
                not: false,
            })
            .where_kind(WhereKind::JsonLength {
                column: "roles".into(),
                operator: "=".to_string(),
                value: 0.into(),
            });

        let compiled = grammar.compile_select(&query).unwrap();
        assert_eq!(
            compiled.sql,
            r#"select * from "users" where ("options")::jsonb @> ? and jsonb_array_length(("roles")::jsonb) = ?"#
        );
        assert_eq!(
            compiled.bindings,
            vec![Value::Json(json!({"lang": "en"})), Value::Int(0)]
        );
    }

    #[test]
    fn test_unions_are_bare_and_aggregate_wraps() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("users").union(Query::table("admins"), false);
        assert_eq!(
            grammar.compile_select(&query).unwrap().sql,
            r#"select * from "users" union select * from "admins""#
        );

        let mut bounded = query.clone();
        bounded.union_offset = Some(5);
        assert_eq!(
            grammar.compile_select(&bounded).unwrap().sql,
            r#"select * from "users" union select * from "admins" offset 5"#
        );

        let counted = query.aggregate(AggregateFunction::Count, Vec::<&str>::new());
        assert_eq!(
            grammar.compile_select(&counted).unwrap().sql,
            r#"select count(*) as aggregate from (select * from "users" union select * from "admins") as "temp_table""#
        );
    }

    #[test]
    fn test_insert_or_ignore_and_get_id() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("users");
        let values = row(&[("email", "a@x.io".into())]);

        let ignored = grammar.compile_insert_or_ignore(&query, &[values.clone()]).unwrap();
        assert_eq!(
            ignored.sql,
            r#"insert into "users" ("email") values (?) on conflict do nothing"#
        );

        let returning = grammar.compile_insert_get_id(&query, &values, None).unwrap();
        assert_eq!(
            returning.sql,
            r#"insert into "users" ("email") values (?) returning "id""#
        );
        let returning = grammar
            .compile_insert_get_id(&query, &values, Some("user_id"))
            .unwrap();
        assert!(returning.sql.ends_with(r#"returning "user_id""#));
    }

    #[test]
    fn test_upsert_is_unsupported() {
        let grammar = PostgresQueryGrammar::default();
        let result = grammar.compile_upsert(
            &Query::table("users"),
            &[row(&[("id", 1.into())])],
            &["id".to_string()],
            &[UpsertUpdate::Inserted("id".to_string())],
        );
        assert!(matches!(
            result,
            Err(GrammarError::Unsupported {
                feature: "upsert",
                ..
            })
        ));
    }

    #[test]
    fn test_update_with_join_and_empty_base_wheres() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("users").join(orders_join());
        let values = row(&[("tier", "gold".into())]);

        let compiled = grammar.compile_update(&query, &values).unwrap();
        assert_eq!(
            compiled.sql,
            r#"update "users" set "tier" = ? from "orders" where "users"."id" = "orders"."user_id" and "orders"."total" > ?"#
        );
        assert_eq!(
            compiled.bindings,
            vec![Value::String("gold".to_string()), Value::Int(50)]
        );
    }

    #[test]
    fn test_update_with_join_keeps_base_wheres_first() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("users")
            .join(orders_join())
            .where_clause(Where::basic("users.active", "=", true));
        let values = row(&[("tier", "gold".into())]);

        let compiled = grammar.compile_update(&query, &values).unwrap();
        assert_eq!(
            compiled.sql,
            r#"update "users" set "tier" = ? from "orders" where "users"."active" = ? and "users"."id" = "orders"."user_id" and "orders"."total" > ?"#
        );
        assert_eq!(
            compiled.bindings,
            vec![
                Value::String("gold".to_string()),
                Value::Boolean(true),
                Value::Int(50)
            ]
        );
    }

    #[test]
    fn test_update_without_join() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("users").where_clause(Where::basic("id", "=", 7));
        let values = row(&[("name", "Ann".into()), ("seen_at", Value::Null)]);

        let compiled = grammar.compile_update(&query, &values).unwrap();
        assert_eq!(
            compiled.sql,
            r#"update "users" set "name" = ?, "seen_at" = ? where "id" = ?"#
        );
        assert_eq!(
            compiled.bindings,
            vec![Value::String("Ann".to_string()), Value::Null, Value::Int(7)]
        );
    }

    #[test]
    fn test_delete_with_join_uses_using() {
        let grammar = PostgresQueryGrammar::default();
        let query = Query::table("users")
            .join(orders_join())
            .where_clause(Where::basic("users.active", "=", false));

        let compiled = grammar.compile_delete(&query).unwrap();
        assert_eq!(
            compiled.sql,
            r#"delete from "users" using "orders" where "users"."active" = ? and "users"."id" = "orders"."user_id" and "orders"."total" > ?"#
        );
        assert_eq!(compiled.bindings, vec![Value::Boolean(false), Value::Int(50)]);
    }

    #[test]
    fn test_truncate_restarts_identity() {
        let grammar = PostgresQueryGrammar::new("app_");
        let statements = grammar.compile_truncate(&Query::table("users")).unwrap();
        assert_eq!(statements[0].sql, r#"truncate "app_users" restart identity"#);
    }

    #[test]
    fn test_missing_table() {
        let grammar = PostgresQueryGrammar::default();
        let err = grammar.compile_delete(&Query::default()).unwrap_err();
        assert!(matches!(err, GrammarError::MissingTable("delete")));
    }
}
