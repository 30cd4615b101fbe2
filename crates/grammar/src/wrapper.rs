//! Identifier quoting and placeholder primitives.
//!
//! These are the only functions that put caller-supplied text into SQL:
//! identifiers are quoted with the dialect's quote character (doubled to
//! escape), values become `?` placeholders, and `Expression`s pass through.

use model::core::{
    expression::{Ident, Operand},
    value::Value,
};

/// The positional placeholder both dialects bind against.
pub const PLACEHOLDER: &str = "?";

#[derive(Debug, Clone)]
pub struct Wrapper {
    quote: char,
    table_prefix: String,
}

impl Wrapper {
    pub fn new(quote: char, table_prefix: impl Into<String>) -> Self {
        Self {
            quote,
            table_prefix: table_prefix.into(),
        }
    }

    /// Backtick quoting, as used by MySQL.
    pub fn backtick(table_prefix: impl Into<String>) -> Self {
        Self::new('`', table_prefix)
    }

    /// Double-quote quoting, as used by PostgreSQL.
    pub fn double_quote(table_prefix: impl Into<String>) -> Self {
        Self::new('"', table_prefix)
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Quotes a single identifier segment. `*` is left alone.
    pub fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return value.to_string();
        }
        let doubled: String = [self.quote, self.quote].iter().collect();
        format!(
            "{q}{}{q}",
            value.replace(self.quote, &doubled),
            q = self.quote
        )
    }

    /// Quotes a column reference, honouring `a.b` qualifiers and `x as y` aliases.
    pub fn wrap(&self, value: &Ident) -> String {
        match value {
            Ident::Raw(expr) => expr.as_str().to_string(),
            Ident::Name(name) => self.wrap_str(name),
        }
    }

    pub fn wrap_str(&self, value: &str) -> String {
        match split_alias(value) {
            Some((base, alias)) => format!("{} as {}", self.wrap_str(base), self.wrap_value(alias)),
            None => self.wrap_segments(value, true),
        }
    }

    /// Quotes a table reference, prepending the table prefix to the table and
    /// to its alias.
    pub fn wrap_table(&self, table: &Ident) -> String {
        match table {
            Ident::Raw(expr) => expr.as_str().to_string(),
            Ident::Name(name) => self.wrap_table_str(name),
        }
    }

    pub fn wrap_table_str(&self, table: &str) -> String {
        match split_alias(table) {
            Some((base, alias)) => format!(
                "{} as {}",
                self.wrap_segments(&format!("{}{}", self.table_prefix, base), false),
                self.wrap_value(&format!("{}{}", self.table_prefix, alias))
            ),
            None => self.wrap_segments(&format!("{}{}", self.table_prefix, table), false),
        }
    }

    /// The name a table is referred to by in the rest of a statement: its
    /// wrapped alias when it has one, the wrapped table otherwise.
    pub fn table_alias(&self, table: &Ident) -> String {
        match table {
            Ident::Name(name) => match split_alias(name) {
                Some((_, alias)) => self.wrap_value(&format!("{}{}", self.table_prefix, alias)),
                None => self.wrap_table_str(name),
            },
            Ident::Raw(expr) => expr.as_str().to_string(),
        }
    }

    pub fn columnize(&self, columns: &[Ident]) -> String {
        columns
            .iter()
            .map(|c| self.wrap(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn columnize_str(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.wrap_str(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns the SQL for one operand, recording its binding when it has one.
    pub fn parameter(&self, value: &Operand, bindings: &mut Vec<Value>) -> String {
        match value {
            Operand::Raw(expr) => expr.as_str().to_string(),
            Operand::Value(v) => {
                bindings.push(v.clone());
                PLACEHOLDER.to_string()
            }
        }
    }

    pub fn parameterize<'a, I>(&self, values: I, bindings: &mut Vec<Value>) -> String
    where
        I: IntoIterator<Item = &'a Operand>,
    {
        values
            .into_iter()
            .map(|v| self.parameter(v, bindings))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Quotes a string literal with single quotes, doubling embedded quotes.
    pub fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn wrap_segments(&self, value: &str, prefix_qualifier: bool) -> String {
        let segments: Vec<&str> = value.split('.').collect();
        let qualified = segments.len() > 1;
        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                if prefix_qualifier && qualified && i == 0 {
                    self.wrap_value(&format!("{}{}", self.table_prefix, segment))
                } else {
                    self.wrap_value(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Splits `base as alias` on the first case-insensitive ` as `.
fn split_alias(value: &str) -> Option<(&str, &str)> {
    let pos = value.to_ascii_lowercase().find(" as ")?;
    Some((value[..pos].trim(), value[pos + 4..].trim()))
}

#[cfg(test)]
mod tests {
    use super::Wrapper;
    use model::{
        core::{
            expression::{Ident, Operand},
            value::Value,
        },
        raw,
    };

    #[test]
    fn test_wrap_plain_and_dotted() {
        let mysql = Wrapper::backtick("");
        let pg = Wrapper::double_quote("");

        assert_eq!(mysql.wrap_str("orders"), "`orders`");
        assert_eq!(pg.wrap_str("orders"), r#""orders""#);
        assert_eq!(mysql.wrap_str("o.id"), "`o`.`id`");
        assert_eq!(pg.wrap_str("o.id"), r#""o"."id""#);
        assert_eq!(pg.wrap_str("users.*"), r#""users".*"#);
        assert_eq!(mysql.wrap_str("*"), "*");
    }

    #[test]
    fn test_wrap_alias() {
        let mysql = Wrapper::backtick("");
        assert_eq!(mysql.wrap_str("name as n"), "`name` as `n`");
        assert_eq!(mysql.wrap_str("u.name AS display"), "`u`.`name` as `display`");
    }

    #[test]
    fn test_wrap_escapes_quote_character() {
        let mysql = Wrapper::backtick("");
        let pg = Wrapper::double_quote("");
        assert_eq!(mysql.wrap_str("we`ird"), "`we``ird`");
        assert_eq!(pg.wrap_str(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn test_expression_passes_through() {
        let mysql = Wrapper::backtick("app_");
        let expr = Ident::Raw(raw!("count(*)"));
        assert_eq!(mysql.wrap(&expr), "count(*)");
        assert_eq!(mysql.wrap_table(&expr), "count(*)");
    }

    #[test]
    fn test_table_prefix() {
        let mysql = Wrapper::backtick("app_");
        assert_eq!(mysql.wrap_table_str("users"), "`app_users`");
        assert_eq!(mysql.wrap_table_str("users as u"), "`app_users` as `app_u`");
        assert_eq!(mysql.wrap_str("u.id"), "`app_u`.`id`");
        assert_eq!(mysql.wrap_str("id"), "`id`");
        assert_eq!(
            mysql.table_alias(&Ident::Name("users as u".to_string())),
            "`app_u`"
        );
    }

    #[test]
    fn test_parameterize() {
        let pg = Wrapper::double_quote("");
        let mut bindings = Vec::new();
        let values = vec![
            Operand::Value(Value::Int(1)),
            Operand::Raw(raw!("now()")),
            Operand::Value(Value::String("x".to_string())),
        ];
        assert_eq!(pg.parameterize(&values, &mut bindings), "?, now(), ?");
        assert_eq!(
            bindings,
            vec![Value::Int(1), Value::String("x".to_string())]
        );
    }

    #[test]
    fn test_quote_string() {
        let pg = Wrapper::double_quote("");
        assert_eq!(pg.quote_string("it's"), "'it''s'");
    }
}
