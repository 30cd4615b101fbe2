//! Compiles a `Blueprint` into the DDL statements that apply it.

use crate::{error::GrammarError, query::CompiledQuery, wrapper::Wrapper};
use model::{
    core::{expression::Operand, value::Value},
    schema::{
        blueprint::{Blueprint, Command, IndexKind, ReferentialAction},
        column::{ColumnDefinition, ColumnType},
    },
};
use tracing::debug;

pub mod mysql;
pub mod postgres;

/// Column modifiers. Each dialect declares the order it emits them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Unsigned,
    Charset,
    Collate,
    Nullable,
    Default,
    Increment,
    Comment,
    After,
    First,
}

pub trait SchemaGrammar: Send + Sync {
    fn name(&self) -> &'static str;

    fn wrapper(&self) -> &Wrapper;

    /// Modifiers in the order they follow the column type.
    fn modifiers(&self) -> &'static [Modifier];

    /// The native spelling of a column's type.
    fn type_sql(&self, column: &ColumnDefinition) -> String;

    /// Renders one modifier, or an empty string when it does not apply.
    fn compile_modifier(&self, modifier: Modifier, column: &ColumnDefinition) -> Result<String, GrammarError>;

    fn boolean_literal(&self, value: bool) -> &'static str;

    /// `add` keyword for a column inside `alter table`.
    fn add_column_prefix(&self) -> &'static str;

    fn drop_column_prefix(&self) -> &'static str;

    fn compile_rename(&self, blueprint: &Blueprint, to: &str) -> Result<Vec<String>, GrammarError>;

    fn compile_rename_column(
        &self,
        blueprint: &Blueprint,
        from: &str,
        to: &str,
        definition: Option<&ColumnDefinition>,
    ) -> Result<Vec<String>, GrammarError>;

    fn compile_primary(&self, blueprint: &Blueprint, index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError>;

    fn compile_unique(&self, blueprint: &Blueprint, index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError>;

    fn compile_index(&self, blueprint: &Blueprint, index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError>;

    fn compile_drop_primary(&self, blueprint: &Blueprint, index: Option<&str>) -> Result<Vec<String>, GrammarError>;

    fn compile_drop_unique(&self, blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError>;

    fn compile_drop_index(&self, blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError>;

    fn compile_drop_foreign(&self, blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError>;

    fn compile_enable_foreign_key_constraints(&self) -> String;

    fn compile_disable_foreign_key_constraints(&self) -> String;

    /// Compiles every command of the blueprint, in order. Columns on a
    /// blueprint that does not create its table are added to it, and column
    /// index flags become index commands.
    fn compile(&self, blueprint: &Blueprint) -> Result<Vec<String>, GrammarError> {
        let mut commands = Vec::with_capacity(blueprint.commands.len() + 1);
        if !blueprint.columns.is_empty() && !blueprint.creating() {
            commands.push(Command::Add);
        }
        commands.extend(blueprint.commands.iter().cloned());
        commands.extend(fluent_indexes(blueprint));

        let mut statements = Vec::new();
        for command in &commands {
            statements.extend(self.compile_command(blueprint, command)?);
        }

        debug!(
            dialect = self.name(),
            table = %blueprint.table,
            commands = commands.len(),
            statements = statements.len(),
            "Compiled blueprint"
        );
        Ok(statements)
    }

    fn compile_command(&self, blueprint: &Blueprint, command: &Command) -> Result<Vec<String>, GrammarError> {
        match command {
            Command::Create { if_not_exists } => self.compile_create(blueprint, *if_not_exists),
            Command::Add => self.compile_add(blueprint),
            Command::Drop => Ok(vec![format!("drop table {}", self.table(blueprint))]),
            Command::DropIfExists => Ok(vec![format!("drop table if exists {}", self.table(blueprint))]),
            Command::Rename { to } => self.compile_rename(blueprint, to),
            Command::DropColumn { columns } => self.compile_drop_column(blueprint, columns),
            Command::RenameColumn {
                from,
                to,
                definition,
            } => self.compile_rename_column(blueprint, from, to, definition.as_ref()),
            Command::Primary { index, columns } => self.compile_primary(blueprint, index.as_deref(), columns),
            Command::Unique { index, columns } => self.compile_unique(blueprint, index.as_deref(), columns),
            Command::Index { index, columns } => self.compile_index(blueprint, index.as_deref(), columns),
            Command::Foreign {
                index,
                columns,
                on,
                references,
                on_delete,
                on_update,
            } => self.compile_foreign(
                blueprint,
                &ForeignKey {
                    index: index.as_deref(),
                    columns,
                    on,
                    references,
                    on_delete: *on_delete,
                    on_update: *on_update,
                },
            ),
            Command::DropPrimary { index } => self.compile_drop_primary(blueprint, index.as_deref()),
            Command::DropUnique { index } => self.compile_drop_unique(blueprint, index),
            Command::DropIndex { index } => self.compile_drop_index(blueprint, index),
            Command::DropForeign { index } => self.compile_drop_foreign(blueprint, index),
        }
    }

    fn compile_create(&self, blueprint: &Blueprint, if_not_exists: bool) -> Result<Vec<String>, GrammarError> {
        let mut sql = String::from("create ");
        if blueprint.temporary {
            sql.push_str("temporary ");
        }
        sql.push_str("table ");
        if if_not_exists {
            sql.push_str("if not exists ");
        }
        sql.push_str(&format!(
            "{} ({})",
            self.table(blueprint),
            self.compile_columns(blueprint)?.join(", ")
        ));

        let trailer = self.compile_create_trailer(blueprint)?;
        if !trailer.is_empty() {
            sql.push(' ');
            sql.push_str(&trailer);
        }

        let mut statements = vec![sql];
        statements.extend(self.compile_comments(blueprint));
        Ok(statements)
    }

    /// Table options following `create table ... (...)`.
    fn compile_create_trailer(&self, _blueprint: &Blueprint) -> Result<String, GrammarError> {
        Ok(String::new())
    }

    /// Statements documenting columns, for dialects without an inline comment.
    fn compile_comments(&self, _blueprint: &Blueprint) -> Vec<String> {
        Vec::new()
    }

    fn compile_add(&self, blueprint: &Blueprint) -> Result<Vec<String>, GrammarError> {
        if blueprint.columns.is_empty() {
            return Ok(Vec::new());
        }
        let columns = prefix_array(self.add_column_prefix(), &self.compile_columns(blueprint)?);
        let mut statements = vec![format!("alter table {} {}", self.table(blueprint), columns.join(", "))];
        statements.extend(self.compile_comments(blueprint));
        Ok(statements)
    }

    fn compile_drop_column(&self, blueprint: &Blueprint, columns: &[String]) -> Result<Vec<String>, GrammarError> {
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let columns: Vec<String> = columns.iter().map(|c| self.wrapper().wrap_str(c)).collect();
        let columns = prefix_array(self.drop_column_prefix(), &columns);
        Ok(vec![format!("alter table {} {}", self.table(blueprint), columns.join(", "))])
    }

    /// `alter table <table> add <clause> (<columns>)`, shared by the key commands.
    fn compile_key(&self, blueprint: &Blueprint, clause: &str, columns: &[String]) -> String {
        format!(
            "alter table {} add {} ({})",
            self.table(blueprint),
            clause,
            self.wrapper().columnize_str(columns)
        )
    }

    fn compile_foreign(&self, blueprint: &Blueprint, foreign: &ForeignKey<'_>) -> Result<Vec<String>, GrammarError> {
        let w = self.wrapper();
        let name = self.index_name(blueprint, IndexKind::Foreign, foreign.index, foreign.columns);

        let mut sql = format!(
            "alter table {} add constraint {} foreign key ({}) references {} ({})",
            self.table(blueprint),
            w.wrap_value(&name),
            w.columnize_str(foreign.columns),
            w.wrap_table_str(foreign.on),
            w.columnize_str(foreign.references)
        );
        if let Some(action) = foreign.on_delete {
            sql.push_str(&format!(" on delete {}", action.as_str()));
        }
        if let Some(action) = foreign.on_update {
            sql.push_str(&format!(" on update {}", action.as_str()));
        }
        Ok(vec![sql])
    }

    fn compile_columns(&self, blueprint: &Blueprint) -> Result<Vec<String>, GrammarError> {
        blueprint
            .columns
            .iter()
            .map(|column| self.compile_column(column))
            .collect()
    }

    /// `<name> <type> <modifiers>`.
    fn compile_column(&self, column: &ColumnDefinition) -> Result<String, GrammarError> {
        let mut sql = format!(
            "{} {}",
            self.wrapper().wrap_value(&column.name),
            self.type_sql(column)
        );
        for modifier in self.modifiers() {
            sql.push_str(&self.compile_modifier(*modifier, column)?);
        }
        Ok(sql)
    }

    fn modify_nullable(&self, column: &ColumnDefinition) -> String {
        if column.nullable {
            " null".to_string()
        } else {
            " not null".to_string()
        }
    }

    fn modify_default(&self, column: &ColumnDefinition) -> Result<String, GrammarError> {
        if column.use_current && column.column_type.is_timestamp() {
            return Ok(" default CURRENT_TIMESTAMP".to_string());
        }
        match &column.default {
            Some(value) => Ok(format!(" default {}", self.default_value(value)?)),
            None => Ok(String::new()),
        }
    }

    /// Renders a default: expressions verbatim, booleans as the dialect's
    /// literal, everything else as a quoted string.
    fn default_value(&self, value: &Operand) -> Result<String, GrammarError> {
        match value {
            Operand::Raw(expr) => Ok(expr.as_str().to_string()),
            Operand::Value(Value::Boolean(b)) => Ok(self.boolean_literal(*b).to_string()),
            Operand::Value(Value::Null) => Ok("null".to_string()),
            Operand::Value(other) => other
                .as_string()
                .map(|s| self.escape_string(&s))
                .ok_or_else(|| GrammarError::InvalidOption {
                    kind: "default",
                    value: other.to_string(),
                }),
        }
    }

    /// Quotes a string literal for DDL, where bindings are not available.
    fn escape_string(&self, value: &str) -> String {
        self.wrapper().quote_string(value)
    }

    /// The explicit index name, or the conventional one.
    fn index_name(&self, blueprint: &Blueprint, kind: IndexKind, index: Option<&str>, columns: &[String]) -> String {
        match index {
            Some(name) => name.to_string(),
            None => blueprint.index_name(self.wrapper().table_prefix(), kind, columns),
        }
    }

    fn table(&self, blueprint: &Blueprint) -> String {
        self.wrapper().wrap_table_str(&blueprint.table)
    }

    fn compile_table_exists(&self, schema: &str, table: &str) -> CompiledQuery {
        CompiledQuery::new(
            "select * from information_schema.tables where table_schema = ? and table_name = ? and table_type = 'BASE TABLE'"
                .to_string(),
            vec![
                Value::from(schema),
                Value::String(format!("{}{}", self.wrapper().table_prefix(), table)),
            ],
        )
    }

    fn compile_column_listing(&self, schema: &str, table: &str) -> CompiledQuery {
        CompiledQuery::new(
            "select column_name from information_schema.columns where table_schema = ? and table_name = ?"
                .to_string(),
            vec![
                Value::from(schema),
                Value::String(format!("{}{}", self.wrapper().table_prefix(), table)),
            ],
        )
    }
}

/// A foreign key command, borrowed from the blueprint.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey<'a> {
    pub index: Option<&'a str>,
    pub columns: &'a [String],
    pub on: &'a str,
    pub references: &'a [String],
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// Index commands for columns flagged `primary`, `unique` or `index`.
pub fn fluent_indexes(blueprint: &Blueprint) -> Vec<Command> {
    let mut commands = Vec::new();
    for column in &blueprint.columns {
        let columns = vec![column.name.clone()];
        if column.primary {
            commands.push(Command::Primary {
                index: None,
                columns: columns.clone(),
            });
        }
        if column.unique {
            commands.push(Command::Unique {
                index: None,
                columns: columns.clone(),
            });
        }
        if column.index {
            commands.push(Command::Index { index: None, columns });
        }
    }
    commands
}

pub fn prefix_array(prefix: &str, values: &[String]) -> Vec<String> {
    values.iter().map(|v| format!("{prefix} {v}")).collect()
}

/// Accepts a table option only when it is a bare word, since it is spelled
/// into the SQL unquoted.
pub fn bare_word<'a>(kind: &'static str, value: &'a str) -> Result<&'a str, GrammarError> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(value)
    } else {
        Err(GrammarError::InvalidOption {
            kind,
            value: value.to_string(),
        })
    }
}

/// `(<total>, <places>)` when both are given.
pub fn precision_pair(total: Option<u32>, places: Option<u32>) -> String {
    match (total, places) {
        (Some(total), Some(places)) => format!("({total}, {places})"),
        (Some(total), None) => format!("({total})"),
        _ => String::new(),
    }
}

pub fn is_numeric(column_type: &ColumnType) -> bool {
    column_type.is_integer()
        || matches!(
            column_type,
            ColumnType::Float { .. } | ColumnType::Double { .. } | ColumnType::Decimal { .. }
        )
}
