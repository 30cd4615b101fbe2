use crate::{
    error::GrammarError,
    schema::{Modifier, SchemaGrammar},
    wrapper::Wrapper,
};
use model::schema::{
    blueprint::{Blueprint, IndexKind},
    column::{ColumnDefinition, ColumnType},
};

const MODIFIERS: &[Modifier] = &[
    Modifier::Collate,
    Modifier::Increment,
    Modifier::Nullable,
    Modifier::Default,
];

#[derive(Debug, Clone)]
pub struct PostgresSchemaGrammar {
    wrapper: Wrapper,
}

impl PostgresSchemaGrammar {
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            wrapper: Wrapper::double_quote(table_prefix),
        }
    }

    fn with_precision(base: &str, precision: Option<u32>, zone: &str) -> String {
        match precision {
            Some(p) => format!("{base}({p}) {zone} time zone"),
            None => format!("{base} {zone} time zone"),
        }
    }
}

impl Default for PostgresSchemaGrammar {
    fn default() -> Self {
        Self::new("")
    }
}

impl SchemaGrammar for PostgresSchemaGrammar {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn wrapper(&self) -> &Wrapper {
        &self.wrapper
    }

    fn modifiers(&self) -> &'static [Modifier] {
        MODIFIERS
    }

    /// Auto-incrementing integers become serial pseudo-types.
    fn type_sql(&self, column: &ColumnDefinition) -> String {
        let serial = column.auto_increment;
        match &column.column_type {
            ColumnType::Char { length } => format!("char({length})"),
            ColumnType::String { length } => format!("varchar({length})"),
            ColumnType::Text | ColumnType::MediumText | ColumnType::LongText => "text".to_string(),
            ColumnType::Integer | ColumnType::MediumInteger => {
                String::from(if serial { "serial" } else { "integer" })
            }
            ColumnType::BigInteger => String::from(if serial { "bigserial" } else { "bigint" }),
            ColumnType::SmallInteger | ColumnType::TinyInteger => {
                String::from(if serial { "smallserial" } else { "smallint" })
            }
            ColumnType::Float { .. } => "real".to_string(),
            ColumnType::Double { .. } => "double precision".to_string(),
            ColumnType::Decimal { total, places } => format!("decimal({total}, {places})"),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Enum { allowed } => {
                let allowed: Vec<String> = allowed.iter().map(|v| self.escape_string(v)).collect();
                format!(
                    "varchar(255) check ({} in ({}))",
                    self.wrapper.wrap_value(&column.name),
                    allowed.join(", ")
                )
            }
            ColumnType::Json => "json".to_string(),
            ColumnType::Jsonb => "jsonb".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::DateTime { precision } | ColumnType::Timestamp { precision } => {
                Self::with_precision("timestamp", *precision, "without")
            }
            ColumnType::DateTimeTz { precision } | ColumnType::TimestampTz { precision } => {
                Self::with_precision("timestamp", *precision, "with")
            }
            ColumnType::Time { precision } => Self::with_precision("time", *precision, "without"),
            ColumnType::TimeTz { precision } => Self::with_precision("time", *precision, "with"),
            ColumnType::Year => "integer".to_string(),
            ColumnType::Binary => "bytea".to_string(),
            ColumnType::Uuid => "uuid".to_string(),
            ColumnType::IpAddress => "inet".to_string(),
            ColumnType::MacAddress => "macaddr".to_string(),
        }
    }

    fn compile_modifier(&self, modifier: Modifier, column: &ColumnDefinition) -> Result<String, GrammarError> {
        let sql = match modifier {
            Modifier::Collate => match &column.collation {
                Some(collation) => format!(" collate {}", self.wrapper.wrap_value(collation)),
                None => String::new(),
            },
            Modifier::Increment if column.auto_increment && column.column_type.is_integer() => {
                " primary key".to_string()
            }
            Modifier::Nullable => self.modify_nullable(column),
            Modifier::Default => self.modify_default(column)?,
            _ => String::new(),
        };
        Ok(sql)
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    fn add_column_prefix(&self) -> &'static str {
        "add column"
    }

    fn drop_column_prefix(&self) -> &'static str {
        "drop column"
    }

    fn compile_comments(&self, blueprint: &Blueprint) -> Vec<String> {
        blueprint
            .columns
            .iter()
            .filter_map(|column| {
                column.comment.as_ref().map(|comment| {
                    format!(
                        "comment on column {}.{} is {}",
                        self.table(blueprint),
                        self.wrapper.wrap_value(&column.name),
                        self.escape_string(comment)
                    )
                })
            })
            .collect()
    }

    fn compile_rename(&self, blueprint: &Blueprint, to: &str) -> Result<Vec<String>, GrammarError> {
        Ok(vec![format!(
            "alter table {} rename to {}",
            self.table(blueprint),
            self.wrapper.wrap_table_str(to)
        )])
    }

    fn compile_rename_column(
        &self,
        blueprint: &Blueprint,
        from: &str,
        to: &str,
        _definition: Option<&ColumnDefinition>,
    ) -> Result<Vec<String>, GrammarError> {
        Ok(vec![format!(
            "alter table {} rename column {} to {}",
            self.table(blueprint),
            self.wrapper.wrap_value(from),
            self.wrapper.wrap_value(to)
        )])
    }

    fn compile_primary(&self, blueprint: &Blueprint, _index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError> {
        Ok(vec![self.compile_key(blueprint, "primary key", columns)])
    }

    fn compile_unique(&self, blueprint: &Blueprint, index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError> {
        let name = self.index_name(blueprint, IndexKind::Unique, index, columns);
        let clause = format!("constraint {} unique", self.wrapper.wrap_value(&name));
        Ok(vec![self.compile_key(blueprint, &clause, columns)])
    }

    /// Indexes are created by a top-level statement.
    fn compile_index(&self, blueprint: &Blueprint, index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError> {
        let name = self.index_name(blueprint, IndexKind::Index, index, columns);
        Ok(vec![format!(
            "create index {} on {} ({})",
            self.wrapper.wrap_value(&name),
            self.table(blueprint),
            self.wrapper.columnize_str(columns)
        )])
    }

    /// Without a name, drops the constraint PostgreSQL names `<table>_pkey`.
    fn compile_drop_primary(&self, blueprint: &Blueprint, index: Option<&str>) -> Result<Vec<String>, GrammarError> {
        let name = match index {
            Some(name) => self.wrapper.wrap_value(name),
            None => self.wrapper.wrap_table_str(&format!("{}_pkey", blueprint.table)),
        };
        Ok(vec![format!(
            "alter table {} drop constraint {}",
            self.table(blueprint),
            name
        )])
    }

    fn compile_drop_unique(&self, blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError> {
        self.compile_drop_foreign(blueprint, index)
    }

    fn compile_drop_index(&self, _blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError> {
        Ok(vec![format!("drop index {}", self.wrapper.wrap_value(index))])
    }

    fn compile_drop_foreign(&self, blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError> {
        Ok(vec![format!(
            "alter table {} drop constraint {}",
            self.table(blueprint),
            self.wrapper.wrap_value(index)
        )])
    }

    fn compile_enable_foreign_key_constraints(&self) -> String {
        "set constraints all immediate".to_string()
    }

    fn compile_disable_foreign_key_constraints(&self) -> String {
        "set constraints all deferred".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::PostgresSchemaGrammar;
    use crate::schema::SchemaGrammar;
    use model::{
        core::value::Value,
        schema::{
            blueprint::{Blueprint, Command, ReferentialAction},
            column::{ColumnDefinition, ColumnType},
        },
    };

    #[test]
    fn test_create_table() {
        let blueprint = Blueprint::create("users")
            .column(ColumnDefinition::new("id", ColumnType::BigInteger).auto_increment())
            .column(
                ColumnDefinition::new("email", ColumnType::String { length: 255 })
                    .unique()
                    .comment("login name"),
            )
            .column(
                ColumnDefinition::new(
                    "status",
                    ColumnType::Enum {
                        allowed: vec!["active".to_string(), "banned".to_string()],
                    },
                )
                .default_value("active"),
            )
            .column(ColumnDefinition::new("flags", ColumnType::Jsonb).nullable())
            .column(
                ColumnDefinition::new("created_at", ColumnType::TimestampTz { precision: Some(0) })
                    .use_current(),
            );

        let statements = PostgresSchemaGrammar::default().compile(&blueprint).unwrap();
        assert_eq!(
            statements,
            vec![
                r#"create table "users" ("id" bigserial primary key not null, "email" varchar(255) not null, "status" varchar(255) check ("status" in ('active', 'banned')) not null default 'active', "flags" jsonb null, "created_at" timestamp(0) with time zone not null default CURRENT_TIMESTAMP)"#,
                r#"comment on column "users"."email" is 'login name'"#,
                r#"alter table "users" add constraint "users_email_unique" unique ("email")"#,
            ]
        );
    }

    #[test]
    fn test_create_ignores_mysql_table_options() {
        let blueprint = Blueprint::create("logs")
            .charset("utf8mb4")
            .engine("InnoDB")
            .column(ColumnDefinition::new("line", ColumnType::Text));

        assert_eq!(
            PostgresSchemaGrammar::default().compile(&blueprint).unwrap(),
            vec![r#"create table "logs" ("line" text not null)"#]
        );
    }

    #[test]
    fn test_add_columns() {
        let blueprint = Blueprint::new("users")
            .column(ColumnDefinition::new("name", ColumnType::String { length: 100 }).collation("C"))
            .column(ColumnDefinition::new("active", ColumnType::Boolean).default_value(false))
            .column(ColumnDefinition::new("seen_from", ColumnType::IpAddress).nullable());

        assert_eq!(
            PostgresSchemaGrammar::default().compile(&blueprint).unwrap(),
            vec![
                r#"alter table "users" add column "name" varchar(100) collate "C" not null, add column "active" boolean not null default false, add column "seen_from" inet null"#
            ]
        );
    }

    #[test]
    fn test_drop_primary_uses_pkey_convention() {
        let blueprint = Blueprint::new("users").command(Command::DropPrimary { index: None });
        assert_eq!(
            PostgresSchemaGrammar::default().compile(&blueprint).unwrap(),
            vec![r#"alter table "users" drop constraint "users_pkey""#]
        );
        assert_eq!(
            PostgresSchemaGrammar::new("app_").compile(&blueprint).unwrap(),
            vec![r#"alter table "app_users" drop constraint "app_users_pkey""#]
        );
    }

    #[test]
    fn test_indexes_and_drops() {
        let blueprint = Blueprint::new("posts")
            .command(Command::Index {
                index: None,
                columns: vec!["user_id".to_string()],
            })
            .command(Command::Foreign {
                index: Some("posts_author_fk".to_string()),
                columns: vec!["user_id".to_string()],
                on: "users".to_string(),
                references: vec!["id".to_string()],
                on_delete: Some(ReferentialAction::SetNull),
                on_update: Some(ReferentialAction::Cascade),
            })
            .command(Command::DropIndex {
                index: "posts_user_id_index".to_string(),
            })
            .command(Command::DropUnique {
                index: "posts_slug_unique".to_string(),
            })
            .command(Command::DropColumn {
                columns: vec!["slug".to_string()],
            });

        assert_eq!(
            PostgresSchemaGrammar::default().compile(&blueprint).unwrap(),
            vec![
                r#"create index "posts_user_id_index" on "posts" ("user_id")"#,
                r#"alter table "posts" add constraint "posts_author_fk" foreign key ("user_id") references "users" ("id") on delete set null on update cascade"#,
                r#"drop index "posts_user_id_index""#,
                r#"alter table "posts" drop constraint "posts_slug_unique""#,
                r#"alter table "posts" drop column "slug""#,
            ]
        );
    }

    #[test]
    fn test_renames() {
        let blueprint = Blueprint::new("users")
            .command(Command::RenameColumn {
                from: "name".to_string(),
                to: "full_name".to_string(),
                definition: None,
            })
            .command(Command::Rename {
                to: "members".to_string(),
            });

        assert_eq!(
            PostgresSchemaGrammar::default().compile(&blueprint).unwrap(),
            vec![
                r#"alter table "users" rename column "name" to "full_name""#,
                r#"alter table "users" rename to "members""#,
            ]
        );
    }

    #[test]
    fn test_foreign_key_toggles_and_introspection() {
        let grammar = PostgresSchemaGrammar::default();
        assert_eq!(grammar.compile_disable_foreign_key_constraints(), "set constraints all deferred");
        assert_eq!(grammar.compile_enable_foreign_key_constraints(), "set constraints all immediate");

        let listing = grammar.compile_column_listing("public", "users");
        assert_eq!(
            listing.sql,
            "select column_name from information_schema.columns where table_schema = ? and table_name = ?"
        );
        assert_eq!(
            listing.bindings,
            vec![
                Value::String("public".to_string()),
                Value::String("users".to_string())
            ]
        );
    }
}
