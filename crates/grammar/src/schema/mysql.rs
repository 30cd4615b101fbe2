use crate::{
    error::GrammarError,
    query::CompiledQuery,
    schema::{Modifier, SchemaGrammar, bare_word, is_numeric, precision_pair},
    wrapper::Wrapper,
};
use model::{
    core::value::Value,
    schema::{
        blueprint::{Blueprint, IndexKind},
        column::{ColumnDefinition, ColumnType},
    },
};

const MODIFIERS: &[Modifier] = &[
    Modifier::Unsigned,
    Modifier::Charset,
    Modifier::Collate,
    Modifier::Nullable,
    Modifier::Default,
    Modifier::Increment,
    Modifier::Comment,
    Modifier::After,
    Modifier::First,
];

#[derive(Debug, Clone)]
pub struct MySqlSchemaGrammar {
    wrapper: Wrapper,
    charset: Option<String>,
    collation: Option<String>,
    engine: Option<String>,
}

impl MySqlSchemaGrammar {
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            wrapper: Wrapper::backtick(table_prefix),
            charset: None,
            collation: None,
            engine: None,
        }
    }

    /// Table options used when a blueprint does not set its own.
    pub fn with_table_options(
        mut self,
        charset: Option<String>,
        collation: Option<String>,
        engine: Option<String>,
    ) -> Self {
        self.charset = charset;
        self.collation = collation;
        self.engine = engine;
        self
    }

    fn precision(precision: Option<u32>) -> String {
        precision.map(|p| format!("({p})")).unwrap_or_default()
    }
}

impl Default for MySqlSchemaGrammar {
    fn default() -> Self {
        Self::new("")
    }
}

impl SchemaGrammar for MySqlSchemaGrammar {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn wrapper(&self) -> &Wrapper {
        &self.wrapper
    }

    fn modifiers(&self) -> &'static [Modifier] {
        MODIFIERS
    }

    fn type_sql(&self, column: &ColumnDefinition) -> String {
        match &column.column_type {
            ColumnType::Char { length } => format!("char({length})"),
            ColumnType::String { length } => format!("varchar({length})"),
            ColumnType::Text => "text".to_string(),
            ColumnType::MediumText => "mediumtext".to_string(),
            ColumnType::LongText => "longtext".to_string(),
            ColumnType::Integer => "int".to_string(),
            ColumnType::BigInteger => "bigint".to_string(),
            ColumnType::MediumInteger => "mediumint".to_string(),
            ColumnType::SmallInteger => "smallint".to_string(),
            ColumnType::TinyInteger => "tinyint".to_string(),
            ColumnType::Float { total, places } => format!("float{}", precision_pair(*total, *places)),
            ColumnType::Double { total, places } => format!("double{}", precision_pair(*total, *places)),
            ColumnType::Decimal { total, places } => format!("decimal({total}, {places})"),
            ColumnType::Boolean => "tinyint(1)".to_string(),
            ColumnType::Enum { allowed } => {
                let allowed: Vec<String> = allowed.iter().map(|v| self.escape_string(v)).collect();
                format!("enum({})", allowed.join(", "))
            }
            ColumnType::Json | ColumnType::Jsonb => "json".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::DateTime { precision } | ColumnType::DateTimeTz { precision } => {
                format!("datetime{}", Self::precision(*precision))
            }
            ColumnType::Time { precision } | ColumnType::TimeTz { precision } => {
                format!("time{}", Self::precision(*precision))
            }
            ColumnType::Timestamp { precision } | ColumnType::TimestampTz { precision } => {
                format!("timestamp{}", Self::precision(*precision))
            }
            ColumnType::Year => "year".to_string(),
            ColumnType::Binary => "blob".to_string(),
            ColumnType::Uuid => "char(36)".to_string(),
            ColumnType::IpAddress => "varchar(45)".to_string(),
            ColumnType::MacAddress => "varchar(17)".to_string(),
        }
    }

    fn compile_modifier(&self, modifier: Modifier, column: &ColumnDefinition) -> Result<String, GrammarError> {
        let sql = match modifier {
            Modifier::Unsigned if column.unsigned && is_numeric(&column.column_type) => " unsigned".to_string(),
            Modifier::Charset => match &column.charset {
                Some(charset) => format!(" character set {}", bare_word("charset", charset)?),
                None => String::new(),
            },
            Modifier::Collate => match &column.collation {
                Some(collation) => format!(" collate {}", bare_word("collation", collation)?),
                None => String::new(),
            },
            Modifier::Nullable => self.modify_nullable(column),
            Modifier::Default => self.modify_default(column)?,
            Modifier::Increment if column.auto_increment && column.column_type.is_integer() => {
                " auto_increment primary key".to_string()
            }
            Modifier::Comment => match &column.comment {
                Some(comment) => format!(" comment {}", self.escape_string(comment)),
                None => String::new(),
            },
            Modifier::After => match &column.after {
                Some(after) => format!(" after {}", self.wrapper.wrap_value(after)),
                None => String::new(),
            },
            Modifier::First if column.first => " first".to_string(),
            _ => String::new(),
        };
        Ok(sql)
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    /// MySQL treats backslashes in literals as escapes.
    fn escape_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn add_column_prefix(&self) -> &'static str {
        "add"
    }

    fn drop_column_prefix(&self) -> &'static str {
        "drop"
    }

    fn compile_create_trailer(&self, blueprint: &Blueprint) -> Result<String, GrammarError> {
        let mut options = Vec::new();
        if let Some(charset) = blueprint.charset.as_ref().or(self.charset.as_ref()) {
            options.push(format!("default character set {}", bare_word("charset", charset)?));
        }
        if let Some(collation) = blueprint.collation.as_ref().or(self.collation.as_ref()) {
            options.push(format!("collate {}", bare_word("collation", collation)?));
        }
        if let Some(engine) = blueprint.engine.as_ref().or(self.engine.as_ref()) {
            options.push(format!("engine = {}", bare_word("engine", engine)?));
        }
        Ok(options.join(" "))
    }

    fn compile_rename(&self, blueprint: &Blueprint, to: &str) -> Result<Vec<String>, GrammarError> {
        Ok(vec![format!(
            "rename table {} to {}",
            self.table(blueprint),
            self.wrapper.wrap_table_str(to)
        )])
    }

    /// `change` restates the whole column, so the new definition is required.
    fn compile_rename_column(
        &self,
        blueprint: &Blueprint,
        from: &str,
        to: &str,
        definition: Option<&ColumnDefinition>,
    ) -> Result<Vec<String>, GrammarError> {
        let mut definition = definition
            .cloned()
            .ok_or_else(|| GrammarError::MissingDefinition(from.to_string()))?;
        definition.name = to.to_string();

        Ok(vec![format!(
            "alter table {} change {} {}",
            self.table(blueprint),
            self.wrapper.wrap_value(from),
            self.compile_column(&definition)?
        )])
    }

    fn compile_primary(&self, blueprint: &Blueprint, _index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError> {
        Ok(vec![self.compile_key(blueprint, "primary key", columns)])
    }

    fn compile_unique(&self, blueprint: &Blueprint, index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError> {
        let name = self.index_name(blueprint, IndexKind::Unique, index, columns);
        let clause = format!("unique {}", self.wrapper.wrap_value(&name));
        Ok(vec![self.compile_key(blueprint, &clause, columns)])
    }

    fn compile_index(&self, blueprint: &Blueprint, index: Option<&str>, columns: &[String]) -> Result<Vec<String>, GrammarError> {
        let name = self.index_name(blueprint, IndexKind::Index, index, columns);
        let clause = format!("index {}", self.wrapper.wrap_value(&name));
        Ok(vec![self.compile_key(blueprint, &clause, columns)])
    }

    fn compile_drop_primary(&self, blueprint: &Blueprint, _index: Option<&str>) -> Result<Vec<String>, GrammarError> {
        Ok(vec![format!("alter table {} drop primary key", self.table(blueprint))])
    }

    fn compile_drop_unique(&self, blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError> {
        self.compile_drop_index(blueprint, index)
    }

    fn compile_drop_index(&self, blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError> {
        Ok(vec![format!(
            "alter table {} drop index {}",
            self.table(blueprint),
            self.wrapper.wrap_value(index)
        )])
    }

    fn compile_drop_foreign(&self, blueprint: &Blueprint, index: &str) -> Result<Vec<String>, GrammarError> {
        Ok(vec![format!(
            "alter table {} drop foreign key {}",
            self.table(blueprint),
            self.wrapper.wrap_value(index)
        )])
    }

    fn compile_enable_foreign_key_constraints(&self) -> String {
        "set foreign_key_checks=1".to_string()
    }

    fn compile_disable_foreign_key_constraints(&self) -> String {
        "set foreign_key_checks=0".to_string()
    }

    fn compile_column_listing(&self, schema: &str, table: &str) -> CompiledQuery {
        CompiledQuery::new(
            "select column_name as `column_name` from information_schema.columns where table_schema = ? and table_name = ?"
                .to_string(),
            vec![
                Value::from(schema),
                Value::String(format!("{}{}", self.wrapper.table_prefix(), table)),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::MySqlSchemaGrammar;
    use crate::{error::GrammarError, schema::SchemaGrammar};
    use model::{
        core::value::Value,
        raw,
        schema::{
            blueprint::{Blueprint, Command, ReferentialAction},
            column::{ColumnDefinition, ColumnType},
        },
    };

    fn grammar() -> MySqlSchemaGrammar {
        MySqlSchemaGrammar::default().with_table_options(
            Some("utf8mb4".to_string()),
            Some("utf8mb4_unicode_ci".to_string()),
            Some("InnoDB".to_string()),
        )
    }

    #[test]
    fn test_create_table() {
        let blueprint = Blueprint::create("users")
            .column(
                ColumnDefinition::new("id", ColumnType::BigInteger)
                    .unsigned()
                    .auto_increment(),
            )
            .column(ColumnDefinition::new("email", ColumnType::String { length: 255 }).unique())
            .column(ColumnDefinition::new("active", ColumnType::Boolean).default_value(true))
            .column(
                ColumnDefinition::new("created_at", ColumnType::Timestamp { precision: None })
                    .nullable()
                    .use_current(),
            );

        let statements = grammar().compile(&blueprint).unwrap();
        assert_eq!(
            statements,
            vec![
                "create table `users` (`id` bigint unsigned not null auto_increment primary key, `email` varchar(255) not null, `active` tinyint(1) not null default 1, `created_at` timestamp null default CURRENT_TIMESTAMP) default character set utf8mb4 collate utf8mb4_unicode_ci engine = InnoDB".to_string(),
                "alter table `users` add unique `users_email_unique` (`email`)".to_string(),
            ]
        );
    }

    #[test]
    fn test_blueprint_options_override_defaults() {
        let blueprint = Blueprint::create("logs")
            .engine("MyISAM")
            .temporary()
            .column(ColumnDefinition::new("line", ColumnType::Text));

        let statements = grammar().compile(&blueprint).unwrap();
        assert_eq!(
            statements[0],
            "create temporary table `logs` (`line` text not null) default character set utf8mb4 collate utf8mb4_unicode_ci engine = MyISAM"
        );
    }

    #[test]
    fn test_invalid_engine_is_rejected() {
        let blueprint = Blueprint::create("logs")
            .engine("InnoDB; drop table users")
            .column(ColumnDefinition::new("line", ColumnType::Text));

        let err = grammar().compile(&blueprint).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidOption { kind: "engine", .. }));
    }

    #[test]
    fn test_add_columns_to_existing_table() {
        let blueprint = Blueprint::new("users").column(
            ColumnDefinition::new("nickname", ColumnType::String { length: 50 })
                .nullable()
                .comment("it's optional")
                .after("email"),
        );

        let statements = MySqlSchemaGrammar::default().compile(&blueprint).unwrap();
        assert_eq!(
            statements,
            vec![
                "alter table `users` add `nickname` varchar(50) null comment 'it''s optional' after `email`"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_add_and_drop_without_columns_emit_nothing() {
        let grammar = MySqlSchemaGrammar::default();

        let add = Blueprint::new("users").command(Command::Add);
        assert!(grammar.compile(&add).unwrap().is_empty());

        let drop = Blueprint::new("users").command(Command::DropColumn { columns: vec![] });
        assert!(grammar.compile(&drop).unwrap().is_empty());
    }

    #[test]
    fn test_column_types_and_defaults() {
        let grammar = MySqlSchemaGrammar::default();
        let status = ColumnDefinition::new(
            "status",
            ColumnType::Enum {
                allowed: vec!["draft".to_string(), "it's".to_string()],
            },
        )
        .default_value("draft");
        assert_eq!(
            grammar.compile_column(&status).unwrap(),
            "`status` enum('draft', 'it''s') not null default 'draft'"
        );

        let path = ColumnDefinition::new("path", ColumnType::String { length: 255 }).default_value(r"C:\tmp");
        assert_eq!(
            grammar.compile_column(&path).unwrap(),
            r"`path` varchar(255) not null default 'C:\\tmp'"
        );

        let amount = ColumnDefinition::new("amount", ColumnType::Decimal { total: 8, places: 2 })
            .unsigned()
            .default_value(raw!("0"));
        assert_eq!(
            grammar.compile_column(&amount).unwrap(),
            "`amount` decimal(8, 2) unsigned not null default 0"
        );

        let at = ColumnDefinition::new("at", ColumnType::DateTimeTz { precision: Some(3) })
            .nullable()
            .default_value(Value::Null);
        assert_eq!(grammar.compile_column(&at).unwrap(), "`at` datetime(3) null default null");

        let id = ColumnDefinition::new("id", ColumnType::Uuid).first();
        assert_eq!(grammar.compile_column(&id).unwrap(), "`id` char(36) not null first");
    }

    #[test]
    fn test_rename_column_requires_definition() {
        let grammar = MySqlSchemaGrammar::default();
        let blueprint = Blueprint::new("users").command(Command::RenameColumn {
            from: "name".to_string(),
            to: "full_name".to_string(),
            definition: None,
        });
        assert!(matches!(
            grammar.compile(&blueprint),
            Err(GrammarError::MissingDefinition(column)) if column == "name"
        ));

        let blueprint = Blueprint::new("users").command(Command::RenameColumn {
            from: "name".to_string(),
            to: "full_name".to_string(),
            definition: Some(ColumnDefinition::new("name", ColumnType::String { length: 100 })),
        });
        assert_eq!(
            grammar.compile(&blueprint).unwrap(),
            vec!["alter table `users` change `name` `full_name` varchar(100) not null".to_string()]
        );
    }

    #[test]
    fn test_keys_and_drops() {
        let grammar = MySqlSchemaGrammar::new("app_");
        let blueprint = Blueprint::new("posts")
            .command(Command::Primary {
                index: None,
                columns: vec!["id".to_string()],
            })
            .command(Command::Index {
                index: None,
                columns: vec!["user_id".to_string(), "created_at".to_string()],
            })
            .command(Command::Foreign {
                index: None,
                columns: vec!["user_id".to_string()],
                on: "users".to_string(),
                references: vec!["id".to_string()],
                on_delete: Some(ReferentialAction::Cascade),
                on_update: None,
            })
            .command(Command::DropPrimary { index: None })
            .command(Command::DropUnique {
                index: "posts_slug_unique".to_string(),
            })
            .command(Command::DropForeign {
                index: "posts_user_id_foreign".to_string(),
            })
            .command(Command::DropColumn {
                columns: vec!["slug".to_string(), "body".to_string()],
            });

        assert_eq!(
            grammar.compile(&blueprint).unwrap(),
            vec![
                "alter table `app_posts` add primary key (`id`)",
                "alter table `app_posts` add index `app_posts_user_id_created_at_index` (`user_id`, `created_at`)",
                "alter table `app_posts` add constraint `app_posts_user_id_foreign` foreign key (`user_id`) references `app_users` (`id`) on delete cascade",
                "alter table `app_posts` drop primary key",
                "alter table `app_posts` drop index `posts_slug_unique`",
                "alter table `app_posts` drop foreign key `posts_user_id_foreign`",
                "alter table `app_posts` drop `slug`, drop `body`",
            ]
        );
    }

    #[test]
    fn test_table_commands() {
        let grammar = MySqlSchemaGrammar::default();
        let blueprint = Blueprint::new("users")
            .command(Command::Rename {
                to: "members".to_string(),
            })
            .command(Command::DropIfExists);
        assert_eq!(
            grammar.compile(&blueprint).unwrap(),
            vec![
                "rename table `users` to `members`",
                "drop table if exists `users`",
            ]
        );
        assert_eq!(grammar.compile_disable_foreign_key_constraints(), "set foreign_key_checks=0");
        assert_eq!(grammar.compile_enable_foreign_key_constraints(), "set foreign_key_checks=1");
    }

    #[test]
    fn test_introspection_binds_prefixed_table() {
        let grammar = MySqlSchemaGrammar::new("app_");
        let exists = grammar.compile_table_exists("shop", "users");
        assert!(exists.sql.contains("table_schema = ? and table_name = ?"));
        assert_eq!(
            exists.bindings,
            vec![
                Value::String("shop".to_string()),
                Value::String("app_users".to_string())
            ]
        );

        let listing = grammar.compile_column_listing("shop", "users");
        assert!(listing.sql.starts_with("select column_name as `column_name`"));
        assert_eq!(listing.bindings.len(), 2);
    }
}
