//! Defines the blueprint of a table: the columns to add and the commands to run.

use crate::schema::column::ColumnDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blueprint {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    pub commands: Vec<Command>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub engine: Option<String>,
    pub temporary: bool,
}

/// What a foreign key does when the referenced row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl ReferentialAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "cascade",
            ReferentialAction::Restrict => "restrict",
            ReferentialAction::SetNull => "set null",
            ReferentialAction::SetDefault => "set default",
            ReferentialAction::NoAction => "no action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
    Foreign,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Primary => "primary",
            IndexKind::Unique => "unique",
            IndexKind::Index => "index",
            IndexKind::Foreign => "foreign",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Command {
    Create {
        #[serde(default)]
        if_not_exists: bool,
    },
    /// Adds every column of the blueprint to an existing table.
    Add,
    Drop,
    DropIfExists,
    Rename {
        to: String,
    },
    DropColumn {
        columns: Vec<String>,
    },
    RenameColumn {
        from: String,
        to: String,
        /// Full definition of the renamed column, required by MySQL.
        #[serde(default)]
        definition: Option<ColumnDefinition>,
    },
    Primary {
        #[serde(default)]
        index: Option<String>,
        columns: Vec<String>,
    },
    Unique {
        #[serde(default)]
        index: Option<String>,
        columns: Vec<String>,
    },
    Index {
        #[serde(default)]
        index: Option<String>,
        columns: Vec<String>,
    },
    Foreign {
        #[serde(default)]
        index: Option<String>,
        columns: Vec<String>,
        on: String,
        references: Vec<String>,
        #[serde(default)]
        on_delete: Option<ReferentialAction>,
        #[serde(default)]
        on_update: Option<ReferentialAction>,
    },
    DropPrimary {
        #[serde(default)]
        index: Option<String>,
    },
    DropUnique {
        index: String,
    },
    DropIndex {
        index: String,
    },
    DropForeign {
        index: String,
    },
}

impl Blueprint {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    /// A blueprint that creates the table.
    pub fn create(table: &str) -> Self {
        Self::new(table).command(Command::Create {
            if_not_exists: false,
        })
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn charset(mut self, charset: &str) -> Self {
        self.charset = Some(charset.to_string());
        self
    }

    pub fn collation(mut self, collation: &str) -> Self {
        self.collation = Some(collation.to_string());
        self
    }

    pub fn engine(mut self, engine: &str) -> Self {
        self.engine = Some(engine.to_string());
        self
    }

    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn creating(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, Command::Create { .. }))
    }

    /// Conventional index name: `<prefix><table>_<columns>_<kind>`, lower-cased,
    /// with `-` and `.` replaced by `_`.
    pub fn index_name(&self, prefix: &str, kind: IndexKind, columns: &[String]) -> String {
        let name = format!(
            "{}{}_{}_{}",
            prefix,
            self.table,
            columns.join("_"),
            kind.as_str()
        );
        name.to_lowercase().replace(['-', '.'], "_")
    }
}
