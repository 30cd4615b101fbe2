//! Column definitions carried by a blueprint.

use crate::core::expression::Operand;
use serde::{Deserialize, Serialize};

/// Logical column types. Each grammar maps every variant to its own native
/// spelling; type-specific attributes live inside the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnType {
    Char { length: u32 },
    String { length: u32 },
    Text,
    MediumText,
    LongText,
    Integer,
    BigInteger,
    MediumInteger,
    SmallInteger,
    TinyInteger,
    Float { total: Option<u32>, places: Option<u32> },
    Double { total: Option<u32>, places: Option<u32> },
    Decimal { total: u32, places: u32 },
    Boolean,
    Enum { allowed: Vec<String> },
    Json,
    Jsonb,
    Date,
    DateTime { precision: Option<u32> },
    DateTimeTz { precision: Option<u32> },
    Time { precision: Option<u32> },
    TimeTz { precision: Option<u32> },
    Timestamp { precision: Option<u32> },
    TimestampTz { precision: Option<u32> },
    Year,
    Binary,
    Uuid,
    IpAddress,
    MacAddress,
}

impl ColumnType {
    /// Integer family, the types auto-increment applies to.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer
                | ColumnType::BigInteger
                | ColumnType::MediumInteger
                | ColumnType::SmallInteger
                | ColumnType::TinyInteger
        )
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            ColumnType::Timestamp { .. } | ColumnType::TimestampTz { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<Operand>,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub unsigned: bool,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Place the column after this one (MySQL only).
    #[serde(default)]
    pub after: Option<String>,
    /// Place the column first (MySQL only).
    #[serde(default)]
    pub first: bool,
    /// Default temporal columns to the current timestamp.
    #[serde(default)]
    pub use_current: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: bool,
}

impl ColumnDefinition {
    /// A `not null` column with no modifiers.
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: false,
            default: None,
            auto_increment: false,
            unsigned: false,
            charset: None,
            collation: None,
            comment: None,
            after: None,
            first: false,
            use_current: false,
            primary: false,
            unique: false,
            index: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Operand>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
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

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn after(mut self, column: &str) -> Self {
        self.after = Some(column.to_string());
        self
    }

    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn use_current(mut self) -> Self {
        self.use_current = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}
