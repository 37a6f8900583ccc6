//! Column and sequence introspection records
//!
//! These are the immutable inputs read from the PostgreSQL catalog once per
//! run. A single physical column can appear in several [`ColumnRecord`]s, one
//! per constraint/index combination the catalog join produces.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ObfuscatorError;

/// Kind of table constraint a column participates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    #[default]
    None,
    PrimaryKey,
    ForeignKey,
    UniqueKey,
    CheckKey,
    ExclusionKey,
}

impl ConstraintKind {
    /// Map a `pg_constraint.contype` code to a constraint kind
    ///
    /// Unknown or missing codes map to [`ConstraintKind::None`].
    pub fn from_contype(code: Option<&str>) -> Self {
        match code {
            Some("p") => Self::PrimaryKey,
            Some("f") => Self::ForeignKey,
            Some("u") => Self::UniqueKey,
            Some("c") => Self::CheckKey,
            Some("x") => Self::ExclusionKey,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PrimaryKey => "primary_key",
            Self::ForeignKey => "foreign_key",
            Self::UniqueKey => "unique_key",
            Self::CheckKey => "check_key",
            Self::ExclusionKey => "exclusion_key",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstraintKind {
    type Err = ObfuscatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "primary_key" => Ok(Self::PrimaryKey),
            "foreign_key" => Ok(Self::ForeignKey),
            "unique_key" => Ok(Self::UniqueKey),
            "check_key" => Ok(Self::CheckKey),
            "exclusion_key" => Ok(Self::ExclusionKey),
            other => Err(ObfuscatorError::Other(format!(
                "Unknown constraint kind: {other}"
            ))),
        }
    }
}

/// One row of the column catalog feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRecord {
    /// Ordinal position of the column within its table (`attnum`)
    pub id: i32,
    pub table: String,
    pub column: String,
    pub source_type: String,
    pub not_null: bool,
    /// Column ids of the index covering this column, in index order
    #[serde(default)]
    pub index_member_ids: Vec<i32>,
    #[serde(default)]
    pub index_definition: Option<String>,
    #[serde(default)]
    pub is_indexed: bool,
    #[serde(default)]
    pub is_unique_indexed: bool,
    #[serde(default)]
    pub constraint_kind: ConstraintKind,
    #[serde(default)]
    pub foreign_table: Option<String>,
    #[serde(default)]
    pub foreign_column: Option<String>,
}

impl ColumnRecord {
    /// Create a plain column record with no index or constraint participation
    pub fn new(
        id: i32,
        table: impl Into<String>,
        column: impl Into<String>,
        source_type: impl Into<String>,
        not_null: bool,
    ) -> Self {
        Self {
            id,
            table: table.into(),
            column: column.into(),
            source_type: source_type.into(),
            not_null,
            index_member_ids: Vec::new(),
            index_definition: None,
            is_indexed: false,
            is_unique_indexed: false,
            constraint_kind: ConstraintKind::None,
            foreign_table: None,
            foreign_column: None,
        }
    }

    pub fn with_constraint(mut self, kind: ConstraintKind) -> Self {
        self.constraint_kind = kind;
        self
    }

    pub fn with_foreign_key(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.constraint_kind = ConstraintKind::ForeignKey;
        self.foreign_table = Some(table.into());
        self.foreign_column = Some(column.into());
        self
    }

    pub fn with_index(mut self, member_ids: Vec<i32>, unique: bool, definition: impl Into<String>) -> Self {
        self.is_indexed = true;
        self.is_unique_indexed = unique;
        self.index_member_ids = member_ids;
        self.index_definition = Some(definition.into());
        self
    }

    /// True when the covering index spans more than one column
    pub fn is_multi_column_indexed(&self) -> bool {
        self.is_indexed && self.index_member_ids.len() > 1
    }
}

/// A sequence owned by a table column, resynced after import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub sequence_name: String,
    pub table_name: String,
    pub column_name: String,
}
