//! Obfuscation configuration tree
//!
//! [`GlobalConfig`] is the generated, persisted document every pipeline phase
//! reads. [`OverrideDocument`] has the same shape with every field optional and
//! is only ever authored by a human.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::obfuscation::type_map::default_type_map;

/// How a fake-data column gets its value during merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FakeKind {
    /// The configured literal
    Precise,
    /// `%{column}` placeholders resolved from the current row
    Pattern,
    /// A named generator from the registry
    Method,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FakeOverride {
    pub kind: FakeKind,
    pub value: String,
}

/// Per-column settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub source_type: String,

    #[serde(default)]
    pub not_null: bool,

    /// Unset while the source type has no mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated_type: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub need_fix: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_data: Option<FakeOverride>,
}

impl ColumnConfig {
    pub fn has_fake_data(&self) -> bool {
        self.fake_data.is_some()
    }
}

/// Per-table settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Columns copied verbatim, never sent to the delegate
    #[serde(default)]
    pub excluded_columns: Vec<String>,

    /// Explicit row ordering for the export streams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<String>>,

    #[serde(default)]
    pub columns: BTreeMap<String, ColumnConfig>,
}

impl TableConfig {
    pub fn is_excluded(&self, column: &str) -> bool {
        self.excluded_columns.iter().any(|c| c == column)
    }

    /// Add a column to `excluded_columns` unless already present
    pub fn exclude(&mut self, column: &str) {
        if !self.is_excluded(column) {
            self.excluded_columns.push(column.to_string());
        }
    }

    /// Names of the columns carrying a fake-data override, in column order
    pub fn fake_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, c)| c.has_fake_data())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipTables {
    /// Tables neither exported nor imported
    #[serde(default)]
    pub skip_loading: Vec<String>,

    /// Tables exported verbatim without the delegate
    #[serde(default)]
    pub skip_obfuscation: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainConfig {
    #[serde(default)]
    pub data_types_map: BTreeMap<String, String>,

    #[serde(default)]
    pub tables: SkipTables,
}

/// The generated obfuscation configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub main: MainConfig,

    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,
}

impl GlobalConfig {
    /// Starting point of every build: built-in type map and empty skip sets
    pub fn with_defaults() -> Self {
        Self {
            main: MainConfig {
                data_types_map: default_type_map(),
                tables: SkipTables::default(),
            },
            tables: BTreeMap::new(),
        }
    }

    pub fn is_skip_loading(&self, table: &str) -> bool {
        self.main.tables.skip_loading.iter().any(|t| t == table)
    }

    pub fn is_skip_obfuscation(&self, table: &str) -> bool {
        self.main.tables.skip_obfuscation.iter().any(|t| t == table)
    }

    /// Tables taking part in export, obfuscation, merge and import
    pub fn loadable_tables(&self) -> impl Iterator<Item = (&String, &TableConfig)> {
        self.tables
            .iter()
            .filter(move |(name, _)| !self.is_skip_loading(name))
    }
}

/// Human-authored overrides, every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<MainOverride>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<BTreeMap<String, TableOverride>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_types_map: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<SkipTablesOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipTablesOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_loading: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_obfuscation: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_columns: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<BTreeMap<String, ColumnOverride>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_null: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated_type: Option<String>,

    /// Setting this to `false` signs a column off after review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_fix: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake_data: Option<FakeOverride>,
}

fn is_false(value: &bool) -> bool {
    !*value
}
