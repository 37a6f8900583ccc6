//! Header manifest
//!
//! Records, per table, the column order of the two export streams so the
//! later phases can check and rebuild rows without touching the database.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::{ObfuscatorError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHeaders {
    pub obfuscate_headers: Vec<String>,
    pub preserve_headers: Vec<String>,
}

impl TableHeaders {
    /// Header row of the merged dataset
    pub fn merged(&self) -> Vec<String> {
        self.obfuscate_headers
            .iter()
            .chain(self.preserve_headers.iter())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderManifest {
    pub tables: BTreeMap<String, TableHeaders>,
}

impl HeaderManifest {
    pub fn path_in(tables_dir: &Path) -> PathBuf {
        tables_dir.join(MANIFEST_FILE)
    }

    pub fn load(tables_dir: &Path) -> Result<Self> {
        let path = Self::path_in(tables_dir);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ObfuscatorError::Configuration(format!(
                "Cannot read header manifest {} (run export-tables first): {e}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, tables_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(tables_dir)?;
        let path = Self::path_in(tables_dir);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), tables = self.tables.len(), "Header manifest saved");
        Ok(())
    }

    pub fn get(&self, table: &str) -> Result<&TableHeaders> {
        self.tables.get(table).ok_or_else(|| {
            ObfuscatorError::Configuration(format!("Table '{table}' is missing from the header manifest"))
        })
    }
}
