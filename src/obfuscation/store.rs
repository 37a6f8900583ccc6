//! Building, validating and persisting the obfuscation configuration

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::domain::{ColumnRecord, ObfuscatorError, Result};
use crate::obfuscation::classifier::{classify, fold_column, needs_fix, ClassificationContext, FoldedColumn};
use crate::obfuscation::merge::{merge_override_after_classification, merge_override_before_classification};
use crate::obfuscation::model::{GlobalConfig, OverrideDocument};
use crate::obfuscation::report::{render_reasons, ReasonIndex, ValidationReport};

/// Owner of a [`GlobalConfig`] and, after a build, the reasons behind it
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    config: GlobalConfig,
    reasons: Option<ReasonIndex>,
}

impl ConfigStore {
    /// Wrap an existing tree (no classification reasons known)
    pub fn from_config(config: GlobalConfig) -> Self {
        Self {
            config,
            reasons: None,
        }
    }

    /// Classify a fresh column scan and merge it with the overrides
    pub fn build(records: &[ColumnRecord], overrides: &OverrideDocument) -> Self {
        tracing::info!(records = records.len(), "Building obfuscation config");

        let mut config = GlobalConfig::with_defaults();
        merge_override_before_classification(&mut config, overrides);

        let folded = classify_all(records, &config);
        let mut reasons = ReasonIndex::new();

        for column in &folded {
            let table = config.tables.entry(column.table.to_string()).or_default();
            let entry = table.columns.entry(column.column.to_string()).or_default();
            entry.source_type = column.patch.source_type.clone();
            entry.not_null = column.patch.not_null;
            if let Some(obfuscated_type) = &column.patch.obfuscated_type {
                entry.obfuscated_type = Some(obfuscated_type.clone());
            }
            if column.exclude {
                table.exclude(column.column);
            }
        }

        // Exclusions are final at this point, so the gate is computed once per column
        for column in &folded {
            let skip_loading = config.is_skip_loading(column.table);
            let skip_obfuscation = config.is_skip_obfuscation(column.table);
            let Some(table) = config.tables.get_mut(column.table) else {
                continue;
            };
            let excluded = table.is_excluded(column.column);
            let Some(entry) = table.columns.get_mut(column.column) else {
                continue;
            };

            // Verbatim columns never reach the delegate
            if excluded {
                entry.obfuscated_type = None;
            }

            entry.need_fix = !skip_loading
                && needs_fix(excluded, skip_obfuscation, entry.has_fake_data(), &column.reasons);

            if entry.need_fix {
                reasons.insert(
                    (column.table.to_string(), column.column.to_string()),
                    render_reasons(column, records),
                );
            }
        }

        merge_override_after_classification(&mut config, overrides);
        prune_unknown(&mut config, records);

        let store = Self {
            config,
            reasons: Some(reasons),
        };

        let report = store.validate();
        if !report.is_ready() {
            tracing::info!("{report}");
        }
        tracing::info!(tables = store.config.tables.len(), "Processed tables");

        store
    }

    /// Load the configuration tree, creating an empty file when missing
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading obfuscation config");

        let content = read_or_create(path)?;
        let config: GlobalConfig = toml::from_str(&content)?;
        Ok(Self::from_config(config))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&self.config)?;
        std::fs::write(path, content)?;

        tracing::info!(path = %path.display(), "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ValidationReport {
        ValidationReport::check(&self.config, self.reasons.as_ref())
    }

    pub fn is_ready(&self) -> bool {
        self.validate().is_ready()
    }

    /// Fail with the full report when the configuration is not ready
    pub fn ensure_ready(&self) -> Result<()> {
        let report = self.validate();
        if report.is_ready() {
            Ok(())
        } else {
            Err(ObfuscatorError::ConfigurationInvalid(report.to_string()))
        }
    }

    /// [`Self::ensure_ready`] for the data phases, which also need at least one table
    pub fn ensure_configured(&self) -> Result<()> {
        if self.config.tables.is_empty() {
            return Err(ObfuscatorError::Configuration(
                "Obfuscation config lists no tables (run configure first)".to_string(),
            ));
        }
        self.ensure_ready()
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn into_config(self) -> GlobalConfig {
        self.config
    }
}

/// Load the human-authored override document, creating an empty file when missing
pub fn load_override(path: impl AsRef<Path>) -> Result<OverrideDocument> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "Loading override document");

    let content = read_or_create(path)?;
    Ok(toml::from_str(&content)?)
}

fn read_or_create(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "")?;
            tracing::info!(path = %path.display(), "Created empty config file");
            Ok(String::new())
        }
        Err(e) => Err(ObfuscatorError::Io(format!(
            "Failed to read {}: {e}",
            path.display()
        ))),
    }
}

fn classify_all<'a>(records: &'a [ColumnRecord], config: &GlobalConfig) -> Vec<FoldedColumn<'a>> {
    let mut grouped: BTreeMap<(&str, &str), Vec<&ColumnRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry((record.table.as_str(), record.column.as_str()))
            .or_default()
            .push(record);
    }

    grouped
        .into_iter()
        .filter_map(|((table, column), group)| {
            let has_fake_data = config
                .tables
                .get(table)
                .and_then(|t| t.columns.get(column))
                .is_some_and(|c| c.has_fake_data());
            let context = ClassificationContext {
                type_map: &config.main.data_types_map,
                has_fake_data,
            };

            let parts = group
                .into_iter()
                .map(|record| (record, classify(record, records, context)))
                .collect();
            fold_column(parts)
        })
        .collect()
}

/// Drop override entries that name tables or columns absent from the scan
fn prune_unknown(config: &mut GlobalConfig, records: &[ColumnRecord]) {
    let mut known: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for record in records {
        known
            .entry(record.table.as_str())
            .or_default()
            .insert(record.column.as_str());
    }

    config.tables.retain(|table, _| {
        let keep = known.contains_key(table.as_str());
        if !keep {
            tracing::warn!(table = %table, "Override names an unknown table, ignoring it");
        }
        keep
    });

    for (table_name, table) in config.tables.iter_mut() {
        let Some(columns) = known.get(table_name.as_str()) else {
            continue;
        };

        table.columns.retain(|column, _| {
            let keep = columns.contains(column.as_str());
            if !keep {
                tracing::warn!(table = %table_name, column = %column, "Override names an unknown column, ignoring it");
            }
            keep
        });

        table.excluded_columns.retain(|column| {
            let keep = columns.contains(column.as_str());
            if !keep {
                tracing::warn!(table = %table_name, column = %column, "Excluded column does not exist, ignoring it");
            }
            keep
        });

        if let Some(order_by) = table.order_by.as_mut() {
            order_by.retain(|column| {
                let keep = columns.contains(column.as_str());
                if !keep {
                    tracing::warn!(table = %table_name, column = %column, "Ordering column does not exist, ignoring it");
                }
                keep
            });
            if order_by.is_empty() {
                table.order_by = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConstraintKind;
    use tempfile::TempDir;

    fn scan() -> Vec<ColumnRecord> {
        vec![
            ColumnRecord::new(1, "users", "id", "int8", true).with_constraint(ConstraintKind::PrimaryKey),
            ColumnRecord::new(2, "users", "email", "varchar", true)
                .with_index(vec![2], true, "CREATE UNIQUE INDEX users_email ON users (email)"),
            ColumnRecord::new(3, "users", "name", "text", false),
        ]
    }

    #[test]
    fn test_build_classifies_every_column() {
        let store = ConfigStore::build(&scan(), &OverrideDocument::default());
        let users = &store.config().tables["users"];

        assert_eq!(users.columns.len(), 3);
        assert_eq!(users.excluded_columns, vec!["id".to_string()]);
        assert!(users.columns["id"].obfuscated_type.is_none());
        assert!(!users.columns["id"].need_fix);
        assert!(users.columns["email"].need_fix);
        assert!(!users.columns["name"].need_fix);
        assert_eq!(
            users.columns["name"].obfuscated_type.as_deref(),
            Some("Nullable(String)")
        );
        assert!(!store.is_ready());
    }

    #[test]
    fn test_build_report_carries_reasons() {
        let store = ConfigStore::build(&scan(), &OverrideDocument::default());
        let report = store.validate();
        let finding = &report.needs_fix["users"][0];
        assert_eq!(finding.column, "email");
        assert_eq!(
            finding.reasons,
            vec!["unique_index: [CREATE UNIQUE INDEX users_email ON users (email)]".to_string()]
        );
    }

    #[test]
    fn test_unknown_override_entries_are_pruned() {
        let overrides: OverrideDocument = toml::from_str(
            r#"
            [tables.ghosts]
            excluded_columns = ["id"]

            [tables.users]
            excluded_columns = ["email", "nickname"]
            order_by = ["nickname"]

            [tables.users.columns.nickname]
            obfuscated_type = "String"
            "#,
        )
        .unwrap();

        let store = ConfigStore::build(&scan(), &overrides);
        let config = store.config();
        assert!(!config.tables.contains_key("ghosts"));

        let users = &config.tables["users"];
        assert!(!users.columns.contains_key("nickname"));
        assert!(!users.is_excluded("nickname"));
        assert!(users.is_excluded("email"));
        assert!(users.order_by.is_none());
        assert!(store.is_ready());
    }

    #[test]
    fn test_load_missing_creates_placeholder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config").join("obfuscation.toml");

        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.config(), &GlobalConfig::default());
        assert!(path.exists());

        let overrides = load_override(dir.path().join("config").join("override.toml")).unwrap();
        assert_eq!(overrides, OverrideDocument::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("obfuscation.toml");

        let built = ConfigStore::build(&scan(), &OverrideDocument::default());
        built.save(&path).unwrap();
        let loaded = ConfigStore::load(&path).unwrap();

        assert_eq!(loaded.config(), built.config());
    }

    #[test]
    fn test_ensure_ready_returns_report() {
        let store = ConfigStore::build(&scan(), &OverrideDocument::default());
        let err = store.ensure_ready().unwrap_err();
        assert!(matches!(err, ObfuscatorError::ConfigurationInvalid(ref report) if report.contains("email")));
    }

    #[test]
    fn test_placeholder_document_is_not_configured() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::load(dir.path().join("obfuscation.toml")).unwrap();

        assert!(store.is_ready());
        assert!(matches!(
            store.ensure_configured(),
            Err(ObfuscatorError::Configuration(ref message)) if message.contains("run configure")
        ));
    }
}
