//! Needs-fix and validation reports
//!
//! Reports are sorted by table and then column so two runs over the same
//! configuration print the same text.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::ColumnRecord;
use crate::obfuscation::classifier::{FoldedColumn, Reason};
use crate::obfuscation::fake::FakeGenerator;
use crate::obfuscation::model::{FakeKind, GlobalConfig};

const SEPARATOR: &str = "----------";
const UNKNOWN_COLUMN: &str = "<unknown column>";

/// Classification reasons rendered for display, keyed by `(table, column)`
pub type ReasonIndex = BTreeMap<(String, String), Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFinding {
    pub column: String,
    pub source_type: String,
    /// Empty when the configuration was loaded rather than built
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIssue {
    pub table: String,
    pub column: String,
    pub detail: String,
}

/// Everything keeping a configuration from being ready
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Columns flagged `need_fix`, grouped by table
    pub needs_fix: BTreeMap<String, Vec<ColumnFinding>>,
    /// `method` overrides naming a generator outside the registry
    pub unknown_generators: Vec<ColumnIssue>,
    /// Columns the delegate would receive without a target type
    pub missing_types: Vec<ColumnIssue>,
    reasons_available: bool,
}

impl ValidationReport {
    /// Check a configuration tree, attaching reasons when known
    pub fn check(config: &GlobalConfig, reasons: Option<&ReasonIndex>) -> Self {
        let mut report = Self {
            reasons_available: reasons.is_some(),
            ..Self::default()
        };

        for (table_name, table) in config.loadable_tables() {
            let skip_obfuscation = config.is_skip_obfuscation(table_name);

            for (column_name, column) in &table.columns {
                if column.need_fix {
                    let key = (table_name.clone(), column_name.clone());
                    report
                        .needs_fix
                        .entry(table_name.clone())
                        .or_default()
                        .push(ColumnFinding {
                            column: column_name.clone(),
                            source_type: column.source_type.clone(),
                            reasons: reasons
                                .and_then(|index| index.get(&key))
                                .cloned()
                                .unwrap_or_default(),
                        });
                } else if column.obfuscated_type.is_none()
                    && !column.has_fake_data()
                    && !skip_obfuscation
                    && !table.is_excluded(column_name)
                {
                    report.missing_types.push(ColumnIssue {
                        table: table_name.clone(),
                        column: column_name.clone(),
                        detail: column.source_type.clone(),
                    });
                }

                if let Some(fake) = &column.fake_data {
                    if fake.kind == FakeKind::Method && fake.value.parse::<FakeGenerator>().is_err() {
                        report.unknown_generators.push(ColumnIssue {
                            table: table_name.clone(),
                            column: column_name.clone(),
                            detail: fake.value.clone(),
                        });
                    }
                }
            }
        }

        report
    }

    pub fn is_ready(&self) -> bool {
        self.needs_fix.is_empty() && self.unknown_generators.is_empty() && self.missing_types.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.needs_fix.len()
    }

    pub fn column_count(&self) -> usize {
        self.needs_fix.values().map(Vec::len).sum()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ready() {
            return writeln!(f, "Configuration is ready");
        }

        if !self.needs_fix.is_empty() {
            writeln!(f, "Columns waiting for a manual fix:")?;
            writeln!(f, "{SEPARATOR}")?;

            for (table, columns) in &self.needs_fix {
                writeln!(f, "Table: {table}")?;
                writeln!(f, "Columns:")?;
                for (i, finding) in columns.iter().enumerate() {
                    writeln!(f, "{}) {} ({})", i + 1, finding.column, finding.source_type)?;
                    if !finding.reasons.is_empty() {
                        writeln!(f, "reasons:")?;
                        for reason in &finding.reasons {
                            writeln!(f, "- {reason}")?;
                        }
                    }
                }
                writeln!(f, "{SEPARATOR}")?;
            }

            writeln!(f, "Tables needing a manual fix: {}", self.table_count())?;
            writeln!(f, "Columns: {}", self.column_count())?;
            writeln!(f, "{SEPARATOR}")?;

            if !self.reasons_available {
                writeln!(f, "Run `pg-obfuscator configure` to list classification reasons")?;
            }
        }

        if !self.unknown_generators.is_empty() {
            writeln!(f, "Unknown fake data generators:")?;
            for issue in &self.unknown_generators {
                writeln!(f, "- {}.{}: '{}'", issue.table, issue.column, issue.detail)?;
            }
        }

        if !self.missing_types.is_empty() {
            writeln!(f, "Columns without an obfuscated type:")?;
            for issue in &self.missing_types {
                writeln!(f, "- {}.{} ({})", issue.table, issue.column, issue.detail)?;
            }
        }

        Ok(())
    }
}

/// Render the reasons of a folded column with their index details
pub fn render_reasons(folded: &FoldedColumn<'_>, all_columns: &[ColumnRecord]) -> Vec<String> {
    folded
        .reasons
        .iter()
        .map(|reason| match reason {
            Reason::UniqueIndex => {
                let definitions: Vec<&str> = unique_in_order(
                    folded
                        .records
                        .iter()
                        .filter(|r| r.is_unique_indexed)
                        .filter_map(|r| r.index_definition.as_deref()),
                );
                format!("{reason}: [{}]", definitions.join(", "))
            }
            Reason::IndexingFewColumns => {
                format!(
                    "{reason}: [{}]",
                    index_participants(folded, all_columns).join(", ")
                )
            }
            other => other.to_string(),
        })
        .collect()
}

fn index_participants(folded: &FoldedColumn<'_>, all_columns: &[ColumnRecord]) -> Vec<String> {
    let member_ids: Vec<i32> = unique_in_order(
        folded
            .records
            .iter()
            .filter(|r| r.is_multi_column_indexed())
            .flat_map(|r| r.index_member_ids.iter().copied()),
    );

    let mut names: Vec<String> = unique_in_order(member_ids.iter().filter(|id| **id != 0).filter_map(|id| {
        all_columns
            .iter()
            .find(|c| c.table == folded.table && c.id == *id)
            .map(|c| c.column.clone())
    }));

    // Expression index members have no column id
    if member_ids.contains(&0) {
        names.push(UNKNOWN_COLUMN.to_string());
    }
    names
}

fn unique_in_order<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConstraintKind;
    use crate::obfuscation::classifier::{classify, fold_column, ClassificationContext};
    use crate::obfuscation::model::{ColumnConfig, FakeOverride, TableConfig};
    use crate::obfuscation::type_map::default_type_map;

    fn column(source_type: &str, need_fix: bool) -> ColumnConfig {
        ColumnConfig {
            source_type: source_type.to_string(),
            not_null: true,
            obfuscated_type: Some("String".to_string()),
            need_fix,
            fake_data: None,
        }
    }

    #[test]
    fn test_ready_config_has_empty_report() {
        let mut config = GlobalConfig::with_defaults();
        let mut users = TableConfig::default();
        users.columns.insert("name".to_string(), column("varchar", false));
        config.tables.insert("users".to_string(), users);

        let report = ValidationReport::check(&config, None);
        assert!(report.is_ready());
        assert_eq!(report.to_string(), "Configuration is ready\n");
    }

    #[test]
    fn test_report_is_sorted_and_skips_skip_loading() {
        let mut config = GlobalConfig::with_defaults();
        for table in ["zeta", "alpha", "ignored"] {
            let mut t = TableConfig::default();
            t.columns.insert("b".to_string(), column("varchar", true));
            t.columns.insert("a".to_string(), column("varchar", true));
            config.tables.insert(table.to_string(), t);
        }
        config.main.tables.skip_loading.push("ignored".to_string());

        let report = ValidationReport::check(&config, None);
        let tables: Vec<&String> = report.needs_fix.keys().collect();
        assert_eq!(tables, vec!["alpha", "zeta"]);
        assert_eq!(report.column_count(), 4);
        let columns: Vec<&str> = report.needs_fix["alpha"].iter().map(|c| c.column.as_str()).collect();
        assert_eq!(columns, vec!["a", "b"]);

        let text = report.to_string();
        assert!(text.contains("Tables needing a manual fix: 2"));
        assert!(text.contains("Run `pg-obfuscator configure`"));
    }

    #[test]
    fn test_unknown_generator_is_reported() {
        let mut config = GlobalConfig::with_defaults();
        let mut users = TableConfig::default();
        let mut phone = column("varchar", false);
        phone.obfuscated_type = None;
        phone.fake_data = Some(FakeOverride {
            kind: FakeKind::Method,
            value: "fax_number".to_string(),
        });
        users.columns.insert("phone".to_string(), phone);
        config.tables.insert("users".to_string(), users);

        let report = ValidationReport::check(&config, None);
        assert!(!report.is_ready());
        assert_eq!(report.unknown_generators.len(), 1);
        assert!(report.missing_types.is_empty());
        assert!(report.to_string().contains("users.phone: 'fax_number'"));
    }

    #[test]
    fn test_missing_type_is_reported_outside_exclusions() {
        let mut config = GlobalConfig::with_defaults();
        let mut orders = TableConfig::default();
        let mut total = column("numeric", false);
        total.obfuscated_type = None;
        orders.columns.insert("total".to_string(), total.clone());
        orders.columns.insert("legacy".to_string(), total);
        orders.exclude("legacy");
        config.tables.insert("orders".to_string(), orders);

        let report = ValidationReport::check(&config, None);
        assert_eq!(report.missing_types.len(), 1);
        assert_eq!(report.missing_types[0].column, "total");
        assert!(!report.is_ready());
    }

    #[test]
    fn test_render_reasons_with_index_details() {
        let map = default_type_map();
        let all = vec![
            ColumnRecord::new(1, "users", "org_id", "int8", true)
                .with_index(vec![1, 2, 0], true, "CREATE UNIQUE INDEX u ON users (org_id, email, lower(name))"),
            ColumnRecord::new(2, "users", "email", "varchar", true)
                .with_constraint(ConstraintKind::UniqueKey),
        ];
        let ctx = ClassificationContext {
            type_map: &map,
            has_fake_data: false,
        };
        let folded = fold_column(vec![(&all[0], classify(&all[0], &all, ctx))]).unwrap();

        let reasons = render_reasons(&folded, &all);
        assert_eq!(
            reasons,
            vec![
                "unique_index: [CREATE UNIQUE INDEX u ON users (org_id, email, lower(name))]".to_string(),
                "indexing_few_columns: [org_id, email, <unknown column>]".to_string(),
            ]
        );
    }
}
