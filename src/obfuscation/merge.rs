//! Applying an [`OverrideDocument`] onto a [`GlobalConfig`]
//!
//! The same merge runs twice during a build: once before classification so
//! overrides (type map entries, fake data, exclusions) influence the rules, and
//! once after so that explicit human values win over generated ones.
//!
//! The merge is idempotent: applying the same override twice yields the same
//! tree as applying it once.

use crate::obfuscation::model::{ColumnConfig, ColumnOverride, GlobalConfig, OverrideDocument};

/// Merge applied to the default tree before any column is classified
pub fn merge_override_before_classification(base: &mut GlobalConfig, overrides: &OverrideDocument) {
    merge_override(base, overrides);
}

/// Merge applied once every column has been classified
pub fn merge_override_after_classification(base: &mut GlobalConfig, overrides: &OverrideDocument) {
    merge_override(base, overrides);
}

fn merge_override(base: &mut GlobalConfig, overrides: &OverrideDocument) {
    if let Some(main) = &overrides.main {
        if let Some(types) = &main.data_types_map {
            base.main
                .data_types_map
                .extend(types.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(skip) = &main.tables {
            if let Some(tables) = &skip.skip_loading {
                union_into(&mut base.main.tables.skip_loading, tables);
            }
            if let Some(tables) = &skip.skip_obfuscation {
                union_into(&mut base.main.tables.skip_obfuscation, tables);
            }
        }
    }

    let Some(tables) = &overrides.tables else {
        return;
    };

    for (table_name, table_override) in tables {
        let table = base.tables.entry(table_name.clone()).or_default();

        if let Some(excluded) = &table_override.excluded_columns {
            union_into(&mut table.excluded_columns, excluded);
        }

        if let Some(order_by) = &table_override.order_by {
            table.order_by = Some(order_by.clone());
        }

        if let Some(columns) = &table_override.columns {
            for (column_name, column_override) in columns {
                let column = table.columns.entry(column_name.clone()).or_default();
                apply_column(column, column_override);
            }
        }
    }
}

fn apply_column(column: &mut ColumnConfig, overrides: &ColumnOverride) {
    if let Some(source_type) = &overrides.source_type {
        column.source_type = source_type.clone();
    }
    if let Some(not_null) = overrides.not_null {
        column.not_null = not_null;
    }
    if let Some(obfuscated_type) = &overrides.obfuscated_type {
        column.obfuscated_type = Some(obfuscated_type.clone());
    }
    if let Some(need_fix) = overrides.need_fix {
        column.need_fix = need_fix;
    }
    if let Some(fake_data) = &overrides.fake_data {
        column.fake_data = Some(fake_data.clone());
    }
}

/// Append entries not yet present, keeping first-seen order
fn union_into(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
