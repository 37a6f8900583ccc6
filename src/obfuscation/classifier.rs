//! Column risk classification
//!
//! Every catalog record is run through [`classify`], which derives the risk
//! reasons, the obfuscation type patch and the exclusion decision. Records of
//! the same physical column are then combined with [`fold_column`], and the
//! gate flag comes from [`needs_fix`].
//!
//! Rules are evaluated in a fixed order and accumulate:
//!
//! 1. `unknown_data_type` when the type map has no entry for the source type
//! 2. the constraint kind, when the column takes part in a constraint
//! 3. `unique_index` when a unique index covers the column
//! 4. `indexing_few_columns` when the covering index spans several columns

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::{ColumnRecord, ConstraintKind};
use crate::obfuscation::type_map::nullable;

/// Why a column may need a human decision
///
/// Variant order is rule order, so sorted sets of reasons read in the order
/// the rules fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reason {
    UnknownDataType,
    Constraint(ConstraintKind),
    UniqueIndex,
    IndexingFewColumns,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownDataType => "unknown_data_type",
            Self::Constraint(kind) => kind.as_str(),
            Self::UniqueIndex => "unique_index",
            Self::IndexingFewColumns => "indexing_few_columns",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs a classification needs besides the record itself
#[derive(Debug, Clone, Copy)]
pub struct ClassificationContext<'a> {
    pub type_map: &'a BTreeMap<String, String>,
    /// The column already carries a fake-data override
    pub has_fake_data: bool,
}

/// Field updates produced for the column's config entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePatch {
    pub source_type: String,
    pub not_null: bool,
    /// `None` leaves the existing value untouched
    pub obfuscated_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub reasons: Vec<Reason>,
    pub patch: TypePatch,
    pub exclude: bool,
}

/// Classify a single catalog record
///
/// `all_columns` is the full record feed and is only consulted to decide
/// whether a foreign key points at a primary key.
pub fn classify(
    record: &ColumnRecord,
    all_columns: &[ColumnRecord],
    context: ClassificationContext<'_>,
) -> Classification {
    let mapped_type = context.type_map.get(&record.source_type);

    let mut reasons = Vec::new();
    if mapped_type.is_none() {
        reasons.push(Reason::UnknownDataType);
    }
    if !record.constraint_kind.is_none() {
        reasons.push(Reason::Constraint(record.constraint_kind));
    }
    if record.is_unique_indexed {
        reasons.push(Reason::UniqueIndex);
    }
    let multi_indexed = record.is_multi_column_indexed();
    if multi_indexed {
        reasons.push(Reason::IndexingFewColumns);
    }

    let obfuscated_type = match mapped_type {
        Some(target) if !context.has_fake_data => Some(nullable(target, record.not_null)),
        _ => None,
    };

    let exclude = match record.constraint_kind {
        ConstraintKind::PrimaryKey => true,
        // Composite-indexed foreign keys stay in review
        ConstraintKind::ForeignKey => !multi_indexed && references_primary_key(record, all_columns),
        _ => false,
    };

    Classification {
        reasons,
        patch: TypePatch {
            source_type: record.source_type.clone(),
            not_null: record.not_null,
            obfuscated_type,
        },
        exclude,
    }
}

fn references_primary_key(record: &ColumnRecord, all_columns: &[ColumnRecord]) -> bool {
    let (Some(table), Some(column)) = (&record.foreign_table, &record.foreign_column) else {
        return false;
    };

    all_columns.iter().any(|candidate| {
        candidate.constraint_kind == ConstraintKind::PrimaryKey
            && &candidate.table == table
            && &candidate.column == column
    })
}

/// Gate flag for a classified column
pub fn needs_fix(
    excluded: bool,
    skip_obfuscation: bool,
    has_fake_data: bool,
    reasons: &[Reason],
) -> bool {
    !excluded && !skip_obfuscation && !has_fake_data && !reasons.is_empty()
}

/// All records of one physical column, combined
#[derive(Debug, Clone)]
pub struct FoldedColumn<'a> {
    pub table: &'a str,
    pub column: &'a str,
    /// Union of the reasons of every record, in rule order
    pub reasons: Vec<Reason>,
    pub patch: TypePatch,
    /// True if any record excludes the column
    pub exclude: bool,
    pub records: Vec<&'a ColumnRecord>,
}

/// Fold the classifications of the records of one column
///
/// `parts` must be non-empty and all refer to the same `(table, column)`.
pub fn fold_column<'a>(parts: Vec<(&'a ColumnRecord, Classification)>) -> Option<FoldedColumn<'a>> {
    let mut iter = parts.into_iter();
    let (first, first_class) = iter.next()?;

    let mut reasons: BTreeSet<Reason> = first_class.reasons.into_iter().collect();
    let mut exclude = first_class.exclude;
    let mut records = vec![first];

    for (record, classification) in iter {
        reasons.extend(classification.reasons);
        exclude |= classification.exclude;
        records.push(record);
    }

    Some(FoldedColumn {
        table: &first.table,
        column: &first.column,
        reasons: reasons.into_iter().collect(),
        patch: first_class.patch,
        exclude,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obfuscation::type_map::default_type_map;

    fn context(map: &BTreeMap<String, String>) -> ClassificationContext<'_> {
        ClassificationContext {
            type_map: map,
            has_fake_data: false,
        }
    }

    #[test]
    fn test_plain_mapped_column_has_no_reasons() {
        let map = default_type_map();
        let record = ColumnRecord::new(2, "users", "name", "varchar", false);
        let result = classify(&record, &[record.clone()], context(&map));

        assert!(result.reasons.is_empty());
        assert!(!result.exclude);
        assert_eq!(
            result.patch.obfuscated_type.as_deref(),
            Some("Nullable(String)")
        );
    }

    #[test]
    fn test_reasons_accumulate_in_rule_order() {
        let map = default_type_map();
        let record = ColumnRecord::new(3, "users", "code", "bpchar", true)
            .with_constraint(ConstraintKind::UniqueKey)
            .with_index(vec![3, 4], true, "CREATE UNIQUE INDEX code_idx ON users (code, org)");
        let result = classify(&record, &[record.clone()], context(&map));

        assert_eq!(
            result.reasons,
            vec![
                Reason::UnknownDataType,
                Reason::Constraint(ConstraintKind::UniqueKey),
                Reason::UniqueIndex,
                Reason::IndexingFewColumns,
            ]
        );
        assert!(result.patch.obfuscated_type.is_none());
    }

    #[test]
    fn test_fake_data_leaves_type_unset() {
        let map = default_type_map();
        let record = ColumnRecord::new(2, "users", "phone", "varchar", true);
        let ctx = ClassificationContext {
            type_map: &map,
            has_fake_data: true,
        };
        let result = classify(&record, &[record.clone()], ctx);
        assert!(result.patch.obfuscated_type.is_none());
    }

    #[test]
    fn test_foreign_key_to_non_primary_is_kept() {
        let map = default_type_map();
        let target = ColumnRecord::new(2, "customers", "code", "varchar", true)
            .with_constraint(ConstraintKind::UniqueKey);
        let fk = ColumnRecord::new(3, "orders", "customer_code", "varchar", true)
            .with_foreign_key("customers", "code");
        let all = vec![target, fk.clone()];

        let result = classify(&fk, &all, context(&map));
        assert!(!result.exclude);
    }

    #[test]
    fn test_needs_fix_gate() {
        let reasons = [Reason::UniqueIndex];
        assert!(needs_fix(false, false, false, &reasons));
        assert!(!needs_fix(true, false, false, &reasons));
        assert!(!needs_fix(false, true, false, &reasons));
        assert!(!needs_fix(false, false, true, &reasons));
        assert!(!needs_fix(false, false, false, &[]));
    }

    #[test]
    fn test_fold_unions_reasons_and_keeps_exclusion() {
        let map = default_type_map();
        let pk = ColumnRecord::new(1, "users", "id", "int8", true)
            .with_constraint(ConstraintKind::PrimaryKey);
        let indexed = ColumnRecord::new(1, "users", "id", "int8", true)
            .with_index(vec![1], true, "CREATE UNIQUE INDEX users_pkey ON users (id)");
        let all = vec![pk.clone(), indexed.clone()];

        let parts = vec![
            (&all[1], classify(&indexed, &all, context(&map))),
            (&all[0], classify(&pk, &all, context(&map))),
        ];
        let folded = fold_column(parts).unwrap();

        assert!(folded.exclude);
        assert_eq!(
            folded.reasons,
            vec![Reason::Constraint(ConstraintKind::PrimaryKey), Reason::UniqueIndex]
        );
        assert_eq!(folded.records.len(), 2);
    }

    #[test]
    fn test_fold_empty_is_none() {
        assert!(fold_column(Vec::new()).is_none());
    }
}
