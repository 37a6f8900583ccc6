//! System catalog queries
//!
//! Column metadata comes back one row per (column, constraint, index)
//! combination, ordered by table name then ordinal.

use tokio_postgres::Row;

use crate::domain::{ColumnRecord, ConstraintKind, ObfuscatorError, Result, SequenceRecord};

pub const COLUMNS_QUERY: &str = r#"
SELECT
    f.attnum::int4 AS id,
    c.relname::text AS table_name,
    f.attname::text AS column_name,
    t.typname::text AS data_type,
    f.attnotnull AS not_null,
    ix.indkey::int2[]::int4[] AS indexing_ids,
    ixs.indexdef AS index_definition,
    (i.oid IS NOT NULL) AS is_index,
    ix.indisunique AS is_unique_index,
    p.contype::text AS constraint_type,
    g.relname::text AS foreign_table,
    fa.attname::text AS foreign_column
FROM pg_attribute f
    JOIN pg_class c ON c.oid = f.attrelid
    JOIN pg_type t ON t.oid = f.atttypid
    JOIN pg_namespace n ON n.oid = c.relnamespace
    LEFT JOIN pg_constraint p ON p.conrelid = c.oid
        AND f.attnum = ANY (p.conkey)
    LEFT JOIN pg_class g ON g.oid = p.confrelid
    LEFT JOIN pg_attribute fa ON fa.attrelid = p.confrelid
        AND fa.attnum = p.confkey[array_position(p.conkey, f.attnum)]
    LEFT JOIN pg_index ix ON ix.indrelid = c.oid
        AND f.attnum = ANY (ix.indkey)
    LEFT JOIN pg_class i ON i.oid = ix.indexrelid
    LEFT JOIN pg_indexes ixs ON ixs.schemaname = n.nspname
        AND ixs.indexname = i.relname
WHERE c.relkind = 'r'
    AND n.nspname = $1
    AND f.attnum > 0
    AND NOT f.attisdropped
ORDER BY c.relname, f.attnum
"#;

pub const SEQUENCES_QUERY: &str = r#"
SELECT
    seqclass.relname::text AS sequence_name,
    depclass.relname::text AS table_name,
    attrib.attname::text AS column_name
FROM pg_class seqclass
    JOIN pg_sequence seq ON seq.seqrelid = seqclass.oid
    JOIN pg_depend dep ON dep.objid = seq.seqrelid
        AND dep.classid = 'pg_class'::regclass
        AND dep.refclassid = 'pg_class'::regclass
    JOIN pg_class depclass ON depclass.oid = dep.refobjid
    JOIN pg_namespace n ON n.oid = depclass.relnamespace
    JOIN pg_attribute attrib ON attrib.attrelid = dep.refobjid
        AND attrib.attnum = dep.refobjsubid
WHERE n.nspname = $1
ORDER BY depclass.relname, seqclass.relname
"#;

pub const TABLE_EXISTS_QUERY: &str = r#"
SELECT EXISTS (
    SELECT 1 FROM information_schema.tables
    WHERE table_schema = $1 AND table_name = $2
)
"#;

fn column<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| ObfuscatorError::Database(format!("Unexpected catalog column '{name}': {e}")))
}

pub fn column_from_row(row: &Row) -> Result<ColumnRecord> {
    let contype: Option<String> = column(row, "constraint_type")?;
    let is_index: bool = column(row, "is_index")?;

    Ok(ColumnRecord {
        id: column(row, "id")?,
        table: column(row, "table_name")?,
        column: column(row, "column_name")?,
        source_type: column(row, "data_type")?,
        not_null: column(row, "not_null")?,
        index_member_ids: column::<Option<Vec<i32>>>(row, "indexing_ids")?.unwrap_or_default(),
        index_definition: column(row, "index_definition")?,
        is_indexed: is_index,
        is_unique_indexed: is_index && column::<Option<bool>>(row, "is_unique_index")?.unwrap_or(false),
        constraint_kind: ConstraintKind::from_contype(contype.as_deref()),
        foreign_table: column(row, "foreign_table")?,
        foreign_column: column(row, "foreign_column")?,
    })
}

pub fn sequence_from_row(row: &Row) -> Result<SequenceRecord> {
    Ok(SequenceRecord {
        sequence_name: column(row, "sequence_name")?,
        table_name: column(row, "table_name")?,
        column_name: column(row, "column_name")?,
    })
}
