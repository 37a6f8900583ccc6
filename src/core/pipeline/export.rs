//! Export stage
//!
//! Splits a table's columns into the obfuscate and preserve sets and writes
//! both streams from one database snapshot, ordered by the same key so the
//! merge can pair rows by position.

use std::time::{Duration, Instant};

use crate::adapters::database::traits::{CopyOutRequest, SourceDatabase};
use crate::adapters::postgresql::sql::{qualified, quote_ident};
use crate::core::pipeline::layout::{Stream, TablesLayout};
use crate::core::pipeline::manifest::TableHeaders;
use crate::core::pipeline::retry::{retry_transient, with_timeout, RetryPolicy};
use crate::domain::Result;
use crate::obfuscation::model::{ColumnConfig, TableConfig};
use crate::obfuscation::type_map::{is_string_like, is_timestamp};
use crate::{log_table_complete, log_table_start};

/// Format the delegate expects for `DateTime` values
pub const TIMESTAMP_FORMAT: &str = "YYYY-MM-DD HH24:MI:SS";

const TEXT_SOURCE_TYPES: &[&str] = &["varchar", "text", "citext", "bpchar", "char", "name"];

/// Split a table's columns into the two export streams
///
/// Obfuscate columns follow the column map order. Preserve columns are the
/// excluded columns first, then the fake-data columns, without duplicates.
pub fn partition_columns(table: &TableConfig) -> TableHeaders {
    let mut preserve: Vec<String> = table.excluded_columns.clone();
    for fake in table.fake_columns() {
        if !preserve.contains(&fake) {
            preserve.push(fake);
        }
    }

    let obfuscate = table
        .columns
        .keys()
        .filter(|name| !preserve.contains(name))
        .cloned()
        .collect();

    TableHeaders {
        obfuscate_headers: obfuscate,
        preserve_headers: preserve,
    }
}

/// Row order shared by both streams of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderingKey {
    /// Key columns, with `ctid` breaking ties between equal keys
    Columns(Vec<String>),
    /// Physical order; stable within one snapshot
    Ctid,
}

impl OrderingKey {
    fn to_sql(&self) -> String {
        match self {
            Self::Columns(columns) => columns
                .iter()
                .map(|c| quote_ident(c))
                .chain(std::iter::once("ctid".to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            Self::Ctid => "ctid".to_string(),
        }
    }
}

/// `order_by` when configured, else `id` when present, else `ctid`
pub fn ordering_key(table: &TableConfig) -> OrderingKey {
    match &table.order_by {
        Some(columns) if !columns.is_empty() => OrderingKey::Columns(columns.clone()),
        _ if table.columns.contains_key("id") => OrderingKey::Columns(vec!["id".to_string()]),
        _ => OrderingKey::Ctid,
    }
}

/// Build the `COPY (SELECT ...) TO STDOUT` statement for one stream
pub fn copy_statement(
    schema: &str,
    table_name: &str,
    table: &TableConfig,
    columns: &[String],
    order: &OrderingKey,
    render_timestamps: bool,
) -> String {
    let mut select = Vec::with_capacity(columns.len());
    let mut force_quote = Vec::new();

    for name in columns {
        let column = table.columns.get(name);
        let ident = quote_ident(name);

        let timestamp = render_timestamps && column.is_some_and(|c| is_timestamp(&c.source_type));
        if timestamp {
            select.push(format!("to_char({ident}, '{TIMESTAMP_FORMAT}') AS {ident}"));
        } else {
            select.push(ident.clone());
        }

        if column.is_some_and(is_text_column) {
            force_quote.push(ident);
        }
    }

    let mut options = vec![
        "FORMAT csv".to_string(),
        "HEADER true".to_string(),
        "NULL '\\N'".to_string(),
    ];
    if !force_quote.is_empty() {
        options.push(format!("FORCE_QUOTE ({})", force_quote.join(", ")));
    }

    format!(
        "COPY (SELECT {} FROM {} ORDER BY {}) TO STDOUT WITH ({})",
        select.join(", "),
        qualified(schema, table_name),
        order.to_sql(),
        options.join(", ")
    )
}

fn is_text_column(column: &ColumnConfig) -> bool {
    match &column.obfuscated_type {
        Some(target) => is_string_like(target),
        None => TEXT_SOURCE_TYPES.contains(&column.source_type.as_str()),
    }
}

/// Row counts written for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub obfuscate_rows: Option<u64>,
    pub preserve_rows: Option<u64>,
}

/// Settings shared by every table export of a run
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub schema: String,
    pub copy_timeout: Duration,
    pub retry: RetryPolicy,
}

/// Export both streams of one table
///
/// An empty column set writes no file for that stream. A `verbatim` table
/// bypasses the delegate, so its timestamps keep their native rendering.
pub async fn export_table(
    source: &dyn SourceDatabase,
    settings: &ExportSettings,
    layout: &TablesLayout,
    table_name: &str,
    table: &TableConfig,
    verbatim: bool,
) -> Result<ExportOutcome> {
    log_table_start!(table_name, "export");
    let started = Instant::now();

    let headers = partition_columns(table);
    let order = ordering_key(table);

    let mut requests = Vec::with_capacity(2);
    if !headers.obfuscate_headers.is_empty() {
        requests.push(CopyOutRequest {
            statement: copy_statement(&settings.schema, table_name, table, &headers.obfuscate_headers, &order, !verbatim),
            output: layout.file(Stream::Source, table_name),
        });
    }
    if !headers.preserve_headers.is_empty() {
        requests.push(CopyOutRequest {
            statement: copy_statement(&settings.schema, table_name, table, &headers.preserve_headers, &order, false),
            output: layout.file(Stream::Excluded, table_name),
        });
    }

    if requests.is_empty() {
        tracing::warn!(table = %table_name, "Table has no columns, nothing to export");
        return Ok(ExportOutcome {
            obfuscate_rows: None,
            preserve_rows: None,
        });
    }

    // Stale files from an earlier run must not be mistaken for this run's output
    for stream in [Stream::Source, Stream::Excluded] {
        remove_if_exists(&layout.file(stream, table_name))?;
    }

    let what = format!("export of table '{table_name}'");
    let counts = retry_transient(&settings.retry, &what, || {
        with_timeout(settings.copy_timeout, &what, source.copy_out_snapshot(&requests))
    })
    .await?;

    let mut counts = counts.into_iter();
    let obfuscate_rows = if headers.obfuscate_headers.is_empty() {
        None
    } else {
        counts.next()
    };
    let preserve_rows = if headers.preserve_headers.is_empty() {
        None
    } else {
        counts.next()
    };

    log_table_complete!(
        table_name,
        "export",
        obfuscate_rows.or(preserve_rows).unwrap_or(0),
        started.elapsed()
    );

    Ok(ExportOutcome {
        obfuscate_rows,
        preserve_rows,
    })
}

pub(crate) fn remove_if_exists(path: &std::path::Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obfuscation::model::{FakeKind, FakeOverride};

    fn column(source_type: &str, obfuscated_type: Option<&str>) -> ColumnConfig {
        ColumnConfig {
            source_type: source_type.to_string(),
            not_null: true,
            obfuscated_type: obfuscated_type.map(str::to_string),
            need_fix: false,
            fake_data: None,
        }
    }

    fn users() -> TableConfig {
        let mut table = TableConfig::default();
        table.columns.insert("id".to_string(), column("int8", None));
        table.columns.insert("name".to_string(), column("varchar", Some("String")));
        table.columns.insert("created_at".to_string(), column("timestamp", Some("DateTime")));
        let mut email = column("varchar", None);
        email.fake_data = Some(FakeOverride {
            kind: FakeKind::Pattern,
            value: "user-%{id}".to_string(),
        });
        table.columns.insert("email".to_string(), email);
        table.exclude("id");
        table
    }

    #[test]
    fn test_partition_columns() {
        let headers = partition_columns(&users());
        assert_eq!(headers.obfuscate_headers, vec!["created_at".to_string(), "name".to_string()]);
        assert_eq!(headers.preserve_headers, vec!["id".to_string(), "email".to_string()]);
    }

    #[test]
    fn test_partition_deduplicates_excluded_fake_column() {
        let mut table = users();
        table.exclude("email");
        let headers = partition_columns(&table);
        assert_eq!(headers.preserve_headers, vec!["id".to_string(), "email".to_string()]);
    }

    #[test]
    fn test_ordering_key_selection() {
        let mut table = users();
        assert_eq!(ordering_key(&table), OrderingKey::Columns(vec!["id".to_string()]));

        table.order_by = Some(vec!["created_at".to_string(), "name".to_string()]);
        assert_eq!(
            ordering_key(&table),
            OrderingKey::Columns(vec!["created_at".to_string(), "name".to_string()])
        );

        let mut no_id = TableConfig::default();
        no_id.columns.insert("code".to_string(), column("text", Some("String")));
        assert_eq!(ordering_key(&no_id), OrderingKey::Ctid);
    }

    #[test]
    fn test_copy_statement_obfuscate_stream() {
        let table = users();
        let headers = partition_columns(&table);
        let sql = copy_statement("public", "users", &table, &headers.obfuscate_headers, &ordering_key(&table), true);

        assert_eq!(
            sql,
            "COPY (SELECT to_char(\"created_at\", 'YYYY-MM-DD HH24:MI:SS') AS \"created_at\", \"name\" \
             FROM \"public\".\"users\" ORDER BY \"id\", ctid) TO STDOUT \
             WITH (FORMAT csv, HEADER true, NULL '\\N', FORCE_QUOTE (\"name\"))"
        );
    }

    #[test]
    fn test_copy_statement_preserve_stream_keeps_raw_values() {
        let table = users();
        let headers = partition_columns(&table);
        let sql = copy_statement("app", "users", &table, &headers.preserve_headers, &OrderingKey::Ctid, false);

        assert!(sql.starts_with("COPY (SELECT \"id\", \"email\" FROM \"app\".\"users\" ORDER BY ctid)"));
        assert!(sql.contains("FORCE_QUOTE (\"email\")"));
        assert!(!sql.contains("to_char"));
    }

    #[test]
    fn test_order_by_columns_break_ties_on_ctid() {
        let mut table = users();
        table.order_by = Some(vec!["created_at".to_string()]);
        let sql = copy_statement("public", "users", &table, &["name".to_string()], &ordering_key(&table), true);
        assert!(sql.contains("ORDER BY \"created_at\", ctid)"));
    }

    /// Records the statements of one snapshot
    #[derive(Default)]
    struct CapturingSource {
        statements: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SourceDatabase for CapturingSource {
        async fn fetch_columns(&self, _schema: &str) -> Result<Vec<crate::domain::ColumnRecord>> {
            Ok(Vec::new())
        }

        async fn copy_out_snapshot(&self, requests: &[CopyOutRequest]) -> Result<Vec<u64>> {
            let mut statements = self.statements.lock().unwrap();
            statements.extend(requests.iter().map(|r| r.statement.clone()));
            Ok(vec![0; requests.len()])
        }
    }

    fn settings() -> ExportSettings {
        ExportSettings {
            schema: "public".to_string(),
            copy_timeout: Duration::from_secs(5),
            retry: RetryPolicy::none(),
        }
    }

    #[tokio::test]
    async fn test_verbatim_table_keeps_native_timestamps() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = TablesLayout::new(dir.path());
        layout.ensure_dirs().unwrap();
        let source = CapturingSource::default();

        export_table(&source, &settings(), &layout, "users", &users(), true)
            .await
            .unwrap();
        export_table(&source, &settings(), &layout, "users", &users(), false)
            .await
            .unwrap();

        let statements = source.statements.lock().unwrap();
        assert!(!statements[0].contains("to_char"));
        assert!(statements[2].contains("to_char(\"created_at\""));
    }
}
