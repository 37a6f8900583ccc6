//! Obfuscate stage
//!
//! Feeds a table's obfuscate stream through the [`Anonymizer`] and checks the
//! shape of what comes back. A failed or malformed run never falls back to
//! the unobfuscated data.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::adapters::delegate::{AnonymizeRequest, Anonymizer};
use crate::core::pipeline::export::remove_if_exists;
use crate::core::pipeline::layout::{Stream, TablesLayout};
use crate::core::pipeline::retry::{retry_transient, with_timeout, RetryPolicy};
use crate::domain::{ObfuscatorError, Result};
use crate::obfuscation::model::TableConfig;
use crate::{log_table_complete, log_table_start};

#[derive(Debug, Clone)]
pub struct ObfuscateSettings {
    pub delegate_timeout: Duration,
    pub retry: RetryPolicy,
}

/// `"<col> <type>, ..."` for the given obfuscate-stream columns
pub fn build_structure(table_name: &str, table: &TableConfig, columns: &[String]) -> Result<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for name in columns {
        let target = table
            .columns
            .get(name)
            .and_then(|c| c.obfuscated_type.as_deref())
            .ok_or_else(|| {
                ObfuscatorError::Configuration(format!(
                    "Column '{table_name}.{name}' has no obfuscated_type"
                ))
            })?;
        parts.push(format!("{name} {target}"));
    }
    Ok(parts.join(", "))
}

/// Produce the obfuscated stream of one table
///
/// Returns the number of data rows written, or `None` when the table has no
/// obfuscate columns.
pub async fn obfuscate_table(
    anonymizer: &dyn Anonymizer,
    settings: &ObfuscateSettings,
    layout: &TablesLayout,
    table_name: &str,
    table: &TableConfig,
    obfuscate_headers: &[String],
    skip_obfuscation: bool,
) -> Result<Option<u64>> {
    let input = layout.file(Stream::Source, table_name);
    let output = layout.file(Stream::Obfuscated, table_name);
    remove_if_exists(&output)?;

    if obfuscate_headers.is_empty() {
        return Ok(None);
    }
    if !input.exists() {
        return Err(ObfuscatorError::Configuration(format!(
            "Export stream {} is missing (run export-tables first)",
            input.display()
        )));
    }

    log_table_start!(table_name, "obfuscate");
    let started = Instant::now();

    let rows = if skip_obfuscation {
        tracing::debug!(table = %table_name, "Obfuscation skipped, copying stream");
        std::fs::copy(&input, &output)?;
        let (_, rows) = blocking_inspect(output.clone()).await?;
        rows
    } else {
        let request = AnonymizeRequest {
            table: table_name.to_string(),
            structure: build_structure(table_name, table, obfuscate_headers)?,
            input,
            output: output.clone(),
        };
        match run_delegate(anonymizer, settings, &request, obfuscate_headers).await {
            Ok(rows) => rows,
            Err(e) => {
                remove_if_exists(&output)?;
                return Err(e);
            }
        }
    };

    log_table_complete!(table_name, "obfuscate", rows, started.elapsed());
    Ok(Some(rows))
}

async fn run_delegate(
    anonymizer: &dyn Anonymizer,
    settings: &ObfuscateSettings,
    request: &AnonymizeRequest,
    expected_headers: &[String],
) -> Result<u64> {
    let what = format!("anonymization of table '{}'", request.table);
    retry_transient(&settings.retry, &what, || {
        with_timeout(settings.delegate_timeout, &what, anonymizer.anonymize(request))
    })
    .await?;

    let (input_header, input_rows) = blocking_inspect(request.input.clone()).await?;
    if input_header != expected_headers {
        return Err(ObfuscatorError::Configuration(format!(
            "Export stream for '{}' has header {:?}, manifest expects {:?}",
            request.table, input_header, expected_headers
        )));
    }

    let delegate_error = |message: String| ObfuscatorError::Delegate {
        table: request.table.clone(),
        message,
    };

    let (output_header, output_rows) = blocking_inspect(request.output.clone())
        .await
        .map_err(|e| delegate_error(format!("unreadable output: {e}")))?;

    if output_header != expected_headers {
        return Err(delegate_error(format!(
            "output header {output_header:?} does not match {expected_headers:?}"
        )));
    }
    if output_rows != input_rows {
        return Err(delegate_error(format!(
            "output has {output_rows} rows, input has {input_rows}"
        )));
    }

    Ok(output_rows)
}

async fn blocking_inspect(path: PathBuf) -> Result<(Vec<String>, u64)> {
    tokio::task::spawn_blocking(move || inspect_stream(&path))
        .await
        .map_err(|e| ObfuscatorError::Other(format!("Stream inspection task failed: {e}")))?
}

/// Header and data-row count of a CSV stream
///
/// Every row must have as many cells as the header.
pub fn inspect_stream(path: &Path) -> Result<(Vec<String>, u64)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records();
    let header: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => return Ok((Vec::new(), 0)),
    };

    let mut rows = 0u64;
    for record in records {
        let record = record?;
        rows += 1;
        if record.len() != header.len() {
            return Err(ObfuscatorError::Other(format!(
                "{}: row {rows} has {} cells, header has {}",
                path.display(),
                record.len(),
                header.len()
            )));
        }
    }

    Ok((header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obfuscation::model::ColumnConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes a fixed body to the output, optionally failing transiently first
    struct ScriptedAnonymizer {
        body: String,
        transient_failures: usize,
        calls: AtomicUsize,
    }

    impl ScriptedAnonymizer {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                transient_failures: 0,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Anonymizer for ScriptedAnonymizer {
        async fn anonymize(&self, request: &AnonymizeRequest) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.transient_failures {
                return Err(ObfuscatorError::TransientIo("spawn failed".to_string()));
            }
            std::fs::write(&request.output, &self.body)?;
            Ok(())
        }
    }

    fn settings() -> ObfuscateSettings {
        ObfuscateSettings {
            delegate_timeout: Duration::from_secs(5),
            retry: RetryPolicy {
                max_retries: 2,
                initial_delay_ms: 1,
                max_delay_ms: 1,
                backoff_multiplier: 1.0,
            },
        }
    }

    fn table() -> TableConfig {
        let mut table = TableConfig::default();
        for (name, target) in [("age", "Int8"), ("name", "Nullable(String)")] {
            table.columns.insert(
                name.to_string(),
                ColumnConfig {
                    source_type: "text".to_string(),
                    obfuscated_type: Some(target.to_string()),
                    ..ColumnConfig::default()
                },
            );
        }
        table
    }

    fn headers() -> Vec<String> {
        vec!["age".to_string(), "name".to_string()]
    }

    fn setup(source: &str) -> (TempDir, TablesLayout) {
        let dir = TempDir::new().unwrap();
        let layout = TablesLayout::new(dir.path());
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.file(Stream::Source, "people"), source).unwrap();
        (dir, layout)
    }

    #[test]
    fn test_build_structure() {
        let structure = build_structure("people", &table(), &headers()).unwrap();
        assert_eq!(structure, "age Int8, name Nullable(String)");

        let err = build_structure("people", &table(), &["missing".to_string()]).unwrap_err();
        assert!(matches!(err, ObfuscatorError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_delegate_output_accepted() {
        let (_dir, layout) = setup("age,name\n30,\"Ann\"\n41,\"Bob\"\n");
        let anonymizer = ScriptedAnonymizer::new("age,name\n12,\"Xyz\"\n77,\"Qrs\"\n");

        let rows = obfuscate_table(&anonymizer, &settings(), &layout, "people", &table(), &headers(), false)
            .await
            .unwrap();

        assert_eq!(rows, Some(2));
        let written = std::fs::read_to_string(layout.file(Stream::Obfuscated, "people")).unwrap();
        assert!(written.contains("Xyz"));
    }

    #[tokio::test]
    async fn test_row_count_mismatch_is_delegate_failure() {
        let (_dir, layout) = setup("age,name\n30,\"Ann\"\n41,\"Bob\"\n");
        let anonymizer = ScriptedAnonymizer::new("age,name\n12,\"Xyz\"\n");

        let err = obfuscate_table(&anonymizer, &settings(), &layout, "people", &table(), &headers(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, ObfuscatorError::Delegate { .. }));
        assert!(!layout.file(Stream::Obfuscated, "people").exists());
    }

    #[tokio::test]
    async fn test_header_mismatch_is_delegate_failure() {
        let (_dir, layout) = setup("age,name\n30,\"Ann\"\n");
        let anonymizer = ScriptedAnonymizer::new("name,age\n\"Xyz\",12\n");

        let err = obfuscate_table(&anonymizer, &settings(), &layout, "people", &table(), &headers(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, ObfuscatorError::Delegate { .. }));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let (_dir, layout) = setup("age,name\n30,\"Ann\"\n");
        let mut anonymizer = ScriptedAnonymizer::new("age,name\n5,\"Q\"\n");
        anonymizer.transient_failures = 2;

        let rows = obfuscate_table(&anonymizer, &settings(), &layout, "people", &table(), &headers(), false)
            .await
            .unwrap();

        assert_eq!(rows, Some(1));
        assert_eq!(anonymizer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_skip_obfuscation_copies_stream() {
        let source = "age,name\n30,\"Ann\"\n";
        let (_dir, layout) = setup(source);
        let anonymizer = ScriptedAnonymizer::new("unused");

        let rows = obfuscate_table(&anonymizer, &settings(), &layout, "people", &table(), &headers(), true)
            .await
            .unwrap();

        assert_eq!(rows, Some(1));
        assert_eq!(anonymizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            std::fs::read_to_string(layout.file(Stream::Obfuscated, "people")).unwrap(),
            source
        );
    }

    #[tokio::test]
    async fn test_empty_obfuscate_set_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let layout = TablesLayout::new(dir.path());
        layout.ensure_dirs().unwrap();
        let anonymizer = ScriptedAnonymizer::new("unused");

        let rows = obfuscate_table(&anonymizer, &settings(), &layout, "ids_only", &TableConfig::default(), &[], false)
            .await
            .unwrap();

        assert_eq!(rows, None);
        assert!(!layout.file(Stream::Obfuscated, "ids_only").exists());
    }

    #[test]
    fn test_inspect_stream_rejects_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "a,b\n1,2\n3\n").unwrap();
        assert!(inspect_stream(&path).is_err());
    }
}
