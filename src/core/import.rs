//! Import of the merged dataset into the target database
//!
//! Order matters: the pre-data schema section creates the tables, the data
//! goes in through `COPY`, and the post-data section adds constraints and
//! indexes afterwards so rows load without FK checks.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::adapters::database::traits::TargetDatabase;
use crate::adapters::postgresql::sql::{qualified, quote_ident};
use crate::core::pipeline::layout::{Stream, TablesLayout};
use crate::core::pipeline::manifest::HeaderManifest;
use crate::core::pipeline::retry::{retry_transient, with_timeout, RetryPolicy};
use crate::domain::{ObfuscatorError, Result};
use crate::obfuscation::store::ConfigStore;
use crate::{log_table_complete, log_table_start};

#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub schema: String,
    pub pre_data: PathBuf,
    pub post_data: PathBuf,
    pub copy_timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The target already holds the dataset; nothing was changed
    AlreadyImported { table: String },
    Imported { tables: usize, rows: u64, sequences: usize },
}

/// Drop psql meta-command lines (`\connect`, `\restrict`, ...) from a dump
pub fn strip_meta_commands(sql: &str) -> String {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with('\\'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `COPY ... FROM STDIN` for one result file
pub fn copy_in_statement(schema: &str, table: &str, columns: &[String]) -> String {
    let columns = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
    format!(
        "COPY {} ({columns}) FROM STDIN WITH (FORMAT csv, HEADER true, NULL '\\N')",
        qualified(schema, table)
    )
}

fn read_script(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ObfuscatorError::Configuration(format!(
            "Cannot read schema script {} (run export-schema first): {e}",
            path.display()
        ))
    })?;
    Ok(strip_meta_commands(&content))
}

pub async fn import_dataset(
    target: &dyn TargetDatabase,
    store: &ConfigStore,
    layout: &TablesLayout,
    settings: &ImportSettings,
) -> Result<ImportOutcome> {
    store.ensure_ready()?;
    let config = store.config();
    let manifest = HeaderManifest::load(layout.root())?;

    let tables: Vec<_> = manifest
        .tables
        .iter()
        .filter(|(name, _)| !config.is_skip_loading(name))
        .collect();

    if let Some((first, _)) = tables.first() {
        if target.table_exists(&settings.schema, first).await? {
            tracing::info!(table = %first, schema = %settings.schema, "Data already imported");
            return Ok(ImportOutcome::AlreadyImported {
                table: (*first).clone(),
            });
        }
    }

    // Fail before touching the target when an input is missing
    for (name, _) in &tables {
        let path = layout.file(Stream::Result, name);
        if !path.exists() {
            return Err(ObfuscatorError::Configuration(format!(
                "Result file {} is missing (run obfuscate first)",
                path.display()
            )));
        }
    }
    let pre_data = read_script(&settings.pre_data)?;
    let post_data = read_script(&settings.post_data)?;

    let started = Instant::now();
    tracing::info!(path = %settings.pre_data.display(), "Applying pre-data schema");
    target.batch_execute(&pre_data).await?;

    let mut rows = 0u64;
    for (name, headers) in &tables {
        log_table_start!(name, "import");
        let table_started = Instant::now();

        let statement = copy_in_statement(&settings.schema, name, &headers.merged());
        let input = layout.file(Stream::Result, name);
        let what = format!("import of table '{name}'");
        let copied = retry_transient(&settings.retry, &what, || {
            with_timeout(settings.copy_timeout, &what, target.copy_in(&statement, &input))
        })
        .await?;

        log_table_complete!(name, "import", copied, table_started.elapsed());
        rows += copied;
    }

    tracing::info!(path = %settings.post_data.display(), "Applying post-data schema");
    target.batch_execute(&post_data).await?;

    let sequences = target.fetch_sequences(&settings.schema).await?;
    for sequence in &sequences {
        target.reset_sequence(&settings.schema, sequence).await?;
    }
    tracing::info!(sequences = sequences.len(), "Sequences reset");

    tracing::info!(
        tables = tables.len(),
        rows,
        duration_secs = started.elapsed().as_secs(),
        "Import completed"
    );

    Ok(ImportOutcome::Imported {
        tables: tables.len(),
        rows,
        sequences: sequences.len(),
    })
}
