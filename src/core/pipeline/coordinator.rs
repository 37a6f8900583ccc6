//! Pipeline coordinator - runs the per-table stages over a worker pool
//!
//! Tables are independent: a failure in one is recorded in the
//! [`PipelineSummary`] and the others carry on. Within a table the stages
//! run in order (export, obfuscate, merge).

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::adapters::database::traits::SourceDatabase;
use crate::adapters::delegate::Anonymizer;
use crate::config::ObfuscatorConfig;
use crate::core::pipeline::export::{export_table, partition_columns, ExportSettings};
use crate::core::pipeline::layout::TablesLayout;
use crate::core::pipeline::manifest::{HeaderManifest, TableHeaders};
use crate::core::pipeline::merge::{merge_table, resolve_fakes};
use crate::core::pipeline::obfuscate::{obfuscate_table, ObfuscateSettings};
use crate::core::pipeline::retry::RetryPolicy;
use crate::core::pipeline::summary::{PipelineSummary, Stage, TableFailure};
use crate::domain::{ObfuscatorError, Result};
use crate::obfuscation::fake::{FakeGenerators, ResolvedFake};
use crate::obfuscation::model::GlobalConfig;
use crate::obfuscation::store::ConfigStore;

/// Worker pool and per-stage settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub concurrency: usize,
    pub export: ExportSettings,
    pub obfuscate: ObfuscateSettings,
}

impl PipelineSettings {
    pub fn from_config(config: &ObfuscatorConfig) -> Self {
        let retry = RetryPolicy::from(&config.pipeline.retry);
        Self {
            concurrency: config.pipeline.concurrency,
            export: ExportSettings {
                schema: config.source.schema.clone(),
                copy_timeout: Duration::from_secs(config.pipeline.copy_timeout_seconds),
                retry: retry.clone(),
            },
            obfuscate: ObfuscateSettings {
                delegate_timeout: Duration::from_secs(config.pipeline.delegate_timeout_seconds),
                retry,
            },
        }
    }
}

enum TableOutcome {
    Done { table: String, rows: u64 },
    Failed(TableFailure),
    NotStarted(String),
}

/// Which stages a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Export,
    Obfuscate,
    All,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Obfuscate => "obfuscate",
            Self::All => "run",
        }
    }
}

pub struct PipelineCoordinator {
    config: Arc<GlobalConfig>,
    layout: TablesLayout,
    settings: PipelineSettings,
    fakes: HashMap<String, Vec<(String, ResolvedFake)>>,
    generators: Arc<Mutex<FakeGenerators>>,
    shutdown: watch::Receiver<bool>,
}

impl PipelineCoordinator {
    /// Refuses to start unless the configuration is ready
    pub fn new(
        store: &ConfigStore,
        layout: TablesLayout,
        settings: PipelineSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        store.ensure_ready()?;

        let config = store.config().clone();
        let fakes = config
            .loadable_tables()
            .map(|(name, table)| Ok((name.clone(), resolve_fakes(table)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            config: Arc::new(config),
            layout,
            settings,
            fakes,
            generators: Arc::new(Mutex::new(FakeGenerators::new())),
            shutdown,
        })
    }

    /// Export every loadable table and write the header manifest
    pub async fn run_export(&self, source: &dyn SourceDatabase) -> Result<PipelineSummary> {
        self.prepare_export()?;
        Ok(self.run(Phase::Export, Some(source), None).await)
    }

    /// Obfuscate and merge tables exported by an earlier run
    pub async fn run_obfuscation(&self, anonymizer: &dyn Anonymizer) -> Result<PipelineSummary> {
        self.layout.ensure_dirs()?;
        Ok(self.run(Phase::Obfuscate, None, Some(anonymizer)).await)
    }

    /// Export, obfuscate and merge every loadable table
    pub async fn run_all(
        &self,
        source: &dyn SourceDatabase,
        anonymizer: &dyn Anonymizer,
    ) -> Result<PipelineSummary> {
        self.prepare_export()?;
        Ok(self.run(Phase::All, Some(source), Some(anonymizer)).await)
    }

    fn prepare_export(&self) -> Result<()> {
        self.layout.ensure_dirs()?;
        let manifest = HeaderManifest {
            tables: self
                .config
                .loadable_tables()
                .map(|(name, table)| (name.clone(), partition_columns(table)))
                .collect(),
        };
        manifest.save(self.layout.root())
    }

    async fn run(
        &self,
        phase: Phase,
        source: Option<&dyn SourceDatabase>,
        anonymizer: Option<&dyn Anonymizer>,
    ) -> PipelineSummary {
        let started = Instant::now();
        let tables: Vec<String> = self.config.loadable_tables().map(|(name, _)| name.clone()).collect();

        tracing::info!(
            phase = phase.as_str(),
            tables = tables.len(),
            concurrency = self.settings.concurrency,
            "Starting pipeline"
        );

        // Manifest only matters once data has been exported
        let manifest = if phase == Phase::Obfuscate {
            match HeaderManifest::load(self.layout.root()) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    let mut summary = PipelineSummary::new();
                    for table in &tables {
                        summary.record_failure(TableFailure::new(table.clone(), Stage::Obfuscate, &e));
                    }
                    return summary.with_duration(started.elapsed());
                }
            }
        } else {
            None
        };

        let jobs = tables.into_iter().map(|table| {
            let manifest = manifest.as_ref();
            async move {
                if *self.shutdown.borrow() {
                    return TableOutcome::NotStarted(table);
                }
                self.process_table(phase, table, source, anonymizer, manifest).await
            }
        });

        let mut summary = PipelineSummary::new();
        let mut outcomes = stream::iter(jobs).buffer_unordered(self.settings.concurrency.max(1));
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                TableOutcome::Done { table, rows } => summary.record_success(table, rows),
                TableOutcome::Failed(failure) => {
                    tracing::error!(
                        table = %failure.table,
                        stage = %failure.stage,
                        error = %failure.message,
                        "Table failed"
                    );
                    summary.record_failure(failure);
                }
                TableOutcome::NotStarted(table) => summary.not_started.push(table),
            }
        }

        summary.interrupted = !summary.not_started.is_empty() || *self.shutdown.borrow();
        summary.sort();
        let summary = summary.with_duration(started.elapsed());
        summary.log_summary(phase.as_str());
        summary
    }

    async fn process_table(
        &self,
        phase: Phase,
        table_name: String,
        source: Option<&dyn SourceDatabase>,
        anonymizer: Option<&dyn Anonymizer>,
        manifest: Option<&HeaderManifest>,
    ) -> TableOutcome {
        let fail = |stage: Stage, e: &ObfuscatorError| {
            TableOutcome::Failed(TableFailure::new(table_name.clone(), stage, e))
        };

        let Some(table) = self.config.tables.get(&table_name) else {
            let e = ObfuscatorError::Configuration(format!("Table '{table_name}' is not configured"));
            return fail(Stage::Export, &e);
        };

        let headers = match manifest {
            Some(manifest) => match manifest.get(&table_name) {
                Ok(headers) => headers.clone(),
                Err(e) => return fail(Stage::Obfuscate, &e),
            },
            None => partition_columns(table),
        };

        let mut rows = 0;

        if let Some(source) = source.filter(|_| phase != Phase::Obfuscate) {
            let verbatim = self.config.is_skip_obfuscation(&table_name);
            match export_table(source, &self.settings.export, &self.layout, &table_name, table, verbatim).await {
                Ok(outcome) => rows = outcome.obfuscate_rows.or(outcome.preserve_rows).unwrap_or(0),
                Err(e) => return fail(Stage::Export, &e),
            }
        }

        if phase == Phase::Export {
            return TableOutcome::Done { table: table_name.clone(), rows };
        }

        if headers.merged().is_empty() {
            tracing::warn!(table = %table_name, "Table has no columns, skipping");
            return TableOutcome::Done { table: table_name.clone(), rows: 0 };
        }

        let Some(anonymizer) = anonymizer else {
            let e = ObfuscatorError::Other("No anonymizer configured".to_string());
            return fail(Stage::Obfuscate, &e);
        };

        let skip_obfuscation = self.config.is_skip_obfuscation(&table_name);
        if let Err(e) = obfuscate_table(
            anonymizer,
            &self.settings.obfuscate,
            &self.layout,
            &table_name,
            table,
            &headers.obfuscate_headers,
            skip_obfuscation,
        )
        .await
        {
            return fail(Stage::Obfuscate, &e);
        }

        match self.merge(&table_name, headers).await {
            Ok(merged) => TableOutcome::Done {
                table: table_name.clone(),
                rows: merged,
            },
            Err(e) => fail(Stage::Merge, &e),
        }
    }

    async fn merge(&self, table_name: &str, headers: TableHeaders) -> Result<u64> {
        let layout = self.layout.clone();
        let table = table_name.to_string();
        let fakes = self.fakes.get(table_name).cloned().unwrap_or_default();
        let generators = Arc::clone(&self.generators);

        tokio::task::spawn_blocking(move || merge_table(&layout, &table, &headers, &fakes, &generators))
            .await
            .map_err(|e| ObfuscatorError::Other(format!("Merge task failed: {e}")))?
    }
}
