//! Pipeline run summary
//!
//! Tracks which tables made it through and which failed, and at what stage.

use std::time::Duration;

use crate::domain::ObfuscatorError;

/// Pipeline stage a table failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Export,
    Obfuscate,
    Merge,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Obfuscate => "obfuscate",
            Self::Merge => "merge",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table that did not complete
#[derive(Debug, Clone)]
pub struct TableFailure {
    pub table: String,
    pub stage: Stage,
    /// [`ObfuscatorError::kind`] of the cause
    pub error_type: &'static str,
    pub message: String,
}

impl TableFailure {
    pub fn new(table: impl Into<String>, stage: Stage, error: &ObfuscatorError) -> Self {
        Self {
            table: table.into(),
            stage,
            error_type: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<TableFailure>,
    /// Tables never started because of a shutdown request
    pub not_started: Vec<String>,
    pub rows: u64,
    pub duration: Duration,
    pub interrupted: bool,
}

impl PipelineSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn record_success(&mut self, table: impl Into<String>, rows: u64) {
        self.succeeded.push(table.into());
        self.rows += rows;
    }

    pub fn record_failure(&mut self, failure: TableFailure) {
        self.failed.push(failure);
    }

    /// Order tables by name so repeated runs report identically
    pub fn sort(&mut self) {
        self.succeeded.sort();
        self.failed.sort_by(|a, b| a.table.cmp(&b.table));
        self.not_started.sort();
    }

    pub fn is_successful(&self) -> bool {
        self.failed.is_empty() && !self.interrupted
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            130
        } else if self.failed.is_empty() {
            0
        } else {
            1
        }
    }

    pub fn log_summary(&self, phase: &str) {
        tracing::info!(
            phase = %phase,
            succeeded = self.succeeded.len(),
            failed = self.failed.len(),
            not_started = self.not_started.len(),
            rows = self.rows,
            duration_secs = self.duration.as_secs(),
            "Pipeline phase completed"
        );

        for failure in &self.failed {
            tracing::warn!(
                table = %failure.table,
                stage = %failure.stage,
                error_type = failure.error_type,
                message = %failure.message,
                "Table failed"
            );
        }

        if self.interrupted {
            tracing::warn!(
                not_started = self.not_started.len(),
                "Run interrupted, remaining tables were not started"
            );
        }
    }
}
