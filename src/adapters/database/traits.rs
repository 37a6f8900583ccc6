//! Database abstraction traits
//!
//! The pipeline talks to PostgreSQL through these two traits so the stages
//! can be exercised against in-memory fakes.

use crate::domain::{ColumnRecord, Result, SequenceRecord};
use async_trait::async_trait;
use std::path::PathBuf;

/// One `COPY ... TO STDOUT` written to a local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutRequest {
    pub statement: String,
    pub output: PathBuf,
}

/// Database the schema scan and the export streams come from
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Column catalog of `schema`, ordered by table name then ordinal
    ///
    /// A column may appear several times, once per constraint/index it is
    /// part of.
    async fn fetch_columns(&self, schema: &str) -> Result<Vec<ColumnRecord>>;

    /// Run every copy inside one read-only snapshot
    ///
    /// Returns the number of rows each statement produced, in request order.
    async fn copy_out_snapshot(&self, requests: &[CopyOutRequest]) -> Result<Vec<u64>>;
}

/// Database the final dataset is imported into
#[async_trait]
pub trait TargetDatabase: Send + Sync {
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool>;

    /// Execute a multi-statement SQL script
    async fn batch_execute(&self, sql: &str) -> Result<()>;

    /// Stream a local CSV file through `COPY ... FROM STDIN`
    async fn copy_in(&self, statement: &str, input: &std::path::Path) -> Result<u64>;

    async fn fetch_sequences(&self, schema: &str) -> Result<Vec<SequenceRecord>>;

    /// Move a sequence to the current maximum of its owning column
    async fn reset_sequence(&self, schema: &str, sequence: &SequenceRecord) -> Result<()>;
}
