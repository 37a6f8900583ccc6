//! Anonymization delegate
//!
//! The obfuscate stage hands each table's obfuscate stream to an external
//! tool through the [`Anonymizer`] trait.

pub mod clickhouse;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::Result;

pub use clickhouse::ClickHouseObfuscator;

/// One delegate invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymizeRequest {
    pub table: String,
    /// `"<col> <type>, ..."` in obfuscate-stream column order
    pub structure: String,
    pub input: PathBuf,
    pub output: PathBuf,
}

#[async_trait]
pub trait Anonymizer: Send + Sync {
    /// Write an anonymized copy of `request.input` to `request.output`
    ///
    /// Spawn failures are reported as [`crate::domain::ObfuscatorError::TransientIo`];
    /// a failed run is a [`crate::domain::ObfuscatorError::Delegate`].
    async fn anonymize(&self, request: &AnonymizeRequest) -> Result<()>;
}
