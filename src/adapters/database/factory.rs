//! Database client factory
//!
//! Builds the trait objects the commands work with from the application
//! configuration.

use crate::adapters::database::traits::{SourceDatabase, TargetDatabase};
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::config::ObfuscatorConfig;
use crate::domain::{ObfuscatorError, Result};
use std::sync::Arc;

/// Create the client for the `[source]` database
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn create_source(config: &ObfuscatorConfig) -> Result<Arc<dyn SourceDatabase>> {
    let client = PostgreSQLClient::new(config.source.clone())?;
    tracing::info!(database = %client.connection_string_safe(), "Connecting to source database");
    client.test_connection().await?;

    Ok(Arc::new(PostgreSQLAdapter::new(client)))
}

/// Create the client for the `[target]` database
///
/// # Errors
///
/// Returns a configuration error when no `[target]` section is present.
pub async fn create_target(config: &ObfuscatorConfig) -> Result<Arc<dyn TargetDatabase>> {
    let target = config.target.as_ref().ok_or_else(|| {
        ObfuscatorError::Configuration("A [target] section is required for import".to_string())
    })?;

    let client = PostgreSQLClient::new(target.clone())?;
    tracing::info!(database = %client.connection_string_safe(), "Connecting to target database");
    client.test_connection().await?;

    Ok(Arc::new(PostgreSQLAdapter::new(client)))
}
