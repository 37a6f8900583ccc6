//! Schema sections through `pg_dump`

use secrecy::ExposeSecret;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::DatabaseConfig;
use crate::domain::{ObfuscatorError, Result};

const PG_DUMP: &str = "pg_dump";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSection {
    /// Table definitions and everything they need
    PreData,
    /// Constraints, indexes and triggers
    PostData,
}

impl SchemaSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreData => "pre-data",
            Self::PostData => "post-data",
        }
    }
}

/// Arguments for one section dump, without the connection
pub fn dump_arguments(schema: &str, section: SchemaSection, output: &Path) -> Vec<String> {
    vec![
        format!("--section={}", section.as_str()),
        "--schema-only".to_string(),
        "--no-owner".to_string(),
        "--no-privileges".to_string(),
        "-n".to_string(),
        schema.to_string(),
        "-f".to_string(),
        output.display().to_string(),
    ]
}

/// Dump one schema section of `database` into `output`
pub async fn dump_schema_section(database: &DatabaseConfig, section: SchemaSection, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let finished = Command::new(PG_DUMP)
        .arg(format!("--dbname={}", database.connection_string.expose_secret().as_ref()))
        .args(dump_arguments(&database.schema, section, output))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ObfuscatorError::TransientIo(format!("Failed to spawn {PG_DUMP}: {e}")))?;

    if !finished.status.success() {
        return Err(ObfuscatorError::Database(format!(
            "{PG_DUMP} --section={} exited with {}: {}",
            section.as_str(),
            finished.status,
            String::from_utf8_lossy(&finished.stderr).trim()
        )));
    }

    tracing::info!(
        section = section.as_str(),
        schema = %database.schema,
        output = %output.display(),
        "Schema section saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_arguments() {
        let args = dump_arguments("app", SchemaSection::PostData, Path::new("work/post-data.sql"));
        assert_eq!(args[0], "--section=post-data");
        assert!(args.windows(2).any(|w| w[0] == "-n" && w[1] == "app"));
        assert_eq!(args.last().map(String::as_str), Some("work/post-data.sql"));
    }
}
