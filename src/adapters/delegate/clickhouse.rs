//! `clickhouse-obfuscator` process delegate

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use std::process::Stdio;
use tokio::process::Command;

use super::{AnonymizeRequest, Anonymizer};
use crate::config::DelegateConfig;
use crate::domain::{ObfuscatorError, Result};

const SEED_BYTES: usize = 16;
const CSV_WITH_NAMES: &str = "CSVWithNames";

/// Runs the ClickHouse obfuscator binary once per table
#[derive(Debug, Clone)]
pub struct ClickHouseObfuscator {
    binary: String,
    extra_args: Vec<String>,
}

impl ClickHouseObfuscator {
    pub fn new(config: &DelegateConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    /// Arguments for one invocation; the seed is passed in so tests can pin it
    pub fn arguments(&self, structure: &str, seed: &str) -> Vec<String> {
        let mut args = vec![
            "--structure".to_string(),
            structure.to_string(),
            "--input-format".to_string(),
            CSV_WITH_NAMES.to_string(),
            "--output-format".to_string(),
            CSV_WITH_NAMES.to_string(),
            "--seed".to_string(),
            seed.to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Fresh random seed, base64-encoded
pub fn random_seed() -> String {
    let mut bytes = [0u8; SEED_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

#[async_trait]
impl Anonymizer for ClickHouseObfuscator {
    async fn anonymize(&self, request: &AnonymizeRequest) -> Result<()> {
        let input = std::fs::File::open(&request.input)?;
        let output = std::fs::File::create(&request.output)?;
        let args = self.arguments(&request.structure, &random_seed());

        tracing::debug!(
            table = %request.table,
            binary = %self.binary,
            structure = %request.structure,
            "Invoking anonymization delegate"
        );

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::from(input))
            .stdout(Stdio::from(output))
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ObfuscatorError::TransientIo(format!("Failed to spawn '{}': {e}", self.binary))
            })?;

        let finished = child.wait_with_output().await.map_err(|e| {
            ObfuscatorError::TransientIo(format!("Failed to wait for '{}': {e}", self.binary))
        })?;

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(ObfuscatorError::Delegate {
                table: request.table.clone(),
                message: format!("{} exited with {}: {}", self.binary, finished.status, stderr.trim()),
            });
        }

        Ok(())
    }
}
