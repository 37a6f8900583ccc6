//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ObfuscatorConfig;
use super::secret::secret_string;
use crate::domain::errors::ObfuscatorError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ObfuscatorConfig
/// 4. Applies environment variable overrides (PGOBF_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a referenced
/// environment variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use pg_obfuscator::config::loader::load_config;
///
/// let config = load_config("pg-obfuscator.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ObfuscatorConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ObfuscatorError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ObfuscatorError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: ObfuscatorConfig = toml::from_str(&contents)
        .map_err(|e| ObfuscatorError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        ObfuscatorError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ObfuscatorError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let substituted = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        result.push_str(&substituted);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ObfuscatorError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using PGOBF_* prefix
///
/// Environment variables follow the pattern: PGOBF_<SECTION>_<KEY>
/// For example: PGOBF_SOURCE_CONNECTION_STRING, PGOBF_PIPELINE_CONCURRENCY
fn apply_env_overrides(config: &mut ObfuscatorConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("PGOBF_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("PGOBF_APPLICATION_WORK_DIR") {
        config.application.work_dir = PathBuf::from(val);
    }

    // Source overrides
    if let Ok(val) = std::env::var("PGOBF_SOURCE_CONNECTION_STRING") {
        config.source.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("PGOBF_SOURCE_SCHEMA") {
        config.source.schema = val;
    }

    // Target overrides (only if a target is configured)
    if let Some(ref mut target) = config.target {
        if let Ok(val) = std::env::var("PGOBF_TARGET_CONNECTION_STRING") {
            target.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("PGOBF_TARGET_SCHEMA") {
            target.schema = val;
        }
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("PGOBF_PIPELINE_CONCURRENCY") {
        if let Ok(concurrency) = val.parse() {
            config.pipeline.concurrency = concurrency;
        }
    }
    if let Ok(val) = std::env::var("PGOBF_PIPELINE_RETRY_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.pipeline.retry.max_retries = retries;
        }
    }

    // Delegate overrides
    if let Ok(val) = std::env::var("PGOBF_DELEGATE_BINARY") {
        config.delegate.binary = val;
    }

    // Paths overrides
    if let Ok(val) = std::env::var("PGOBF_PATHS_TABLES_DIR") {
        config.paths.tables_dir = PathBuf::from(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("PGOBF_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("PGOBF_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
