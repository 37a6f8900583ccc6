//! Result type alias for pg-obfuscator
//!
//! This module provides a convenient Result type alias that uses ObfuscatorError
//! as the error type.

use super::errors::ObfuscatorError;

/// Result type alias for pg-obfuscator operations
///
/// # Examples
///
/// ```
/// use pg_obfuscator::domain::result::Result;
/// use pg_obfuscator::domain::errors::ObfuscatorError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ObfuscatorError::Configuration("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ObfuscatorError>;
