//! Source column type to obfuscation type lookup

use std::collections::BTreeMap;

/// Built-in mapping from PostgreSQL `typname` to delegate structure types
pub const DEFAULT_DATA_TYPES: &[(&str, &str)] = &[
    ("citext", "String"),
    ("inet", "IPv4"),
    ("int2", "Int8"),
    ("int4", "Int8"),
    ("int8", "Int8"),
    ("varchar", "String"),
    ("timestamp", "DateTime"),
    ("text", "String"),
];

/// Owned copy of the built-in type map
pub fn default_type_map() -> BTreeMap<String, String> {
    DEFAULT_DATA_TYPES
        .iter()
        .map(|(source, target)| (source.to_string(), target.to_string()))
        .collect()
}

/// Wrap a target type as `Nullable(<type>)` unless the column is `NOT NULL`
pub fn nullable(target: &str, not_null: bool) -> String {
    if not_null {
        target.to_string()
    } else {
        format!("Nullable({target})")
    }
}

/// Strip a `Nullable(...)` wrapper, if any
pub fn base_type(target: &str) -> &str {
    target
        .strip_prefix("Nullable(")
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(target)
}

/// Target types written as quoted CSV strings in the obfuscate stream
pub fn is_string_like(target: &str) -> bool {
    matches!(base_type(target), "String" | "FixedString")
        || base_type(target).starts_with("FixedString(")
}

/// Source types rendered with a fixed timestamp format on export
pub fn is_timestamp(source_type: &str) -> bool {
    matches!(source_type, "timestamp" | "timestamptz")
}
