use std::fmt;

/// Batch-level precondition failures. Per-row merge problems are not errors:
/// they are reported as `RowAction::Failed` outcomes so one malformed row
/// cannot silently abort the whole import.
#[derive(Debug)]
pub enum MergeError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column name, key column listed as transient).
    ConfigValidation(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for MergeError {}
