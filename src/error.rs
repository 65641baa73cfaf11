use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by pipeline functions.
///
/// Row-level problems (missing fields, bad values, broken foreign keys) are never reported
/// through this type: they are the quarantine path. Only I/O at the boundaries and a broken
/// engine configuration surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding or encoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A rule definition is unusable (unknown field, empty reason, inverted range, ...).
    ///
    /// This means the engine itself is broken, so the run is aborted before any row is read.
    #[error("invalid rule '{rule}': {message}")]
    RuleConfig { rule: String, message: String },

    /// Invalid pipeline configuration value.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl PipelineError {
    pub(crate) fn rule_config(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleConfig {
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
