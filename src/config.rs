//! Run configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a valid
//! configuration:
//!
//! ```json
//! {
//!   "normalizer": { "default_servings": 1 },
//!   "execution": { "num_threads": 4, "chunk_size": 2048 },
//!   "rules_path": "rules.json"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::execution::ExecutionOptions;
use crate::normalize::NormalizerConfig;
use crate::rules::RuleSet;

/// Configuration for a [`crate::pipeline::Pipeline`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub normalizer: NormalizerConfig,
    /// Parallel validation settings. `None` validates each table sequentially.
    pub execution: Option<ExecutionOptions>,
    /// JSON rule set replacing the built-in rules.
    pub rules_path: Option<PathBuf>,
}

impl PipelineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(input: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Read a configuration file. A relative `rules_path` is resolved against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let mut config = Self::from_json_str(&text)?;
        if let (Some(rules), Some(dir)) = (&config.rules_path, path.parent()) {
            if rules.is_relative() {
                config.rules_path = Some(dir.join(rules));
            }
        }
        Ok(config)
    }

    /// Builder: enable parallel validation.
    pub fn with_execution(mut self, execution: ExecutionOptions) -> Self {
        self.execution = Some(execution);
        self
    }

    /// Builder: load rules from `path` instead of the built-in set.
    pub fn with_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    /// The rule set this configuration selects.
    pub fn rule_set(&self) -> PipelineResult<RuleSet> {
        match &self.rules_path {
            Some(path) => RuleSet::from_path(path),
            None => Ok(RuleSet::standard()),
        }
    }
}
