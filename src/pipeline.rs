//! One-call orchestration of a batch run: normalize, collect parent keys, validate, report.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::execution::{ExecutionEngine, TracingExecutionObserver};
use crate::normalize::{NormalizedBatch, Normalizer};
use crate::raw::RawBatch;
use crate::report::ValidationReport;
use crate::rules::{ParentKeys, RuleEngine};
use crate::tables::Table;
use crate::validation::{TablePartition, Validator};

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// One partition per table, in [`Table::ALL`] order.
    pub partitions: Vec<TablePartition>,
    pub report: ValidationReport,
}

impl PipelineOutput {
    pub fn partition(&self, table: Table) -> Option<&TablePartition> {
        self.partitions.iter().find(|p| p.table == table)
    }
}

/// A configured normalization and validation run.
#[derive(Debug)]
pub struct Pipeline {
    normalizer: Normalizer,
    validator: Validator,
    engine: Option<ExecutionEngine>,
}

impl Pipeline {
    /// Build a pipeline. Rule and execution configuration problems surface here, before any
    /// document is read.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        let rules = config.rule_set()?;
        let validator = Validator::new(RuleEngine::new(&rules)?);
        let engine = config
            .execution
            .map(|opts| {
                ExecutionEngine::new(opts)
                    .map(|e| e.with_observer(Arc::new(TracingExecutionObserver)))
            })
            .transpose()?;

        Ok(Self {
            normalizer: Normalizer::new(config.normalizer),
            validator,
            engine,
        })
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Normalize and validate a full batch.
    pub fn run(&self, batch: &RawBatch) -> PipelineResult<PipelineOutput> {
        let start = Instant::now();
        let normalized = self.normalizer.normalize_batch(batch);
        let output = self.validate(&normalized);
        info!(
            documents = batch.document_count(),
            rows = output.report.totals.rows_processed,
            clean = output.report.totals.clean_count,
            quarantined = output.report.totals.quarantine_count,
            elapsed = ?start.elapsed(),
            "pipeline run finished"
        );
        Ok(output)
    }

    /// Validate already normalized tables.
    pub fn validate(&self, normalized: &NormalizedBatch) -> PipelineOutput {
        let keys = ParentKeys::from_batch(normalized);
        let partitions: Vec<TablePartition> = Table::ALL
            .into_iter()
            .map(|table| {
                let rows = normalized.table(table);
                match &self.engine {
                    Some(engine) => engine.validate_parallel(&self.validator, table, rows, &keys),
                    None => self.validator.validate(table, rows, &keys),
                }
            })
            .collect();
        let report = ValidationReport::from_partitions(&partitions);
        PipelineOutput { partitions, report }
    }
}
