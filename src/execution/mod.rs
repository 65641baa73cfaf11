//! Chunked parallel validation.
//!
//! [`ExecutionEngine::validate_parallel`] produces exactly the partition the sequential
//! [`Validator::validate`] produces: the table-wide context (uniqueness, parent keys) is
//! prepared once, chunks are evaluated on a rayon pool, and chunk results are stitched back in
//! row order.
//!
//! - `num_threads` sizes the pool
//! - `chunk_size` bounds the rows handled per task
//! - `max_in_flight_chunks` throttles concurrently evaluated chunks

mod observer;
mod semaphore;

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::rules::ParentKeys;
use crate::tables::Table;
use crate::types::DataSet;
use crate::validation::{TablePartition, Validator, partition_rows};

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, TracingExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Worker threads. `None` uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Rows per chunk.
    pub chunk_size: usize,
    /// Upper bound on concurrently evaluated chunks, on top of `num_threads`.
    pub max_in_flight_chunks: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = available_parallelism();
        Self {
            num_threads: Some(n),
            chunk_size: 4_096,
            max_in_flight_chunks: n,
        }
    }
}

impl ExecutionOptions {
    fn check(&self) -> PipelineResult<()> {
        if self.chunk_size == 0 {
            return Err(PipelineError::config("execution.chunk_size must be > 0"));
        }
        if self.max_in_flight_chunks == 0 {
            return Err(PipelineError::config("execution.max_in_flight_chunks must be > 0"));
        }
        if self.num_threads == Some(0) {
            return Err(PipelineError::config("execution.num_threads must be > 0 when set"));
        }
        Ok(())
    }
}

/// Parallel driver for a [`Validator`].
pub struct ExecutionEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("opts", &self.opts)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    /// Build an engine and its thread pool.
    ///
    /// Fails with [`PipelineError::Config`] on zero-valued options or when the pool cannot be
    /// created.
    pub fn new(opts: ExecutionOptions) -> PipelineResult<Self> {
        opts.check()?;
        let n_threads = opts.num_threads.unwrap_or_else(available_parallelism);
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("validate-{i}"))
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build thread pool: {e}")))?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.opts
    }

    /// Handle to the live metrics of the most recent run.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Validate `dataset` as `table` in parallel chunks. Output order matches input order.
    pub fn validate_parallel(
        &self,
        validator: &Validator,
        table: Table,
        dataset: &DataSet,
        parent_keys: &ParentKeys,
    ) -> TablePartition {
        self.pool
            .install(|| self.validate_parallel_impl(validator, table, dataset, parent_keys))
    }

    fn validate_parallel_impl(
        &self,
        validator: &Validator,
        table: Table,
        dataset: &DataSet,
        parent_keys: &ParentKeys,
    ) -> TablePartition {
        let start = Instant::now();
        let ranges = chunk_ranges(dataset.row_count(), self.opts.chunk_size);
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted {
            table,
            rows: dataset.row_count(),
            chunks: ranges.len(),
        });

        let scan = validator.scan(table, dataset, parent_keys);
        let sem = Semaphore::new(self.opts.max_in_flight_chunks);

        let per_chunk: Vec<TablePartition> = ranges
            .into_par_iter()
            .map(|range| {
                let permit = sem.acquire();
                if !permit.waited.is_zero() {
                    self.metrics.on_throttle_wait(permit.waited);
                    self.emit(ExecutionEvent::ThrottleWaited { duration: permit.waited });
                }

                self.metrics.on_chunk_start();
                self.emit(ExecutionEvent::ChunkStarted {
                    start_row: range.start,
                    row_count: range.len(),
                });

                let part = partition_rows(table, &dataset.rows[range], &scan);

                self.emit(ExecutionEvent::ChunkFinished {
                    clean_rows: part.clean.row_count(),
                    quarantined_rows: part.quarantine.row_count(),
                });
                self.metrics.on_chunk_end(part.row_count(), part.quarantine.row_count());
                drop(permit);
                part
            })
            .collect();

        let mut out = TablePartition::empty(table);
        for part in per_chunk {
            out.append(part);
        }

        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        self.emit(ExecutionEvent::RunFinished {
            table,
            elapsed,
            metrics: self.metrics.snapshot(),
        });
        out
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn chunk_ranges(row_count: usize, chunk_size: usize) -> Vec<Range<usize>> {
    (0..row_count)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(row_count))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{ExecutionEngine, ExecutionEvent, ExecutionObserver, ExecutionOptions, chunk_ranges};
    use crate::rules::{ParentKeys, RuleEngine};
    use crate::tables::Table;
    use crate::types::{DataSet, Value};
    use crate::validation::Validator;

    fn steps(n: usize) -> DataSet {
        // Every 7th step repeats its predecessor's number, every 5th lacks an instruction.
        let rows = (0..n)
            .map(|i| {
                let no = if i % 7 == 6 { i } else { i + 1 };
                let instruction = if i % 5 == 4 { Value::Null } else { Value::Utf8(format!("step {i}")) };
                vec![Value::Utf8("r1".to_string()), Value::Int64(no as i64), instruction, Value::Int64(1)]
            })
            .collect();
        DataSet::new(Table::Steps.schema(), rows)
    }

    fn opts(chunk_size: usize, max_in_flight_chunks: usize) -> ExecutionOptions {
        ExecutionOptions {
            num_threads: Some(4),
            chunk_size,
            max_in_flight_chunks,
        }
    }

    #[derive(Default)]
    struct ConcurrencyObserver {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ExecutionObserver for ConcurrencyObserver {
        fn on_event(&self, event: &ExecutionEvent) {
            match event {
                ExecutionEvent::ChunkStarted { .. } => {
                    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_active.fetch_max(now, Ordering::SeqCst);
                }
                ExecutionEvent::ChunkFinished { .. } => {
                    self.active.fetch_sub(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn parallel_partition_matches_sequential() {
        let ds = steps(250);
        let keys = ParentKeys::new().with_key(Table::Recipes, "r1");
        let validator = Validator::new(RuleEngine::standard().unwrap());

        let sequential = validator.validate(Table::Steps, &ds, &keys);
        let engine = ExecutionEngine::new(opts(16, 4)).unwrap();
        let parallel = engine.validate_parallel(&validator, Table::Steps, &ds, &keys);

        assert_eq!(parallel, sequential);
        assert!(parallel.quarantine.row_count() > 0);
    }

    #[test]
    fn metrics_track_rows_and_chunks() {
        let ds = steps(100);
        let keys = ParentKeys::new().with_key(Table::Recipes, "r1");
        let validator = Validator::new(RuleEngine::standard().unwrap());
        let engine = ExecutionEngine::new(opts(10, 2)).unwrap();
        let metrics = engine.metrics();

        let part = engine.validate_parallel(&validator, Table::Steps, &ds, &keys);

        let snap = metrics.snapshot();
        assert_eq!(snap.run_id, 1);
        assert_eq!(snap.rows_processed, 100);
        assert_eq!(snap.rows_quarantined, part.quarantine.row_count() as u64);
        assert_eq!(snap.chunks_started, 10);
        assert_eq!(snap.chunks_finished, 10);
        assert!(snap.max_active_chunks <= 2);
        assert!(snap.elapsed.is_some());
    }

    #[test]
    fn max_in_flight_chunks_throttles_chunk_concurrency() {
        let ds = steps(64);
        let observer = Arc::new(ConcurrencyObserver::default());
        let engine = ExecutionEngine::new(opts(1, 1))
            .unwrap()
            .with_observer(observer.clone());
        let validator = Validator::new(RuleEngine::standard().unwrap());

        let part = engine.validate_parallel(&validator, Table::Steps, &ds, &ParentKeys::new());

        assert_eq!(part.row_count(), ds.row_count());
        assert_eq!(observer.max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_options_are_rejected() {
        assert!(ExecutionEngine::new(opts(0, 1)).is_err());
        assert!(ExecutionEngine::new(opts(1, 0)).is_err());
        let no_threads = ExecutionOptions {
            num_threads: Some(0),
            ..ExecutionOptions::default()
        };
        assert!(ExecutionEngine::new(no_threads).is_err());
    }

    #[test]
    fn empty_dataset_has_no_chunks() {
        assert!(chunk_ranges(0, 8).is_empty());
        assert_eq!(chunk_ranges(10, 4), vec![0..4, 4..8, 8..10]);
    }
}
