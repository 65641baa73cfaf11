//! Writer boundary: partitions as CSV, the report as JSON.
//!
//! [`write_outputs`] lays out one run in a directory:
//!
//! - `clean_<table>.csv` for every table
//! - `quarantined_<table>.csv` for every table, with a trailing `reasons` column
//! - `validation_report.json`

pub mod csv;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::PipelineResult;
use crate::pipeline::PipelineOutput;
use crate::report::ValidationReport;
use crate::tables::Table;

pub use self::csv::{write_dataset_csv, write_dataset_csv_to_writer};

/// File name of the report written by [`write_outputs`].
pub const REPORT_FILE: &str = "validation_report.json";

pub fn clean_file_name(table: Table) -> String {
    format!("clean_{table}.csv")
}

pub fn quarantine_file_name(table: Table) -> String {
    format!("quarantined_{table}.csv")
}

/// Write the report as pretty-printed JSON.
pub fn write_report(path: impl AsRef<Path>, report: &ValidationReport) -> PipelineResult<()> {
    let json = report.to_json_pretty()?;
    fs::write(path, json)?;
    Ok(())
}

/// Write every partition and the report into `dir`, creating it if needed.
///
/// Returns the paths written, partitions first.
pub fn write_outputs(dir: impl AsRef<Path>, output: &PipelineOutput) -> PipelineResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(output.partitions.len() * 2 + 1);
    for partition in &output.partitions {
        let clean_path = dir.join(clean_file_name(partition.table));
        write_dataset_csv(&clean_path, &partition.clean)?;
        written.push(clean_path);

        let quarantine_path = dir.join(quarantine_file_name(partition.table));
        write_dataset_csv(&quarantine_path, &partition.quarantine.to_flat_dataset())?;
        written.push(quarantine_path);
    }

    let report_path = dir.join(REPORT_FILE);
    write_report(&report_path, &output.report)?;
    written.push(report_path);

    info!(dir = %dir.display(), files = written.len(), "wrote pipeline outputs");
    Ok(written)
}
