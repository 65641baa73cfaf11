//! CSV serialization of a [`DataSet`].
//!
//! The header row is the schema's field names. Cells use [`Value`]'s `Display`: null is an empty
//! field, text is written verbatim (quoted by the writer when needed).

use std::io::Write;
use std::path::Path;

use crate::error::PipelineResult;
use crate::types::{DataSet, Value};

/// Write `dataset` to a CSV file, replacing any existing file.
pub fn write_dataset_csv(path: impl AsRef<Path>, dataset: &DataSet) -> PipelineResult<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    write_dataset_csv_to_writer(&mut wtr, dataset)
}

/// Write `dataset`, header first, to an existing CSV writer.
pub fn write_dataset_csv_to_writer<W: Write>(wtr: &mut csv::Writer<W>, dataset: &DataSet) -> PipelineResult<()> {
    wtr.write_record(dataset.schema.field_names())?;
    for row in &dataset.rows {
        wtr.write_record(row.iter().map(Value::to_string))?;
    }
    wtr.flush()?;
    Ok(())
}
