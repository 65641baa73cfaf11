//! JSON document reading.
//!
//! Supported inputs:
//! - A JSON array of documents: `[{"recipe_id": "r1"}, {"recipe_id": "r2"}]`
//! - A single JSON object (one document)
//! - Newline-delimited JSON (NDJSON): `{"recipe_id": "r1"}\n{"recipe_id": "r2"}\n`
//!
//! Documents are returned as loose [`serde_json::Value`]s; shape problems are left to the
//! raw record model and the rule engine. An NDJSON line that does not parse becomes a `null`
//! document, so one corrupt line quarantines one record instead of aborting the run.
//!
//! Input only counts as NDJSON when it does not start with `[` and its first non-empty line
//! parses on its own. A truncated array or a broken pretty-printed object is an error.

use std::fs;
use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::PipelineResult;

/// Read documents from in-memory JSON or NDJSON text. Empty input yields no documents.
pub fn read_documents_from_str(input: &str) -> PipelineResult<Vec<JsonValue>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    // A single JSON value first (array or object), NDJSON otherwise.
    let whole_err = match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(JsonValue::Array(items)) => return Ok(items),
        Ok(other) => return Ok(vec![other]),
        Err(e) => e,
    };

    // A broken array, or a file whose first line is not a document on its own, was never
    // line-delimited: the file itself is corrupt.
    let mut lines = trimmed.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = match lines.next() {
        Some(line) if !trimmed.starts_with('[') => line,
        _ => return Err(whole_err.into()),
    };
    let first = match serde_json::from_str::<JsonValue>(first) {
        Ok(doc) => doc,
        Err(_) => return Err(whole_err.into()),
    };

    let mut docs = vec![first];
    for (i, line) in lines.enumerate() {
        docs.push(serde_json::from_str(line).unwrap_or_else(|e| {
            warn!(line = i + 2, error = %e, "unparseable ndjson line; keeping it as a null document");
            JsonValue::Null
        }));
    }
    Ok(docs)
}

/// Read documents from a JSON or NDJSON file.
pub fn read_documents_from_path(path: impl AsRef<Path>) -> PipelineResult<Vec<JsonValue>> {
    let text = fs::read_to_string(path)?;
    read_documents_from_str(&text)
}
