//! Extraction boundary: raw documents from JSON exports on disk.
//!
//! [`load_batch_from_dir`] expects one export per collection, named after it:
//!
//! - `recipes.json` (or `recipes.ndjson`)
//! - `users.json` (or `users.ndjson`)
//! - `interactions.json` (or `interactions.ndjson`)
//!
//! Format-specific readers live in [`json`].

pub mod json;

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::raw::RawBatch;

pub use json::{read_documents_from_path, read_documents_from_str};

/// Collections read by [`load_batch_from_dir`], in load order.
pub const COLLECTIONS: [&str; 3] = ["recipes", "users", "interactions"];

/// Locate the export file of `collection` in `dir`, preferring `.json` over `.ndjson`.
pub fn collection_path(dir: &Path, collection: &str) -> PipelineResult<PathBuf> {
    ["json", "ndjson"]
        .iter()
        .map(|ext| dir.join(format!("{collection}.{ext}")))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no {collection}.json or {collection}.ndjson in {}", dir.display()),
            )
            .into()
        })
}

/// Read the three document collections from `dir` into a [`RawBatch`].
pub fn load_batch_from_dir(dir: impl AsRef<Path>) -> PipelineResult<RawBatch> {
    let dir = dir.as_ref();
    let [recipes, users, interactions] = COLLECTIONS.map(|c| {
        let path = collection_path(dir, c)?;
        let docs = read_documents_from_path(&path)?;
        info!(collection = c, path = %path.display(), documents = docs.len(), "loaded documents");
        Ok::<_, PipelineError>(docs)
    });
    Ok(RawBatch::from_documents(&recipes?, &users?, &interactions?))
}
