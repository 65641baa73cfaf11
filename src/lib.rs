//! `recipe-pipeline` turns loosely-typed recipe, user and interaction documents into five
//! relational tables and splits every resulting row into a clean or a quarantined partition,
//! recording why each rejected row failed.
//!
//! The primary entrypoint is [`pipeline::Pipeline`]: build it from a [`config::PipelineConfig`]
//! and [`run`](pipeline::Pipeline::run) it over a [`raw::RawBatch`].
//!
//! ## Tables
//!
//! | Table | Key | Produced from |
//! |---|---|---|
//! | `recipes` | `recipe_id` | one row per recipe document |
//! | `ingredients` | `ingredient_id` (`{recipe_id}_ing_{n}`) | one row per embedded ingredient |
//! | `steps` | (`recipe_id`, `step_no`) | one row per embedded step |
//! | `users` | `user_id` | one row per user document |
//! | `interactions` | `interaction_id` | one row per interaction document |
//!
//! Array fields (`tags`, `cuisines`) are encoded into one `|`-separated cell, see
//! [`normalize::ListCodec`].
//!
//! ## Quick example
//!
//! ```rust
//! use recipe_pipeline::config::PipelineConfig;
//! use recipe_pipeline::pipeline::Pipeline;
//! use recipe_pipeline::raw::RawBatch;
//! use recipe_pipeline::tables::Table;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), recipe_pipeline::PipelineError> {
//! let batch = RawBatch::from_documents(
//!     &[json!({
//!         "recipe_id": "r1",
//!         "name": "",
//!         "prep_time_minutes": -5,
//!         "difficulty": "Hard",
//!         "ingredients": [{"name": "Salt", "quantity": 1, "unit": "tsp"}],
//!         "steps": [{"step_no": 1, "instruction": "Boil", "duration_minutes": 5}],
//!     })],
//!     &[],
//!     &[],
//! );
//!
//! let output = Pipeline::new(PipelineConfig::default())?.run(&batch)?;
//! let recipes = output.partition(Table::Recipes).unwrap();
//! assert_eq!(recipes.quarantine.reasons[0], vec!["missing name", "negative prep_time_minutes"]);
//! assert_eq!(output.report.totals.rows_processed, 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Rules
//!
//! Validation is driven by declarative [`rules::Rule`] records, grouped per table and evaluated
//! in declaration order. [`rules::RuleSet::standard`] is the built-in set; a JSON rule file can
//! replace it:
//!
//! ```json
//! {"rules": [
//!   {"table": "interactions", "field": "rating", "category": "domain",
//!    "check": {"kind": "range", "min": 0, "max": 5}, "reason": "rating out of range"}
//! ]}
//! ```
//!
//! A rule naming an unknown field aborts pipeline construction with
//! [`PipelineError::RuleConfig`]. Bad data never aborts a run: it is quarantined.
//!
//! ## Modules
//!
//! - [`raw`]: source document shapes with absent/null/present fields
//! - [`normalize`]: flattening, identifier generation and scalar coercion
//! - [`rules`]: rule definitions and the compiled rule engine
//! - [`validation`]: clean/quarantine partitioning
//! - [`report`]: consolidated counts per table and reason
//! - [`execution`]: optional chunked parallel validation
//! - [`ingestion`] / [`output`]: JSON exports in, CSV partitions and JSON report out
//! - [`types`] / [`tables`]: the typed row model and the five table schemas

pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod raw;
pub mod report;
pub mod rules;
pub mod tables;
pub mod types;
pub mod validation;

pub use error::{PipelineError, PipelineResult};
