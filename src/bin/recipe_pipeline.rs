//! Batch runner: load exports, normalize, validate, write partitions and the report.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::error;

use recipe_pipeline::config::PipelineConfig;
use recipe_pipeline::error::PipelineResult;
use recipe_pipeline::ingestion::load_batch_from_dir;
use recipe_pipeline::logging::init_logging;
use recipe_pipeline::output::write_outputs;
use recipe_pipeline::pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "recipe-pipeline")]
#[command(about = "Normalize and validate recipe, user and interaction exports")]
#[command(version)]
#[command(long_about = "
Reads recipes.json, users.json and interactions.json (or .ndjson) from the input directory,
flattens them into five relational tables and splits every row into clean or quarantined.

OUTPUT:
  clean_<table>.csv          rows passing every rule
  quarantined_<table>.csv    rejected rows plus a `reasons` column
  validation_report.json     per-table counts and reason breakdown

EXAMPLES:
  recipe-pipeline --input exports/ --output out/
  recipe-pipeline -v --input exports/ --output out/ --config pipeline.json
")]
struct Cli {
    /// Directory holding the document exports
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving partitions and the report
    #[arg(short, long)]
    output: PathBuf,

    /// JSON pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON rule set, overriding the configuration's `rules_path`
    #[arg(long)]
    rules: Option<PathBuf>,

    #[arg(short, long, action = ArgAction::Count, help = "Increase verbosity (-v, -vv)")]
    verbose: u8,

    #[arg(short, long, help = "Suppress all output except errors")]
    quiet: bool,
}

fn run(cli: &Cli) -> PipelineResult<()> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(rules) = &cli.rules {
        config = config.with_rules_path(rules);
    }

    let pipeline = Pipeline::new(config)?;
    let batch = load_batch_from_dir(&cli.input)?;
    let output = pipeline.run(&batch)?;
    write_outputs(&cli.output, &output)?;

    if !cli.quiet {
        let totals = output.report.totals;
        println!(
            "{} rows processed: {} clean, {} quarantined (report in {})",
            totals.rows_processed,
            totals.clean_count,
            totals.quarantine_count,
            cli.output.display()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "pipeline run failed");
            ExitCode::FAILURE
        }
    }
}
