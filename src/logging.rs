//! Logging setup for the command-line runner.
//!
//! The library only emits `tracing` events; installing a subscriber is the binary's job.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::{PipelineError, PipelineResult};

/// Level selected by the `-v`/`-q` flags: 0=INFO, 1=DEBUG, 2+=TRACE, quiet=ERROR.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Install a stderr `fmt` subscriber. `RUST_LOG`, when set, overrides the flag-derived level.
///
/// ```rust,no_run
/// recipe_pipeline::logging::init_logging(1, false).expect("logging already initialized");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> PipelineResult<()> {
    let level = level_for(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| PipelineError::config(format!("failed to initialize logging: {e}")))
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::level_for;

    #[test]
    fn verbosity_levels() {
        let cases = [
            ((true, 0), Level::ERROR),
            ((true, 5), Level::ERROR),
            ((false, 0), Level::INFO),
            ((false, 1), Level::DEBUG),
            ((false, 2), Level::TRACE),
            ((false, 10), Level::TRACE),
        ];
        for ((quiet, verbose), expected) in cases {
            assert_eq!(level_for(verbose, quiet), expected, "quiet={quiet}, verbose={verbose}");
        }
    }
}
