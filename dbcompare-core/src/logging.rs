//! Logging setup for programs embedding the comparison engine.
//!
//! The library itself only emits `tracing` events; this helper installs the
//! fmt subscriber used by wrappers around it. `RUST_LOG` overrides the
//! verbosity flags when set.

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Maps verbosity flags onto a tracing level.
///
/// `quiet` wins over any verbosity; 0 is INFO, 1 is DEBUG, anything above is TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Filter directive for the verbosity flags.
///
/// Events from this crate follow [`level_for`]; driver crates such as sqlx
/// stay at WARN (ERROR when quiet).
pub fn filter_directive(verbose: u8, quiet: bool) -> String {
    let others = if quiet { "error" } else { "warn" };
    format!(
        "{},dbcompare_core={}",
        others,
        level_for(verbose, quiet).as_str().to_ascii_lowercase()
    )
}

/// Initializes structured logging based on verbosity level.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
///
/// # Example
/// ```rust,no_run
/// use dbcompare_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose, quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::CompareError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let test_cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in test_cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "Failed for quiet={}, verbose={}",
                quiet,
                verbose
            );
        }
    }

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directive(0, false), "warn,dbcompare_core=info");
        assert_eq!(filter_directive(2, false), "warn,dbcompare_core=trace");
        assert_eq!(filter_directive(3, true), "error,dbcompare_core=error");
        assert!(filter_directive(1, false).parse::<EnvFilter>().is_ok());
    }
}
