//! Logging setup shared by the dumpmirror binary and its tests.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::Result;

/// Maps CLI verbosity flags to a maximum log level.
///
/// `quiet` wins over any `-v` count.
pub const fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Builds the event filter from the CLI flags and `RUST_LOG` directives.
///
/// Valid directives replace the `-v` level; `quiet` still wins. Unparsable
/// directives are ignored.
pub fn filter_for(verbose: u8, quiet: bool, directives: Option<&str>) -> EnvFilter {
    let level = LevelFilter::from_level(level_for(verbose, quiet));
    let cli_filter = || EnvFilter::default().add_directive(level.into());
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) if !quiet => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| cli_filter())
        }
        _ => cli_filter(),
    }
}

/// Initializes structured logging based on verbosity level.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
///
/// `RUST_LOG` directives, when set and valid, override the verbosity level.
///
/// # Example
/// ```rust,no_run
/// use dumpmirror_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, quiet, directives.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| {
            crate::error::DumpMirrorError::configuration(format!(
                "Failed to initialize logging: {e}"
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Logging can only be initialized once per test process, so only the
    // level mapping is exercised here.
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
                "Failed for quiet={quiet}, verbose={verbose}"
            );
        }
    }

    #[test]
    fn test_rust_log_directives_override_verbosity() {
        assert_eq!(
            filter_for(0, false, Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            filter_for(0, false, Some("dumpmirror_core=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
        assert_eq!(filter_for(1, false, None).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(filter_for(0, false, Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_quiet_beats_rust_log() {
        assert_eq!(filter_for(0, true, Some("trace")).max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_invalid_rust_log_falls_back_to_verbosity() {
        assert_eq!(
            filter_for(1, false, Some("dumpmirror=loud")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }
}
