//! Diagnostic logging to stderr.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber.
///
/// `--verbose` forces `debug` for the workspace crates; otherwise `RUST_LOG`
/// applies, falling back to `warn`. Agent mode logs JSON lines.
pub fn init_logging(verbose: u8, agent: bool) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        1 => EnvFilter::new("warn,servarr_config=debug,servarr_compose=debug,servarr=debug"),
        _ => EnvFilter::new("debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    // A second install (tests) keeps the first subscriber.
    let _ = if agent {
        builder.json().try_init()
    } else {
        builder.without_time().try_init()
    };
}
