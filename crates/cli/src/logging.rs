//! Logging setup using `tracing-subscriber`.
//!
//! Logs go to stderr so stdout stays reserved for the summary or JSON report.
//!
//! - default: `warn` (records without dimensions, nothing else)
//! - `-v`: `info`, stage counts
//! - `-vv`: `debug`, per-record exclusions and join misses
//!
//! `RUST_LOG` overrides the verbosity flags entirely.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Install the global subscriber. Call once, before any command runs.
pub fn init(verbosity: u8) {
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    // A second init (tests calling twice) is ignored
    let _ = tracing_subscriber::registry()
        .with(build_env_filter(level_for(verbosity)))
        .with(layer)
        .try_init();
}

/// Filter for our crates at `level`; other crates stay at warn.
fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,postfill_cli={level},postfill_io={level},postfill_recon={level}"
        ))
    })
}
