// Tracing setup for the CLI. Logs go to stderr so they never interleave with
// rendered tables or JSON on stdout.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log level for the number of `-v` flags.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn init_tracing(verbosity: u8) {
    // Prefer RUST_LOG from env, otherwise derive the level from -v.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
