use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global tracing subscriber.
///
/// Diagnostics go to stderr so they never interleave with the colored status
/// lines and tables printed to stdout. `RUST_LOG` wins over the verbosity flag.
pub fn init(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "tastemix=warn",
        1 => "tastemix=info",
        _ => "tastemix=debug",
    };

    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_directive));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .compact();

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
