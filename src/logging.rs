//! Tracing subscriber setup for the `ratchet` binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "ratchet=warn";
/// Filter used for `--debug` when `RUST_LOG` is not set
pub const DEBUG_FILTER: &str = "ratchet=debug";

/// Pick the filter directive: `RUST_LOG` wins, then `--debug`, then the default.
pub fn filter_directive(rust_log: Option<String>, debug: bool) -> String {
    match rust_log.filter(|value| !value.trim().is_empty()) {
        Some(value) => value,
        None if debug => DEBUG_FILTER.to_string(),
        None => DEFAULT_FILTER.to_string(),
    }
}

/// Initialise the global tracing subscriber, writing to stderr.
///
/// Stdout carries the metric value and verdict, so log lines never go there.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(debug: bool) {
    let env_filter = EnvFilter::new(filter_directive(std::env::var("RUST_LOG").ok(), debug));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init();
}
