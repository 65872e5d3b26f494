//! tracing subscriber set-up for the binary.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber. `RUST_LOG` wins; otherwise the level is
/// `info`, or `debug` when `verbose` is set.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
