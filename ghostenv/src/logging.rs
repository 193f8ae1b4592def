//! Diagnostic tracing for ghostenv.
//!
//! Events from `tracing` macros (lifecycle transitions, child spawns, cleanup
//! failures) go to stderr through this subscriber. What the user is meant to
//! read, such as panels and progress lines, goes through `io::console` and is
//! never filtered.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
fn fallback_filter(verbose: bool) -> &'static str {
    if verbose { "ghostenv=debug" } else { "warn" }
}

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_crate_debug() {
        assert_eq!(fallback_filter(true), "ghostenv=debug");
        assert_eq!(fallback_filter(false), "warn");
    }
}
