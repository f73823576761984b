//! Logging setup, powered by tracing-subscriber.
//!
//! The engine only emits `tracing` events. Binaries and tests that want to
//! see them call [`init_tracing`] once; later calls are ignored.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Build the filter: `RUST_LOG` when set, otherwise `default_filter` plus a
/// directive for this crate.
fn build_env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = format!("{},coretable={}", default_filter, default_filter);
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Install a fmt subscriber writing to stderr.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(build_env_filter(default_filter))
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
