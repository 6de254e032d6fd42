//! Tracing subscriber setup for binaries embedding the ledger

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install a global subscriber filtered by `RUST_LOG` (default `info`)
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    Registry::default().with(env_filter).with(fmt_layer).try_init()
}
