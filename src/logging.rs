//! Tracing initialization helper
//!
//! The crate itself only emits `tracing` events; installing a subscriber is
//! the embedding application's job. This helper covers the common case:
//! an env-filtered fmt subscriber defaulting to `parley=info`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the default subscriber
///
/// Honors `RUST_LOG` when set. Safe to call more than once; subsequent
/// calls are no-ops.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parley=info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
