//! Logging system initialization.
//!
//! Console-only: no file rotation, no JSON layer. Structured `tracing`
//! spans and events cover per-page fetch, per-candidate scoring,
//! insert/merge decisions, and final per-source counts.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a global `tracing` subscriber. `RUST_LOG` controls verbosity;
/// defaults to `info` when unset.
pub fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()?;

    Ok(())
}
