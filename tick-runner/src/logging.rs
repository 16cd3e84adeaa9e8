//! Diagnostics for the tick runner, kept apart from what the game sees.
//!
//! The CLI writes two streams. Stdout carries the product: console lines
//! (`GAME TICK`, `Panic!`, `TRACE:`, hive output), `notify:` lines and the run
//! summary. Stderr carries `tracing` events from the runner and the hive
//! (per-cycle `debug!`, `info!` on module load, `warn!` with `phase` and
//! `fault` fields on every recovered fault), filtered by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber. `RUST_LOG` overrides the `warn` default.
///
/// ```bash
/// RUST_LOG=tick_runner=debug tick-runner run --ticks 5
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
