//! Models and drivers exercising `tempo_core`.
//!
//! Each binary under `src/bin` runs one simulation and reports summary
//! numbers through `tracing`. Set `RUST_LOG=debug` to see Newton iterations.
pub mod mass_spring;
pub mod models;

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber honoring `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
