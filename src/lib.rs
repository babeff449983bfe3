// Browser Screen Library Entry Point
// Exposes the screen core so main.rs and host shells can embed it.

pub mod error;
pub mod headless;
pub mod history;
pub mod settings;

// Shared state
pub mod state;

// Screen logic (no UI toolkit imports)
pub mod modules;

use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber for `log` and `tracing` records.
/// Level comes from `RUST_LOG`, defaulting to info.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        log::debug!("Logger already installed");
    }
}
