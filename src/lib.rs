pub mod clock;
pub mod config;
pub mod error;
pub mod request;
pub mod server;
pub mod writer;

use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging with a plain console formatter
///
/// Note: This function can only be called once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Route `tracing` events through the log writer
///
/// Use this instead of [`init_tracing`]: the writer's console mirror already
/// prints every event, so no `fmt` layer is installed.
pub fn add_log_writer_layer(writer: Arc<writer::LogWriter>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(writer::LogWriterLayer::new(writer));

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: Failed to install log writer layer: {}", e);
    }
}
