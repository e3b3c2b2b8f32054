use anyhow::Result;
use std::sync::Arc;

use request_logger::{add_log_writer_layer, config::load_config, init_tracing, server, writer::LogWriter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            // No writer yet; report through a plain console subscriber
            init_tracing();
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e);
        }
    };

    // Built once and shared for the life of the process
    let writer = Arc::new(LogWriter::from_config(&config.logging));
    add_log_writer_layer(writer.clone());

    server::start_server(config, writer).await
}
