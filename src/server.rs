use anyhow::Result;
use axum::{
    http::{header, HeaderMap, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

use crate::{
    config::Config,
    error::AppError,
    request::{request_logging_middleware, RequestLogger},
    writer::LogWriter,
};

/// Start the demo server
///
/// This function:
/// 1. Builds the request logger on top of the shared writer
/// 2. Creates the Axum application
/// 3. Binds to the configured address
/// 4. Serves requests until Ctrl-C
pub async fn start_server(config: Config, writer: Arc<LogWriter>) -> Result<()> {
    let logger = Arc::new(RequestLogger::new(writer.clone(), &config.logging));
    let app = create_router(logger);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting request logger demo on {}", addr);
    info!(
        file_logging = config.logging.file_logging_active(),
        sinks = writer.sink_count(),
        "Log writer ready"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received, draining connections...");
    })
    .await?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Create the Axum router with the logging middleware applied to every route
pub fn create_router(logger: Arc<RequestLogger>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/empty", get(empty))
        .route("/fail", get(fail))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            logger,
            request_logging_middleware,
        ))
}

/// Entity tag of the `/status` body
pub const STATUS_ETAG: &str = "\"status-ok\"";

async fn status(headers: HeaderMap) -> Response {
    let fresh = headers
        .get(header::IF_NONE_MATCH)
        .is_some_and(|v| v.as_bytes() == STATUS_ETAG.as_bytes());
    if fresh {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, STATUS_ETAG)]).into_response();
    }

    ([(header::ETAG, STATUS_ETAG)], Json(json!({ "status": "ok" }))).into_response()
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fail() -> Result<Json<serde_json::Value>, AppError> {
    Err(AppError::InternalError("simulated failure".to_string()))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
