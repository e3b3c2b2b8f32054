use super::{RequestLogger, ResponseMeta};
use crate::error::HandlerFailure;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Request logging middleware
///
/// Writes the start-line, runs the rest of the stack, writes an error line if
/// the handler failed, then the end-line. A [`HandlerFailure`] found on the
/// response is put back after logging so outer layers still observe it.
pub async fn request_logging_middleware(
    State(logger): State<Arc<RequestLogger>>,
    req: Request,
    next: Next,
) -> Response {
    let ctx = logger.begin(&req);

    let mut response = next.run(req).await;

    if let Some(failure) = response.extensions_mut().remove::<HandlerFailure>() {
        let failure = logger.fail(&ctx, failure.status, failure);
        response.extensions_mut().insert(failure);
    }

    logger.finish(&ctx, &ResponseMeta::from_response(&response));
    response
}
