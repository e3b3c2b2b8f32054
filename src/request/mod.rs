//! Per-request correlation and timing
//!
//! Each request produces a start-line at entry and exactly one end-line when
//! its response is finalized, both tagged with the same correlation token:
//!
//! ```text
//! [user42]
//! [Ab12Cd] GET --> /status
//! [Ab12Cd] FURL --> https://a.example/x
//! ...
//! [user42]
//! [Ab12Cd] GET <-- 304 /status
//! [Ab12Cd] FURL --> https://a.example/x 3ms
//! ```
//!
//! A handler failure adds an error-level line with the same framing before
//! the end-line.

pub mod context;
pub mod middleware;
pub mod token;

pub use context::{RequestContext, RequestState, ResponseMeta};
pub use middleware::request_logging_middleware;
pub use token::{Charset, FixedTokenSource, RandomTokenSource, TokenSource, TOKEN_LENGTH};

use crate::config::LoggerConfig;
use crate::writer::{LogWriter, Severity, META};
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, Request, StatusCode};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Context label of every request line
pub const REQUEST_CONTEXT: &str = "request_logger";

/// Caller identity used when the header is not configured or missing
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Emits the start, error and end lines of each request
pub struct RequestLogger {
    writer: Arc<LogWriter>,
    tokens: Arc<dyn TokenSource>,
    identity_header: Option<HeaderName>,
}

impl RequestLogger {
    pub fn new(writer: Arc<LogWriter>, config: &LoggerConfig) -> Self {
        let identity_header = config
            .identity_header
            .as_deref()
            .and_then(|name| HeaderName::from_bytes(name.as_bytes()).ok());
        let tokens = RandomTokenSource::new(TOKEN_LENGTH, Charset::parse(&config.token_charset));

        Self {
            writer,
            tokens: Arc::new(tokens),
            identity_header,
        }
    }

    /// Replace the correlation token source
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Open a request: assign a token and write the start-line
    pub fn begin<B>(&self, request: &Request<B>) -> RequestContext {
        let headers = request.headers();

        let identity = self
            .identity_header
            .as_ref()
            .and_then(|name| header_string(headers, name))
            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());
        let referrer = header_string(headers, &header::REFERER);
        let client_ip = header_string(headers, &HeaderName::from_static("x-forwarded-for"))
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|v| !v.is_empty())
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });

        let ctx = RequestContext::new(
            self.tokens.next_token(),
            identity,
            referrer,
            client_ip,
            request.method().as_str().to_string(),
            request.uri().path().to_string(),
        );

        let message = format!(
            "[{}]\n[{}] {} --> {}{}",
            ctx.identity(),
            ctx.token(),
            ctx.method(),
            ctx.path(),
            referrer_line(&ctx)
        );
        self.writer
            .emit(Severity::Info, message, Some(REQUEST_CONTEXT), ctx.fields());

        ctx
    }

    /// Record a handler failure and hand the error back untouched
    ///
    /// Only the first failure of a request that has not finished is logged.
    pub fn fail<E: fmt::Display>(&self, ctx: &RequestContext, status: StatusCode, error: E) -> E {
        if ctx.mark_errored() {
            let mut fields = ctx.fields();
            fields.insert(META.to_string(), Some(error.to_string()));
            self.writer.emit(
                Severity::Error,
                exit_message(ctx, status),
                Some(REQUEST_CONTEXT),
                fields,
            );
        }
        error
    }

    /// Close a request and write its end-line
    ///
    /// Returns false, writing nothing, when the request was already finished.
    pub fn finish(&self, ctx: &RequestContext, response: &ResponseMeta) -> bool {
        if !ctx.mark_finished() {
            return false;
        }

        let elapsed_ms = ctx.elapsed().as_millis();
        let mut fields = ctx.fields();
        let size = response.size();
        if !size.is_empty() {
            fields.insert(META.to_string(), Some(size));
        }

        let message = format!("{} {}ms", exit_message(ctx, response.status), elapsed_ms);
        self.writer
            .emit(Severity::Info, message, Some(REQUEST_CONTEXT), fields);
        true
    }
}

/// Header value as text; bytes that are not valid UTF-8 are replaced
fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .filter(|v| !v.is_empty())
}

fn referrer_line(ctx: &RequestContext) -> String {
    match ctx.referrer() {
        Some(referrer) => format!("\n[{}] FURL --> {}", ctx.token(), referrer),
        None => String::new(),
    }
}

fn exit_message(ctx: &RequestContext, status: StatusCode) -> String {
    format!(
        "[{}]\n[{}] {} <-- {} {}{}",
        ctx.identity(),
        ctx.token(),
        ctx.method(),
        status.as_u16(),
        ctx.path(),
        referrer_line(ctx)
    )
}
