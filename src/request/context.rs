use crate::writer::{format_bytes, Fields, CLIENT_IP, LOGIN_ID, REQUEST_ID};
use axum::body::HttpBody;
use axum::http::{header, Response, StatusCode};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

const STARTED: u8 = 0;
const ERRORED: u8 = 1;
const FINISHED: u8 = 2;

/// Lifecycle of one request: `Started -> (Errored) -> Finished`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Started,
    Errored,
    Finished,
}

/// Per-request correlation data, created by
/// [`RequestLogger::begin`](super::RequestLogger::begin)
#[derive(Debug)]
pub struct RequestContext {
    token: String,
    identity: String,
    referrer: Option<String>,
    client_ip: Option<String>,
    method: String,
    path: String,
    started: Instant,
    state: AtomicU8,
}

impl RequestContext {
    pub(crate) fn new(
        token: String,
        identity: String,
        referrer: Option<String>,
        client_ip: Option<String>,
        method: String,
        path: String,
    ) -> Self {
        Self {
            token,
            identity,
            referrer,
            client_ip,
            method,
            path,
            started: Instant::now(),
            state: AtomicU8::new(STARTED),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Monotonic time since `begin`
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn state(&self) -> RequestState {
        match self.state.load(Ordering::Acquire) {
            STARTED => RequestState::Started,
            ERRORED => RequestState::Errored,
            _ => RequestState::Finished,
        }
    }

    /// `Started -> Errored`; false in any other state
    pub(crate) fn mark_errored(&self) -> bool {
        self.state
            .compare_exchange(STARTED, ERRORED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move to `Finished`; false if it already was
    pub(crate) fn mark_finished(&self) -> bool {
        self.state.swap(FINISHED, Ordering::AcqRel) != FINISHED
    }

    /// Correlation fields attached to every line of this request
    pub(crate) fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(REQUEST_ID.to_string(), Some(self.token.clone()));
        fields.insert(LOGIN_ID.to_string(), Some(self.identity.clone()));
        fields.insert(CLIENT_IP.to_string(), self.client_ip.clone());
        fields
    }
}

/// What the end-line needs to know about the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: StatusCode,
    /// Declared body length, if known
    pub content_length: Option<u64>,
}

impl ResponseMeta {
    pub fn new(status: StatusCode, content_length: Option<u64>) -> Self {
        Self {
            status,
            content_length,
        }
    }

    /// Read status and length from a response
    ///
    /// The `Content-Length` header wins; otherwise an exact body size hint is
    /// used.
    pub fn from_response<B: HttpBody>(response: &Response<B>) -> Self {
        let content_length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .or_else(|| response.body().size_hint().exact());

        Self::new(response.status(), content_length)
    }

    /// Human-readable body size, empty for bodiless statuses or unknown length
    pub fn size(&self) -> String {
        match self.status.as_u16() {
            204 | 205 | 304 => String::new(),
            _ => self.content_length.map(format_bytes).unwrap_or_default(),
        }
    }
}
