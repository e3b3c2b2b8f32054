//! Structured log records and severities

use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use std::fmt;

/// Field carrying the caller's IP address
pub const CLIENT_IP: &str = "client_ip";
/// Field carrying the request correlation token
pub const REQUEST_ID: &str = "request_id";
/// Field carrying the caller identity
pub const LOGIN_ID: &str = "login_id";
/// Field rendered verbatim in the trailing metadata column
pub const META: &str = "meta";

/// Structured fields attached to a record
pub type Fields = BTreeMap<String, Option<String>>;

/// Log severity, ordered `Info < Warn < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Upper-cased label used in the line format
    pub fn as_upper(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One structured log line, immutable once built
#[derive(Debug, Clone)]
pub struct LogRecord {
    timestamp: DateTime<FixedOffset>,
    severity: Severity,
    message: String,
    context: Option<String>,
    fields: Fields,
    trace: Option<String>,
}

impl LogRecord {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        severity: Severity,
        message: impl Into<String>,
        context: Option<&str>,
        fields: Fields,
    ) -> Self {
        Self {
            timestamp,
            severity,
            message: message.into(),
            context: context.map(str::to_string),
            fields,
            trace: None,
        }
    }

    /// Attach an error trace (printed on the console mirror only)
    pub fn with_trace(mut self, trace: Option<String>) -> Self {
        self.trace = trace;
        self
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    /// Look up a field, treating empty values as absent
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty())
    }
}
