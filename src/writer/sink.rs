//! Output destinations for formatted log lines

use super::record::{LogRecord, Severity};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Sink I/O failure
///
/// These never leave the [`LogWriter`](super::LogWriter); they are reported on
/// the console mirror and the record is dropped for that sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rotate {path}: {source}")]
    Rotate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("console write failed: {0}")]
    Console(#[source] io::Error),
}

/// A destination bound to a minimum severity
///
/// Implementations serialize their own writes; the writer calls `write`
/// concurrently from many requests.
pub trait Sink: Send + Sync {
    /// Short label used when reporting failures
    fn name(&self) -> &str;

    /// Records below this severity are not routed here
    fn min_severity(&self) -> Severity;

    /// Append one formatted line
    fn write(&self, record: &LogRecord, line: &str) -> Result<(), SinkError>;
}

/// Standard output mirror; prints the error trace after the line when present
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn min_severity(&self) -> Severity {
        Severity::Info
    }

    fn write(&self, record: &LogRecord, line: &str) -> Result<(), SinkError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", line).map_err(SinkError::Console)?;
        if let Some(trace) = record.trace() {
            writeln!(out, "{}", trace).map_err(SinkError::Console)?;
        }
        Ok(())
    }
}

/// In-memory sink, for tests and for hosts that inspect their own output
#[derive(Debug)]
pub struct MemorySink {
    name: String,
    min_severity: Severity,
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>, min_severity: Severity) -> Self {
        Self {
            name: name.into(),
            min_severity,
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every line written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn write(&self, _record: &LogRecord, line: &str) -> Result<(), SinkError> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }
}
