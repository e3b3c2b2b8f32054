//! Multi-sink log writer
//!
//! Every record is formatted once into the fixed tab-separated layout, printed
//! on the console mirror, and appended to each file sink whose minimum
//! severity it meets.
//!
//! ## File layout
//!
//! ```text
//! <dir>/app.log.INFO.<YYYY-MM-DD>[.N]   daily + size, info and above
//! <dir>/app.log.INFO[.N]                size, info and above
//! <dir>/app.log.WARN[.N]                size, warn and above
//! <dir>/app.log.ERROR[.N]               size, error
//! ```
//!
//! Sink failures never reach the caller. They are reported as a warn line on
//! the console mirror; if the console fails too the line is dropped.

pub mod file;
pub mod format;
pub mod layer;
pub mod record;
pub mod sink;

pub use file::{FileSink, RotationPolicy};
pub use format::{format_bytes, format_line};
pub use layer::LogWriterLayer;
pub use record::{Fields, LogRecord, Severity, CLIENT_IP, LOGIN_ID, META, REQUEST_ID};
pub use sink::{ConsoleSink, MemorySink, Sink, SinkError};

use crate::clock::{Clock, LocalClock};
use crate::config::LoggerConfig;
use std::fs;
use std::sync::Arc;

/// `tracing` target of the writer's own diagnostics
///
/// [`LogWriterLayer`] ignores this target so a failing sink cannot feed
/// itself.
pub const WRITER_TARGET: &str = "request_logger::writer";

/// Context label of the writer's fallback reports
const FALLBACK_CONTEXT: &str = "log_writer";

/// Base file name of every file sink
pub const FILE_PREFIX: &str = "app.log";

/// Process-wide log writer
///
/// Build it once at startup and share it behind an `Arc`.
pub struct LogWriter {
    sinks: Vec<Arc<dyn Sink>>,
    mirror: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    pid: u32,
}

impl LogWriter {
    /// Writer with explicit file sinks and console mirror
    pub fn new(sinks: Vec<Arc<dyn Sink>>, mirror: Arc<dyn Sink>) -> Self {
        Self {
            sinks,
            mirror,
            clock: Arc::new(LocalClock),
            pid: std::process::id(),
        }
    }

    /// Writer that only prints to standard output
    pub fn console_only() -> Self {
        Self::new(Vec::new(), Arc::new(ConsoleSink))
    }

    /// Build the writer described by the configuration
    ///
    /// File sinks are only created when file logging is enabled and a
    /// directory is set. A directory that cannot be created leaves the writer
    /// console-only.
    pub fn from_config(config: &LoggerConfig) -> Self {
        let writer = Self::console_only();

        let dir = match config.dir.as_ref() {
            Some(dir) if config.file_logging_active() => dir,
            _ => return writer,
        };

        if let Err(e) = fs::create_dir_all(dir) {
            writer.report(format!(
                "log directory {} unavailable, file logging disabled: {}",
                dir.display(),
                e
            ));
            return writer;
        }

        let info = format!("{}.INFO", FILE_PREFIX);
        let sinks: Vec<Arc<dyn Sink>> = vec![
            Arc::new(FileSink::new(
                dir,
                info.clone(),
                Severity::Info,
                config.info_max_size,
                RotationPolicy::DailyAndSize,
            )),
            Arc::new(FileSink::new(
                dir,
                info,
                Severity::Info,
                config.info_max_size,
                RotationPolicy::Size,
            )),
            Arc::new(FileSink::new(
                dir,
                format!("{}.WARN", FILE_PREFIX),
                Severity::Warn,
                config.warn_max_size,
                RotationPolicy::Size,
            )),
            Arc::new(FileSink::new(
                dir,
                format!("{}.ERROR", FILE_PREFIX),
                Severity::Error,
                config.error_max_size,
                RotationPolicy::Size,
            )),
        ];

        Self { sinks, ..writer }
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Build and write one record
    pub fn emit(&self, severity: Severity, message: impl Into<String>, context: Option<&str>, fields: Fields) {
        let record = LogRecord::new(self.clock.now(), severity, message, context, fields);
        self.write_record(&record);
    }

    /// Info-level record
    pub fn log(&self, message: impl Into<String>, context: Option<&str>, fields: Fields) {
        self.emit(Severity::Info, message, context, fields);
    }

    /// Warn-level record
    pub fn warn(&self, message: impl Into<String>, context: Option<&str>, fields: Fields) {
        self.emit(Severity::Warn, message, context, fields);
    }

    /// Error-level record; the trace is shown on the console only
    pub fn error(
        &self,
        message: impl Into<String>,
        trace: Option<String>,
        context: Option<&str>,
        fields: Fields,
    ) {
        let record = LogRecord::new(self.clock.now(), Severity::Error, message, context, fields)
            .with_trace(trace);
        self.write_record(&record);
    }

    /// Route an already-built record
    pub fn write_record(&self, record: &LogRecord) {
        let line = format_line(record, self.pid);

        let _ = self.mirror.write(record, &line);

        for sink in self.sinks.iter().filter(|s| record.severity() >= s.min_severity()) {
            if let Err(e) = sink.write(record, &line) {
                self.report(format!("sink {} dropped a record: {}", sink.name(), e));
            }
        }
    }

    /// Console-only warn line about the writer itself
    fn report(&self, message: String) {
        let record = LogRecord::new(
            self.clock.now(),
            Severity::Warn,
            message,
            Some(FALLBACK_CONTEXT),
            Fields::new(),
        );
        let line = format_line(&record, self.pid);
        let _ = self.mirror.write(&record, &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct FixedClock(DateTime<FixedOffset>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<FixedOffset> {
            self.0
        }
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn name(&self) -> &str {
            "broken"
        }

        fn min_severity(&self) -> Severity {
            Severity::Info
        }

        fn write(&self, _record: &LogRecord, _line: &str) -> Result<(), SinkError> {
            Err(SinkError::Write {
                path: PathBuf::from("/broken"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }
    }

    fn memory_writer() -> (LogWriter, Arc<MemorySink>, Arc<MemorySink>, Arc<MemorySink>) {
        let info = Arc::new(MemorySink::new("info", Severity::Info));
        let warn = Arc::new(MemorySink::new("warn", Severity::Warn));
        let mirror = Arc::new(MemorySink::new("console", Severity::Info));
        let writer = LogWriter::new(vec![info.clone(), warn.clone()], mirror.clone());
        (writer, info, warn, mirror)
    }

    #[test]
    fn test_routes_by_min_severity() {
        let (writer, info, warn, mirror) = memory_writer();

        writer.log("i", Some("test"), Fields::new());
        writer.warn("w", Some("test"), Fields::new());
        writer.error("e", None, Some("test"), Fields::new());

        assert_eq!(info.lines().len(), 3);
        assert_eq!(mirror.lines().len(), 3);

        let warn_lines = warn.lines();
        assert_eq!(warn_lines.len(), 2);
        assert!(warn_lines.iter().all(|l| !l.contains("\tINFO\t")));
        assert!(warn_lines[0].contains("\tWARN\t"));
        assert!(warn_lines[1].contains("\tERROR\t"));
    }

    #[test]
    fn test_uses_clock_and_pid() {
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap();
        let (writer, info, _, _) = memory_writer();
        let writer = writer.with_clock(Arc::new(FixedClock(ts)));

        writer.log("hello", None, Fields::new());

        let expected = format!(
            "2024-01-01 00:00:00.000\tINFO\t[{}]\t[-]\t[unknown]\t[-,-,]\t[-]\thello\t",
            std::process::id()
        );
        assert_eq!(info.lines(), vec![expected]);
    }

    #[test]
    fn test_sink_failure_is_absorbed_and_reported() {
        let good = Arc::new(MemorySink::new("good", Severity::Info));
        let mirror = Arc::new(MemorySink::new("console", Severity::Info));
        let writer = LogWriter::new(vec![Arc::new(FailingSink), good.clone()], mirror.clone());

        writer.log("still delivered", None, Fields::new());

        assert_eq!(good.lines().len(), 1);
        let console = mirror.lines();
        assert_eq!(console.len(), 2);
        assert!(console[1].contains("\tWARN\t"));
        assert!(console[1].contains("[log_writer]"));
        assert!(console[1].contains("sink broken dropped a record"));
    }

    #[test]
    fn test_from_config_disabled_is_console_only() {
        let dir = TempDir::new().unwrap();
        let config = LoggerConfig {
            file_logging: false,
            dir: Some(dir.path().to_path_buf()),
            ..LoggerConfig::default()
        };
        assert_eq!(LogWriter::from_config(&config).sink_count(), 0);

        let config = LoggerConfig {
            file_logging: true,
            dir: None,
            ..LoggerConfig::default()
        };
        assert_eq!(LogWriter::from_config(&config).sink_count(), 0);
    }

    #[test]
    fn test_from_config_writes_severity_files() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let config = LoggerConfig {
            file_logging: true,
            dir: Some(logs.clone()),
            ..LoggerConfig::default()
        };
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .unwrap();
        let writer = LogWriter::from_config(&config).with_clock(Arc::new(FixedClock(ts)));
        assert_eq!(writer.sink_count(), 4);

        writer.log("info line", None, Fields::new());
        writer.warn("warn line", None, Fields::new());
        writer.error("error line", Some("trace".to_string()), None, Fields::new());

        let read = |name: &str| fs::read_to_string(logs.join(name)).unwrap();
        assert_eq!(read("app.log.INFO").lines().count(), 3);
        assert_eq!(read("app.log.INFO.2024-06-01").lines().count(), 3);

        let warn = read("app.log.WARN");
        assert_eq!(warn.lines().count(), 2);
        assert!(!warn.contains("info line"));

        let error = read("app.log.ERROR");
        assert_eq!(error.lines().count(), 1);
        assert!(error.contains("error line"));
        assert!(!error.contains("trace"));
    }
}
