//! Rotating file sink
//!
//! Two layouts are supported:
//! - **Size**: the active file keeps its configured name; when the next line
//!   would push it past `max_size` it is renamed to `<name>.<N>` (first unused
//!   `N`, starting at 1) and a fresh file is opened under the original name.
//! - **Daily + size**: lines go to `<name>.<YYYY-MM-DD>`, and when that file is
//!   full to `<name>.<YYYY-MM-DD>.1`, `.2`, ... A new date starts a new file
//!   regardless of size. The date is taken from the record's own timestamp.
//!
//! Rolled files are never reopened for writing or overwritten.

use super::record::{LogRecord, Severity};
use super::sink::{Sink, SinkError};
use chrono::NaiveDate;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// When a file sink starts a new file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Append forever
    None,
    /// Roll when the size limit would be exceeded
    Size,
    /// Roll on size and on calendar day change
    DailyAndSize,
}

struct ActiveFile {
    file: File,
    path: PathBuf,
    size: u64,
    date: NaiveDate,
    seq: u32,
}

/// Append-only file sink with size/daily rotation
///
/// All writes, rotations and reopenings go through one mutex, so concurrent
/// requests never interleave partial lines or race a rename.
pub struct FileSink {
    name: String,
    min_severity: Severity,
    dir: PathBuf,
    file_name: String,
    max_size: u64,
    policy: RotationPolicy,
    active: Mutex<Option<ActiveFile>>,
}

impl FileSink {
    pub fn new(
        dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        min_severity: Severity,
        max_size: u64,
        policy: RotationPolicy,
    ) -> Self {
        let file_name = file_name.into();
        let name = match policy {
            RotationPolicy::DailyAndSize => format!("{}.%DATE%", file_name),
            _ => file_name.clone(),
        };

        Self {
            name,
            min_severity,
            dir: dir.into(),
            file_name,
            max_size,
            policy,
            active: Mutex::new(None),
        }
    }

    /// Path currently being appended to, if a file has been opened yet
    pub fn active_path(&self) -> Option<PathBuf> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|active| active.path.clone())
    }

    fn base_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    fn dated_path(&self, date: NaiveDate, seq: u32) -> PathBuf {
        let mut name = format!("{}.{}", self.file_name, date.format("%Y-%m-%d"));
        if seq > 0 {
            name.push_str(&format!(".{}", seq));
        }
        self.dir.join(name)
    }

    /// Open the file a fresh process (or a new day) should append to
    fn open_active(&self, date: NaiveDate) -> Result<ActiveFile, SinkError> {
        match self.policy {
            RotationPolicy::DailyAndSize => {
                // Continue the newest sequence of the day after a restart
                let mut seq = 0;
                while self.dated_path(date, seq + 1).exists() {
                    seq += 1;
                }
                open_append(self.dated_path(date, seq), date, seq)
            }
            RotationPolicy::Size | RotationPolicy::None => open_append(self.base_path(), date, 0),
        }
    }

    fn should_roll(&self, active: &ActiveFile, incoming: u64) -> bool {
        self.policy != RotationPolicy::None
            && self.max_size > 0
            && active.size > 0
            && active.size + incoming > self.max_size
    }

    fn roll(&self, active: ActiveFile) -> Result<ActiveFile, SinkError> {
        let ActiveFile {
            file, path, date, seq, ..
        } = active;
        drop(file);

        match self.policy {
            RotationPolicy::DailyAndSize => open_append(self.dated_path(date, seq + 1), date, seq + 1),
            RotationPolicy::Size | RotationPolicy::None => {
                let rolled = next_free_sequence(&path);
                fs::rename(&path, &rolled).map_err(|source| SinkError::Rotate {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!(
                    target: super::WRITER_TARGET,
                    from = %path.display(),
                    to = %rolled.display(),
                    "Rolled log file"
                );
                open_append(path, date, 0)
            }
        }
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn write(&self, record: &LogRecord, line: &str) -> Result<(), SinkError> {
        let date = record.timestamp().date_naive();
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        let incoming = buf.len() as u64;

        let mut guard = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        let mut active = match guard.take() {
            Some(active)
                if !(self.policy == RotationPolicy::DailyAndSize && active.date != date) =>
            {
                active
            }
            _ => self.open_active(date)?,
        };

        if self.should_roll(&active, incoming) {
            active = self.roll(active)?;
        }

        let result = active
            .file
            .write_all(buf.as_bytes())
            .map_err(|source| SinkError::Write {
                path: active.path.clone(),
                source,
            });
        if result.is_ok() {
            active.size += incoming;
        }

        *guard = Some(active);
        result
    }
}

fn open_append(path: PathBuf, date: NaiveDate, seq: u32) -> Result<ActiveFile, SinkError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| SinkError::Open {
            path: path.clone(),
            source,
        })?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);

    Ok(ActiveFile {
        file,
        path,
        size,
        date,
        seq,
    })
}

/// First `<path>.<N>` (N >= 1) that does not exist yet
fn next_free_sequence(path: &Path) -> PathBuf {
    let mut n: u32 = 1;
    loop {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(format!(".{}", n));
        let candidate = PathBuf::from(candidate);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::record::Fields;
    use chrono::{FixedOffset, TimeZone};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record_on(day: u32, severity: Severity) -> LogRecord {
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, day, 23, 59, 0)
            .unwrap();
        LogRecord::new(ts, severity, "m", None, Fields::new())
    }

    fn read(path: impl AsRef<Path>) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.log.WARN"), "old\n").unwrap();

        let sink = FileSink::new(dir.path(), "app.log.WARN", Severity::Warn, 1024, RotationPolicy::Size);
        sink.write(&record_on(1, Severity::Warn), "new").unwrap();

        assert_eq!(read(dir.path().join("app.log.WARN")), "old\nnew\n");
    }

    #[test]
    fn test_size_rotation_keeps_prior_content() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path(), "app.log.INFO", Severity::Info, 20, RotationPolicy::Size);
        let rec = record_on(1, Severity::Info);

        sink.write(&rec, "line-one").unwrap(); // 9 bytes
        sink.write(&rec, "line-two").unwrap(); // 18 bytes
        sink.write(&rec, "line-three").unwrap(); // would be 29 > 20

        assert_eq!(read(dir.path().join("app.log.INFO.1")), "line-one\nline-two\n");
        assert_eq!(read(dir.path().join("app.log.INFO")), "line-three\n");

        sink.write(&rec, "line-four-long").unwrap();
        assert_eq!(read(dir.path().join("app.log.INFO.1")), "line-one\nline-two\n");
        assert_eq!(read(dir.path().join("app.log.INFO.2")), "line-three\n");
        assert_eq!(read(dir.path().join("app.log.INFO")), "line-four-long\n");
    }

    #[test]
    fn test_oversized_line_written_to_empty_file() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path(), "app.log.ERROR", Severity::Error, 4, RotationPolicy::Size);

        sink.write(&record_on(1, Severity::Error), "far too long").unwrap();

        assert_eq!(read(dir.path().join("app.log.ERROR")), "far too long\n");
        assert!(!dir.path().join("app.log.ERROR.1").exists());
    }

    #[test]
    fn test_no_rotation_policy_ignores_size() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path(), "plain.log", Severity::Info, 4, RotationPolicy::None);
        let rec = record_on(1, Severity::Info);

        sink.write(&rec, "first").unwrap();
        sink.write(&rec, "second").unwrap();

        assert_eq!(read(dir.path().join("plain.log")), "first\nsecond\n");
    }

    #[test]
    fn test_daily_rotation_on_date_change() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(
            dir.path(),
            "app.log.INFO",
            Severity::Info,
            1024,
            RotationPolicy::DailyAndSize,
        );

        sink.write(&record_on(1, Severity::Info), "monday").unwrap();
        sink.write(&record_on(2, Severity::Info), "tuesday").unwrap();

        assert_eq!(read(dir.path().join("app.log.INFO.2024-05-01")), "monday\n");
        assert_eq!(read(dir.path().join("app.log.INFO.2024-05-02")), "tuesday\n");
        assert_eq!(
            sink.active_path(),
            Some(dir.path().join("app.log.INFO.2024-05-02"))
        );
    }

    #[test]
    fn test_daily_size_rotation_and_restart() {
        let dir = TempDir::new().unwrap();
        let rec = record_on(3, Severity::Info);
        {
            let sink = FileSink::new(
                dir.path(),
                "app.log.INFO",
                Severity::Info,
                10,
                RotationPolicy::DailyAndSize,
            );
            sink.write(&rec, "aaaaaa").unwrap();
            sink.write(&rec, "bbbbbb").unwrap();
        }

        assert_eq!(read(dir.path().join("app.log.INFO.2024-05-03")), "aaaaaa\n");
        assert_eq!(read(dir.path().join("app.log.INFO.2024-05-03.1")), "bbbbbb\n");

        // A new process continues the newest file of the day
        let sink = FileSink::new(
            dir.path(),
            "app.log.INFO",
            Severity::Info,
            10,
            RotationPolicy::DailyAndSize,
        );
        sink.write(&rec, "c").unwrap();
        assert_eq!(read(dir.path().join("app.log.INFO.2024-05-03.1")), "bbbbbb\nc\n");
        assert_eq!(read(dir.path().join("app.log.INFO.2024-05-03")), "aaaaaa\n");
    }

    #[test]
    fn test_concurrent_writers_never_split_lines() {
        const THREADS: usize = 8;
        const LINES: usize = 200;
        const MAX: u64 = 500;

        let dir = TempDir::new().unwrap();
        let sink = Arc::new(FileSink::new(
            dir.path(),
            "app.log.INFO",
            Severity::Info,
            MAX,
            RotationPolicy::Size,
        ));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    let rec = record_on(1, Severity::Info);
                    for i in 0..LINES {
                        sink.write(&rec, &format!("thread-{}-line-{:04}-payload", t, i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = HashSet::new();
        for entry in fs::read_dir(dir.path()).unwrap() {
            let path = entry.unwrap().path();
            let content = read(&path);
            assert!(content.len() as u64 <= MAX, "{} is over the limit", path.display());
            assert!(content.ends_with('\n'));
            for line in content.lines() {
                let rest = line.strip_prefix("thread-").unwrap();
                let (t, rest) = rest.split_once("-line-").unwrap();
                let i = rest.strip_suffix("-payload").unwrap();
                assert!(t.parse::<usize>().unwrap() < THREADS);
                assert_eq!(i.len(), 4);
                assert!(seen.insert(line.to_string()), "duplicate line {}", line);
            }
        }
        assert_eq!(seen.len(), THREADS * LINES);
    }

    #[test]
    fn test_missing_directory_reports_open_error() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(
            dir.path().join("does-not-exist"),
            "app.log.INFO",
            Severity::Info,
            1024,
            RotationPolicy::Size,
        );

        let err = sink.write(&record_on(1, Severity::Info), "x").unwrap_err();
        assert!(matches!(err, SinkError::Open { .. }));
        assert!(sink.active_path().is_none());
    }
}
