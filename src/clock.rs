use chrono::{DateTime, FixedOffset, Local};

/// Source of wall-clock timestamps for log records
///
/// The offset of the returned time decides which calendar day a daily sink
/// rolls on, so the default reads the local timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Clock backed by the process-local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}
