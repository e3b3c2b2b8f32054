//! Line layout and human-readable byte sizes

use super::record::{LogRecord, CLIENT_IP, LOGIN_ID, META, REQUEST_ID};

/// Timestamp layout: `YYYY-MM-DD HH:mm:ss.SSS`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Render a record as one tab-separated line (without trailing newline)
///
/// ```text
/// ts  LEVEL  [pid]  [ip|-]  [context]  [token,identity,]  [-]  message  meta
/// ```
pub fn format_line(record: &LogRecord, pid: u32) -> String {
    format!(
        "{}\t{}\t[{}]\t[{}]\t[{}]\t[{},{},]\t[-]\t{}\t{}",
        record.timestamp().format(TIMESTAMP_FORMAT),
        record.severity().as_upper(),
        pid,
        record.field(CLIENT_IP).unwrap_or("-"),
        record.context().filter(|c| !c.is_empty()).unwrap_or("unknown"),
        record.field(REQUEST_ID).unwrap_or("-"),
        record.field(LOGIN_ID).unwrap_or("-"),
        record.message(),
        record.field(META).unwrap_or(""),
    )
}

const UNITS: [(&str, u64); 5] = [
    ("pb", 1 << 50),
    ("tb", 1 << 40),
    ("gb", 1 << 30),
    ("mb", 1 << 20),
    ("kb", 1 << 10),
];

/// Format a byte count with a 1024 base, e.g. `512b`, `1.5kb`, `10mb`
///
/// At most two decimals are kept and trailing zeros are trimmed.
pub fn format_bytes(len: u64) -> String {
    for (unit, scale) in UNITS {
        if len >= scale {
            let value = format!("{:.2}", len as f64 / scale as f64);
            let value = value.trim_end_matches('0').trim_end_matches('.');
            return format!("{}{}", value, unit);
        }
    }
    format!("{}b", len)
}
