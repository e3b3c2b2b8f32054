//! Tracing layer that forwards application events into the log writer
//!
//! `tracing` events become [`LogRecord`]s: the level maps to a severity, the
//! target becomes the context label, and the `client_ip`, `request_id` and
//! `login_id` fields fill their columns. Remaining fields are serialized as
//! JSON into the metadata column.

use super::record::{Fields, LogRecord, Severity, CLIENT_IP, LOGIN_ID, META, REQUEST_ID};
use super::{LogWriter, WRITER_TARGET};
use crate::clock::{Clock, LocalClock};
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

/// Layer writing every event through a [`LogWriter`]
pub struct LogWriterLayer {
    writer: Arc<LogWriter>,
    clock: Arc<dyn Clock>,
}

impl LogWriterLayer {
    pub fn new(writer: Arc<LogWriter>) -> Self {
        Self {
            writer,
            clock: Arc::new(LocalClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

fn severity_for(level: &Level) -> Severity {
    if *level == Level::ERROR {
        Severity::Error
    } else if *level == Level::WARN {
        Severity::Warn
    } else {
        Severity::Info
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Fields,
    extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldVisitor {
    fn record_value(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = Some(value),
            CLIENT_IP | REQUEST_ID | LOGIN_ID => {
                self.fields.insert(name.to_string(), Some(value));
            }
            _ => {
                self.extra
                    .insert(name.to_string(), serde_json::Value::String(value));
            }
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record_value(field.name(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record_value(field.name(), value.to_string());
    }
}

impl<S> Layer<S> for LogWriterLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(WRITER_TARGET) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut fields = visitor.fields;
        if !visitor.extra.is_empty() {
            let meta = serde_json::to_string(&visitor.extra).unwrap_or_default();
            fields.insert(META.to_string(), Some(meta));
        }

        let record = LogRecord::new(
            self.clock.now(),
            severity_for(metadata.level()),
            visitor.message.unwrap_or_default(),
            Some(metadata.target()),
            fields,
        );
        self.writer.write_record(&record);
    }
}
