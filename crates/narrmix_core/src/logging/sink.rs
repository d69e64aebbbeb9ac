//! Injected structured logging.
//!
//! Pipeline components never touch global logger state. They receive a
//! `&dyn LogSink` and call [`LogSink::record`] (usually through the
//! helpers on [`LogSinkExt`]).

use std::sync::Arc;

use parking_lot::Mutex;

use super::types::{render_fields, LogLevel, MessagePrefix, EVENT_KEY, MESSAGE_KEY};

/// Destination for structured log records.
pub trait LogSink: Send + Sync {
    /// Record one event as a list of `(key, value)` fields.
    fn record(&self, level: LogLevel, fields: &[(&str, String)]);

    /// Record diagnostic output of an external tool (usually stderr).
    ///
    /// The default records each line at debug level.
    fn diagnostic(&self, tool: &str, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.record(
                LogLevel::Debug,
                &[("tool", tool.to_string()), (MESSAGE_KEY, line.to_string())],
            );
        }
    }
}

/// Convenience helpers available on every sink.
pub trait LogSinkExt: LogSink {
    fn info(&self, message: &str) {
        self.record(LogLevel::Info, &[(MESSAGE_KEY, message.to_string())]);
    }

    fn debug(&self, message: &str) {
        self.record(LogLevel::Debug, &[(MESSAGE_KEY, message.to_string())]);
    }

    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, &[(MESSAGE_KEY, message.to_string())]);
    }

    fn error(&self, message: &str) {
        self.record(LogLevel::Error, &[(MESSAGE_KEY, message.to_string())]);
    }

    /// Record a tagged event with extra fields.
    fn event(&self, level: LogLevel, event: &str, message: &str, extra: &[(&str, String)]) {
        let mut fields = Vec::with_capacity(extra.len() + 2);
        fields.push((EVENT_KEY, event.to_string()));
        fields.push((MESSAGE_KEY, message.to_string()));
        fields.extend(extra.iter().map(|(k, v)| (*k, v.clone())));
        self.record(level, &fields);
    }

    /// Log a command being executed.
    fn command(&self, command: &str) {
        self.info(&MessagePrefix::Command.format(command));
    }

    /// Log a stage marker.
    fn stage(&self, stage_name: &str) {
        self.info(&MessagePrefix::Stage.format(stage_name));
    }

    /// Log a success message.
    fn success(&self, message: &str) {
        self.info(&MessagePrefix::Success.format(message));
    }
}

impl<T: LogSink + ?Sized> LogSinkExt for T {}

/// Forwards records to the global `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, level: LogLevel, fields: &[(&str, String)]) {
        let line = render_fields(fields);
        match level {
            LogLevel::Trace => tracing::trace!(target: "narrmix", "{}", line),
            LogLevel::Debug => tracing::debug!(target: "narrmix", "{}", line),
            LogLevel::Info => tracing::info!(target: "narrmix", "{}", line),
            LogLevel::Warn => tracing::warn!(target: "narrmix", "{}", line),
            LogLevel::Error => tracing::error!(target: "narrmix", "{}", line),
        }
    }
}

/// A captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    /// Value of the field `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn message(&self) -> &str {
        self.get(MESSAGE_KEY).unwrap_or("")
    }

    pub fn event(&self) -> Option<&str> {
        self.get(EVENT_KEY)
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records carrying the given event tag.
    pub fn events(&self, event: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.event() == Some(event))
            .cloned()
            .collect()
    }

    /// Whether any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.records.lock().iter().any(|r| r.message().contains(needle))
    }

    pub fn count_at(&self, level: LogLevel) -> usize {
        self.records.lock().iter().filter(|r| r.level == level).count()
    }
}

impl LogSink for MemorySink {
    fn record(&self, level: LogLevel, fields: &[(&str, String)]) {
        self.records.lock().push(LogRecord {
            level,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }
}

/// Sends every record to several sinks.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl LogSink for FanoutSink {
    fn record(&self, level: LogLevel, fields: &[(&str, String)]) {
        for sink in &self.sinks {
            sink.record(level, fields);
        }
    }

    fn diagnostic(&self, tool: &str, text: &str) {
        for sink in &self.sinks {
            sink.diagnostic(tool, text);
        }
    }
}
