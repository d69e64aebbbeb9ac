//! Levels, per-job logger settings and line rendering.

use serde::{Deserialize, Serialize};

/// Field holding the human-readable text of a record.
pub const MESSAGE_KEY: &str = "msg";

/// Field holding the short machine tag of a record (`download_error`, `response`).
pub const EVENT_KEY: &str = "event";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How a [`JobLogger`](super::JobLogger) filters and decorates its lines.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Engine stderr lines retained for the failure report. Zero disables it.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

/// Receives every line a job logger writes, after decoration.
pub type LineCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Marker placed in front of a rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// `$ ffmpeg ...`
    Command,
    /// `=== Compose ===`
    Stage,
    Success,
    Warning,
    Error,
    None,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        let tag = match self {
            MessagePrefix::Command => return format!("$ {}", message),
            MessagePrefix::Stage => return format!("=== {} ===", message),
            MessagePrefix::None => return message.to_string(),
            MessagePrefix::Success => "SUCCESS",
            MessagePrefix::Warning => "WARNING",
            MessagePrefix::Error => "ERROR",
        };
        format!("[{}] {}", tag, message)
    }

    /// Marker for a plain message recorded at `level`.
    pub fn for_level(level: LogLevel) -> Self {
        match level {
            LogLevel::Warn => MessagePrefix::Warning,
            LogLevel::Error => MessagePrefix::Error,
            LogLevel::Trace | LogLevel::Debug | LogLevel::Info => MessagePrefix::None,
        }
    }
}

/// Flatten a record into `message key=value ...`.
///
/// Values that are empty or contain whitespace are debug-quoted so the
/// line stays splittable on spaces.
pub fn render_fields(fields: &[(&str, String)]) -> String {
    let message = fields
        .iter()
        .find_map(|(k, v)| (*k == MESSAGE_KEY).then_some(v.as_str()));

    let rest = fields
        .iter()
        .filter(|(k, _)| *k != MESSAGE_KEY)
        .map(|(key, value)| {
            if value.is_empty() || value.contains(char::is_whitespace) {
                format!("{}={:?}", key, value)
            } else {
                format!("{}={}", key, value)
            }
        });

    message
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .into_iter()
        .chain(rest)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_and_command_markers() {
        assert_eq!(MessagePrefix::Stage.format("Pad"), "=== Pad ===");
        assert_eq!(MessagePrefix::Command.format("ffmpeg -y"), "$ ffmpeg -y");
        assert_eq!(MessagePrefix::Error.format("boom"), "[ERROR] boom");
    }

    #[test]
    fn only_warn_and_error_get_a_level_marker() {
        assert_eq!(MessagePrefix::for_level(LogLevel::Warn), MessagePrefix::Warning);
        assert_eq!(MessagePrefix::for_level(LogLevel::Debug), MessagePrefix::None);
    }

    #[test]
    fn message_leads_and_spaced_values_are_quoted() {
        let line = render_fields(&[
            ("key", "chunks/a.mp3".to_string()),
            (MESSAGE_KEY, "Chunk inspected".to_string()),
            ("note", "two words".to_string()),
        ]);
        assert_eq!(line, "Chunk inspected key=chunks/a.mp3 note=\"two words\"");
    }

    #[test]
    fn fields_without_message() {
        let line = render_fields(&[("status", "404".to_string()), ("bucket", String::new())]);
        assert_eq!(line, "status=404 bucket=\"\"");
    }

    #[test]
    fn level_names_parse_from_config() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }
        let parsed: Wrapper = toml::from_str("level = \"warn\"").unwrap();
        assert_eq!(parsed.level, LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Info);
    }
}
