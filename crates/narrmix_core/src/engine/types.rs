//! Engine error types, encode profiles and filter graph specs.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a fatal engine invocation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine executable could not be started.
    #[error("Failed to launch {tool}: {source}")]
    Unreachable {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The engine did not finish within the configured bound.
    #[error("{tool} did not finish within {}s", .timeout.as_secs_f64())]
    TimedOut { tool: String, timeout: Duration },

    /// The engine ran but reported a failure.
    #[error("{tool} failed with exit code {exit_code}: {diagnostic}")]
    Failed {
        tool: String,
        exit_code: i32,
        diagnostic: String,
    },

    /// The engine exited cleanly but the expected output is missing.
    #[error("{tool} produced no output at {}", .path.display())]
    MissingOutput { tool: String, path: PathBuf },

    /// The request cannot be expressed as an engine invocation.
    #[error("Unsupported engine request: {0}")]
    Unsupported(String),

    /// Local file handling around an invocation failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    pub fn unreachable(tool: impl Into<String>, source: io::Error) -> Self {
        Self::Unreachable {
            tool: tool.into(),
            source,
        }
    }

    pub fn timed_out(tool: impl Into<String>, timeout: Duration) -> Self {
        Self::TimedOut {
            tool: tool.into(),
            timeout,
        }
    }

    pub fn failed(tool: impl Into<String>, exit_code: i32, diagnostic: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            exit_code,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn missing_output(tool: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingOutput {
            tool: tool.into(),
            path: path.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// True when the engine could not be run to completion at all
    /// (unreachable or timed out), as opposed to running and failing.
    pub fn is_invocation(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::TimedOut { .. })
    }

    /// Diagnostic text reported by the engine, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Failed { diagnostic, .. } => Some(diagnostic.as_str()),
            _ => None,
        }
    }

    /// Name of the tool involved, if known.
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::Unreachable { tool, .. }
            | Self::TimedOut { tool, .. }
            | Self::Failed { tool, .. }
            | Self::MissingOutput { tool, .. } => Some(tool.as_str()),
            Self::Unsupported(_) | Self::Io { .. } => None,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A duration probe that could not be interpreted.
///
/// Never fatal: callers substitute a zero duration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not read duration of {}: {reason}", .path.display())]
pub struct ProbeFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl ProbeFailure {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Output encoding options for re-encoding operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeProfile {
    /// Audio codec (`-c:a`).
    pub codec: Option<String>,
    /// Output sample rate (`-ar`).
    pub sample_rate: Option<u32>,
    /// Output bitrate (`-b:a`).
    pub bitrate: Option<String>,
}

impl EncodeProfile {
    /// Let the engine pick everything from the output extension.
    pub fn engine_default() -> Self {
        Self::default()
    }

    /// Profile for the concatenated narration master.
    pub fn narration_master() -> Self {
        Self {
            codec: Some("libmp3lame".to_string()),
            sample_rate: Some(44_100),
            bitrate: Some("328k".to_string()),
        }
    }

    /// Profile for the final mixed output.
    pub fn mix_output() -> Self {
        Self {
            codec: Some("mp3".to_string()),
            sample_rate: None,
            bitrate: None,
        }
    }

    /// Command-line arguments for this profile.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(ref codec) = self.codec {
            args.push("-c:a".into());
            args.push(codec.into());
        }
        if let Some(rate) = self.sample_rate {
            args.push("-ar".into());
            args.push(rate.to_string().into());
        }
        if let Some(ref bitrate) = self.bitrate {
            args.push("-b:a".into());
            args.push(bitrate.into());
        }
        args
    }
}

/// A filter specification applied over one or two inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterGraph {
    /// A linear audio filter chain over a single input (`-filter:a`).
    Simple { chain: String },
    /// A labelled graph over several inputs, producing `output_label`
    /// (`-filter_complex ... -map [label]`).
    Complex { graph: String, output_label: String },
}

impl FilterGraph {
    pub fn simple(chain: impl Into<String>) -> Self {
        Self::Simple {
            chain: chain.into(),
        }
    }

    pub fn complex(graph: impl Into<String>, output_label: impl Into<String>) -> Self {
        Self::Complex {
            graph: graph.into(),
            output_label: output_label.into(),
        }
    }

    /// The filter text itself.
    pub fn spec(&self) -> &str {
        match self {
            Self::Simple { chain } => chain,
            Self::Complex { graph, .. } => graph,
        }
    }
}

/// How a stream-copy retime reaches its target length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetimeMode {
    /// Repeat the input indefinitely, then cut at the target.
    Loop,
    /// Cut the input at the target.
    Trim,
}

impl std::fmt::Display for RetimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetimeMode::Loop => write!(f, "loop"),
            RetimeMode::Trim => write!(f, "trim"),
        }
    }
}

/// Format seconds for engine arguments and filter text.
///
/// Millisecond precision, trailing zeros trimmed but at least one
/// decimal kept (`3.0`, `7.15`, `0.15`).
pub fn format_seconds(seconds: f64) -> String {
    let mut text = format!("{:.3}", seconds);
    while text.ends_with('0') && !text.ends_with(".0") {
        text.pop();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_displays_context() {
        let err = EngineError::failed("ffmpeg", 1, "Invalid data found when processing input");
        let msg = err.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Invalid data"));
        assert_eq!(err.diagnostic(), Some("Invalid data found when processing input"));
        assert!(!err.is_invocation());
    }

    #[test]
    fn invocation_errors_are_classified() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "no such file");
        assert!(EngineError::unreachable("ffmpeg", missing).is_invocation());
        assert!(EngineError::timed_out("ffmpeg", Duration::from_secs(3)).is_invocation());
        assert!(!EngineError::missing_output("ffmpeg", "/tmp/x.mp3").is_invocation());
    }

    #[test]
    fn profiles_build_args() {
        let args: Vec<String> = EncodeProfile::narration_master()
            .to_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["-c:a", "libmp3lame", "-ar", "44100", "-b:a", "328k"]);
        assert!(EncodeProfile::engine_default().to_args().is_empty());
    }

    #[test]
    fn seconds_format_trims_zeros() {
        assert_eq!(format_seconds(3.0), "3.0");
        assert_eq!(format_seconds(7.15), "7.15");
        assert_eq!(format_seconds(0.15), "0.15");
        assert_eq!(format_seconds(10.0), "10.0");
        assert_eq!(format_seconds(0.8), "0.8");
        assert_eq!(format_seconds(1.23456), "1.235");
    }
}
