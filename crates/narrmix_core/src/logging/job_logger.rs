//! One log file per mix job.
//!
//! Besides writing every accepted record to `<logs>/<job_id>.log`, the
//! logger remembers the last few lines of engine stderr so a failed job
//! can be diagnosed from its log alone.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::sink::LogSink;
use super::types::{render_fields, LineCallback, LogConfig, LogLevel, MessagePrefix};

struct Output {
    file: Option<BufWriter<File>>,
    diagnostics: VecDeque<String>,
}

/// File-backed [`LogSink`] for a single job.
pub struct JobLogger {
    job_id: String,
    path: PathBuf,
    config: LogConfig,
    output: Mutex<Output>,
    on_line: Option<LineCallback>,
}

impl JobLogger {
    /// Create `<log_dir>/<job_id>.log`, truncating any previous file.
    pub fn new(
        job_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        on_line: Option<LineCallback>,
    ) -> io::Result<Self> {
        let job_id = job_id.into();
        fs::create_dir_all(log_dir.as_ref())?;
        let path = log_dir.as_ref().join(log_file_name(&job_id));
        let file = File::create(&path)?;

        Ok(Self {
            output: Mutex::new(Output {
                file: Some(BufWriter::new(file)),
                diagnostics: VecDeque::with_capacity(config.error_tail),
            }),
            job_id,
            path,
            config,
            on_line,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn log_path(&self) -> &Path {
        &self.path
    }

    /// Retained engine stderr, oldest first.
    pub fn get_tail(&self) -> Vec<String> {
        self.output.lock().diagnostics.iter().cloned().collect()
    }

    /// Repeat the retained engine stderr under a `[tool/tail]` header.
    pub fn show_tail(&self, tool: &str) {
        let mut output = self.output.lock();
        if output.diagnostics.is_empty() {
            return;
        }
        let mut block = Vec::with_capacity(output.diagnostics.len() + 1);
        block.push(format!("[{}/tail]", tool));
        block.extend(output.diagnostics.iter().cloned());
        for line in block {
            self.emit(&mut output, &line);
        }
    }

    pub fn flush(&self) {
        if let Some(file) = self.output.lock().file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Flush and drop the file handle. Later records only reach the callback.
    pub fn close(&self) {
        let mut output = self.output.lock();
        if let Some(mut file) = output.file.take() {
            let _ = file.flush();
        }
    }

    fn emit(&self, output: &mut Output, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };
        if let Some(file) = output.file.as_mut() {
            let _ = writeln!(file, "{}", line);
        }
        if let Some(on_line) = &self.on_line {
            on_line(&line);
        }
    }
}

impl LogSink for JobLogger {
    fn record(&self, level: LogLevel, fields: &[(&str, String)]) {
        if level < self.config.level {
            return;
        }
        let message = MessagePrefix::for_level(level).format(&render_fields(fields));
        let mut output = self.output.lock();
        self.emit(&mut output, &message);
    }

    fn diagnostic(&self, tool: &str, text: &str) {
        let limit = self.config.error_tail;
        if limit > 0 {
            let mut output = self.output.lock();
            for line in text.lines().filter(|l| !l.trim().is_empty()) {
                if output.diagnostics.len() == limit {
                    output.diagnostics.pop_front();
                }
                output.diagnostics.push_back(line.to_string());
            }
        }
        self.show_tail(tool);
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Job ids come from callers; keep them inside the logs folder.
fn log_file_name(job_id: &str) -> String {
    let stem: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.log", stem.trim_start_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogSinkExt;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn logger_in(dir: &Path, config: LogConfig) -> JobLogger {
        JobLogger::new("job-1", dir, config, None).unwrap()
    }

    #[test]
    fn log_file_is_named_after_the_job() {
        let dir = tempdir().unwrap();
        let logger = logger_in(dir.path(), LogConfig::default());

        assert_eq!(logger.log_path(), dir.path().join("job-1.log"));
        assert!(logger.log_path().exists());
        assert_eq!(logger.job_id(), "job-1");
    }

    #[test]
    fn warnings_carry_marker_and_fields() {
        let dir = tempdir().unwrap();
        let logger = logger_in(
            dir.path(),
            LogConfig {
                show_timestamps: false,
                ..LogConfig::default()
            },
        );

        logger.event(LogLevel::Warn, "zero_length", "Zero-length chunk", &[("index", "1".into())]);
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert_eq!(content, "[WARNING] Zero-length chunk event=zero_length index=1\n");
    }

    #[test]
    fn records_below_threshold_are_dropped() {
        let dir = tempdir().unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let on_line: LineCallback = Box::new(move |line| sink.lock().push(line.to_string()));

        let logger = JobLogger::new(
            "job-1",
            dir.path(),
            LogConfig {
                show_timestamps: false,
                ..LogConfig::default()
            },
            Some(on_line),
        )
        .unwrap();
        logger.debug("hidden");
        logger.stage("Pad");

        assert_eq!(*seen.lock(), vec!["=== Pad ===".to_string()]);
    }

    #[test]
    fn engine_stderr_tail_is_bounded() {
        let dir = tempdir().unwrap();
        let logger = logger_in(
            dir.path(),
            LogConfig {
                error_tail: 3,
                ..LogConfig::default()
            },
        );

        let stderr: String = (0..6).map(|i| format!("frame {}\n\n", i)).collect();
        logger.diagnostic("ffmpeg", &stderr);

        assert_eq!(logger.get_tail(), vec!["frame 3", "frame 4", "frame 5"]);
        logger.close();
        let content = fs::read_to_string(dir.path().join("job-1.log")).unwrap();
        assert!(content.contains("[ffmpeg/tail]"));
        assert!(!content.contains("frame 2"));
    }

    #[test]
    fn zero_tail_keeps_nothing() {
        let dir = tempdir().unwrap();
        let logger = logger_in(
            dir.path(),
            LogConfig {
                error_tail: 0,
                ..LogConfig::default()
            },
        );
        logger.diagnostic("ffprobe", "Invalid data found");
        assert!(logger.get_tail().is_empty());
    }

    #[test]
    fn hostile_job_ids_stay_in_folder() {
        assert_eq!(log_file_name("a/../b"), "a_.._b.log");
        assert_eq!(log_file_name("..hidden"), "hidden.log");
        assert_eq!(log_file_name("3f2a-99"), "3f2a-99.log");
    }
}
