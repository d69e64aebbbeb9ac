//! Media engine adapter.
//!
//! Every decode/encode operation in the pipeline goes through
//! [`MediaEngine`]. The shipped implementation is [`FfmpegEngine`], which
//! runs the ffmpeg command-line tools as bounded subprocesses; tests use
//! an in-memory fake.
//!
//! All operations take an explicit output path allocated from the job's
//! [`Workspace`](crate::models::Workspace), so an engine holds no per-job
//! state and can be shared between concurrent jobs.

mod command;
mod ffmpeg;
mod types;

pub use command::{describe, run_bounded, CommandOutput};
pub use ffmpeg::{parse_probe_output, FfmpegEngine};
pub use types::{
    format_seconds, EncodeProfile, EngineError, EngineResult, FilterGraph, ProbeFailure,
    RetimeMode,
};

use std::path::Path;

use crate::logging::{LogLevel, LogSink, LogSinkExt};
use crate::models::{AudioAsset, SilenceSpec};

/// External transcoding and probing capability.
pub trait MediaEngine: Send + Sync {
    /// Measure the duration of the file at `path` in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64, ProbeFailure>;

    /// Write `spec` worth of stereo 44.1 kHz silence to `output`.
    fn synthesize_silence(&self, spec: SilenceSpec, output: &Path) -> EngineResult<AudioAsset>;

    /// Re-encode `assets`, in order, into one continuous file.
    fn concatenate(
        &self,
        assets: &[AudioAsset],
        profile: &EncodeProfile,
        output: &Path,
    ) -> EngineResult<AudioAsset>;

    /// Run `graph` over one or two inputs and encode its output stream.
    fn apply_filter_graph(
        &self,
        inputs: &[&AudioAsset],
        graph: &FilterGraph,
        profile: &EncodeProfile,
        output: &Path,
    ) -> EngineResult<AudioAsset>;

    /// Stream-copy `input` to exactly `target_seconds`, looping it first
    /// when `mode` is [`RetimeMode::Loop`].
    fn retime(
        &self,
        input: &AudioAsset,
        target_seconds: f64,
        mode: RetimeMode,
        output: &Path,
    ) -> EngineResult<AudioAsset>;
}

/// Measure `asset` and cache the result on it.
///
/// A [`ProbeFailure`] is recovered here: it is logged as a warning and the
/// duration degrades to zero.
pub fn probe_or_zero(engine: &dyn MediaEngine, asset: &mut AudioAsset, log: &dyn LogSink) -> f64 {
    let seconds = match engine.probe_duration(asset.path()) {
        Ok(seconds) => seconds,
        Err(failure) => {
            log.event(
                LogLevel::Warn,
                "duration_error",
                &format!("[DURATION_ERROR] {}", failure),
                &[("path", asset.path().display().to_string())],
            );
            0.0
        }
    };
    asset.set_duration(seconds);
    seconds
}
