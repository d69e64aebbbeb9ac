//! ffmpeg / ffprobe backed engine.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::command::run_bounded;
use super::types::{
    format_seconds, EncodeProfile, EngineError, EngineResult, FilterGraph, ProbeFailure,
    RetimeMode,
};
use super::MediaEngine;
use crate::config::EngineSettings;
use crate::models::{AudioAsset, SilenceSpec};

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

/// Silence source: stereo at 44.1 kHz.
const SILENCE_SOURCE: &str = "anullsrc=channel_layout=stereo:sample_rate=44100";

/// Media engine driving the ffmpeg command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl FfmpegEngine {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(&settings.ffmpeg_path, &settings.ffprobe_path, settings.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments for `ffprobe` reading the container duration.
    pub fn probe_args(path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(path.into());
        args
    }

    /// Arguments synthesizing `spec` worth of silence into `output`.
    pub fn silence_args(spec: SilenceSpec, output: &Path) -> Vec<OsString> {
        let mut args = base_args();
        args.extend(
            [
                "-f",
                "lavfi",
                "-i",
                SILENCE_SOURCE,
                "-t",
                format_seconds(spec.duration_seconds()).as_str(),
                "-q:a",
                "9",
                "-acodec",
                "libmp3lame",
            ]
            .iter()
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }

    /// Arguments concatenating the entries of `list_file` into `output`.
    pub fn concat_args(list_file: &Path, profile: &EncodeProfile, output: &Path) -> Vec<OsString> {
        let mut args = base_args();
        args.extend(["-f", "concat", "-safe", "0", "-i"].iter().map(OsString::from));
        args.push(list_file.into());
        args.extend(profile.to_args());
        args.push(output.into());
        args
    }

    /// Arguments running `graph` over `inputs` into `output`.
    pub fn filter_args(
        inputs: &[&Path],
        graph: &FilterGraph,
        profile: &EncodeProfile,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args = base_args();
        for input in inputs {
            args.push("-i".into());
            args.push((*input).into());
        }
        match graph {
            FilterGraph::Simple { chain } => {
                args.push("-filter:a".into());
                args.push(chain.into());
            }
            FilterGraph::Complex {
                graph,
                output_label,
            } => {
                args.push("-filter_complex".into());
                args.push(graph.into());
                args.push("-map".into());
                args.push(output_label.into());
            }
        }
        args.extend(profile.to_args());
        args.push(output.into());
        args
    }

    /// Arguments stream-copying `input` to `target_seconds` into `output`.
    pub fn retime_args(
        input: &Path,
        target_seconds: f64,
        mode: RetimeMode,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args = base_args();
        if mode == RetimeMode::Loop {
            args.extend(["-stream_loop", "-1"].iter().map(OsString::from));
        }
        args.push("-i".into());
        args.push(input.into());
        args.extend(
            ["-t", format_seconds(target_seconds).as_str(), "-c", "copy"]
                .iter()
                .map(OsString::from),
        );
        args.push(output.into());
        args
    }

    fn run_ffmpeg(&self, args: Vec<OsString>, output: &Path) -> EngineResult<AudioAsset> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(args);
        let result = run_bounded(FFMPEG, &mut cmd, self.timeout)?;

        if !result.success() {
            return Err(EngineError::failed(
                FFMPEG,
                result.exit_code,
                result.stderr.trim(),
            ));
        }
        if !output.exists() {
            return Err(EngineError::missing_output(FFMPEG, output));
        }
        Ok(AudioAsset::new(output))
    }
}

impl MediaEngine for FfmpegEngine {
    fn probe_duration(&self, path: &Path) -> Result<f64, ProbeFailure> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args(Self::probe_args(path));

        let output = run_bounded(FFPROBE, &mut cmd, self.timeout)
            .map_err(|e| ProbeFailure::new(path, e.to_string()))?;

        if !output.success() {
            return Err(ProbeFailure::new(
                path,
                format!("ffprobe exited with {}: {}", output.exit_code, output.stderr.trim()),
            ));
        }

        parse_probe_output(&output.stdout).map_err(|reason| ProbeFailure::new(path, reason))
    }

    fn synthesize_silence(&self, spec: SilenceSpec, output: &Path) -> EngineResult<AudioAsset> {
        let mut asset = self.run_ffmpeg(Self::silence_args(spec, output), output)?;
        asset.set_duration(spec.duration_seconds());
        Ok(asset)
    }

    fn concatenate(
        &self,
        assets: &[AudioAsset],
        profile: &EncodeProfile,
        output: &Path,
    ) -> EngineResult<AudioAsset> {
        if assets.is_empty() {
            return Err(EngineError::Unsupported(
                "concatenation needs at least one input".to_string(),
            ));
        }

        let list_file = output.with_extension("concat.txt");
        fs::write(&list_file, concat_list(assets))
            .map_err(|e| EngineError::io("writing concat list", e))?;

        let result = self.run_ffmpeg(Self::concat_args(&list_file, profile, output), output);

        if let Err(e) = fs::remove_file(&list_file) {
            tracing::warn!("Failed to remove {}: {}", list_file.display(), e);
        }
        result
    }

    fn apply_filter_graph(
        &self,
        inputs: &[&AudioAsset],
        graph: &FilterGraph,
        profile: &EncodeProfile,
        output: &Path,
    ) -> EngineResult<AudioAsset> {
        let allowed = match graph {
            FilterGraph::Simple { .. } => 1..=1,
            FilterGraph::Complex { .. } => 1..=2,
        };
        if !allowed.contains(&inputs.len()) {
            return Err(EngineError::Unsupported(format!(
                "filter graph over {} inputs",
                inputs.len()
            )));
        }

        let paths: Vec<&Path> = inputs.iter().map(|a| a.path()).collect();
        self.run_ffmpeg(Self::filter_args(&paths, graph, profile, output), output)
    }

    fn retime(
        &self,
        input: &AudioAsset,
        target_seconds: f64,
        mode: RetimeMode,
        output: &Path,
    ) -> EngineResult<AudioAsset> {
        let args = Self::retime_args(input.path(), target_seconds, mode, output);
        self.run_ffmpeg(args, output)
    }
}

fn base_args() -> Vec<OsString> {
    vec!["-y".into(), "-hide_banner".into()]
}

/// Body of a concat demuxer list file, one `file '<path>'` line per asset.
fn concat_list(assets: &[AudioAsset]) -> String {
    assets
        .iter()
        .map(|a| {
            let path = a.path().to_string_lossy().replace('\'', "'\\''");
            format!("file '{}'\n", path)
        })
        .collect()
}

/// Interpret ffprobe's bare duration output.
pub fn parse_probe_output(stdout: &str) -> Result<f64, String> {
    let text = stdout.trim();
    if text.is_empty() {
        return Err("empty ffprobe output".to_string());
    }
    let line = text.lines().next().unwrap_or(text).trim();
    match line.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        Ok(seconds) => Err(format!("implausible duration {}", seconds)),
        Err(_) => Err(format!("unparsable duration {:?}", line)),
    }
}
