//! Music bed references and duration fitting.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::engine::{probe_or_zero, EngineResult, MediaEngine, RetimeMode};
use crate::logging::{LogSink, LogSinkExt};
use crate::models::{AudioAsset, Workspace};

/// Music shorter than the target by more than this is looped.
pub const LOOP_TOLERANCE_SECONDS: f64 = 0.05;

/// A caller-supplied music reference resolved to a storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicRef {
    raw: String,
    key: String,
}

impl MusicRef {
    /// Resolve `raw` to a storage key.
    ///
    /// Anything starting with `http` that parses as an absolute URL
    /// yields its path, without the leading `/`, as the key. Values with
    /// no scheme (`http-beds/calm.mp3`) and everything else are the key
    /// itself. In both cases percent escapes are decoded.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let url = if raw.starts_with("http") {
            match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(url::ParseError::RelativeUrlWithoutBase) => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };
        let key = match url {
            Some(url) => decode(url.path().trim_start_matches('/')).into_owned(),
            None => decode(raw).into_owned(),
        };
        Ok(Self {
            raw: raw.to_string(),
            key,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Extension of the key, falling back to `mp3`.
    pub fn extension(&self) -> &str {
        Path::new(&self.key)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("mp3")
    }
}

impl fmt::Display for MusicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

fn decode(text: &str) -> Cow<'_, str> {
    percent_decode_str(text).decode_utf8_lossy()
}

/// How the bed is brought to the target length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPolicy {
    /// Repeat the bed, then cut it at the target.
    Loop,
    /// Cut the bed at the target.
    Trim,
}

impl FitPolicy {
    /// Loop when the bed falls short of `target` by more than `tolerance`.
    pub fn decide(music_seconds: f64, target_seconds: f64, tolerance: f64) -> Self {
        if music_seconds < target_seconds - tolerance {
            FitPolicy::Loop
        } else {
            FitPolicy::Trim
        }
    }

    pub fn retime_mode(self) -> RetimeMode {
        match self {
            FitPolicy::Loop => RetimeMode::Loop,
            FitPolicy::Trim => RetimeMode::Trim,
        }
    }
}

/// A bed fitted to the narration.
#[derive(Debug, Clone)]
pub struct FittedMusic {
    pub asset: AudioAsset,
    pub policy: FitPolicy,
    /// Measured duration of the bed before fitting.
    pub source_duration: f64,
    pub target_duration: f64,
}

/// Loops or trims a music bed to a target duration.
pub struct MusicFitter<'a> {
    engine: &'a dyn MediaEngine,
    workspace: &'a Workspace,
    log: &'a dyn LogSink,
}

impl<'a> MusicFitter<'a> {
    pub fn new(engine: &'a dyn MediaEngine, workspace: &'a Workspace, log: &'a dyn LogSink) -> Self {
        Self {
            engine,
            workspace,
            log,
        }
    }

    pub fn fit(&self, music: &AudioAsset, target_seconds: f64) -> EngineResult<FittedMusic> {
        let mut source = music.clone();
        let source_duration = probe_or_zero(self.engine, &mut source, self.log);
        let policy = FitPolicy::decide(source_duration, target_seconds, LOOP_TOLERANCE_SECONDS);

        match policy {
            FitPolicy::Loop => self.log.info("[ADJUST_MUSIC] Looping music to fit narration"),
            FitPolicy::Trim => self.log.info("[ADJUST_MUSIC] Trimming music to fit narration"),
        }

        let output = self
            .workspace
            .allocate("music_adj", source.file_extension());
        let mut asset = self
            .engine
            .retime(&source, target_seconds, policy.retime_mode(), &output)?;
        asset.set_duration(target_seconds);

        Ok(FittedMusic {
            asset,
            policy,
            source_duration,
            target_duration: target_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use crate::testing::{EngineCall, FakeEngine};

    #[test]
    fn plain_keys_are_percent_decoded() {
        let music = MusicRef::parse("beds/calm%20morning.mp3").unwrap();
        assert_eq!(music.key(), "beds/calm morning.mp3");
        assert_eq!(music.raw(), "beds/calm%20morning.mp3");
        assert_eq!(music.extension(), "mp3");
    }

    #[test]
    fn urls_resolve_to_their_path() {
        let music =
            MusicRef::parse("https://music.s3.amazonaws.com/beds/Soft%20Piano.m4a?X-Amz-Expires=60")
                .unwrap();
        assert_eq!(music.key(), "beds/Soft Piano.m4a");
        assert_eq!(music.extension(), "m4a");
    }

    #[test]
    fn http_prefixed_keys_are_plain_keys() {
        let music = MusicRef::parse("http-beds/calm.mp3").unwrap();
        assert_eq!(music.key(), "http-beds/calm.mp3");

        let music = MusicRef::parse("httpfoo%20bar.mp3").unwrap();
        assert_eq!(music.key(), "httpfoo bar.mp3");
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(MusicRef::parse("http://").is_err());
    }

    #[test]
    fn policy_boundaries() {
        assert_eq!(FitPolicy::decide(6.0, 10.0, LOOP_TOLERANCE_SECONDS), FitPolicy::Loop);
        assert_eq!(FitPolicy::decide(9.94, 10.0, LOOP_TOLERANCE_SECONDS), FitPolicy::Loop);
        assert_eq!(FitPolicy::decide(9.96, 10.0, LOOP_TOLERANCE_SECONDS), FitPolicy::Trim);
        assert_eq!(FitPolicy::decide(10.0, 10.0, LOOP_TOLERANCE_SECONDS), FitPolicy::Trim);
        assert_eq!(FitPolicy::decide(60.0, 10.0, LOOP_TOLERANCE_SECONDS), FitPolicy::Trim);
        // An unprobeable bed reads as zero and is looped.
        assert_eq!(FitPolicy::decide(0.0, 10.0, LOOP_TOLERANCE_SECONDS), FitPolicy::Loop);
    }

    fn fit(music_seconds: f64, target: f64) -> (FittedMusic, FakeEngine) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), "job").unwrap();
        let engine = FakeEngine::new();
        let log = MemorySink::new();

        let path = ws.allocate("music", "mp3");
        engine.write_audio(&path, music_seconds);
        let fitted = MusicFitter::new(&engine, &ws, &log)
            .fit(&AudioAsset::new(&path), target)
            .unwrap();

        let mut probed = fitted.asset.clone();
        assert_eq!(probe_or_zero(&engine, &mut probed, &log), target);
        (fitted, engine)
    }

    #[test]
    fn short_bed_is_looped_to_target() {
        let (fitted, engine) = fit(6.0, 10.0);
        assert_eq!(fitted.policy, FitPolicy::Loop);
        assert_eq!(fitted.source_duration, 6.0);
        assert!(engine.calls().contains(&EngineCall::Retime {
            target: 10.0,
            mode: RetimeMode::Loop
        }));
    }

    #[test]
    fn fitted_bed_keeps_source_container() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), "job").unwrap();
        let engine = FakeEngine::new();
        let log = MemorySink::new();

        let path = ws.allocate("music", "aiff");
        engine.write_audio(&path, 4.0);
        let fitted = MusicFitter::new(&engine, &ws, &log)
            .fit(&AudioAsset::new(&path), 10.0)
            .unwrap();

        assert_eq!(fitted.policy, FitPolicy::Loop);
        assert_eq!(fitted.asset.file_extension(), "aiff");
        assert!(fitted.asset.exists());
    }

    #[test]
    fn long_or_close_bed_is_trimmed_to_target() {
        let (fitted, _) = fit(30.0, 10.0);
        assert_eq!(fitted.policy, FitPolicy::Trim);

        let (fitted, engine) = fit(10.0, 10.0);
        assert_eq!(fitted.policy, FitPolicy::Trim);
        assert_eq!(engine.count("retime"), 1);
    }
}
