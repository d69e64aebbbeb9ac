//! Core types for the orchestrator pipeline.

use std::fs;
use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::engine::{MediaEngine, RetimeMode};
use crate::logging::{LogSink, LogSinkExt};
use crate::models::{AudioAsset, NarrationFragmentRef, Workspace};
use crate::music::MusicRef;
use crate::storage::ObjectStore;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Arc<dyn Fn(&str, u32, &str) + Send + Sync>;

/// A validated mix request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Narration fragments in caller order.
    pub fragments: Vec<NarrationFragmentRef>,
    /// Bucket holding the fragments.
    pub bucket: String,
    /// Optional music bed.
    pub music: Option<MusicRef>,
}

impl JobRequest {
    pub fn chunk_keys(&self) -> Vec<String> {
        self.fragments.iter().map(|f| f.source_key.clone()).collect()
    }
}

/// Read-only context passed to pipeline steps.
///
/// Contains the request and shared collaborators that steps can use
/// but not replace. Mutable state goes in `JobState`.
pub struct Context {
    /// The validated request.
    pub request: JobRequest,
    /// Application settings.
    pub settings: Settings,
    /// Job name/identifier.
    pub job_name: String,
    /// Media engine.
    pub engine: Arc<dyn MediaEngine>,
    /// Object storage.
    pub store: Arc<dyn ObjectStore>,
    /// Per-job logger.
    pub logger: Arc<dyn LogSink>,
    /// Scratch directory owned by this job.
    pub workspace: Workspace,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    pub fn new(
        request: JobRequest,
        settings: Settings,
        job_name: impl Into<String>,
        engine: Arc<dyn MediaEngine>,
        store: Arc<dyn ObjectStore>,
        logger: Arc<dyn LogSink>,
        workspace: Workspace,
    ) -> Self {
        Self {
            request,
            settings,
            job_name: job_name.into(),
            engine,
            store,
            logger,
            workspace,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress_callback = callback;
        self
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    pub fn engine(&self) -> &dyn MediaEngine {
        self.engine.as_ref()
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn log(&self) -> &dyn LogSink {
        self.logger.as_ref()
    }

    pub fn has_music(&self) -> bool {
        self.request.music.is_some()
    }
}

/// Assets that a later stage no longer needs.
#[derive(Debug, Default)]
pub struct TempSet {
    assets: Vec<AudioAsset>,
}

impl TempSet {
    pub fn push(&mut self, asset: AudioAsset) {
        self.assets.push(asset);
    }

    pub fn extend(&mut self, assets: impl IntoIterator<Item = AudioAsset>) {
        self.assets.extend(assets);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Delete every pending file. Failures are logged and never escalated.
    ///
    /// Returns the number of files that could not be removed.
    pub fn release(&mut self, log: &dyn LogSink) -> usize {
        let mut failures = 0;
        for asset in self.assets.drain(..) {
            match fs::remove_file(asset.path()) {
                Ok(()) => log.debug(&format!("Removed {}", asset)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    failures += 1;
                    log.warn(&format!("[CLEANUP_WARNING] {}: {}", asset, e));
                }
            }
        }
        failures
    }
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// This is the "write-once manifest" - steps add their own section and
/// hand superseded inputs to `superseded`, which the pipeline releases
/// after every step.
#[derive(Debug, Default, Serialize)]
pub struct JobState {
    /// Unique job identifier.
    pub job_id: String,
    /// When the job started.
    pub started_at: Option<String>,
    /// Assembly results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<NarrationOutput>,
    /// Lead-in padding results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padded: Option<PaddedOutput>,
    /// Downloaded music bed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_source: Option<MusicSourceOutput>,
    /// Fitted music bed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<FittedMusicOutput>,
    /// Final mix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix: Option<MixOutput>,
    /// Published result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishOutput>,
    /// Files pending deletion.
    #[serde(skip)]
    pub superseded: TempSet,
}

impl JobState {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Mark `asset` as no longer needed.
    pub fn supersede(&mut self, asset: AudioAsset) {
        self.superseded.push(asset);
    }

    pub fn has_narration(&self) -> bool {
        self.narration.is_some()
    }

    pub fn download_url(&self) -> Option<&str> {
        self.publish.as_ref().map(|p| p.download_url.as_str())
    }
}

/// Output from the Assemble step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationOutput {
    pub asset: AudioAsset,
    /// Sequence indices that made it into the narration, in order.
    pub fragments_used: Vec<usize>,
    /// Sequence indices whose download failed.
    pub fragments_skipped: Vec<usize>,
    pub concatenated: bool,
}

/// Output from the Pad step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddedOutput {
    pub asset: AudioAsset,
    pub pad_seconds: f64,
    /// Measured duration of the padded narration.
    pub duration_seconds: f64,
}

/// Output from the FetchMusic step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicSourceOutput {
    pub bucket: String,
    pub key: String,
    pub asset: AudioAsset,
}

/// Output from the FitMusic step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedMusicOutput {
    pub asset: AudioAsset,
    pub mode: RetimeMode,
    pub source_duration: f64,
    pub target_duration: f64,
}

/// Output from the Compose step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixOutput {
    pub asset: AudioAsset,
    pub narration_duration: f64,
    pub fade_length_seconds: f64,
    pub with_music: bool,
}

/// Output from the Publish step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutput {
    pub bucket: String,
    pub key: String,
    pub download_url: String,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (not requested, not an error).
    Skipped(String),
}
