//! One mix invocation from request to published link.

use std::sync::Arc;

use serde::Serialize;

use super::create_standard_pipeline;
use super::errors::{PipelineError, PipelineResult};
use super::pipeline::{Pipeline, PipelineRunResult};
use super::types::{Context, JobState, ProgressCallback};
use crate::api::MixRequest;
use crate::config::Settings;
use crate::engine::MediaEngine;
use crate::logging::{LogSink, LogSinkExt};
use crate::models::{new_job_id, Workspace};
use crate::storage::ObjectStore;

/// Result of a successful job.
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub job_id: String,
    pub download_url: String,
    /// Per-step manifest.
    pub state: JobState,
    #[serde(skip)]
    pub run: PipelineRunResult,
}

/// Runs the standard pipeline for one request at a time.
///
/// Every invocation gets its own workspace under `paths.temp_root`, which
/// is removed when the invocation ends, whatever the outcome.
pub struct MixJob {
    settings: Settings,
    engine: Arc<dyn MediaEngine>,
    store: Arc<dyn ObjectStore>,
    logger: Arc<dyn LogSink>,
    pipeline: Pipeline,
    progress_callback: Option<ProgressCallback>,
}

impl MixJob {
    pub fn new(
        settings: Settings,
        engine: Arc<dyn MediaEngine>,
        store: Arc<dyn ObjectStore>,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            settings,
            engine,
            store,
            logger,
            pipeline: create_standard_pipeline(),
            progress_callback: None,
        }
    }

    /// Replace the step sequence.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn log(&self) -> &dyn LogSink {
        self.logger.as_ref()
    }

    /// Run `request` under a fresh job id.
    pub fn run(&self, request: &MixRequest) -> PipelineResult<JobReport> {
        self.run_with_id(&new_job_id(), request)
    }

    /// Run `request` as job `job_id`.
    pub fn run_with_id(&self, job_id: &str, request: &MixRequest) -> PipelineResult<JobReport> {
        let log = self.log();
        log.info(&format!(
            "[PROCESS] chunk_keys={:?}, bucket={:?}, music={:?}",
            request.chunk_keys, request.bucket, request.music
        ));

        let job_request = request
            .validate()
            .map_err(|message| PipelineError::validation_failed(job_id, message))?;

        if self.settings.storage.output_bucket.is_empty() {
            return Err(PipelineError::setup_failed(
                job_id,
                "No output bucket configured (storage.output_bucket)",
            ));
        }

        let workspace = Workspace::create(&self.settings.paths.temp_root, job_id).map_err(|e| {
            PipelineError::setup_failed(
                job_id,
                format!(
                    "Cannot create scratch directory under {}: {}",
                    self.settings.paths.temp_root, e
                ),
            )
        })?;
        log.debug(&format!("Workspace: {}", workspace.root().display()));

        let ctx = Context::new(
            job_request,
            self.settings.clone(),
            job_id,
            Arc::clone(&self.engine),
            Arc::clone(&self.store),
            Arc::clone(&self.logger),
            workspace,
        )
        .with_progress_callback(self.progress_callback.clone());

        let mut state = JobState::new(job_id);
        let result = self.pipeline.run(&ctx, &mut state);

        state.superseded.release(log);
        remove_workspace(&ctx.workspace, log);

        let run = result?;
        let download_url = state
            .download_url()
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::setup_failed(job_id, "Pipeline finished without publishing")
            })?;

        Ok(JobReport {
            job_id: job_id.to_string(),
            download_url,
            state,
            run,
        })
    }
}

fn remove_workspace(workspace: &Workspace, log: &dyn LogSink) {
    if let Err(e) = workspace.remove() {
        log.warn(&format!(
            "[CLEANUP_WARNING] {}: {}",
            workspace.root().display(),
            e
        ));
    }
}
