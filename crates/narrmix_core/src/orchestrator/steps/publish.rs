//! Publish step: upload the mix and mint a download link.

use uuid::Uuid;

use crate::logging::LogSinkExt;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, PublishOutput, StepOutcome};

/// Uploads the final mix to the output bucket under a fresh key.
pub struct PublishStep;

impl PublishStep {
    pub fn new() -> Self {
        Self
    }

    /// `<prefix><uuid>.mp3`; every invocation gets its own key.
    pub fn output_key(prefix: &str) -> String {
        format!("{}{}.mp3", prefix, Uuid::new_v4())
    }
}

impl Default for PublishStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for PublishStep {
    fn name(&self) -> &str {
        "Publish"
    }

    fn description(&self) -> &str {
        "Upload the mix and generate a time-limited download link"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.settings.storage.output_bucket.is_empty() {
            return Err(StepError::invalid_input("No output bucket configured"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let mix = state
            .mix
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("No mixed output to publish"))?
            .asset
            .clone();

        let storage = &ctx.settings.storage;
        let bucket = storage.output_bucket.clone();
        let key = Self::output_key(&storage.output_prefix);

        ctx.log()
            .info(&format!("[S3_UPLOAD] Uploading {} to {}/{}", mix, bucket, key));
        ctx.store()
            .upload(&bucket, &key, mix.path())
            .map_err(|e| StepError::publish("upload output", e))?;

        let download_url = ctx
            .store()
            .presign(&bucket, &key, storage.presign_ttl())
            .map_err(|e| StepError::publish("generate download link", e))?;
        ctx.log().info(&format!(
            "[PRESIGNED_URL] Link valid for {}s: {}",
            storage.presign_ttl_secs, download_url
        ));

        state.supersede(mix);
        state.publish = Some(PublishOutput {
            bucket,
            key,
            download_url,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.publish {
            Some(ref publish) if !publish.download_url.is_empty() => Ok(()),
            _ => Err(StepError::invalid_output("no download link recorded")),
        }
    }
}
