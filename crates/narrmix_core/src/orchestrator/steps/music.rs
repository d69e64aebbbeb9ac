//! Music steps: fetch the requested bed and fit it to the narration.

use crate::logging::{LogLevel, LogSinkExt};
use crate::models::AudioAsset;
use crate::music::MusicFitter;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{
    Context, FittedMusicOutput, JobState, MusicSourceOutput, StepOutcome,
};

const NO_MUSIC: &str = "no music requested";

/// Downloads the music bed from the music bucket.
pub struct FetchMusicStep;

impl FetchMusicStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FetchMusicStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for FetchMusicStep {
    fn name(&self) -> &str {
        "FetchMusic"
    }

    fn description(&self) -> &str {
        "Download the requested music bed"
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let Some(ref music) = ctx.request.music else {
            return Ok(StepOutcome::Skipped(NO_MUSIC.to_string()));
        };

        let bucket = ctx.settings.storage.effective_music_bucket().to_string();
        let key = music.key().to_string();
        let asset = AudioAsset::new(ctx.workspace.allocate("music", music.extension()));

        ctx.log().info(&format!(
            "[S3_DOWNLOAD] Downloading music {}/{} to {}",
            bucket, key, asset
        ));
        if let Err(source) = ctx.store().download(&bucket, &key, asset.path()) {
            ctx.log().event(
                LogLevel::Error,
                "music_download_error",
                &format!("[S3_MUSIC_DOWNLOAD_ERROR] {}", source),
                &[("bucket", bucket.clone()), ("key", key.clone())],
            );
            return Err(StepError::MusicNotFound {
                bucket,
                key,
                source,
            });
        }

        state.music_source = Some(MusicSourceOutput { bucket, key, asset });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.music_source {
            Some(ref music) if music.asset.exists() => Ok(()),
            _ => Err(StepError::invalid_output("music bed missing after download")),
        }
    }
}

/// Loops or trims the music bed to the padded narration's duration.
pub struct FitMusicStep;

impl FitMusicStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FitMusicStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for FitMusicStep {
    fn name(&self) -> &str {
        "FitMusic"
    }

    fn description(&self) -> &str {
        "Loop or trim the music bed to the narration length"
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let Some(source) = state.music_source.as_ref().map(|m| m.asset.clone()) else {
            return Ok(StepOutcome::Skipped(NO_MUSIC.to_string()));
        };
        let target = state
            .padded
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("No padded narration to fit against"))?
            .duration_seconds;

        let fitted = MusicFitter::new(ctx.engine(), &ctx.workspace, ctx.log())
            .fit(&source, target)
            .map_err(|e| StepError::engine("fit music", e))?;

        state.supersede(source);
        state.music = Some(FittedMusicOutput {
            asset: fitted.asset,
            mode: fitted.policy.retime_mode(),
            source_duration: fitted.source_duration,
            target_duration: fitted.target_duration,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.music {
            Some(ref music) if music.asset.exists() => Ok(()),
            _ => Err(StepError::invalid_output("fitted music missing")),
        }
    }
}
