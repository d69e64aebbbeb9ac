//! Compose step: shape the narration and mix in the music bed.

use crate::mix::{MixComposer, MixGraphBuilder};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, MixOutput, StepOutcome};

/// Produces the final mixed asset.
pub struct ComposeStep;

impl ComposeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ComposeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ComposeStep {
    fn name(&self) -> &str {
        "Compose"
    }

    fn description(&self) -> &str {
        "Apply narration shaping and mix the music bed"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let narration = state
            .padded
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("No padded narration"))?
            .asset
            .clone();
        let music = state.music.as_ref().map(|m| m.asset.clone());
        if ctx.has_music() && music.is_none() {
            return Err(StepError::invalid_input("Music requested but not fitted"));
        }

        let mix = &ctx.settings.mix;
        let composer = MixComposer::new(ctx.engine(), &ctx.workspace, ctx.log())
            .with_graphs(MixGraphBuilder::new(mix.parameters()))
            .with_fade_bounds(mix.fade_bounds());

        let spec = composer.plan(narration, music);
        let output = composer.compose(&spec)?;

        state.supersede(spec.narration.clone());
        if let Some(music) = spec.music.clone() {
            state.supersede(music);
        }
        state.mix = Some(MixOutput {
            asset: output,
            narration_duration: spec.narration_duration,
            fade_length_seconds: spec.fade_length_seconds,
            with_music: spec.has_music(),
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.mix {
            Some(ref mix) if mix.asset.exists() => Ok(()),
            _ => Err(StepError::invalid_output("mixed output missing")),
        }
    }
}
