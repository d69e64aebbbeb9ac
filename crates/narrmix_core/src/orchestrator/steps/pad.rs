//! Pad step: prepend the lead-in silence.

use crate::engine::probe_or_zero;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, PaddedOutput, StepOutcome};
use crate::padding::LeadInPadder;

/// Prepends `assembly.lead_in_seconds` of silence to the narration and
/// measures the result.
pub struct PadStep;

impl PadStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PadStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for PadStep {
    fn name(&self) -> &str {
        "Pad"
    }

    fn description(&self) -> &str {
        "Prepend lead-in silence to the narration"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let narration = state
            .narration
            .as_ref()
            .ok_or_else(|| StepError::invalid_input("No assembled narration"))?
            .asset
            .clone();

        let pad_seconds = ctx.settings.assembly.lead_in_seconds;
        let mut padded = LeadInPadder::new(ctx.engine(), &ctx.workspace, ctx.log())
            .with_pad_seconds(pad_seconds)
            .pad(&narration)
            .map_err(|e| StepError::engine("pad narration", e))?;
        let duration_seconds = probe_or_zero(ctx.engine(), &mut padded, ctx.log());

        state.supersede(narration);
        state.padded = Some(PaddedOutput {
            asset: padded,
            pad_seconds,
            duration_seconds,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.padded {
            Some(ref padded) if padded.asset.exists() => Ok(()),
            _ => Err(StepError::invalid_output("padded narration missing")),
        }
    }
}
