//! The unit of work a [`Pipeline`](super::Pipeline) runs.

use super::errors::StepResult;
use super::types::{Context, JobState, StepOutcome};

/// One stage of a mix job.
///
/// The pipeline calls `validate_input`, then `execute`, then (only when
/// `execute` reported [`StepOutcome::Success`]) `validate_output`. A step
/// reads the request from [`Context`] and the results of earlier stages
/// from [`JobState`], writes its own section of the state, and hands the
/// scratch files it no longer needs to [`JobState::supersede`].
pub trait PipelineStep: Send + Sync {
    /// Short name used in stage markers and error reports.
    fn name(&self) -> &str;

    fn validate_input(&self, ctx: &Context) -> StepResult<()>;

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Steps that only apply to some requests (the music stages) return true.
    fn is_optional(&self) -> bool {
        false
    }

    fn description(&self) -> &str {
        self.name()
    }
}
