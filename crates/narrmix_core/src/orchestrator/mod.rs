//! Pipeline orchestrator for coordinating job execution.
//!
//! This module provides the infrastructure for running a mix request
//! as a sequence of steps that validate, execute, and record their
//! results. [`MixJob`] wraps one invocation: validation, scratch
//! workspace, pipeline run and cleanup.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Assemble    (download chunks, concatenate with gaps)
//!     ├── Step: Pad         (lead-in silence)
//!     ├── Step: FetchMusic  (optional)
//!     ├── Step: FitMusic    (optional, loop or trim)
//!     ├── Step: Compose     (shaping + music bed)
//!     └── Step: Publish     (upload + download link)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use narrmix_core::orchestrator::MixJob;
//!
//! let job = MixJob::new(settings, engine, store, logger);
//! let report = job.run(&request)?;
//! println!("{}", report.download_url);
//! ```

mod errors;
mod job;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use errors::{ErrorKind, PipelineError, PipelineResult, StepError, StepResult};
pub use job::{JobReport, MixJob};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{
    AssembleStep, ComposeStep, FetchMusicStep, FitMusicStep, PadStep, PublishStep,
};
pub use types::{
    Context, FittedMusicOutput, JobRequest, JobState, MixOutput, MusicSourceOutput,
    NarrationOutput, PaddedOutput, ProgressCallback, PublishOutput, StepOutcome, TempSet,
};

/// Create the standard pipeline with all steps in the correct order.
///
/// 1. Assemble - download chunks and concatenate them with gap silences
/// 2. Pad - prepend the lead-in silence
/// 3. FetchMusic - download the music bed (skipped without music)
/// 4. FitMusic - loop or trim the bed to the narration (skipped without music)
/// 5. Compose - shape the narration and mix in the bed
/// 6. Publish - upload and generate the download link
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(AssembleStep::new())
        .with_step(PadStep::new())
        .with_step(FetchMusicStep::new())
        .with_step(FitMusicStep::new())
        .with_step(ComposeStep::new())
        .with_step(PublishStep::new())
}
