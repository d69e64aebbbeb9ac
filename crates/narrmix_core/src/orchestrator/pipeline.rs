//! Runs the steps of a mix job in order.

use super::errors::{PipelineError, PipelineResult, StepError};
use super::step::PipelineStep;
use super::types::{Context, JobState, StepOutcome};
use crate::logging::{LogSink, LogSinkExt};

/// Ordered list of steps sharing one [`JobState`].
///
/// Scratch files a step supersedes are deleted as soon as that step
/// returns, whether it succeeded or not. The first failure ends the run.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<PipelineRunResult> {
        let log = ctx.log();
        let mut summary = PipelineRunResult::default();

        for (position, step) in self.steps.iter().enumerate() {
            let name = step.name();
            log.stage(name);
            ctx.report_progress(name, percent(position, self.steps.len()), step.description());

            let outcome = run_step(step.as_ref(), ctx, state);
            state.superseded.release(log);
            let outcome =
                outcome.map_err(|e| PipelineError::step_failed(&ctx.job_name, name, e))?;

            match outcome {
                StepOutcome::Success => {
                    log.success(&format!("{} completed", name));
                    summary.steps_completed.push(name.to_string());
                }
                StepOutcome::Skipped(reason) => {
                    if step.is_optional() {
                        log.info(&format!("{} skipped: {}", name, reason));
                    } else {
                        log.warn(&format!("Required step {} skipped: {}", name, reason));
                    }
                    summary.steps_skipped.push(name.to_string());
                }
            }
        }

        ctx.report_progress("Complete", 100, "Mix published");
        log.success("Pipeline completed successfully");
        Ok(summary)
    }
}

fn percent(position: usize, total: usize) -> u32 {
    (position * 100).checked_div(total).unwrap_or(0) as u32
}

fn run_step(
    step: &dyn PipelineStep,
    ctx: &Context,
    state: &mut JobState,
) -> Result<StepOutcome, StepError> {
    let log = ctx.log();

    step.validate_input(ctx)
        .inspect_err(|e| log.error(&format!("Input validation failed: {}", e)))?;

    let outcome = step.execute(ctx, state).inspect_err(|e| report_failure(log, e))?;

    if outcome == StepOutcome::Success {
        step.validate_output(ctx, state)
            .inspect_err(|e| log.error(&format!("Output validation failed: {}", e)))?;
    }
    Ok(outcome)
}

fn report_failure(log: &dyn LogSink, error: &StepError) {
    log.error(&format!("Execution failed: {}", error));
    if let Some(stderr) = error.diagnostic() {
        log.diagnostic("ffmpeg", stderr);
    }
}

/// Which steps did work and which had nothing to do.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
}

impl PipelineRunResult {
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }

    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::logging::MemorySink;
    use crate::models::{AudioAsset, NarrationFragmentRef, Workspace};
    use crate::orchestrator::types::JobRequest;
    use crate::testing::{FakeEngine, MemoryStore};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Writes one scratch file, supersedes it, then behaves as configured.
    struct ScratchStep {
        name: &'static str,
        optional: bool,
        result: fn() -> Result<StepOutcome, StepError>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ScratchStep {
        fn ok(name: &'static str, calls: &Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self {
                name,
                optional: false,
                result: || Ok(StepOutcome::Success),
                calls: calls.clone(),
            }
        }
    }

    impl PipelineStep for ScratchStep {
        fn name(&self) -> &str {
            self.name
        }

        fn validate_input(&self, _ctx: &Context) -> Result<(), StepError> {
            Ok(())
        }

        fn execute(&self, ctx: &Context, state: &mut JobState) -> Result<StepOutcome, StepError> {
            self.calls.lock().push(self.name);
            let scratch = ctx.workspace.allocate(self.name, "mp3");
            std::fs::write(&scratch, b"x").unwrap();
            state.supersede(AudioAsset::new(scratch));
            (self.result)()
        }

        fn validate_output(&self, _ctx: &Context, _state: &JobState) -> Result<(), StepError> {
            Ok(())
        }

        fn is_optional(&self) -> bool {
            self.optional
        }
    }

    fn context(dir: &std::path::Path, log: Arc<MemorySink>) -> Context {
        Context::new(
            JobRequest {
                fragments: vec![NarrationFragmentRef::new(0, "a.mp3")],
                bucket: "narr".into(),
                music: None,
            },
            Settings::default(),
            "job-1",
            Arc::new(FakeEngine::new()),
            Arc::new(MemoryStore::new()),
            log,
            Workspace::create(dir, "job-1").unwrap(),
        )
    }

    fn scratch_files(ctx: &Context) -> usize {
        std::fs::read_dir(ctx.workspace.root()).unwrap().count()
    }

    #[test]
    fn skipped_optional_step_is_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(MemorySink::new());
        let ctx = context(dir.path(), log.clone());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut music = ScratchStep::ok("FetchMusic", &calls);
        music.optional = true;
        music.result = || Ok(StepOutcome::Skipped("no music requested".into()));
        let pipeline = Pipeline::new()
            .with_step(ScratchStep::ok("Pad", &calls))
            .with_step(music);

        let mut state = JobState::new("job-1");
        let result = pipeline.run(&ctx, &mut state).unwrap();

        assert_eq!(*calls.lock(), vec!["Pad", "FetchMusic"]);
        assert_eq!(result.steps_completed, vec!["Pad"]);
        assert_eq!(result.steps_skipped, vec!["FetchMusic"]);
        assert!(!result.all_completed());
        assert_eq!(result.total_steps(), 2);
        assert_eq!(scratch_files(&ctx), 0);
        assert!(log.contains("=== Pad ==="));
        assert!(log.contains("FetchMusic skipped: no music requested"));
    }

    #[test]
    fn skipped_required_step_warns() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(MemorySink::new());
        let ctx = context(dir.path(), log.clone());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut pad = ScratchStep::ok("Pad", &calls);
        pad.result = || Ok(StepOutcome::Skipped("nothing to pad".into()));

        let mut state = JobState::new("job-1");
        Pipeline::new().with_step(pad).run(&ctx, &mut state).unwrap();

        assert!(log.contains("Required step Pad skipped"));
    }

    #[test]
    fn failure_stops_the_run_and_still_releases_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(MemorySink::new()));
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut compose = ScratchStep::ok("Compose", &calls);
        compose.result = || Err(StepError::invalid_output("boom"));
        let pipeline = Pipeline::new()
            .with_step(compose)
            .with_step(ScratchStep::ok("Publish", &calls));

        let mut state = JobState::new("job-1");
        let err = pipeline.run(&ctx, &mut state).unwrap_err();

        assert_eq!(err.step_name(), Some("Compose"));
        assert_eq!(*calls.lock(), vec!["Compose"]);
        assert_eq!(scratch_files(&ctx), 0);
    }

    #[test]
    fn progress_percent_handles_empty_pipeline() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(3, 6), 50);
    }
}
