//! Assemble step: download narration chunks and build one narration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;

use crate::assembly::{AssemblerOptions, LocalFragment, NarrationAssembler};
use crate::logging::{LogLevel, LogSinkExt};
use crate::models::{AudioAsset, NarrationFragmentRef};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, NarrationOutput, StepOutcome};
use crate::storage::{StorageError, StorageResult};

/// Downloads every fragment and assembles the narration.
///
/// Downloads run on up to `assembly.download_concurrency` threads. Each
/// result lands in the slot of its sequence index, so completion order
/// never affects playback order.
pub struct AssembleStep;

impl AssembleStep {
    pub fn new() -> Self {
        Self
    }

    fn download_all(
        &self,
        ctx: &Context,
    ) -> Vec<(NarrationFragmentRef, AudioAsset, StorageResult<()>)> {
        let fragments = &ctx.request.fragments;
        let bucket = ctx.request.bucket.as_str();
        let workers = ctx
            .settings
            .assembly
            .download_concurrency
            .clamp(1, fragments.len().max(1));

        let targets: Vec<AudioAsset> = fragments
            .iter()
            .map(|f| {
                AudioAsset::new(
                    ctx.workspace
                        .allocate(&format!("narr_{}", f.sequence_index), f.extension()),
                )
            })
            .collect();
        let slots: Vec<Mutex<Option<StorageResult<()>>>> =
            fragments.iter().map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    let Some(fragment) = fragments.get(i) else {
                        break;
                    };
                    ctx.log().info(&format!(
                        "[S3_DOWNLOAD] Downloading {}/{} to {}",
                        bucket, fragment.source_key, targets[i]
                    ));
                    let result = ctx
                        .store()
                        .download(bucket, &fragment.source_key, targets[i].path());
                    *slots[i].lock() = Some(result);
                });
            }
        });

        fragments
            .iter()
            .cloned()
            .zip(targets)
            .zip(slots)
            .map(|((fragment, asset), slot)| {
                let result = slot
                    .into_inner()
                    .unwrap_or_else(|| Err(StorageError::not_found(bucket, &fragment.source_key)));
                (fragment, asset, result)
            })
            .collect()
    }
}

impl Default for AssembleStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AssembleStep {
    fn name(&self) -> &str {
        "Assemble"
    }

    fn description(&self) -> &str {
        "Download narration chunks and concatenate them with gap silences"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.request.fragments.is_empty() {
            return Err(StepError::invalid_input("No narration chunks requested"));
        }
        if ctx.request.bucket.is_empty() {
            return Err(StepError::invalid_input("No narration bucket"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let log = ctx.log();
        let strict = ctx.settings.assembly.strict_chunks;
        let total = ctx.request.fragments.len();
        log.info(&format!(
            "[CONCATENATE] Downloading {} narration chunks from bucket: {}",
            total, ctx.request.bucket
        ));

        let mut local = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut first_failure = None;

        for (fragment, asset, result) in self.download_all(ctx) {
            match result {
                Ok(()) => {
                    log.info(&format!(
                        "[DOWNLOAD] Chunk {}: key={} -> {}",
                        fragment.sequence_index, fragment.source_key, asset
                    ));
                    local.push(LocalFragment::new(fragment, asset));
                }
                Err(e) => {
                    log.event(
                        LogLevel::Error,
                        "download_error",
                        &format!(
                            "[DOWNLOAD_ERROR] Failed to fetch chunk {} ({}): {}",
                            fragment.sequence_index, fragment.source_key, e
                        ),
                        &[("index", fragment.sequence_index.to_string())],
                    );
                    if strict {
                        return Err(StepError::fetch(
                            format!("narration chunk {}", fragment.sequence_index),
                            e,
                        ));
                    }
                    skipped.push(fragment.sequence_index);
                    first_failure.get_or_insert(e);
                }
            }
        }

        if local.is_empty() {
            if let Some(e) = first_failure {
                return Err(StepError::fetch(
                    format!("any of the {} narration chunks", total),
                    e,
                ));
            }
        }

        let options = AssemblerOptions {
            gap_seconds: ctx.settings.assembly.gap_seconds,
            strict_chunks: strict,
        };
        let assembled =
            NarrationAssembler::new(ctx.engine(), &ctx.workspace, log, options).assemble(local)?;

        state.superseded.extend(assembled.temporaries);
        state.narration = Some(NarrationOutput {
            asset: assembled.asset,
            fragments_used: assembled.fragment_order,
            fragments_skipped: skipped,
            concatenated: assembled.concatenated,
        });

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.narration {
            Some(ref narration) if narration.asset.exists() => Ok(()),
            Some(ref narration) => Err(StepError::invalid_output(format!(
                "narration not found at {}",
                narration.asset
            ))),
            None => Err(StepError::invalid_output("narration not recorded")),
        }
    }
}
