//! Narration assembly: fragments plus gap silences, concatenated once.

use std::path::PathBuf;

use thiserror::Error;

use super::plan::ConcatenationPlan;
use crate::engine::{probe_or_zero, EncodeProfile, EngineError, MediaEngine};
use crate::logging::{LogLevel, LogSink, LogSinkExt};
use crate::models::{AudioAsset, NarrationFragmentRef, Workspace};
use crate::silence::{SilenceGenerator, DEFAULT_GAP_SECONDS};

/// Errors from narration assembly.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("No narration fragments to assemble")]
    NoFragments,

    #[error("Chunk {index} ({key}) is {reason}")]
    InvalidChunk {
        index: usize,
        key: String,
        reason: String,
    },

    #[error("Failed to {operation}: {source}")]
    Engine {
        operation: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("Concatenated narration does not exist at {}", .0.display())]
    MissingOutput(PathBuf),
}

impl AssemblyError {
    /// Engine diagnostic text, when the failure came from the engine.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            AssemblyError::Engine { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A downloaded fragment ready for assembly.
#[derive(Debug, Clone)]
pub struct LocalFragment {
    pub fragment: NarrationFragmentRef,
    pub asset: AudioAsset,
}

impl LocalFragment {
    pub fn new(fragment: NarrationFragmentRef, asset: AudioAsset) -> Self {
        Self { fragment, asset }
    }
}

/// What was found on disk for one fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentCheck {
    pub exists: bool,
    pub size_bytes: Option<u64>,
    pub duration_seconds: f64,
}

impl FragmentCheck {
    /// Inspect `asset`, probing it only when there is something to probe.
    pub fn inspect(engine: &dyn MediaEngine, asset: &mut AudioAsset, log: &dyn LogSink) -> Self {
        let size_bytes = asset.size_bytes();
        let exists = size_bytes.is_some();
        let duration_seconds = match size_bytes {
            Some(size) if size > 0 => probe_or_zero(engine, asset, log),
            _ => {
                asset.set_duration(0.0);
                0.0
            }
        };
        Self {
            exists,
            size_bytes,
            duration_seconds,
        }
    }

    /// Why the fragment is unusable, if it is.
    pub fn problem(&self) -> Option<&'static str> {
        match self.size_bytes {
            None => Some("missing"),
            Some(0) => Some("empty"),
            Some(_) => None,
        }
    }
}

/// Assembly options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblerOptions {
    /// Silence inserted after every fragment except the last.
    pub gap_seconds: f64,
    /// Reject missing or empty fragments instead of appending them anyway.
    pub strict_chunks: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            gap_seconds: DEFAULT_GAP_SECONDS,
            strict_chunks: false,
        }
    }
}

/// Result of assembling a narration.
#[derive(Debug, Clone)]
pub struct AssembledNarration {
    /// The narration asset (the sole fragment when nothing was concatenated).
    pub asset: AudioAsset,
    /// Sequence indices in playback order.
    pub fragment_order: Vec<usize>,
    /// Number of plan entries (fragments plus gaps).
    pub plan_len: usize,
    /// Whether the engine concatenated the plan.
    pub concatenated: bool,
    /// Inputs superseded by `asset`, safe to delete.
    pub temporaries: Vec<AudioAsset>,
}

/// Builds one narration asset out of ordered fragments.
pub struct NarrationAssembler<'a> {
    engine: &'a dyn MediaEngine,
    workspace: &'a Workspace,
    log: &'a dyn LogSink,
    options: AssemblerOptions,
}

impl<'a> NarrationAssembler<'a> {
    pub fn new(
        engine: &'a dyn MediaEngine,
        workspace: &'a Workspace,
        log: &'a dyn LogSink,
        options: AssemblerOptions,
    ) -> Self {
        Self {
            engine,
            workspace,
            log,
            options,
        }
    }

    /// Assemble `fragments` in sequence order.
    pub fn assemble(
        &self,
        mut fragments: Vec<LocalFragment>,
    ) -> Result<AssembledNarration, AssemblyError> {
        if fragments.is_empty() {
            return Err(AssemblyError::NoFragments);
        }
        fragments.sort_by_key(|f| f.fragment.sequence_index);

        let plan = self.build_plan(fragments)?;
        let fragment_order = plan.fragment_order();
        let plan_len = plan.len();

        let plan = match plan.into_single() {
            Ok(asset) => {
                self.log.info("Only one chunk, skipping concatenation");
                return Ok(AssembledNarration {
                    asset,
                    fragment_order,
                    plan_len,
                    concatenated: false,
                    temporaries: Vec::new(),
                });
            }
            Err(plan) => plan,
        };

        let asset = self.concatenate(&plan)?;
        Ok(AssembledNarration {
            asset,
            fragment_order,
            plan_len,
            concatenated: true,
            temporaries: plan.into_assets(),
        })
    }

    /// Inspect every fragment and interleave gap silences.
    pub fn build_plan(
        &self,
        fragments: Vec<LocalFragment>,
    ) -> Result<ConcatenationPlan, AssemblyError> {
        let silence = SilenceGenerator::new(self.engine, self.workspace);
        let last = fragments.len().saturating_sub(1);
        let mut plan = ConcatenationPlan::new();

        for (position, local) in fragments.into_iter().enumerate() {
            let LocalFragment {
                fragment,
                mut asset,
            } = local;
            let index = fragment.sequence_index;

            let check = FragmentCheck::inspect(self.engine, &mut asset, self.log);
            self.log.event(
                LogLevel::Info,
                "chunk",
                &format!(
                    "[CHUNK {}] key: {}, exists: {}, size: {}, duration: {:.2}s",
                    index,
                    fragment.source_key,
                    check.exists,
                    check.size_bytes.map_or(-1, |s| s as i64),
                    check.duration_seconds
                ),
                &[("index", index.to_string()), ("key", fragment.source_key.clone())],
            );

            if let Some(problem) = check.problem() {
                if self.options.strict_chunks {
                    return Err(AssemblyError::InvalidChunk {
                        index,
                        key: fragment.source_key,
                        reason: problem.to_string(),
                    });
                }
                let (event, label) = match problem {
                    "missing" => ("missing_chunk", "MISSING_CHUNK"),
                    _ => ("empty_chunk", "EMPTY_CHUNK"),
                };
                self.log.event(
                    LogLevel::Error,
                    event,
                    &format!(
                        "[{}] {} (key: {}), appending anyway",
                        label, asset, fragment.source_key
                    ),
                    &[("index", index.to_string())],
                );
            }

            plan.push_fragment(index, asset);

            if position < last {
                let gap = silence
                    .make_silence(self.options.gap_seconds)
                    .map_err(|source| AssemblyError::Engine {
                        operation: "synthesize gap silence",
                        source,
                    })?;
                plan.push_silence(gap);
            }
        }

        Ok(plan)
    }

    fn concatenate(&self, plan: &ConcatenationPlan) -> Result<AudioAsset, AssemblyError> {
        let output = self.workspace.allocate("narration_full", "mp3");
        self.log.command(&format!(
            "concat {} inputs (libmp3lame 44100 Hz 328k) -> {}",
            plan.len(),
            output.display()
        ));

        let mut asset = self
            .engine
            .concatenate(&plan.assets(), &EncodeProfile::narration_master(), &output)
            .map_err(|source| AssemblyError::Engine {
                operation: "concatenate narration",
                source,
            })?;

        let Some(size) = asset.size_bytes() else {
            self.log.error("[ERROR] Concatenated file does not exist");
            return Err(AssemblyError::MissingOutput(output));
        };
        let duration = probe_or_zero(self.engine, &mut asset, self.log);
        self.log.event(
            LogLevel::Info,
            "check",
            &format!(
                "[CHECK] Concatenated narration duration: {:.2}s, size: {} bytes",
                duration, size
            ),
            &[],
        );
        Ok(asset)
    }
}
