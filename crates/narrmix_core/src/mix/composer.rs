//! Final mix execution.

use thiserror::Error;

use super::fade::{fade_length, FadeBounds, FadeWindow};
use super::graph::MixGraphBuilder;
use crate::engine::{probe_or_zero, EncodeProfile, EngineError, FilterGraph, MediaEngine};
use crate::logging::{LogSink, LogSinkExt};
use crate::models::{AudioAsset, Workspace};

/// The engine failed while producing the final mix.
#[derive(Error, Debug)]
#[error("Mixing failed: {source}")]
pub struct MixFailure {
    #[source]
    pub source: EngineError,
}

/// Fully resolved inputs of the final mix.
#[derive(Debug, Clone)]
pub struct MixSpec {
    pub narration: AudioAsset,
    pub music: Option<AudioAsset>,
    /// Measured duration of `narration`.
    pub narration_duration: f64,
    pub fade_length_seconds: f64,
}

impl MixSpec {
    pub fn has_music(&self) -> bool {
        self.music.is_some()
    }

    pub fn fade_window(&self) -> FadeWindow {
        FadeWindow::ending_at(self.narration_duration, self.fade_length_seconds)
    }
}

/// Shapes the narration and, when present, mixes the music bed under it.
pub struct MixComposer<'a> {
    engine: &'a dyn MediaEngine,
    workspace: &'a Workspace,
    log: &'a dyn LogSink,
    graphs: MixGraphBuilder,
    fade_bounds: FadeBounds,
}

impl<'a> MixComposer<'a> {
    pub fn new(engine: &'a dyn MediaEngine, workspace: &'a Workspace, log: &'a dyn LogSink) -> Self {
        Self {
            engine,
            workspace,
            log,
            graphs: MixGraphBuilder::default(),
            fade_bounds: FadeBounds::default(),
        }
    }

    pub fn with_graphs(mut self, graphs: MixGraphBuilder) -> Self {
        self.graphs = graphs;
        self
    }

    pub fn with_fade_bounds(mut self, fade_bounds: FadeBounds) -> Self {
        self.fade_bounds = fade_bounds;
        self
    }

    /// Resolve the mix parameters. An unmeasured narration is probed so
    /// the fade is always computed from a measured duration.
    pub fn plan(&self, narration: AudioAsset, music: Option<AudioAsset>) -> MixSpec {
        let mut narration = narration;
        let narration_duration = match narration.duration() {
            Some(seconds) => seconds,
            None => probe_or_zero(self.engine, &mut narration, self.log),
        };
        let fade_length_seconds = fade_length(narration_duration, &self.fade_bounds);
        MixSpec {
            narration,
            music,
            narration_duration,
            fade_length_seconds,
        }
    }

    /// Filter graph for `spec`.
    pub fn graph_for(&self, spec: &MixSpec) -> FilterGraph {
        if spec.has_music() {
            self.graphs.music_bed(&spec.fade_window())
        } else {
            self.graphs.narration_only()
        }
    }

    /// Run the mix, returning the output asset.
    pub fn compose(&self, spec: &MixSpec) -> Result<AudioAsset, MixFailure> {
        let graph = self.graph_for(spec);
        let output = self.workspace.allocate("output", "mp3");

        let mut inputs = vec![&spec.narration];
        if let Some(ref music) = spec.music {
            let window = spec.fade_window();
            self.log.info(&format!(
                "Fade out {}s starting at {:.3}s of {:.3}s",
                window.length, window.start, spec.narration_duration
            ));
            inputs.push(music);
        }

        self.log.command(&format!("mix {} -> {}", graph.spec(), output.display()));
        let asset = self
            .engine
            .apply_filter_graph(&inputs, &graph, &EncodeProfile::mix_output(), &output)
            .map_err(|source| MixFailure { source })?;

        self.log
            .success(&format!("Audio processed, output: {}", asset));
        Ok(asset)
    }
}
