//! Lead-in padding.

use std::fs;

use crate::engine::{EncodeProfile, EngineResult, FilterGraph, MediaEngine};
use crate::logging::{LogSink, LogSinkExt};
use crate::models::{AudioAsset, Workspace};
use crate::silence::{SilenceGenerator, DEFAULT_LEAD_IN_SECONDS};

/// Audio-only concat of input 0 followed by input 1.
pub const PAD_GRAPH: &str = "[0][1]concat=n=2:v=0:a=1[a]";
pub const PAD_OUTPUT_LABEL: &str = "[a]";

/// Prepends a short silence so playback does not clip the first word.
pub struct LeadInPadder<'a> {
    engine: &'a dyn MediaEngine,
    workspace: &'a Workspace,
    log: &'a dyn LogSink,
    pad_seconds: f64,
}

impl<'a> LeadInPadder<'a> {
    pub fn new(engine: &'a dyn MediaEngine, workspace: &'a Workspace, log: &'a dyn LogSink) -> Self {
        Self {
            engine,
            workspace,
            log,
            pad_seconds: DEFAULT_LEAD_IN_SECONDS,
        }
    }

    pub fn with_pad_seconds(mut self, pad_seconds: f64) -> Self {
        self.pad_seconds = pad_seconds;
        self
    }

    pub fn pad_seconds(&self) -> f64 {
        self.pad_seconds
    }

    /// Return a new asset holding the lead-in followed by `asset`.
    ///
    /// The synthesized lead-in is deleted before returning.
    pub fn pad(&self, asset: &AudioAsset) -> EngineResult<AudioAsset> {
        let lead_in = SilenceGenerator::new(self.engine, self.workspace).make_silence(self.pad_seconds)?;
        let output = self.workspace.allocate("narr_sil", "mp3");

        let result = self.engine.apply_filter_graph(
            &[&lead_in, asset],
            &FilterGraph::complex(PAD_GRAPH, PAD_OUTPUT_LABEL),
            &EncodeProfile::engine_default(),
            &output,
        );

        if let Err(e) = fs::remove_file(lead_in.path()) {
            self.log
                .warn(&format!("[CLEANUP_WARNING] {}: {}", lead_in, e));
        }

        let padded = result?;
        self.log.info(&format!(
            "[PAD_NARRATION] Added {}s silence: {}",
            self.pad_seconds, padded
        ));
        Ok(padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::probe_or_zero;
    use crate::logging::MemorySink;
    use crate::testing::FakeEngine;

    #[test]
    fn pad_prepends_lead_in() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), "job").unwrap();
        let engine = FakeEngine::new();
        let log = MemorySink::new();

        let narration = ws.allocate("narration", "mp3");
        engine.write_audio(&narration, 8.0);

        let mut padded = LeadInPadder::new(&engine, &ws, &log)
            .pad(&AudioAsset::new(&narration))
            .unwrap();

        assert_eq!(probe_or_zero(&engine, &mut padded, &log), 8.15);
        assert_eq!(
            engine.filter_graphs(),
            vec![FilterGraph::complex(PAD_GRAPH, PAD_OUTPUT_LABEL)]
        );
        assert!(narration.exists());
        assert!(log.contains("[PAD_NARRATION]"));

        // Only the source narration and the padded output remain.
        assert_eq!(std::fs::read_dir(ws.root()).unwrap().count(), 2);
    }

    #[test]
    fn pad_length_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), "job").unwrap();
        let engine = FakeEngine::new();
        let log = MemorySink::new();

        let padder = LeadInPadder::new(&engine, &ws, &log).with_pad_seconds(0.5);
        assert_eq!(padder.pad_seconds(), 0.5);

        let narration = ws.allocate("narration", "mp3");
        engine.write_audio(&narration, 2.0);
        let mut padded = padder.pad(&AudioAsset::new(&narration)).unwrap();
        assert_eq!(probe_or_zero(&engine, &mut padded, &log), 2.5);
    }

    #[test]
    fn filter_failure_still_removes_lead_in() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), "job").unwrap();
        let engine = FakeEngine::new().failing("filter");
        let log = MemorySink::new();

        let narration = ws.allocate("narration", "mp3");
        engine.write_audio(&narration, 2.0);

        assert!(LeadInPadder::new(&engine, &ws, &log)
            .pad(&AudioAsset::new(&narration))
            .is_err());
        assert_eq!(std::fs::read_dir(ws.root()).unwrap().count(), 1);
    }
}
