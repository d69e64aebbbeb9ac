//! Fixed-duration silent assets.

use crate::engine::{EngineResult, MediaEngine};
use crate::models::{AudioAsset, SilenceSpec, Workspace};

/// Silence inserted between consecutive narration fragments.
pub const DEFAULT_GAP_SECONDS: f64 = 1.0;

/// Silence prepended to the assembled narration.
pub const DEFAULT_LEAD_IN_SECONDS: f64 = 0.15;

/// Produces silent assets inside a job workspace.
pub struct SilenceGenerator<'a> {
    engine: &'a dyn MediaEngine,
    workspace: &'a Workspace,
}

impl<'a> SilenceGenerator<'a> {
    pub fn new(engine: &'a dyn MediaEngine, workspace: &'a Workspace) -> Self {
        Self { engine, workspace }
    }

    /// Synthesize `duration_seconds` of silence into a fresh scratch file.
    pub fn make_silence(&self, duration_seconds: f64) -> EngineResult<AudioAsset> {
        let output = self.workspace.allocate("silence", "mp3");
        self.engine
            .synthesize_silence(SilenceSpec::new(duration_seconds), &output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::probe_or_zero;
    use crate::logging::MemorySink;
    use crate::testing::FakeEngine;

    #[test]
    fn silence_has_requested_duration() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), "job").unwrap();
        let engine = FakeEngine::new();

        let generator = SilenceGenerator::new(&engine, &ws);
        let mut gap = generator.make_silence(DEFAULT_GAP_SECONDS).unwrap();
        let lead = generator.make_silence(DEFAULT_LEAD_IN_SECONDS).unwrap();

        assert!(gap.path().starts_with(ws.root()));
        assert_ne!(gap.path(), lead.path());
        assert_eq!(probe_or_zero(&engine, &mut gap, &MemorySink::new()), 1.0);
        assert_eq!(lead.duration(), Some(0.15));
    }

    #[test]
    fn engine_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path(), "job").unwrap();
        let engine = FakeEngine::new().failing("silence");

        let err = SilenceGenerator::new(&engine, &ws)
            .make_silence(1.0)
            .unwrap_err();
        assert!(err.diagnostic().unwrap().contains("silence"));
    }
}
