//! Caller-supplied narration fragment references and silence specs.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One narration chunk, identified by its position and storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationFragmentRef {
    /// Position in the caller's list (0-based).
    pub sequence_index: usize,
    /// Object key inside the narration bucket.
    pub source_key: String,
}

impl NarrationFragmentRef {
    pub fn new(sequence_index: usize, source_key: impl Into<String>) -> Self {
        Self {
            sequence_index,
            source_key: source_key.into(),
        }
    }

    /// Build references from an ordered key list, preserving its order.
    pub fn from_keys<S: AsRef<str>>(keys: &[S]) -> Vec<Self> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| Self::new(i, k.as_ref()))
            .collect()
    }

    /// Extension of the source key, falling back to `mp3`.
    pub fn extension(&self) -> &str {
        Path::new(&self.source_key)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("mp3")
    }
}

/// Requested length of a synthesized silence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceSpec {
    duration_seconds: f64,
}

impl SilenceSpec {
    /// Negative and non-finite durations collapse to zero.
    pub fn new(duration_seconds: f64) -> Self {
        let duration_seconds = if duration_seconds.is_finite() {
            duration_seconds.max(0.0)
        } else {
            0.0
        };
        Self { duration_seconds }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_keys_keeps_caller_order() {
        let refs = NarrationFragmentRef::from_keys(&["c.mp3", "a.mp3", "b.mp3"]);
        let keys: Vec<_> = refs.iter().map(|r| r.source_key.as_str()).collect();
        assert_eq!(keys, vec!["c.mp3", "a.mp3", "b.mp3"]);
        assert_eq!(refs[2].sequence_index, 2);
    }

    #[test]
    fn extension_falls_back_to_mp3() {
        assert_eq!(NarrationFragmentRef::new(0, "x/y.wav").extension(), "wav");
        assert_eq!(NarrationFragmentRef::new(0, "x/chunk").extension(), "mp3");
    }

    #[test]
    fn silence_spec_rejects_negative() {
        assert_eq!(SilenceSpec::new(-1.0).duration_seconds(), 0.0);
        assert_eq!(SilenceSpec::new(f64::NAN).duration_seconds(), 0.0);
        assert_eq!(SilenceSpec::new(0.15).duration_seconds(), 0.15);
    }
}
