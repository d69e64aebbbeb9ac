//! Ordered concatenation plans.

use crate::models::AudioAsset;

/// One entry of a [`ConcatenationPlan`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEntry {
    /// A caller-supplied narration fragment.
    Fragment {
        sequence_index: usize,
        asset: AudioAsset,
    },
    /// A synthesized gap.
    Silence(AudioAsset),
}

impl PlanEntry {
    pub fn asset(&self) -> &AudioAsset {
        match self {
            PlanEntry::Fragment { asset, .. } => asset,
            PlanEntry::Silence(asset) => asset,
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self, PlanEntry::Silence(_))
    }
}

/// Fragments interleaved with gap silences, in playback order.
///
/// For N fragments a complete plan holds 2N-1 entries: there is no
/// silence after the last fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConcatenationPlan {
    entries: Vec<PlanEntry>,
}

impl ConcatenationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_fragment(&mut self, sequence_index: usize, asset: AudioAsset) {
        self.entries.push(PlanEntry::Fragment {
            sequence_index,
            asset,
        });
    }

    pub fn push_silence(&mut self, asset: AudioAsset) {
        self.entries.push(PlanEntry::Silence(asset));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn fragment_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_silence()).count()
    }

    /// Sequence indices of the fragments, in plan order.
    pub fn fragment_order(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                PlanEntry::Fragment { sequence_index, .. } => Some(*sequence_index),
                PlanEntry::Silence(_) => None,
            })
            .collect()
    }

    /// Assets in playback order.
    pub fn assets(&self) -> Vec<AudioAsset> {
        self.entries.iter().map(|e| e.asset().clone()).collect()
    }

    /// The only asset, when the plan has exactly one entry.
    pub fn into_single(mut self) -> Result<AudioAsset, Self> {
        if self.entries.len() == 1 {
            if let Some(entry) = self.entries.pop() {
                return Ok(match entry {
                    PlanEntry::Fragment { asset, .. } => asset,
                    PlanEntry::Silence(asset) => asset,
                });
            }
        }
        Err(self)
    }

    /// Consume the plan, returning every asset it referenced.
    pub fn into_assets(self) -> Vec<AudioAsset> {
        self.entries
            .into_iter()
            .map(|e| match e {
                PlanEntry::Fragment { asset, .. } => asset,
                PlanEntry::Silence(asset) => asset,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_interleaves_in_push_order() {
        let mut plan = ConcatenationPlan::new();
        plan.push_fragment(0, AudioAsset::new("a.mp3"));
        plan.push_silence(AudioAsset::new("s1.mp3"));
        plan.push_fragment(1, AudioAsset::new("b.mp3"));

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.fragment_count(), 2);
        assert_eq!(plan.fragment_order(), vec![0, 1]);
        assert!(plan.entries()[1].is_silence());

        let names: Vec<_> = plan
            .assets()
            .iter()
            .map(|a| a.path().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp3", "s1.mp3", "b.mp3"]);
    }

    #[test]
    fn into_single_only_for_one_entry() {
        let mut plan = ConcatenationPlan::new();
        plan.push_fragment(0, AudioAsset::new("only.mp3"));
        assert_eq!(plan.into_single().unwrap(), AudioAsset::new("only.mp3"));

        let mut plan = ConcatenationPlan::new();
        plan.push_fragment(0, AudioAsset::new("a.mp3"));
        plan.push_silence(AudioAsset::new("s.mp3"));
        let plan = plan.into_single().unwrap_err();
        assert_eq!(plan.len(), 2);
    }
}
