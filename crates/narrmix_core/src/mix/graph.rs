//! Filter graphs for the final mix.

use serde::{Deserialize, Serialize};

use super::fade::FadeWindow;
use crate::engine::{format_seconds, FilterGraph};

/// Output label of the two-input mix graph.
pub const MIX_OUTPUT_LABEL: &str = "[aout]";

/// Gain and EQ parameters of the mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixParameters {
    pub narration_volume: f64,
    /// High-pass cutoff on narration when music is mixed in.
    pub highpass_with_music_hz: u32,
    /// High-pass cutoff on narration-only output.
    pub highpass_solo_hz: u32,
    pub eq_frequency_hz: u32,
    pub eq_width_q: f64,
    pub eq_gain_db: f64,
    pub music_volume: f64,
}

impl Default for MixParameters {
    fn default() -> Self {
        Self {
            narration_volume: 0.7,
            highpass_with_music_hz: 180,
            highpass_solo_hz: 120,
            eq_frequency_hz: 100,
            eq_width_q: 2.0,
            eq_gain_db: -8.0,
            music_volume: 0.2,
        }
    }
}

/// Builds the narration-only and music-bed filter graphs.
#[derive(Debug, Clone, Default)]
pub struct MixGraphBuilder {
    params: MixParameters,
}

impl MixGraphBuilder {
    pub fn new(params: MixParameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> &MixParameters {
        &self.params
    }

    fn narration_chain(&self, highpass_hz: u32) -> String {
        let p = &self.params;
        format!(
            "volume={},highpass=f={},equalizer=f={}:t=q:w={}:g={}",
            p.narration_volume, highpass_hz, p.eq_frequency_hz, p.eq_width_q, p.eq_gain_db
        )
    }

    /// Shaping for narration without music.
    pub fn narration_only(&self) -> FilterGraph {
        FilterGraph::simple(self.narration_chain(self.params.highpass_solo_hz))
    }

    /// Narration (input 0) over a faded, ducked music bed (input 1).
    ///
    /// The mix lasts as long as the narration.
    pub fn music_bed(&self, fade: &FadeWindow) -> FilterGraph {
        let graph = format!(
            "[0:a]{narr}[narr];\
             [1:a]afade=t=out:st={start}:d={length},volume={music}[music];\
             [narr][music]amix=inputs=2:duration=first{out}",
            narr = self.narration_chain(self.params.highpass_with_music_hz),
            start = format_seconds(fade.start),
            length = format_seconds(fade.length),
            music = self.params.music_volume,
            out = MIX_OUTPUT_LABEL,
        );
        FilterGraph::complex(graph, MIX_OUTPUT_LABEL)
    }
}
