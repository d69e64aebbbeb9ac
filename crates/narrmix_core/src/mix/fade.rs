//! Music fade-out length and placement.

use serde::{Deserialize, Serialize};

/// Lower and upper limits of the fade-out length, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeBounds {
    pub floor: f64,
    pub cap: f64,
}

impl Default for FadeBounds {
    fn default() -> Self {
        Self {
            floor: 0.8,
            cap: 5.0,
        }
    }
}

/// Fade length for a narration of `narration_seconds`.
///
/// A third of the narration in whole seconds, limited to `bounds.cap`,
/// and never below `bounds.floor`. The floor wins for narrations shorter
/// than three seconds, so there the fade may exceed a third of the
/// narration.
pub fn fade_length(narration_seconds: f64, bounds: &FadeBounds) -> f64 {
    let narration_seconds = if narration_seconds.is_finite() {
        narration_seconds.max(0.0)
    } else {
        0.0
    };
    (narration_seconds / 3.0)
        .floor()
        .min(bounds.cap)
        .max(bounds.floor)
}

/// Where the fade-out sits on the narration timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeWindow {
    pub start: f64,
    pub length: f64,
}

impl FadeWindow {
    /// Fade of `length` ending with the narration, clamped to start at 0.
    pub fn ending_at(narration_seconds: f64, length: f64) -> Self {
        Self {
            start: (narration_seconds - length).max(0.0),
            length,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}
