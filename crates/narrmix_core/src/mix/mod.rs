//! Mix composition: fade computation, filter graphs and execution.

mod composer;
mod fade;
mod graph;

pub use composer::{MixComposer, MixFailure, MixSpec};
pub use fade::{fade_length, FadeBounds, FadeWindow};
pub use graph::{MixGraphBuilder, MixParameters, MIX_OUTPUT_LABEL};
