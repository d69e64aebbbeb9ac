//! Pipeline step implementations.
//!
//! Each step handles one stage of the narration mix: assembling the
//! chunks, padding, fetching and fitting the music bed, mixing and
//! publishing.

mod assemble;
mod compose;
mod music;
mod pad;
mod publish;

pub use assemble::AssembleStep;
pub use compose::ComposeStep;
pub use music::{FetchMusicStep, FitMusicStep};
pub use pad::PadStep;
pub use publish::PublishStep;
