//! narrmix core - narration assembly and music bed mixing.
//!
//! This crate contains all pipeline logic with zero CLI dependencies.
//! Audio bytes are never decoded here: every transformation is delegated
//! to a [`engine::MediaEngine`], and every remote object goes through an
//! [`storage::ObjectStore`].
//!
//! # Layout
//!
//! ```text
//! orchestrator (MixJob, Pipeline, steps)
//!     ├── assembly   - fragments + gap silences -> one narration
//!     ├── padding    - lead-in silence
//!     ├── music      - loop/trim the bed to the narration length
//!     ├── mix        - fade length + filter graph
//!     ├── silence    - fixed-duration silent assets
//!     └── engine     - ffmpeg/ffprobe adapter
//! ```

pub mod api;
pub mod assembly;
pub mod config;
pub mod engine;
pub mod logging;
pub mod mix;
pub mod models;
pub mod music;
pub mod orchestrator;
pub mod padding;
pub mod silence;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
