//! Data models shared by every pipeline stage.
//!
//! - Audio assets and their container formats
//! - Caller-supplied fragment references
//! - Per-invocation scratch workspaces

mod asset;
mod fragment;
mod workspace;

pub use asset::{AudioAsset, AudioFormat};
pub use fragment::{NarrationFragmentRef, SilenceSpec};
pub use workspace::{new_job_id, Workspace};
