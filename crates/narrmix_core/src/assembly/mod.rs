//! Narration assembly.
//!
//! Downloaded fragments are inspected, interleaved with gap silences in
//! caller order and concatenated into a single narration master.

mod assembler;
mod plan;

pub use assembler::{
    AssembledNarration, AssemblerOptions, AssemblyError, FragmentCheck, LocalFragment,
    NarrationAssembler,
};
pub use plan::{ConcatenationPlan, PlanEntry};
