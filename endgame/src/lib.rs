//! The endgame finality pipeline (component C7): coordinates single-slot finality voting, BLS
//! signature verification and an external execution/proof flow into the fast-path / slow-path
//! finality decision described in §4.6.

mod capability;
mod pipeline;

pub use capability::{ExecutionEngine, ExecutionError, ProofValidator};
pub use pipeline::{
    EndgamePipeline, FinalityPath, FinalityResult, PipelineConfig, PipelineError, VoteInput,
};
