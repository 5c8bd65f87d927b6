//! Secure prequorum: two-phase commit-reveal voting with VRF-weighted quorum (component C8).
//!
//! Orthogonal to `finality`: a prequorum signal is an advisory preconfirmation for the user
//! layer, never an input to single-slot finality or the endgame pipeline.

mod commit;
mod engine;

pub use commit::{commitment_hash, vrf_weight, CommitVote, RevealVote};
pub use engine::{PrequorumConfig, PrequorumEngine, PrequorumError, RoundStatus};
