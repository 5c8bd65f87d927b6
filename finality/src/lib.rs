//! Casper FFG justification/finalization and single-slot finality (components C3 and C4).
//!
//! Deliberately independent of `beacon_state`: both trackers are driven by whatever caller
//! already has access to the active validator set and stake-weighted vote tallies for a given
//! epoch or slot, so this crate carries no dependency on the state transition itself.

mod ffg;
mod ssf;

pub use ffg::{FfgError, FfgTracker, FfgUpdate};
pub use ssf::{Equivocation, FinalityStatus, FinalizedSlot, SsfEngine, SsfError, Vote, VoteOutcome};
