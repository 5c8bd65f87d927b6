//! Domain-separated signing roots and BLS verification wrappers (component C6).
//!
//! The core never hard-codes a curve implementation: every verifier here is generic over
//! `BLSBackend`, the capability trait consumed from the external BLS primitives (§6).

mod backend;
mod domain;
mod verify;

pub use backend::{BLSBackend, BlstBackend};
pub use domain::{
    compute_signing_root, domain_separation, DOMAIN_ATTESTER, DOMAIN_DEPOSIT, DOMAIN_PROPOSER,
    DOMAIN_RANDAO, DOMAIN_SYNC_COMMITTEE, DOMAIN_VOLUNTARY_EXIT,
};
pub use verify::{
    verify_attestation_signature, verify_proposer_signature, verify_sync_committee_signature,
    ForkContext,
};
