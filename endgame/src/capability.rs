use types::{Hash256, Slot};

/// External transaction-execution capability consumed by the pipeline's execution flow.
///
/// Transaction execution itself is out of scope for this core (`spec.md` §1); the pipeline only
/// needs to hand a finalized block over and learn the resulting state root.
pub trait ExecutionEngine: Send + Sync {
    fn execute_block(&self, slot: Slot, block_root: Hash256) -> Result<Hash256, ExecutionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionError;

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "execution engine failed to execute block")
    }
}

impl std::error::Error for ExecutionError {}

/// External execution-proof verifier, consulted only on the slow path (§4.6's proof policy
/// table).
pub trait ProofValidator: Send + Sync {
    fn validate_proof(&self, block_root: Hash256, state_root: Hash256, proof_data: Option<&[u8]>) -> bool;
}
