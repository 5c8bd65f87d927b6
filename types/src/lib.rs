//! Primitive types shared across the consensus core: time units, hashes, the validator
//! registry entry, checkpoints, fixed-width key material and the configuration surface.
//!
//! Everything here is a value type or a narrow capability trait (`Keccak256Hasher`); no
//! component-specific logic lives in this crate.

mod bitfield;
mod checkpoint;
mod config;
mod fixed_bytes;
pub mod hashing;
mod slot_epoch;
mod validator;

pub use bitfield::JustificationBits;
pub use checkpoint::Checkpoint;
pub use config::{Config, Fraction};
pub use fixed_bytes::{PublicKeyBytes, SignatureBytes};
pub use hashing::{Keccak256Hasher, Sha3Keccak256};
pub use slot_epoch::{Epoch, Slot, FAR_FUTURE_EPOCH};
pub use validator::Validator;

/// A 32-byte digest: block roots, state roots, checkpoint roots, epoch seeds and domains are
/// all expressed in this type.
pub type Hash256 = alloy_primitives::B256;

/// Stable index of a validator within `BeaconState::validators` / `BeaconState::balances`.
pub type ValidatorIndex = u64;

/// Balances are always denominated in Gwei (1 ETH = `Config::gwei_per_eth`).
pub type Gwei = u64;
