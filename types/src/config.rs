use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The fraction of total weight required to cross a stake-weighted threshold, expressed as
/// `numerator / denominator` so that the decision itself stays in integer arithmetic
/// (`vote * denominator >= total * numerator`) and carries no rounding bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: u64,
    pub denominator: u64,
}

impl Fraction {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub const TWO_THIRDS: Self = Self::new(2, 3);

    /// `ceil(total * numerator / denominator)`, the minimum weight needed to cross the fraction.
    pub fn ceil_threshold(&self, total: u64) -> u64 {
        let num = total as u128 * self.numerator as u128;
        let den = self.denominator as u128;
        ((num + den - 1) / den) as u64
    }

    /// Integer-exact "does `weight` cross the fraction of `total`" check, avoiding the rounding
    /// bias that a floating-point comparison would introduce.
    pub fn is_met_by(&self, weight: u64, total: u64) -> bool {
        (weight as u128) * (self.denominator as u128) >= (total as u128) * (self.numerator as u128)
    }
}

/// Genesis/epoch-length configuration shared by the state transition, finality machinery and
/// committee rotation. Distinct deployments plug in different values (e.g. the "quick-slots"
/// variant shortens slots and epochs); none of this is loaded from a file by the core itself —
/// config *loading* is an external concern, only the struct and its defaults live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub slots_per_epoch: u64,
    pub seconds_per_slot: u64,
    pub epochs_for_finality: u64,

    pub max_effective_balance: u64,
    pub gwei_per_eth: u64,

    pub max_committees_per_slot: u64,
    pub target_committee_size: u64,
    pub max_attesters: usize,
    pub historical_roots_limit: usize,

    pub target_finality_ms: u64,
    pub require_proof_on_slow_path: bool,
    pub skip_execution: bool,
    pub max_concurrent_slots: usize,

    pub finality_threshold: Fraction,
    pub max_slot_history: usize,
    pub optimistic_threshold: f64,

    pub prequorum_threshold: Fraction,
    pub prequorum_timeout: Duration,
    pub prequorum_min_validators: usize,
    pub prequorum_max_votes_per_slot: usize,

    pub kps_default_threshold: usize,
    pub kps_max_group_size: usize,
    pub kps_key_rotation_interval_epochs: u64,

    pub coordinator_max_builders: usize,
    pub coordinator_gas_limit: u64,
    pub coordinator_default_reputation: f64,
    pub coordinator_round_timeout: Duration,
    pub coordinator_max_fragments: usize,
}

impl Default for Config {
    /// The "mainnet-scale" defaults.
    fn default() -> Self {
        Self {
            slots_per_epoch: 32,
            seconds_per_slot: 12,
            epochs_for_finality: 2,

            max_effective_balance: 32_000_000_000,
            gwei_per_eth: 1_000_000_000,

            max_committees_per_slot: 64,
            target_committee_size: 128,
            max_attesters: 128 * 1024,
            historical_roots_limit: 16_777_216,

            target_finality_ms: 500,
            require_proof_on_slow_path: false,
            skip_execution: false,
            max_concurrent_slots: 32,

            finality_threshold: Fraction::TWO_THIRDS,
            max_slot_history: 256,
            optimistic_threshold: 0.5,

            prequorum_threshold: Fraction::new(67, 100),
            prequorum_timeout: Duration::from_secs(6),
            prequorum_min_validators: 3,
            prequorum_max_votes_per_slot: 10_000,

            kps_default_threshold: 2,
            kps_max_group_size: 10,
            kps_key_rotation_interval_epochs: 256,

            coordinator_max_builders: 32,
            coordinator_gas_limit: 30_000_000,
            coordinator_default_reputation: 0.5,
            coordinator_round_timeout: Duration::from_secs(2),
            coordinator_max_fragments: 64,
        }
    }
}

impl Config {
    /// The "quick-slots" variant: 4-slot epochs, 6-second slots, single-slot finality.
    pub fn quick_slots() -> Self {
        Self {
            slots_per_epoch: 4,
            seconds_per_slot: 6,
            epochs_for_finality: 1,
            ..Self::default()
        }
    }
}
