use std::collections::{HashSet, VecDeque};

use parking_lot::RwLock;
use tracing::{debug, instrument, warn};
use types::{Config, Hash256, Keccak256Hasher, Slot};

use crate::registry::{BuilderRegistry, RegistryError};

/// A bounded step applied to a builder's reputation after each finalized round. Small enough
/// that a single round's outcome never dominates a builder's standing.
const REPUTATION_STEP: f64 = 0.05;

const HISTORY_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundError {
    AlreadyActive,
    NoActiveRound,
    BuilderNotFound,
    DeadlinePassed,
    GasConflict,
    FragmentCapExceeded,
    NoFragments,
}

impl std::fmt::Display for RoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for RoundError {}

/// A candidate bundle of transactions offered by a registered builder for inclusion in a slot's
/// block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub builder_id: String,
    pub gas_used: u64,
    pub priority: u64,
    pub tx_count: usize,
}

/// A finalized (or previewed) assembly: the fragments selected for one slot, in descending-score
/// order, plus the deterministic digest identifying the resulting block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub slot: Slot,
    pub builder_ids: Vec<String>,
    pub fragments: Vec<Fragment>,
    pub total_gas: u64,
    pub total_txs: usize,
    pub block_hash: Hash256,
}

struct RoundState {
    slot: Slot,
    deadline_ms: u64,
    gas_limit: u64,
    cumulative_gas: u64,
    fragments: Vec<Fragment>,
    fragment_counts: std::collections::HashMap<String, usize>,
    conflicted_builders: HashSet<String>,
}

impl RoundState {
    fn new(slot: Slot, start_time_ms: u64, round_timeout_ms: u64, gas_limit: u64) -> Self {
        Self {
            slot,
            deadline_ms: start_time_ms.saturating_add(round_timeout_ms),
            gas_limit,
            cumulative_gas: 0,
            fragments: Vec::new(),
            fragment_counts: std::collections::HashMap::new(),
            conflicted_builders: HashSet::new(),
        }
    }
}

/// `revenue = gas_used * max(priority, 1)`.
fn revenue_of(fragment: &Fragment) -> u64 {
    fragment.gas_used.saturating_mul(fragment.priority.max(1))
}

/// Min-max normalization of `value` within `[min, max]`; a degenerate (all-equal) range
/// normalizes everything to `1.0` rather than dividing by zero.
fn normalize(value: u64, min: u64, max: u64) -> f64 {
    if max == min {
        1.0
    } else {
        (value - min) as f64 / (max - min) as f64
    }
}

/// `score = 0.7 * normalize(revenue) + 0.3 * reputation`.
fn score_fragments(fragments: &[Fragment], reputations: &std::collections::HashMap<String, f64>) -> Vec<(usize, f64)> {
    let revenues: Vec<u64> = fragments.iter().map(revenue_of).collect();
    let min = revenues.iter().copied().min().unwrap_or(0);
    let max = revenues.iter().copied().max().unwrap_or(0);

    let mut scored: Vec<(usize, f64)> = fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| {
            let reputation = reputations.get(&fragment.builder_id).copied().unwrap_or(0.0);
            let score = 0.7 * normalize(revenues[i], min, max) + 0.3 * reputation;
            (i, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}

/// Distributed block-builder coordinator (component C10): a registry of builders plus the
/// single-active-round fragment submission and assembly lifecycle.
pub struct BuilderCoordinator {
    registry: BuilderRegistry,
    round: RwLock<Option<RoundState>>,
    history: RwLock<VecDeque<Assembly>>,
    round_timeout_ms: u64,
    gas_limit: u64,
}

impl BuilderCoordinator {
    pub fn new(config: &Config) -> Self {
        Self {
            registry: BuilderRegistry::new(config),
            round: RwLock::new(None),
            history: RwLock::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
            round_timeout_ms: config.coordinator_round_timeout.as_millis() as u64,
            gas_limit: config.coordinator_gas_limit,
        }
    }

    pub fn registry(&self) -> &BuilderRegistry {
        &self.registry
    }

    pub fn register_builder(
        &self,
        id: String,
        pubkey: types::PublicKeyBytes,
        stake: types::Gwei,
        capabilities: u64,
        max_fragments: usize,
    ) -> Result<(), RegistryError> {
        self.registry.register(id, pubkey, stake, capabilities, max_fragments)
    }

    pub fn is_round_active(&self) -> bool {
        self.round.read().is_some()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn start_round(&self, slot: Slot, start_time_ms: u64) -> Result<(), RoundError> {
        let mut round = self.round.write();
        if round.is_some() {
            return Err(RoundError::AlreadyActive);
        }
        *round = Some(RoundState::new(slot, start_time_ms, self.round_timeout_ms, self.gas_limit));
        debug!(slot = slot.as_u64(), "started builder round");
        Ok(())
    }

    /// Accepts one builder's fragment into the active round, enforcing the per-builder fragment
    /// cap and the cumulative gas ceiling at acceptance time so assembly never has to reject a
    /// fragment it already counted.
    #[instrument(level = "debug", skip(self, fragment))]
    pub fn submit_fragment(&self, fragment: Fragment, now_ms: u64) -> Result<(), RoundError> {
        let builder = self
            .registry
            .get(&fragment.builder_id)
            .ok_or(RoundError::BuilderNotFound)?;

        let mut round_guard = self.round.write();
        let round = round_guard.as_mut().ok_or(RoundError::NoActiveRound)?;

        if now_ms > round.deadline_ms {
            return Err(RoundError::DeadlinePassed);
        }

        let count = round.fragment_counts.get(&fragment.builder_id).copied().unwrap_or(0);
        if count >= builder.max_fragments {
            round.conflicted_builders.insert(fragment.builder_id.clone());
            return Err(RoundError::FragmentCapExceeded);
        }

        if round.cumulative_gas.saturating_add(fragment.gas_used) > round.gas_limit {
            round.conflicted_builders.insert(fragment.builder_id.clone());
            warn!(builder = %fragment.builder_id, "fragment rejected: gas ceiling exceeded");
            return Err(RoundError::GasConflict);
        }

        round.cumulative_gas += fragment.gas_used;
        *round.fragment_counts.entry(fragment.builder_id.clone()).or_insert(0) += 1;
        round.fragments.push(fragment);
        Ok(())
    }

    fn build_assembly(&self, round: &RoundState, hasher: &dyn Keccak256Hasher) -> Result<Assembly, RoundError> {
        if round.fragments.is_empty() {
            return Err(RoundError::NoFragments);
        }

        let reputations: std::collections::HashMap<String, f64> = round
            .fragments
            .iter()
            .map(|f| f.builder_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| self.registry.reputation_of(&id).map(|r| (id, r)))
            .collect();

        let scored = score_fragments(&round.fragments, &reputations);
        let fragments: Vec<Fragment> = scored.iter().map(|(i, _)| round.fragments[*i].clone()).collect();

        let total_gas: u64 = fragments.iter().map(|f| f.gas_used).sum();
        let total_txs: usize = fragments.iter().map(|f| f.tx_count).sum();

        let mut builder_ids = Vec::new();
        for fragment in &fragments {
            if !builder_ids.contains(&fragment.builder_id) {
                builder_ids.push(fragment.builder_id.clone());
            }
        }

        let block_hash = hasher.hash_concat(&[
            &round.slot.as_u64().to_be_bytes(),
            &total_gas.to_be_bytes(),
            &(total_txs as u64).to_be_bytes(),
        ]);

        Ok(Assembly {
            slot: round.slot,
            builder_ids,
            fragments,
            total_gas,
            total_txs,
            block_hash,
        })
    }

    /// Previews the block the active round would produce, without finalizing the round or
    /// applying reputation feedback.
    pub fn assemble_block(&self, hasher: &dyn Keccak256Hasher) -> Result<Assembly, RoundError> {
        let round_guard = self.round.read();
        let round = round_guard.as_ref().ok_or(RoundError::NoActiveRound)?;
        self.build_assembly(round, hasher)
    }

    /// Assembles the active round's block, applies bounded reputation feedback to included and
    /// conflicting builders, records the assembly in history, and clears the round.
    #[instrument(level = "debug", skip(self, hasher))]
    pub fn finalize_round(&self, hasher: &dyn Keccak256Hasher) -> Result<Assembly, RoundError> {
        let mut round_guard = self.round.write();
        let round = round_guard.as_ref().ok_or(RoundError::NoActiveRound)?;
        let assembly = self.build_assembly(round, hasher)?;

        let included: HashSet<&String> = assembly.builder_ids.iter().collect();
        for builder_id in &assembly.builder_ids {
            self.registry.adjust_reputation(builder_id, REPUTATION_STEP);
        }
        for conflicted in &round.conflicted_builders {
            if !included.contains(conflicted) {
                self.registry.adjust_reputation(conflicted, -REPUTATION_STEP);
            }
        }

        *round_guard = None;
        debug!(slot = assembly.slot.as_u64(), builders = assembly.builder_ids.len(), "finalized builder round");

        let mut history = self.history.write();
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(assembly.clone());

        Ok(assembly)
    }

    /// Returns the most recent `n` finalized assemblies, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<Assembly> {
        let history = self.history.read();
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Sha3Keccak256, Slot};

    fn pubkey(byte: u8) -> types::PublicKeyBytes {
        types::PublicKeyBytes([byte; 48])
    }

    const MIN_STAKE: types::Gwei = 32_000_000_000;

    fn coordinator_with_builders(n: usize) -> BuilderCoordinator {
        let coordinator = BuilderCoordinator::new(&Config::default());
        for i in 0..n {
            coordinator
                .register_builder(format!("b{i}"), pubkey(i as u8 + 1), MIN_STAKE, 0, 8)
                .unwrap();
        }
        coordinator
    }

    fn fragment(builder_id: &str, gas_used: u64, priority: u64, tx_count: usize) -> Fragment {
        Fragment {
            builder_id: builder_id.into(),
            gas_used,
            priority,
            tx_count,
        }
    }

    #[test]
    fn only_one_round_may_be_active_at_a_time() {
        let coordinator = coordinator_with_builders(1);
        coordinator.start_round(Slot::new(1), 0).unwrap();
        assert_eq!(coordinator.start_round(Slot::new(2), 0), Err(RoundError::AlreadyActive));
    }

    #[test]
    fn submit_fragment_requires_an_active_round() {
        let coordinator = coordinator_with_builders(1);
        assert_eq!(
            coordinator.submit_fragment(fragment("b0", 100, 1, 1), 0),
            Err(RoundError::NoActiveRound)
        );
    }

    #[test]
    fn submit_fragment_rejects_unknown_builder() {
        let coordinator = coordinator_with_builders(0);
        coordinator.start_round(Slot::new(1), 0).unwrap();
        assert_eq!(
            coordinator.submit_fragment(fragment("ghost", 100, 1, 1), 0),
            Err(RoundError::BuilderNotFound)
        );
    }

    #[test]
    fn submit_fragment_rejects_past_the_deadline() {
        let coordinator = coordinator_with_builders(1);
        coordinator.start_round(Slot::new(1), 0).unwrap();
        let past_deadline = Config::default().coordinator_round_timeout.as_millis() as u64 + 1;
        assert_eq!(
            coordinator.submit_fragment(fragment("b0", 100, 1, 1), past_deadline),
            Err(RoundError::DeadlinePassed)
        );
    }

    #[test]
    fn submit_fragment_enforces_the_per_builder_fragment_cap() {
        let coordinator = BuilderCoordinator::new(&Config::default());
        coordinator.register_builder("b0".into(), pubkey(1), MIN_STAKE, 0, 1).unwrap();
        coordinator.start_round(Slot::new(1), 0).unwrap();
        coordinator.submit_fragment(fragment("b0", 100, 1, 1), 0).unwrap();
        assert_eq!(
            coordinator.submit_fragment(fragment("b0", 100, 1, 1), 0),
            Err(RoundError::FragmentCapExceeded)
        );
    }

    #[test]
    fn submit_fragment_enforces_the_cumulative_gas_ceiling() {
        let mut config = Config::default();
        config.coordinator_gas_limit = 150;
        let coordinator = BuilderCoordinator::new(&config);
        coordinator.register_builder("b0".into(), pubkey(1), MIN_STAKE, 0, 8).unwrap();
        coordinator.register_builder("b1".into(), pubkey(2), MIN_STAKE, 0, 8).unwrap();
        coordinator.start_round(Slot::new(1), 0).unwrap();

        coordinator.submit_fragment(fragment("b0", 100, 1, 1), 0).unwrap();
        assert_eq!(
            coordinator.submit_fragment(fragment("b1", 100, 1, 1), 0),
            Err(RoundError::GasConflict)
        );
    }

    #[test]
    fn assemble_block_previews_without_finalizing() {
        let coordinator = coordinator_with_builders(1);
        coordinator.start_round(Slot::new(1), 0).unwrap();
        coordinator.submit_fragment(fragment("b0", 100, 2, 5), 0).unwrap();

        let preview = coordinator.assemble_block(&Sha3Keccak256).unwrap();
        assert_eq!(preview.total_gas, 100);
        assert!(coordinator.is_round_active());
    }

    #[test]
    fn assemble_block_with_no_fragments_errors() {
        let coordinator = coordinator_with_builders(1);
        coordinator.start_round(Slot::new(1), 0).unwrap();
        assert_eq!(coordinator.assemble_block(&Sha3Keccak256), Err(RoundError::NoFragments));
    }

    #[test]
    fn finalize_round_orders_fragments_by_descending_score_and_feeds_back_reputation() {
        let coordinator = coordinator_with_builders(2);
        coordinator.start_round(Slot::new(1), 0).unwrap();
        // b0 offers the lower-revenue fragment, b1 the higher-revenue one.
        coordinator.submit_fragment(fragment("b0", 10, 1, 1), 0).unwrap();
        coordinator.submit_fragment(fragment("b1", 1000, 1, 1), 0).unwrap();

        let assembly = coordinator.finalize_round(&Sha3Keccak256).unwrap();
        assert_eq!(assembly.fragments[0].builder_id, "b1");
        assert_eq!(assembly.fragments[1].builder_id, "b0");
        assert_eq!(assembly.total_gas, 1010);
        assert_eq!(assembly.total_txs, 2);
        assert!(!coordinator.is_round_active());

        let default_reputation = Config::default().coordinator_default_reputation;
        assert_eq!(
            coordinator.registry().reputation_of("b0"),
            Some(default_reputation + REPUTATION_STEP)
        );
        assert_eq!(
            coordinator.registry().reputation_of("b1"),
            Some(default_reputation + REPUTATION_STEP)
        );
    }

    #[test]
    fn conflicting_builders_lose_reputation_on_finalize() {
        let mut config = Config::default();
        config.coordinator_gas_limit = 50;
        let coordinator = BuilderCoordinator::new(&config);
        coordinator.register_builder("b0".into(), pubkey(1), MIN_STAKE, 0, 8).unwrap();
        coordinator.register_builder("b1".into(), pubkey(2), MIN_STAKE, 0, 8).unwrap();
        coordinator.start_round(Slot::new(1), 0).unwrap();

        coordinator.submit_fragment(fragment("b0", 50, 1, 1), 0).unwrap();
        assert_eq!(
            coordinator.submit_fragment(fragment("b1", 50, 1, 1), 0),
            Err(RoundError::GasConflict)
        );

        coordinator.finalize_round(&Sha3Keccak256).unwrap();

        let default_reputation = config.coordinator_default_reputation;
        assert_eq!(
            coordinator.registry().reputation_of("b0"),
            Some(default_reputation + REPUTATION_STEP)
        );
        assert_eq!(
            coordinator.registry().reputation_of("b1"),
            Some((default_reputation - REPUTATION_STEP).max(0.0))
        );
    }

    #[test]
    fn block_hash_is_deterministic_over_slot_gas_and_tx_count() {
        let coordinator = coordinator_with_builders(1);
        coordinator.start_round(Slot::new(3), 0).unwrap();
        coordinator.submit_fragment(fragment("b0", 42, 1, 2), 0).unwrap();
        let a = coordinator.assemble_block(&Sha3Keccak256).unwrap();

        let other = coordinator_with_builders(1);
        other.start_round(Slot::new(3), 0).unwrap();
        other.submit_fragment(fragment("b0", 42, 1, 2), 0).unwrap();
        let b = other.assemble_block(&Sha3Keccak256).unwrap();

        assert_eq!(a.block_hash, b.block_hash);
    }

    #[test]
    fn history_tracks_finalized_assemblies_in_insertion_order() {
        let coordinator = coordinator_with_builders(1);
        for slot in 1..=3u64 {
            coordinator.start_round(Slot::new(slot), 0).unwrap();
            coordinator.submit_fragment(fragment("b0", 10, 1, 1), 0).unwrap();
            coordinator.finalize_round(&Sha3Keccak256).unwrap();
        }

        let last_two = coordinator.last_n(2);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].slot, Slot::new(2));
        assert_eq!(last_two[1].slot, Slot::new(3));
    }
}
