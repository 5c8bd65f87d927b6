use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, instrument};
use types::{Config, Gwei, PublicKeyBytes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    BuilderExists,
    InvalidPubkey,
    InsufficientStake,
    MaxBuilders,
    BuilderNotFound,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for RegistryError {}

/// A registered block builder. `capabilities` is a free-form bitfield the coordinator's caller
/// defines (e.g. which execution features a builder supports); the coordinator itself never
/// interprets individual bits.
#[derive(Debug, Clone, PartialEq)]
pub struct Builder {
    pub id: String,
    pub pubkey: PublicKeyBytes,
    pub stake: Gwei,
    pub capabilities: u64,
    pub max_fragments: usize,
    pub reputation: f64,
}

/// Builder registration and reputation bookkeeping, guarded by a single reader/writer lock
/// (matching `committee::CommitteeCache`'s locking shape).
pub struct BuilderRegistry {
    builders: RwLock<HashMap<String, Builder>>,
    max_builders: usize,
    min_stake: Gwei,
    default_reputation: f64,
}

impl BuilderRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            builders: RwLock::new(HashMap::new()),
            max_builders: config.coordinator_max_builders,
            min_stake: config.gwei_per_eth.saturating_mul(32),
            default_reputation: config.coordinator_default_reputation,
        }
    }

    #[instrument(level = "debug", skip(self, pubkey))]
    pub fn register(
        &self,
        id: String,
        pubkey: PublicKeyBytes,
        stake: Gwei,
        capabilities: u64,
        max_fragments: usize,
    ) -> Result<(), RegistryError> {
        if id.is_empty() || pubkey.is_zero() {
            return Err(RegistryError::InvalidPubkey);
        }
        if stake < self.min_stake {
            return Err(RegistryError::InsufficientStake);
        }

        let mut builders = self.builders.write();
        if builders.contains_key(&id) {
            return Err(RegistryError::BuilderExists);
        }
        if builders.len() >= self.max_builders {
            return Err(RegistryError::MaxBuilders);
        }

        debug!(builder = %id, stake, "registered builder");
        builders.insert(
            id.clone(),
            Builder {
                id,
                pubkey,
                stake,
                capabilities,
                max_fragments,
                reputation: self.default_reputation,
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Builder> {
        self.builders.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.builders.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.builders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.read().is_empty()
    }

    pub fn reputation_of(&self, id: &str) -> Option<f64> {
        self.builders.read().get(id).map(|b| b.reputation)
    }

    /// Nudges `id`'s reputation by `delta`, clamped to `[0.0, 1.0]`. A builder that is not
    /// registered is silently ignored: feedback can race a builder's own deregistration and the
    /// coordinator has no standing to fail a round over it.
    pub fn adjust_reputation(&self, id: &str, delta: f64) {
        if let Some(builder) = self.builders.write().get_mut(id) {
            builder.reputation = (builder.reputation + delta).clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BuilderRegistry {
        BuilderRegistry::new(&Config::default())
    }

    fn pubkey(byte: u8) -> PublicKeyBytes {
        PublicKeyBytes([byte; 48])
    }

    const MIN_STAKE: Gwei = 32_000_000_000;

    #[test]
    fn register_rejects_empty_id() {
        let registry = registry();
        assert_eq!(
            registry.register(String::new(), pubkey(1), MIN_STAKE, 0, 4),
            Err(RegistryError::InvalidPubkey)
        );
    }

    #[test]
    fn register_rejects_zero_pubkey() {
        let registry = registry();
        assert_eq!(
            registry.register("b1".into(), PublicKeyBytes::zero(), MIN_STAKE, 0, 4),
            Err(RegistryError::InvalidPubkey)
        );
    }

    #[test]
    fn register_rejects_insufficient_stake() {
        let registry = registry();
        assert_eq!(
            registry.register("b1".into(), pubkey(1), MIN_STAKE - 1, 0, 4),
            Err(RegistryError::InsufficientStake)
        );
    }

    #[test]
    fn register_rejects_duplicate_id() {
        let registry = registry();
        registry.register("b1".into(), pubkey(1), MIN_STAKE, 0, 4).unwrap();
        assert_eq!(
            registry.register("b1".into(), pubkey(2), MIN_STAKE, 0, 4),
            Err(RegistryError::BuilderExists)
        );
    }

    #[test]
    fn register_rejects_beyond_max_builders() {
        let mut config = Config::default();
        config.coordinator_max_builders = 1;
        let registry = BuilderRegistry::new(&config);
        registry.register("b1".into(), pubkey(1), MIN_STAKE, 0, 4).unwrap();
        assert_eq!(
            registry.register("b2".into(), pubkey(2), MIN_STAKE, 0, 4),
            Err(RegistryError::MaxBuilders)
        );
    }

    #[test]
    fn adjust_reputation_clamps_to_unit_interval() {
        let registry = registry();
        registry.register("b1".into(), pubkey(1), MIN_STAKE, 0, 4).unwrap();
        registry.adjust_reputation("b1", 10.0);
        assert_eq!(registry.reputation_of("b1"), Some(1.0));
        registry.adjust_reputation("b1", -10.0);
        assert_eq!(registry.reputation_of("b1"), Some(0.0));
    }

    #[test]
    fn adjust_reputation_on_unknown_builder_is_a_no_op() {
        let registry = registry();
        registry.adjust_reputation("ghost", 0.5);
        assert_eq!(registry.reputation_of("ghost"), None);
    }
}
