//! Distributed block-builder coordinator: builder registry, per-slot fragment submission and
//! gas-constrained greedy assembly, and reputation feedback (component C10).

mod registry;
mod round;

pub use registry::{Builder, BuilderRegistry, RegistryError};
pub use round::{Assembly, BuilderCoordinator, Fragment, RoundError};
