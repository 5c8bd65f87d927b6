//! Validator registry, balances, recent/historical root caches and the per-block state
//! transition (component C2 of the consensus core).

mod historical;
mod ring_buffer;
mod state;

pub use historical::{HistoricalStateCache, DEFAULT_HISTORICAL_ROOTS_LIMIT};
pub use ring_buffer::{RecentStateCache, DEFAULT_RECENT_STATE_CAPACITY};
pub use state::{compute_block_root, BeaconState, Block, StateError};
