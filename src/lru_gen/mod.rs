//! Multi-generational LRU control through the lru_gen interface.
//!
//! This module provides:
//! - `ledger`: parsing of the per-memcg generation table
//! - `directive`: aging/eviction commands and their wire format
//! - `port`: the read/write capability over the pseudo-file, plus test doubles
//! - `controller`: the fixed reclaim-then-age policy

pub mod controller;
pub mod directive;
pub mod ledger;
pub mod port;

// Re-export commonly used types
pub use controller::{ControllerOutcome, FailedDirective, PassOutcome, ReclaimController};
pub use directive::{DirectiveKind, DirectiveParams, ReclaimDirective};
pub use ledger::{
    parse_ledger, CgroupLedgerEntry, Generation, GenerationStats, Ledger, ROOT_CGROUP_ID,
};
pub use port::{
    BoxedPort, CommandPort, DryRunPort, LruGenFile, MemoryPort, PortEvent, DEFAULT_LRU_GEN_PATH,
};
