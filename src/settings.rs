//! Runtime settings of the driver core.
//!
//! The binary builds a [`DriverConfig`] from its merged file/CLI
//! configuration; library users construct one directly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::kpageflags::{FlagLayout, PAGE_SIZE};
use crate::lru_gen::DEFAULT_LRU_GEN_PATH;

pub const DEFAULT_KPAGEFLAGS_PATH: &str = "/proc/kpageflags";
pub const DEFAULT_RECLAIM_UNIT_BYTES: u64 = 16384;
pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;

/// Settings for one driver instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub kpageflags_path: PathBuf,
    pub lru_gen_path: PathBuf,
    pub page_size: u64,
    /// Size of one contiguity window in bytes.
    pub reclaim_unit_bytes: u64,
    pub interval_seconds: u64,
    pub flag_layout: FlagLayout,
    pub node_id: u32,
    pub dry_run: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kpageflags_path: PathBuf::from(DEFAULT_KPAGEFLAGS_PATH),
            lru_gen_path: PathBuf::from(DEFAULT_LRU_GEN_PATH),
            page_size: *PAGE_SIZE,
            reclaim_unit_bytes: DEFAULT_RECLAIM_UNIT_BYTES,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            flag_layout: FlagLayout::default(),
            node_id: 0,
            dry_run: false,
        }
    }
}

impl DriverConfig {
    /// Pages per contiguity window (at least one).
    pub fn window_pages(&self) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        ((self.reclaim_unit_bytes / self.page_size) as usize).max(1)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_pages() {
        let mut cfg = DriverConfig {
            page_size: 4096,
            ..DriverConfig::default()
        };
        assert_eq!(cfg.window_pages(), 4);

        cfg.page_size = 16384;
        assert_eq!(cfg.window_pages(), 1);

        cfg.page_size = 0;
        assert_eq!(cfg.window_pages(), 1);
    }
}
