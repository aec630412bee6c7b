//! Application state shared by HTTP handlers and the driver thread.

use lru_gen_driver::{CycleReport, DriverError};
use prometheus::Registry;
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Instant;
use tracing::warn;

use crate::config::Config;
use crate::health_stats::HealthStats;
use crate::metrics::DriverMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Outcome of the most recent cycle.
#[derive(Debug, Clone)]
pub enum LastCycle {
    Ok(Box<CycleReport>),
    Failed(String),
}

/// Global application state.
pub struct AppState {
    pub registry: Registry,
    pub metrics: DriverMetrics,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    pub last_cycle: StdRwLock<Option<LastCycle>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();
        let metrics = DriverMetrics::new(&registry)?;
        Ok(Self {
            registry,
            metrics,
            config: Arc::new(config),
            health_stats: Arc::new(HealthStats::new()),
            last_cycle: StdRwLock::new(None),
            start_time: Instant::now(),
        })
    }

    /// Feeds one cycle result into metrics, health stats and the last-cycle slot.
    pub fn record_cycle(&self, result: &Result<CycleReport, DriverError>) {
        self.metrics.record_cycle(result);
        self.health_stats.record_cycle(result);

        let last = match result {
            Ok(report) => LastCycle::Ok(Box::new(report.clone())),
            Err(e) => LastCycle::Failed(e.to_string()),
        };
        match self.last_cycle.write() {
            Ok(mut guard) => *guard = Some(last),
            Err(e) => warn!("last_cycle lock poisoned: {}", e),
        }
    }

    /// True once a cycle has run and the latest one succeeded with both
    /// snapshots taken.
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.last_cycle.read().as_deref(),
            Ok(Some(LastCycle::Ok(report))) if report.is_complete()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lru_gen_driver::kpageflags::{InMemoryFlagTable, KPageFlagsFile};
    use lru_gen_driver::lru_gen::MemoryPort;
    use lru_gen_driver::{CycleDriver, DriverConfig, PortError};

    const LEDGER: &str = "memcg 5\n 2 0 0 0\n 3 0 0 0\n 4 0 0 0\n";

    #[test]
    fn test_health_follows_last_cycle() {
        let state = AppState::new(Config::default()).unwrap();
        assert!(!state.is_healthy());

        let err = Err(DriverError::Port(PortError::Read(std::io::Error::other(
            "gone",
        ))));
        state.record_cycle(&err);
        assert!(!state.is_healthy());
        assert!(matches!(
            state.last_cycle.read().unwrap().as_ref(),
            Some(LastCycle::Failed(msg)) if msg.contains("gone")
        ));
    }

    #[test]
    fn test_incomplete_cycle_is_unhealthy() {
        let state = AppState::new(Config::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut driver = CycleDriver::new(
            &DriverConfig::default(),
            KPageFlagsFile::new(dir.path().join("missing")),
            MemoryPort::new(LEDGER),
        );
        state.record_cycle(&driver.run_cycle());
        assert!(!state.is_healthy());
        assert_eq!(
            state.health_stats.flag_table_errors.load(std::sync::atomic::Ordering::Relaxed),
            2
        );

        let mut driver = CycleDriver::new(
            &DriverConfig::default(),
            InMemoryFlagTable::from_words(&[0; 4]),
            MemoryPort::new(LEDGER),
        );
        state.record_cycle(&driver.run_cycle());
        assert!(state.is_healthy());
    }
}
