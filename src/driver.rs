//! The periodic driver cycle.
//!
//! One cycle takes a classifier snapshot, runs the reclaim pass and then the
//! age pass, takes a second snapshot and reports the difference. Cycles run
//! back to back on a single thread, separated by the [`Ticker`].
//!
//! Snapshots only feed the report. A flag table that cannot be scanned is
//! recorded in the [`CycleReport`] and never keeps the controller from running.

use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::contiguity::ContiguityAggregator;
use crate::error::DriverError;
use crate::kpageflags::{Category, FlagTable, KPageFlagsFile, PageClassifier, PageFlagDecoder};
use crate::lru_gen::{BoxedPort, CommandPort, DryRunPort, LruGenFile, ReclaimController};
use crate::report::{CycleReport, SnapshotDelta, SnapshotReport};
use crate::scheduler::{StopSignal, Ticker};
use crate::settings::DriverConfig;

/// Driver over a flag table `F` and a command port `P`.
pub struct CycleDriver<F, P> {
    table: F,
    port: P,
    classifier: PageClassifier,
    aggregator: ContiguityAggregator,
    controller: ReclaimController,
    cycles: u64,
}

impl CycleDriver<KPageFlagsFile, BoxedPort> {
    /// Builds a driver on the live kernel interfaces named in `cfg`.
    pub fn from_config(cfg: &DriverConfig) -> Self {
        let file = LruGenFile::new(&cfg.lru_gen_path);
        let port: BoxedPort = if cfg.dry_run {
            Box::new(DryRunPort::new(file))
        } else {
            Box::new(file)
        };
        Self::new(cfg, KPageFlagsFile::new(&cfg.kpageflags_path), port)
    }
}

impl<F: FlagTable, P: CommandPort> CycleDriver<F, P> {
    pub fn new(cfg: &DriverConfig, table: F, port: P) -> Self {
        Self {
            table,
            port,
            classifier: PageClassifier::new(PageFlagDecoder::new(cfg.flag_layout), cfg.page_size),
            aggregator: ContiguityAggregator::new(cfg.window_pages(), cfg.page_size),
            controller: ReclaimController::new(cfg.node_id),
            cycles: 0,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Scans the flag table once.
    pub fn snapshot(&self) -> Result<SnapshotReport, DriverError> {
        let scan = self
            .table
            .open()
            .and_then(|reader| self.classifier.scan(reader))
            .map_err(|source| DriverError::FlagTable {
                source_name: self.table.describe(),
                source,
            })?;
        Ok(SnapshotReport::new(
            &scan,
            self.classifier.page_size(),
            &self.aggregator,
        ))
    }

    fn snapshot_or_record(
        &self,
        phase: &str,
        errors: &mut Vec<String>,
    ) -> Option<SnapshotReport> {
        match self.snapshot() {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Cycle {}: {} snapshot failed: {}", self.cycles, phase, e);
                errors.push(format!("{}: {}", phase, e));
                None
            }
        }
    }

    /// Runs one complete cycle.
    #[instrument(skip(self))]
    pub fn run_cycle(&mut self) -> Result<CycleReport, DriverError> {
        self.cycles += 1;
        let start = Instant::now();

        let mut snapshot_errors = Vec::new();
        let before = self.snapshot_or_record("before", &mut snapshot_errors);
        let controller = self.controller.run(&mut self.port)?;
        let after = self.snapshot_or_record("after", &mut snapshot_errors);
        let delta = match (&before, &after) {
            (Some(b), Some(a)) => Some(SnapshotDelta::between(b, a)),
            _ => None,
        };

        Ok(CycleReport {
            cycle: self.cycles,
            before,
            after,
            delta,
            snapshot_errors,
            controller,
            duration_seconds: start.elapsed().as_secs_f64(),
        })
    }

    /// Runs cycles until `ticker` declines or `stop` is raised.
    ///
    /// Failed cycles are logged and handed to `on_cycle` like successful
    /// ones; the next cycle starts from fresh state either way.
    pub fn run<T, C>(&mut self, ticker: &mut T, stop: &StopSignal, mut on_cycle: C) -> u64
    where
        T: Ticker,
        C: FnMut(&Result<CycleReport, DriverError>),
    {
        let mut completed = 0;

        while !stop.is_stopped() {
            let result = self.run_cycle();
            match &result {
                Ok(report) => match &report.delta {
                    Some(delta) => info!(
                        "Cycle {} done in {:.2}s: free {:+} bytes, file {:+} bytes",
                        report.cycle,
                        report.duration_seconds,
                        delta.category(Category::Free),
                        delta.category(Category::File)
                    ),
                    None => warn!(
                        "Cycle {} done in {:.2}s without page statistics ({} snapshot errors)",
                        report.cycle,
                        report.duration_seconds,
                        report.snapshot_errors.len()
                    ),
                },
                Err(e) => error!("Cycle {} failed: {}", self.cycles, e),
            }
            on_cycle(&result);
            completed += 1;

            if !ticker.wait(stop) {
                break;
            }
        }

        info!("Driver loop stopped after {} cycles", completed);
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpageflags::flags::{KPF_BUDDY, KPF_LRU};
    use crate::kpageflags::InMemoryFlagTable;
    use crate::lru_gen::{MemoryPort, PortEvent};
    use crate::scheduler::FixedTicks;
    use std::cell::Cell;
    use std::io::{self, Cursor};

    /// Table that can be opened `ok_opens` times and fails afterwards.
    struct FlakyTable {
        inner: InMemoryFlagTable,
        ok_opens: Cell<usize>,
    }

    impl FlagTable for FlakyTable {
        type Reader = Cursor<Vec<u8>>;

        fn open(&self) -> io::Result<Self::Reader> {
            match self.ok_opens.get() {
                0 => Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
                n => {
                    self.ok_opens.set(n - 1);
                    self.inner.open()
                }
            }
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    fn cfg() -> DriverConfig {
        DriverConfig {
            page_size: 4096,
            ..DriverConfig::default()
        }
    }

    #[test]
    fn test_run_cycle() {
        let table = InMemoryFlagTable::from_words(&[1 << KPF_BUDDY; 4]);
        let port = MemoryPort::new("memcg 5\n 2 0 0 0\n 3 0 0 0\n 4 0 0 0\n");
        let mut driver = CycleDriver::new(&cfg(), table, port);

        let report = driver.run_cycle().unwrap();
        assert_eq!(report.cycle, 1);
        assert!(report.is_complete());
        assert_eq!(report.before.as_ref().unwrap().contiguity.free, 16384);
        assert_eq!(report.delta.as_ref().unwrap().category(Category::Free), 0);
        assert_eq!(
            driver.port().events(),
            &[
                PortEvent::Read,
                PortEvent::Write("- 5 0 2 0".into()),
                PortEvent::Write("+ 5 0 4 0 0".into()),
            ]
        );
    }

    #[test]
    fn test_after_snapshot_failure_keeps_controller_outcome() {
        let table = FlakyTable {
            inner: InMemoryFlagTable::from_words(&[1 << KPF_BUDDY; 4]),
            ok_opens: Cell::new(1),
        };
        let port = MemoryPort::new("memcg 5\n 2 0 0 0\n 3 0 0 0\n 4 0 0 0\n");
        let mut driver = CycleDriver::new(&cfg(), table, port);

        let report = driver.run_cycle().unwrap();
        assert!(report.before.is_some());
        assert!(report.after.is_none());
        assert!(report.delta.is_none());
        assert_eq!(report.snapshot_errors.len(), 1);
        assert!(report.snapshot_errors[0].starts_with("after: "));
        assert_eq!(report.controller.reclaim.issued_count(), 1);
        assert_eq!(report.controller.age.issued_count(), 1);
        assert_eq!(driver.port().written(), vec!["- 5 0 2 0", "+ 5 0 4 0 0"]);
    }

    #[test]
    fn test_run_continues_after_failure() {
        let table = InMemoryFlagTable::from_words(&[1 << KPF_LRU]);
        let port = MemoryPort::new("memcg 5\n garbage\n");
        let mut driver = CycleDriver::new(&cfg(), table, port);

        let mut results = Vec::new();
        let cycles = driver.run(&mut FixedTicks::new(2), &StopSignal::new(), |r| {
            results.push(r.is_ok())
        });

        assert_eq!(cycles, 3);
        assert_eq!(results, vec![false, false, false]);
        assert!(driver.port().written().is_empty());
    }

    #[test]
    fn test_run_honours_stop() {
        let stop = StopSignal::new();
        stop.stop();
        let mut driver = CycleDriver::new(
            &cfg(),
            InMemoryFlagTable::default(),
            MemoryPort::new(""),
        );
        assert_eq!(driver.run(&mut FixedTicks::new(10), &stop, |_| {}), 0);
        assert_eq!(driver.cycles(), 0);
    }
}
