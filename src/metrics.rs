//! Prometheus metrics definitions for lru-gen-driver.
//!
//! Page totals and contiguity gauges carry a `phase` label (`before` /
//! `after`) so a single scrape shows what the last cycle changed.

use lru_gen_driver::kpageflags::Category;
use lru_gen_driver::lru_gen::PassOutcome;
use lru_gen_driver::{CycleReport, DriverError, SnapshotReport};
use prometheus::{Counter, CounterVec, Gauge, GaugeVec, Opts, Registry};

/// Collection of driver metrics.
#[derive(Clone)]
pub struct DriverMetrics {
    // labels: category, phase
    pub page_bytes: GaugeVec,
    // labels: kind, phase
    pub contiguous_bytes: GaugeVec,
    // labels: kind, result
    pub directives_total: CounterVec,
    // labels: result
    pub cycles_total: CounterVec,
    pub snapshot_errors_total: Counter,
    pub cycle_duration_seconds: Gauge,
    pub memcgs: Gauge,
}

impl DriverMetrics {
    /// Creates and registers all Prometheus metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, Box<dyn std::error::Error>> {
        let page_bytes = GaugeVec::new(
            Opts::new(
                "lru_gen_driver_page_bytes",
                "Physical memory per page category in bytes",
            ),
            &["category", "phase"],
        )?;
        let contiguous_bytes = GaugeVec::new(
            Opts::new(
                "lru_gen_driver_contiguous_bytes",
                "Reclaimable memory in uniform reclaim-unit windows in bytes",
            ),
            &["kind", "phase"],
        )?;
        let directives_total = CounterVec::new(
            Opts::new(
                "lru_gen_driver_directives_total",
                "Directives written to lru_gen",
            ),
            &["kind", "result"],
        )?;
        let cycles_total = CounterVec::new(
            Opts::new("lru_gen_driver_cycles_total", "Completed driver cycles"),
            &["result"],
        )?;
        let snapshot_errors_total = Counter::new(
            "lru_gen_driver_snapshot_errors_total",
            "Page flag table scans that failed during a cycle",
        )?;
        let cycle_duration_seconds = Gauge::new(
            "lru_gen_driver_cycle_duration_seconds",
            "Duration of the last successful cycle in seconds",
        )?;
        let memcgs = Gauge::new(
            "lru_gen_driver_memcgs",
            "Memcgs in the last parsed generation ledger",
        )?;

        registry.register(Box::new(page_bytes.clone()))?;
        registry.register(Box::new(contiguous_bytes.clone()))?;
        registry.register(Box::new(directives_total.clone()))?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(snapshot_errors_total.clone()))?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;
        registry.register(Box::new(memcgs.clone()))?;

        Ok(Self {
            page_bytes,
            contiguous_bytes,
            directives_total,
            cycles_total,
            snapshot_errors_total,
            cycle_duration_seconds,
            memcgs,
        })
    }

    /// Updates all series from one cycle result.
    pub fn record_cycle(&self, result: &Result<CycleReport, DriverError>) {
        match result {
            Ok(report) => {
                self.cycles_total.with_label_values(&["ok"]).inc();
                self.cycle_duration_seconds.set(report.duration_seconds);
                self.memcgs.set(report.controller.memcgs as f64);
                self.snapshot_errors_total
                    .inc_by(report.snapshot_errors.len() as f64);
                if let Some(before) = &report.before {
                    self.record_snapshot(before, "before");
                }
                if let Some(after) = &report.after {
                    self.record_snapshot(after, "after");
                }
                self.record_pass(&report.controller.reclaim);
                self.record_pass(&report.controller.age);
            }
            Err(_) => self.cycles_total.with_label_values(&["error"]).inc(),
        }
    }

    pub fn record_snapshot(&self, snapshot: &SnapshotReport, phase: &str) {
        for category in Category::ALL {
            self.page_bytes
                .with_label_values(&[category.as_str(), phase])
                .set(snapshot.totals.get(category) as f64);
        }
        for (kind, bytes) in snapshot.contiguity.entries() {
            self.contiguous_bytes
                .with_label_values(&[kind, phase])
                .set(bytes as f64);
        }
    }

    fn record_pass(&self, pass: &PassOutcome) {
        let kind = pass.kind.as_str();
        self.directives_total
            .with_label_values(&[kind, "ok"])
            .inc_by(pass.issued_count() as f64);
        self.directives_total
            .with_label_values(&[kind, "error"])
            .inc_by(pass.failed_count() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lru_gen_driver::kpageflags::{InMemoryFlagTable, KPageFlagsFile};
    use lru_gen_driver::lru_gen::MemoryPort;
    use lru_gen_driver::{CycleDriver, DriverConfig};
    use prometheus::{Encoder, TextEncoder};

    fn encode(registry: &Registry) -> String {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_record_successful_cycle() {
        let registry = Registry::new();
        let metrics = DriverMetrics::new(&registry).unwrap();

        let cfg = DriverConfig {
            page_size: 4096,
            ..DriverConfig::default()
        };
        let table = InMemoryFlagTable::from_words(&[1 << 10; 4]);
        let port = MemoryPort::new("memcg 5\n 2 0 0 0\n 3 0 0 0\n 4 0 0 0\n");
        let mut driver = CycleDriver::new(&cfg, table, port);
        metrics.record_cycle(&driver.run_cycle());

        let text = encode(&registry);
        for line in [
            r#"lru_gen_driver_page_bytes{category="free",phase="after"} 16384"#,
            r#"lru_gen_driver_contiguous_bytes{kind="free",phase="before"} 16384"#,
            r#"lru_gen_driver_directives_total{kind="reclaim",result="ok"} 1"#,
            r#"lru_gen_driver_cycles_total{result="ok"} 1"#,
            "lru_gen_driver_snapshot_errors_total 0",
        ] {
            assert!(text.contains(line), "missing {line}");
        }
    }

    #[test]
    fn test_record_cycle_without_flag_table() {
        let registry = Registry::new();
        let metrics = DriverMetrics::new(&registry).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let table = KPageFlagsFile::new(dir.path().join("missing"));
        let port = MemoryPort::new("memcg 5\n 2 0 0 0\n 3 0 0 0\n 4 0 0 0\n");
        let mut driver = CycleDriver::new(&DriverConfig::default(), table, port);
        metrics.record_cycle(&driver.run_cycle());

        let text = encode(&registry);
        assert!(text.contains("lru_gen_driver_snapshot_errors_total 2"));
        assert!(text.contains(r#"lru_gen_driver_directives_total{kind="age",result="ok"} 1"#));
        assert!(!text.contains("lru_gen_driver_page_bytes{"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        assert!(DriverMetrics::new(&registry).is_ok());
        assert!(DriverMetrics::new(&registry).is_err());
    }
}
