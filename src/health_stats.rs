//! Health statistics for the driver.
//!
//! Tracks cycle timing, scan sizes, directive outcomes and error counts
//! for the `/health` endpoint.

use lru_gen_driver::{CycleReport, DriverError};
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::Instant;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Driver health statistics.
pub struct HealthStats {
    // Cycle performance
    pub cycle_duration_seconds: Stat,
    pub pages_scanned: Stat,
    pub memcgs_seen: Stat,
    pub total_cycles: AtomicU64,
    pub cycle_success_count: AtomicU64,
    pub cycle_failure_count: AtomicU64,

    // Directives
    pub directives_issued: AtomicU64,
    pub directive_write_failures: AtomicU64,

    // Error tracking
    pub flag_table_errors: AtomicU64,
    pub ledger_errors: AtomicU64,
    pub port_errors: AtomicU64,

    // HTTP
    pub metrics_endpoint_calls: AtomicU64,

    // Timing
    pub start_time: Instant,
    pub last_cycle_time: StdRwLock<Option<Instant>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            cycle_duration_seconds: Stat::default(),
            pages_scanned: Stat::default(),
            memcgs_seen: Stat::default(),
            total_cycles: AtomicU64::new(0),
            cycle_success_count: AtomicU64::new(0),
            cycle_failure_count: AtomicU64::new(0),
            directives_issued: AtomicU64::new(0),
            directive_write_failures: AtomicU64::new(0),
            flag_table_errors: AtomicU64::new(0),
            ledger_errors: AtomicU64::new(0),
            port_errors: AtomicU64::new(0),
            metrics_endpoint_calls: AtomicU64::new(0),
            start_time: Instant::now(),
            last_cycle_time: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_cycle(&self, result: &Result<CycleReport, DriverError>) {
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_cycle_time.write() {
            *guard = Some(Instant::now());
        }

        match result {
            Ok(report) => {
                self.cycle_success_count.fetch_add(1, Ordering::Relaxed);
                self.cycle_duration_seconds
                    .add_sample(report.duration_seconds);
                if let Some(after) = &report.after {
                    self.pages_scanned.add_sample(after.pages_scanned as f64);
                }
                self.flag_table_errors
                    .fetch_add(report.snapshot_errors.len() as u64, Ordering::Relaxed);
                self.memcgs_seen.add_sample(report.controller.memcgs as f64);

                let passes = [&report.controller.reclaim, &report.controller.age];
                let issued: usize = passes.iter().map(|p| p.issued_count()).sum();
                let failed: usize = passes.iter().map(|p| p.failed_count()).sum();
                self.directives_issued
                    .fetch_add(issued as u64, Ordering::Relaxed);
                self.directive_write_failures
                    .fetch_add(failed as u64, Ordering::Relaxed);
            }
            Err(e) => {
                self.cycle_failure_count.fetch_add(1, Ordering::Relaxed);
                let counter = match e {
                    DriverError::FlagTable { .. } => &self.flag_table_errors,
                    DriverError::Ledger(_) => &self.ledger_errors,
                    DriverError::Port(_) => &self.port_errors,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_metrics_endpoint_call(&self) {
        self.metrics_endpoint_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_cycle_success_rate(&self) -> f64 {
        let success = self.cycle_success_count.load(Ordering::Relaxed);
        let failure = self.cycle_failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_cycle_age_str(&self) -> String {
        match self.last_cycle_time.read() {
            Ok(guard) => match *guard {
                Some(last) => format!("{}s ago", last.elapsed().as_secs()),
                None => "N/A".to_string(),
            },
            Err(_) => "N/A".to_string(),
        }
    }

    pub fn render_table(&self) -> String {
        let left_col = 26usize;
        let col_w = 12usize;
        let mut out = String::new();

        let row = |out: &mut String, name: &str, stat: &Stat, precision: usize| {
            let (cur, avg, max, min, _) = stat.snapshot();
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                format!("{:.p$}", cur, p = precision),
                format!("{:.p$}", avg, p = precision.max(1)),
                format!("{:.p$}", max, p = precision),
                format!("{:.p$}", min, p = precision),
                left = left_col,
                col = col_w
            )
            .ok();
        };
        let counter = |out: &mut String, name: &str, value: String| {
            writeln!(out, "{:left$} | {:^col$}", name, value, left = left_col, col = col_w).ok();
        };

        writeln!(out, "HEALTH ENDPOINT - DRIVER INTERNAL STATS").ok();
        writeln!(out, "========================================").ok();
        writeln!(out).ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "CYCLE PERFORMANCE").ok();
        writeln!(out, "-----------------").ok();
        row(&mut out, "cycle_duration (s)", &self.cycle_duration_seconds, 3);
        row(&mut out, "pages_scanned", &self.pages_scanned, 0);
        row(&mut out, "memcgs", &self.memcgs_seen, 0);

        writeln!(out).ok();
        writeln!(out, "COUNTERS").ok();
        writeln!(out, "--------").ok();
        counter(
            &mut out,
            "total_cycles",
            self.total_cycles.load(Ordering::Relaxed).to_string(),
        );
        counter(
            &mut out,
            "cycle_success_rate (%)",
            format!("{:.1}", self.get_cycle_success_rate()),
        );
        counter(
            &mut out,
            "directives_issued",
            self.directives_issued.load(Ordering::Relaxed).to_string(),
        );
        counter(
            &mut out,
            "directive_write_failures",
            self.directive_write_failures.load(Ordering::Relaxed).to_string(),
        );
        counter(
            &mut out,
            "flag_table_errors",
            self.flag_table_errors.load(Ordering::Relaxed).to_string(),
        );
        counter(
            &mut out,
            "ledger_errors",
            self.ledger_errors.load(Ordering::Relaxed).to_string(),
        );
        counter(
            &mut out,
            "port_errors",
            self.port_errors.load(Ordering::Relaxed).to_string(),
        );
        counter(
            &mut out,
            "metrics_endpoint_calls",
            self.metrics_endpoint_calls.load(Ordering::Relaxed).to_string(),
        );

        writeln!(out).ok();
        writeln!(out, "uptime: {}s", self.get_uptime_seconds()).ok();
        writeln!(out, "last cycle: {}", self.get_last_cycle_age_str()).ok();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lru_gen_driver::LedgerError;

    #[test]
    fn test_running_stat() {
        let mut stat = RunningStat::default();
        stat.add(2.0);
        stat.add(4.0);
        stat.add(0.0);
        assert_eq!(stat.count, 3);
        assert_eq!(stat.min, 0.0);
        assert_eq!(stat.max, 4.0);
        assert_eq!(stat.last, 0.0);
        assert!((stat.avg() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failure_counters() {
        let stats = HealthStats::new();
        let err: Result<CycleReport, DriverError> =
            Err(DriverError::Ledger(LedgerError::OrphanGeneration { line_no: 1 }));
        stats.record_cycle(&err);

        assert_eq!(stats.cycle_failure_count.load(Ordering::Relaxed), 1);
        assert_eq!(stats.ledger_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.get_cycle_success_rate(), 0.0);
        assert_ne!(stats.get_last_cycle_age_str(), "N/A");
    }

    #[test]
    fn test_render_table_sections() {
        let stats = HealthStats::new();
        let table = stats.render_table();
        assert!(table.contains("CYCLE PERFORMANCE"));
        assert!(table.contains("cycle_success_rate (%)"));
        assert!(table.contains("last cycle: N/A"));
    }
}
