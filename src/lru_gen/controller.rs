//! Reclaim/age policy over the generation ledger.
//!
//! Each cycle evicts the oldest generation of every memcg holding more than
//! two generations, then asks every memcg for one new generation. Eviction
//! must be applied before aging: aging a memcg at full generation capacity
//! makes the kernel drop a generation on its own, leaving one generation
//! fewer than intended.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::directive::{DirectiveKind, ReclaimDirective};
use super::ledger::{parse_ledger, Ledger};
use super::port::CommandPort;
use crate::error::{DriverError, PortError};

/// Memcgs with at most this many generations are never evicted from.
pub const MIN_GENERATIONS_KEPT: usize = 2;
/// Eviction touches file pages only.
pub const RECLAIM_SWAPPINESS: u8 = 0;
/// Aging skips anon pages.
pub const AGE_CAN_SWAP: u8 = 0;
/// Aging may skip page tables via the kernel's bloom filter.
pub const AGE_FORCE_SCAN: u8 = 0;

/// A directive whose write failed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedDirective {
    pub directive: ReclaimDirective,
    pub error: String,
}

/// Result of one pass over the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub kind: DirectiveKind,
    pub issued: Vec<ReclaimDirective>,
    pub failed: Vec<FailedDirective>,
}

impl PassOutcome {
    fn new(kind: DirectiveKind) -> Self {
        Self {
            kind,
            issued: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Both passes of one cycle, in issue order.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerOutcome {
    pub memcgs: usize,
    pub reclaim: PassOutcome,
    pub age: PassOutcome,
}

/// Builds and issues directives for a single NUMA node.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReclaimController {
    node_id: u32,
}

impl ReclaimController {
    pub fn new(node_id: u32) -> Self {
        Self { node_id }
    }

    /// Eviction directives: oldest generation of each non-root memcg with
    /// more than [`MIN_GENERATIONS_KEPT`] generations.
    pub fn plan_reclaim(&self, ledger: &Ledger) -> Vec<ReclaimDirective> {
        ledger
            .entries()
            .iter()
            .filter(|entry| !entry.is_root())
            .filter_map(|entry| {
                let stats = entry.stats()?;
                (stats.gen_count > MIN_GENERATIONS_KEPT).then(|| {
                    ReclaimDirective::reclaim(
                        entry.cgroup_id.as_str(),
                        self.node_id,
                        stats.min_gen,
                        RECLAIM_SWAPPINESS,
                    )
                })
            })
            .collect()
    }

    /// Aging directives: youngest generation of each non-root memcg.
    pub fn plan_age(&self, ledger: &Ledger) -> Vec<ReclaimDirective> {
        ledger
            .entries()
            .iter()
            .filter(|entry| !entry.is_root())
            .filter_map(|entry| match entry.stats() {
                Some(stats) => Some(ReclaimDirective::age(
                    entry.cgroup_id.as_str(),
                    self.node_id,
                    stats.max_gen,
                    AGE_CAN_SWAP,
                    AGE_FORCE_SCAN,
                )),
                None => {
                    debug!("memcg {} has no generations, not aging", entry.cgroup_id);
                    None
                }
            })
            .collect()
    }

    pub fn reclaim_pass<P: CommandPort>(&self, port: &mut P, ledger: &Ledger) -> PassOutcome {
        issue(port, DirectiveKind::Reclaim, self.plan_reclaim(ledger))
    }

    pub fn age_pass<P: CommandPort>(&self, port: &mut P, ledger: &Ledger) -> PassOutcome {
        issue(port, DirectiveKind::Age, self.plan_age(ledger))
    }

    /// Reads and parses the ledger.
    pub fn read_ledger<P: CommandPort>(&self, port: &mut P) -> Result<Ledger, DriverError> {
        let text = port.read_all().map_err(PortError::Read)?;
        Ok(parse_ledger(&text)?)
    }

    /// Reads the ledger once, then runs the reclaim pass to completion
    /// followed by the age pass.
    ///
    /// A read or parse failure aborts before any directive is written.
    #[instrument(skip(self, port))]
    pub fn run<P: CommandPort>(&self, port: &mut P) -> Result<ControllerOutcome, DriverError> {
        let ledger = self.read_ledger(port)?;
        let reclaim = self.reclaim_pass(port, &ledger);
        let age = self.age_pass(port, &ledger);

        info!(
            "lru_gen: {} memcgs, reclaim {}/{} ok, age {}/{} ok",
            ledger.len(),
            reclaim.issued_count(),
            reclaim.issued_count() + reclaim.failed_count(),
            age.issued_count(),
            age.issued_count() + age.failed_count()
        );

        Ok(ControllerOutcome {
            memcgs: ledger.len(),
            reclaim,
            age,
        })
    }
}

/// Writes every directive; a failing memcg is logged and skipped.
fn issue<P: CommandPort>(
    port: &mut P,
    kind: DirectiveKind,
    directives: Vec<ReclaimDirective>,
) -> PassOutcome {
    let mut outcome = PassOutcome::new(kind);

    for directive in directives {
        let line = directive.to_line();
        match port.write_line(&line) {
            Ok(()) => {
                debug!("Issued {} directive '{}'", kind, line);
                outcome.issued.push(directive);
            }
            Err(source) => {
                let err = PortError::Write {
                    cgroup_id: directive.cgroup_id.clone(),
                    source,
                };
                warn!("Skipping {} directive '{}': {}", kind, line, err);
                outcome.failed.push(FailedDirective {
                    directive,
                    error: err.to_string(),
                });
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lru_gen::port::{MemoryPort, PortEvent};

    const LEDGER: &str = "\
memcg     0
 node     0
          0       9000          0        100
          1       4000          0         50
          2       1000          0         50
memcg     5 /a
 node     0
          2        100         10         20
          3         50          5         15
          4         10          2          8
memcg     3 /b
 node     0
          7        300          1          1
          8        100          1          1
";

    #[test]
    fn test_plan_reclaim_skips_small_and_root() {
        let ledger = parse_ledger(LEDGER).unwrap();
        let lines: Vec<String> = ReclaimController::new(0)
            .plan_reclaim(&ledger)
            .iter()
            .map(|d| d.to_line())
            .collect();
        assert_eq!(lines, vec!["- 5 0 2 0"]);
    }

    #[test]
    fn test_plan_age_skips_root() {
        let ledger = parse_ledger(LEDGER).unwrap();
        let lines: Vec<String> = ReclaimController::new(0)
            .plan_age(&ledger)
            .iter()
            .map(|d| d.to_line())
            .collect();
        assert_eq!(lines, vec!["+ 5 0 4 0 0", "+ 3 0 8 0 0"]);
    }

    #[test]
    fn test_run_orders_reclaim_before_age() {
        let mut port = MemoryPort::new(LEDGER);
        let outcome = ReclaimController::new(0).run(&mut port).unwrap();

        assert_eq!(outcome.memcgs, 3);
        assert_eq!(
            port.events(),
            &[
                PortEvent::Read,
                PortEvent::Write("- 5 0 2 0".into()),
                PortEvent::Write("+ 5 0 4 0 0".into()),
                PortEvent::Write("+ 3 0 8 0 0".into()),
            ]
        );
    }

    #[test]
    fn test_write_failure_continues_pass() {
        let mut port = MemoryPort::new(LEDGER).fail_cgroup("5");
        let outcome = ReclaimController::new(0).run(&mut port).unwrap();

        assert_eq!(outcome.reclaim.failed_count(), 1);
        assert_eq!(outcome.age.failed_count(), 1);
        assert_eq!(outcome.age.issued_count(), 1);
        assert_eq!(port.written(), vec!["+ 3 0 8 0 0"]);
    }

    #[test]
    fn test_parse_failure_writes_nothing() {
        let mut port = MemoryPort::new("memcg 5\n 1 2 3\n");
        let err = ReclaimController::new(0).run(&mut port).unwrap_err();
        assert!(matches!(err, DriverError::Ledger(_)));
        assert!(port.written().is_empty());
    }

    #[test]
    fn test_read_failure() {
        let mut port = MemoryPort::new(LEDGER).fail_reads();
        let err = ReclaimController::new(0).run(&mut port).unwrap_err();
        assert!(matches!(err, DriverError::Port(PortError::Read(_))));
    }
}
