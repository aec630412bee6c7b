//! Snapshot and before/after reporting.
//!
//! Reports are plain data consumed by logging, the CLI and the metrics
//! exporter. Human rendering uses MiB like the kernel's own tooling.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt::Write as FmtWrite;

use crate::contiguity::{ContiguityAggregator, ContiguitySummary};
use crate::kpageflags::{Category, CategoryTotals, ClassifierSnapshot};
use crate::lru_gen::ControllerOutcome;

const MIB: f64 = 1024.0 * 1024.0;

/// Totals of one classifier scan.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub taken_at: DateTime<Utc>,
    pub page_size: u64,
    pub pages_scanned: u64,
    pub pages_skipped: u64,
    pub totals: CategoryTotals,
    pub contiguity: ContiguitySummary,
}

impl SnapshotReport {
    pub fn new(
        snapshot: &ClassifierSnapshot,
        page_size: u64,
        aggregator: &ContiguityAggregator,
    ) -> Self {
        Self {
            taken_at: Utc::now(),
            page_size,
            pages_scanned: snapshot.records_read,
            pages_skipped: snapshot.records_skipped,
            totals: snapshot.totals.clone(),
            contiguity: aggregator.aggregate(&snapshot.sequence, &snapshot.totals),
        }
    }

    /// Renders raw and contiguous totals in MiB.
    pub fn render_text(&self, window_bytes: u64) -> String {
        let mut out = String::new();
        for (category, bytes) in self.totals.iter() {
            let _ = writeln!(out, "{}: {} MiB", category, bytes as f64 / MIB);
        }
        let _ = writeln!(out, "---");
        let _ = writeln!(out, "total: {} MiB", self.totals.total() as f64 / MIB);
        let _ = writeln!(out);
        let _ = writeln!(out, "CONTIGUOUS {}K (FREEABLE):", window_bytes / 1024);
        for (name, bytes) in self.contiguity.entries() {
            let _ = writeln!(out, "{}: {} MiB", name, bytes as f64 / MIB);
        }
        out
    }
}

/// Signed change of every total between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDelta {
    pub categories: Vec<(Category, i64)>,
    pub contiguity: Vec<(&'static str, i64)>,
}

impl SnapshotDelta {
    pub fn between(before: &SnapshotReport, after: &SnapshotReport) -> Self {
        let categories = Category::ALL
            .into_iter()
            .filter(|&c| before.totals.get(c) != 0 || after.totals.get(c) != 0)
            .map(|c| (c, signed_diff(before.totals.get(c), after.totals.get(c))))
            .collect();

        let contiguity = before
            .contiguity
            .entries()
            .into_iter()
            .zip(after.contiguity.entries())
            .map(|((name, b), (_, a))| (name, signed_diff(b, a)))
            .collect();

        Self {
            categories,
            contiguity,
        }
    }

    pub fn category(&self, category: Category) -> i64 {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, d)| *d)
            .unwrap_or(0)
    }
}

fn signed_diff(before: u64, after: u64) -> i64 {
    after as i64 - before as i64
}

#[derive(Serialize)]
struct DeltaView<'a> {
    #[serde(serialize_with = "serialize_category_pairs")]
    categories: &'a [(Category, i64)],
    #[serde(serialize_with = "serialize_named_pairs")]
    contiguity: &'a [(&'static str, i64)],
}

fn serialize_category_pairs<S: Serializer>(
    pairs: &&[(Category, i64)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(pairs.iter().map(|(c, d)| (c.as_str(), d)))
}

fn serialize_named_pairs<S: Serializer>(
    pairs: &&[(&'static str, i64)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(pairs.iter().map(|(n, d)| (n, d)))
}

impl Serialize for SnapshotDelta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DeltaView {
            categories: &self.categories,
            contiguity: &self.contiguity,
        }
        .serialize(serializer)
    }
}

/// Everything one driver cycle produced.
///
/// A snapshot that could not be taken is `None` and its error is listed in
/// `snapshot_errors`; the controller outcome is kept either way.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub before: Option<SnapshotReport>,
    pub after: Option<SnapshotReport>,
    pub delta: Option<SnapshotDelta>,
    pub snapshot_errors: Vec<String>,
    pub controller: ControllerOutcome,
    pub duration_seconds: f64,
}

impl CycleReport {
    /// True when both snapshots were taken.
    pub fn is_complete(&self) -> bool {
        self.snapshot_errors.is_empty()
    }

    /// Renders the per-category and contiguity deltas in MiB.
    pub fn render_delta_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "cycle {} ({:.2}s):", self.cycle, self.duration_seconds);
        if let Some(delta) = &self.delta {
            for (category, d) in &delta.categories {
                let _ = writeln!(out, "  {}: {:+.2} MiB", category, *d as f64 / MIB);
            }
            for (name, d) in &delta.contiguity {
                let _ = writeln!(out, "  contiguous {}: {:+.2} MiB", name, *d as f64 / MIB);
            }
        }
        for error in &self.snapshot_errors {
            let _ = writeln!(out, "  snapshot failed: {}", error);
        }
        let _ = writeln!(
            out,
            "  directives: {} reclaim ({} failed), {} age ({} failed)",
            self.controller.reclaim.issued_count(),
            self.controller.reclaim.failed_count(),
            self.controller.age.issued_count(),
            self.controller.age.failed_count()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(free: u64, file: u64, contiguous_free: u64) -> SnapshotReport {
        let mut totals = CategoryTotals::default();
        totals.add(Category::Free, free);
        totals.add(Category::File, file);
        SnapshotReport {
            taken_at: Utc::now(),
            page_size: 4096,
            pages_scanned: 0,
            pages_skipped: 0,
            totals,
            contiguity: ContiguitySummary {
                free: contiguous_free,
                ..ContiguitySummary::default()
            },
        }
    }

    #[test]
    fn test_delta_between() {
        let before = report(4096, 8192, 0);
        let after = report(16384, 4096, 16384);
        let delta = SnapshotDelta::between(&before, &after);

        assert_eq!(delta.category(Category::Free), 12288);
        assert_eq!(delta.category(Category::File), -4096);
        assert_eq!(delta.category(Category::Slab), 0);
        assert_eq!(delta.contiguity[0], ("free", 16384));
        assert_eq!(delta.contiguity.len(), 5);
    }

    #[test]
    fn test_delta_serializes_as_maps() {
        let delta = SnapshotDelta::between(&report(0, 4096, 0), &report(0, 0, 0));
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json["categories"]["file"], -4096);
        assert_eq!(json["contiguity"]["free | file"], 0);
    }

    #[test]
    fn test_render_text_lists_categories() {
        let text = report(1024 * 1024, 2 * 1024 * 1024, 0).render_text(16384);
        assert!(text.contains("free: 1 MiB"));
        assert!(text.contains("file: 2 MiB"));
        assert!(text.contains("total: 3 MiB"));
        assert!(text.contains("CONTIGUOUS 16K (FREEABLE):"));
        assert!(text.contains("non-contig free + file: 0 MiB"));
    }
}
