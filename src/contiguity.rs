//! Contiguous reclaimable region statistics.
//!
//! The dense category sequence of a scan is cut into consecutive windows of
//! one reclaim unit each. A window counts as contiguous free/file memory when
//! every page in it has the respective category.

use serde::{Serialize, Serializer};

use crate::kpageflags::{Category, CategoryTotals};

/// Byte totals of uniformly reclaimable windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContiguitySummary {
    /// Windows made only of free pages.
    pub free: u64,
    /// Windows made only of file pages.
    pub file: u64,
    /// Windows made only of free or file pages (mixed allowed).
    pub free_or_file: u64,
    /// Raw free + file total of the scan, regardless of contiguity.
    pub non_contig_free_file: u64,
}

impl ContiguitySummary {
    /// Free-uniform plus file-uniform bytes.
    pub fn free_plus_file(&self) -> u64 {
        self.free + self.file
    }

    /// Named entries in reporting order.
    pub fn entries(&self) -> [(&'static str, u64); 5] {
        [
            ("free", self.free),
            ("file", self.file),
            ("free | file", self.free_or_file),
            ("free + file", self.free_plus_file()),
            ("non-contig free + file", self.non_contig_free_file),
        ]
    }
}

impl Serialize for ContiguitySummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries())
    }
}

/// Window-based aggregation over a classified page sequence.
#[derive(Debug, Clone, Copy)]
pub struct ContiguityAggregator {
    window_pages: usize,
    page_size: u64,
}

impl ContiguityAggregator {
    /// A zero window is treated as one page per window.
    pub fn new(window_pages: usize, page_size: u64) -> Self {
        Self {
            window_pages: window_pages.max(1),
            page_size,
        }
    }

    /// Builds the aggregator for a reclaim unit given in bytes.
    pub fn for_reclaim_unit(reclaim_unit_bytes: u64, page_size: u64) -> Self {
        let window = if page_size == 0 {
            1
        } else {
            (reclaim_unit_bytes / page_size) as usize
        };
        Self::new(window, page_size)
    }

    pub fn window_pages(&self) -> usize {
        self.window_pages
    }

    /// Aggregates `sequence`; the trailing window may be shorter and is
    /// counted over its own length.
    pub fn aggregate(&self, sequence: &[Category], totals: &CategoryTotals) -> ContiguitySummary {
        let mut summary = ContiguitySummary {
            non_contig_free_file: totals.get(Category::Free) + totals.get(Category::File),
            ..ContiguitySummary::default()
        };

        for window in sequence.chunks(self.window_pages) {
            let bytes = window.len() as u64 * self.page_size;
            if window.iter().all(|&c| c == Category::Free) {
                summary.free += bytes;
            }
            if window.iter().all(|&c| c == Category::File) {
                summary.file += bytes;
            }
            if window.iter().all(|c| c.is_reclaimable()) {
                summary.free_or_file += bytes;
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Category::{Anon, File, Free, Unknown};

    fn totals_of(sequence: &[Category], page_size: u64) -> CategoryTotals {
        let mut totals = CategoryTotals::default();
        for &c in sequence {
            totals.add(c, page_size);
        }
        totals
    }

    #[test]
    fn test_three_windows() {
        let seq = [
            Free, Free, Free, Free, File, File, File, File, Free, Unknown, Free, Free,
        ];
        let agg = ContiguityAggregator::new(4, 4096);
        let summary = agg.aggregate(&seq, &totals_of(&seq, 4096));

        assert_eq!(summary.free, 16384);
        assert_eq!(summary.file, 16384);
        assert_eq!(summary.free_or_file, 32768);
        assert_eq!(summary.free_plus_file(), 32768);
        assert_eq!(summary.non_contig_free_file, 11 * 4096);
    }

    #[test]
    fn test_mixed_reclaimable_window() {
        let seq = [Free, File, Free, File];
        let summary = ContiguityAggregator::new(4, 4096).aggregate(&seq, &totals_of(&seq, 4096));
        assert_eq!(summary.free, 0);
        assert_eq!(summary.file, 0);
        assert_eq!(summary.free_or_file, 16384);
    }

    #[test]
    fn test_short_trailing_window() {
        let seq = [Anon, Anon, Anon, Anon, Free, Free];
        let summary = ContiguityAggregator::new(4, 4096).aggregate(&seq, &totals_of(&seq, 4096));
        assert_eq!(summary.free, 2 * 4096);
        assert_eq!(summary.free_or_file, 2 * 4096);
    }

    #[test]
    fn test_empty_sequence() {
        let summary =
            ContiguityAggregator::new(4, 4096).aggregate(&[], &CategoryTotals::default());
        assert_eq!(summary, ContiguitySummary::default());
    }

    #[test]
    fn test_for_reclaim_unit() {
        assert_eq!(ContiguityAggregator::for_reclaim_unit(16384, 4096).window_pages(), 4);
        assert_eq!(ContiguityAggregator::for_reclaim_unit(16384, 16384).window_pages(), 1);
        assert_eq!(ContiguityAggregator::for_reclaim_unit(4096, 16384).window_pages(), 1);
    }

    #[test]
    fn test_summary_serializes_named_keys() {
        let summary = ContiguitySummary {
            free: 1,
            file: 2,
            free_or_file: 3,
            non_contig_free_file: 4,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            json,
            r#"{"free":1,"file":2,"free | file":3,"free + file":3,"non-contig free + file":4}"#
        );
    }
}
