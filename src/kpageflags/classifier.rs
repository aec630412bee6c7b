//! Sequential classification of a whole page flag table.

use ahash::AHashMap as HashMap;
use serde::{Serialize, Serializer};
use std::io::{self, BufReader, ErrorKind, Read};
use tracing::{debug, trace};

use super::category::Category;
use super::decoder::{CompoundState, Decoded, PageFlagDecoder};
use super::flags::KPageFlags;
use super::source::RECORD_SIZE;

/// Read buffer size for flag tables.
const READ_BUFFER_KB: usize = 256;

/// Byte totals per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTotals {
    bytes: HashMap<Category, u64>,
}

impl CategoryTotals {
    pub fn add(&mut self, category: Category, bytes: u64) {
        *self.bytes.entry(category).or_insert(0) += bytes;
    }

    pub fn get(&self, category: Category) -> u64 {
        self.bytes.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.bytes.values().sum()
    }

    /// Non-zero totals in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        Category::ALL
            .into_iter()
            .filter_map(|c| self.bytes.get(&c).map(|&b| (c, b)))
    }
}

impl Serialize for CategoryTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(c, b)| (c.as_str(), b)))
    }
}

/// Result of one full scan.
#[derive(Debug, Clone, Default)]
pub struct ClassifierSnapshot {
    pub totals: CategoryTotals,
    /// Categories of all non-skipped pages in physical order. Skipped pages
    /// are absent, so positions are not physical page indices.
    pub sequence: Vec<Category>,
    pub records_read: u64,
    pub records_skipped: u64,
}

/// Drives a [`PageFlagDecoder`] over a flag record stream.
#[derive(Debug, Clone)]
pub struct PageClassifier {
    decoder: PageFlagDecoder,
    page_size: u64,
}

impl PageClassifier {
    pub fn new(decoder: PageFlagDecoder, page_size: u64) -> Self {
        Self { decoder, page_size }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Classifies every record until end of stream.
    ///
    /// A final record shorter than 8 bytes ends the scan like a clean EOF.
    pub fn scan<R: Read>(&self, reader: R) -> io::Result<ClassifierSnapshot> {
        let mut reader = BufReader::with_capacity(READ_BUFFER_KB * 1024, reader);
        let mut snapshot = ClassifierSnapshot::default();
        let mut state = CompoundState::default();
        let mut record = [0u8; RECORD_SIZE];

        loop {
            match reader.read_exact(&mut record) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            snapshot.records_read += 1;

            let flags = KPageFlags::from_le_bytes(record);
            let (decoded, next) = self.decoder.decode(flags, state);
            state = next;

            match decoded {
                Decoded::Page(category) => {
                    if category == Category::UnknownFlags {
                        trace!(
                            "Page {} has unknown flags {}",
                            snapshot.records_read - 1,
                            flags
                        );
                    }
                    snapshot.totals.add(category, self.page_size);
                    snapshot.sequence.push(category);
                }
                Decoded::Skipped => snapshot.records_skipped += 1,
            }
        }

        debug!(
            "Classified {} pages ({} skipped, {} bytes)",
            snapshot.records_read,
            snapshot.records_skipped,
            snapshot.totals.total()
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpageflags::flags::{
        KPF_ANON, KPF_BUDDY, KPF_COMPOUND_HEAD, KPF_COMPOUND_TAIL, KPF_LRU, KPF_NOPAGE, KPF_SLAB,
    };
    use crate::kpageflags::source::encode_records;

    fn classifier() -> PageClassifier {
        PageClassifier::new(PageFlagDecoder::default(), 4096)
    }

    #[test]
    fn test_scan_totals_and_sequence() {
        let words = [
            1 << KPF_BUDDY,
            1 << KPF_LRU,
            1 << KPF_NOPAGE,
            (1 << KPF_ANON) | (1 << KPF_LRU),
            0,
        ];
        let snap = classifier().scan(&encode_records(&words)[..]).unwrap();

        assert_eq!(
            snap.sequence,
            vec![Category::Free, Category::File, Category::Anon, Category::Unknown]
        );
        assert_eq!(snap.records_read, 5);
        assert_eq!(snap.records_skipped, 1);
        assert_eq!(snap.totals.get(Category::Free), 4096);
        assert_eq!(snap.totals.get(Category::Anon), 4096);
        assert_eq!(snap.totals.get(Category::Slab), 0);
        assert_eq!(snap.totals.total(), 4 * 4096);
    }

    #[test]
    fn test_truncated_record_ends_scan() {
        let mut bytes = encode_records(&[1 << KPF_LRU, 1 << KPF_LRU]);
        bytes.extend_from_slice(&[0xff, 0xff, 0xff]);
        let snap = classifier().scan(&bytes[..]).unwrap();
        assert_eq!(snap.records_read, 2);
        assert_eq!(snap.totals.get(Category::File), 2 * 4096);
    }

    #[test]
    fn test_empty_stream() {
        let snap = classifier().scan(std::io::empty()).unwrap();
        assert!(snap.sequence.is_empty());
        assert_eq!(snap.totals.total(), 0);
    }

    #[test]
    fn test_compound_triple_in_stream() {
        let words = [
            (1 << KPF_COMPOUND_HEAD) | (1 << KPF_SLAB),
            1 << KPF_COMPOUND_TAIL,
            1 << KPF_COMPOUND_TAIL,
            1 << KPF_BUDDY,
        ];
        let snap = classifier().scan(&encode_records(&words)[..]).unwrap();
        assert_eq!(
            snap.sequence,
            vec![Category::Slab, Category::Slab, Category::Slab, Category::Free]
        );
    }

    #[test]
    fn test_totals_serialize_in_order() {
        let mut totals = CategoryTotals::default();
        totals.add(Category::Slab, 8192);
        totals.add(Category::Free, 4096);
        let json = serde_json::to_string(&totals).unwrap();
        assert_eq!(json, r#"{"free":4096,"slab":8192}"#);
    }
}
