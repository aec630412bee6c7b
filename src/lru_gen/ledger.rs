//! Parser for the per-memcg generation table of the multi-gen LRU.
//!
//! The kernel prints one section per memory cgroup:
//!
//! ```text
//! memcg     5 /system.slice
//!  node     0
//!           2        100         10         20
//!           3         50          5         15
//! ```
//!
//! Generation rows carry `gen age_ms anon_pages file_pages`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::LedgerError;

/// Cgroup id of the root memcg, never targeted by directives.
pub const ROOT_CGROUP_ID: &str = "0";

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^memcg\s+(\S+)(?:\s+(.*?))?\s*$").expect("header regex is valid")
});

static NODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s?node(?:\s|$)").expect("node regex is valid"));

/// One generation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub index: u64,
    pub age_ms: u64,
    pub anon_pages: u64,
    pub file_pages: u64,
}

/// Incidental per-cgroup statistics used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationStats {
    pub min_gen: u64,
    pub max_gen: u64,
    pub gen_count: usize,
}

/// All generations of one memcg, in ledger order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CgroupLedgerEntry {
    pub cgroup_id: String,
    /// Cgroup path printed after the id, if any.
    pub path: Option<String>,
    pub generations: Vec<Generation>,
}

impl CgroupLedgerEntry {
    pub fn new(cgroup_id: impl Into<String>) -> Self {
        Self {
            cgroup_id: cgroup_id.into(),
            path: None,
            generations: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.cgroup_id == ROOT_CGROUP_ID
    }

    /// `None` for a cgroup without generation rows.
    pub fn stats(&self) -> Option<GenerationStats> {
        let min_gen = self.generations.iter().map(|g| g.index).min()?;
        let max_gen = self.generations.iter().map(|g| g.index).max()?;
        Some(GenerationStats {
            min_gen,
            max_gen,
            gen_count: self.generations.len(),
        })
    }

    pub fn total_anon_pages(&self) -> u64 {
        self.generations.iter().map(|g| g.anon_pages).sum()
    }

    pub fn total_file_pages(&self) -> u64 {
        self.generations.iter().map(|g| g.file_pages).sum()
    }
}

/// Parsed generation table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ledger {
    entries: Vec<CgroupLedgerEntry>,
}

impl Ledger {
    pub fn from_entries(entries: Vec<CgroupLedgerEntry>) -> Self {
        Self { entries }
    }

    /// Cgroups in the order they first appeared.
    pub fn entries(&self) -> &[CgroupLedgerEntry] {
        &self.entries
    }

    pub fn get(&self, cgroup_id: &str) -> Option<&CgroupLedgerEntry> {
        self.entries.iter().find(|e| e.cgroup_id == cgroup_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn section(&mut self, cgroup_id: &str, path: Option<&str>) -> usize {
        if let Some(pos) = self.entries.iter().position(|e| e.cgroup_id == cgroup_id) {
            return pos;
        }
        let mut entry = CgroupLedgerEntry::new(cgroup_id);
        entry.path = path.map(str::to_string);
        self.entries.push(entry);
        self.entries.len() - 1
    }
}

/// Parses the full ledger text.
///
/// Any line that is neither a memcg header, a node line nor a row of exactly
/// four integers fails the whole parse.
pub fn parse_ledger(text: &str) -> Result<Ledger, LedgerError> {
    let mut ledger = Ledger::default();
    let mut current: Option<usize> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = HEADER_RE.captures(line) {
            let id = &caps[1];
            let path = caps.get(2).map(|m| m.as_str()).filter(|p| !p.is_empty());
            current = Some(ledger.section(id, path));
            continue;
        }

        if NODE_RE.is_match(line) {
            continue;
        }

        let generation = parse_generation(line, line_no)?;
        match current {
            Some(pos) => ledger.entries[pos].generations.push(generation),
            None => return Err(LedgerError::OrphanGeneration { line_no }),
        }
    }

    debug!("Parsed ledger with {} memcgs", ledger.len());
    Ok(ledger)
}

fn parse_generation(line: &str, line_no: usize) -> Result<Generation, LedgerError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(LedgerError::MalformedLine {
            line_no,
            line: line.to_string(),
        });
    }

    let parse = |field: &str| -> Result<u64, LedgerError> {
        field.parse().map_err(|_| LedgerError::InvalidNumber {
            line_no,
            field: field.to_string(),
        })
    };

    Ok(Generation {
        index: parse(fields[0])?,
        age_ms: parse(fields[1])?,
        anon_pages: parse(fields[2])?,
        file_pages: parse(fields[3])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
memcg     0
 node     0
          0       9000          0        100
          1       4000          0         50
memcg     5 /system.slice
 node     0
          2        100         10         20
          3         50          5         15
          4         10          2          8
memcg     3 /user.slice
 node     0
          7        300          1          1
          8        100          1          1
";

    #[test]
    fn test_parse_sample() {
        let ledger = parse_ledger(SAMPLE).unwrap();
        assert_eq!(ledger.len(), 3);

        let ids: Vec<&str> = ledger.entries().iter().map(|e| e.cgroup_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "5", "3"]);

        let five = ledger.get("5").unwrap();
        assert_eq!(five.path.as_deref(), Some("/system.slice"));
        assert_eq!(
            five.generations[0],
            Generation {
                index: 2,
                age_ms: 100,
                anon_pages: 10,
                file_pages: 20
            }
        );
        assert_eq!(
            five.stats(),
            Some(GenerationStats {
                min_gen: 2,
                max_gen: 4,
                gen_count: 3
            })
        );
        assert_eq!(five.total_file_pages(), 43);
        assert!(ledger.get("0").unwrap().is_root());
        assert!(ledger.get("0").unwrap().path.is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_ledger("").unwrap().is_empty());
        assert!(parse_ledger("\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_cgroup_without_generations() {
        let ledger = parse_ledger("memcg 9 /empty\n node 0\n").unwrap();
        assert_eq!(ledger.get("9").unwrap().stats(), None);
    }

    #[test]
    fn test_malformed_row() {
        let err = parse_ledger("memcg 5\n 1 2 3\n").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedLine { line_no: 2, .. }));

        let err = parse_ledger("memcg 5\n 1 2 3 4 5\n").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedLine { line_no: 2, .. }));
    }

    #[test]
    fn test_non_numeric_row() {
        let err = parse_ledger("memcg 5\n 1 2 x 4\n").unwrap_err();
        match err {
            LedgerError::InvalidNumber { line_no, field } => {
                assert_eq!(line_no, 2);
                assert_eq!(field, "x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_row_before_header() {
        let err = parse_ledger(" 1 2 3 4\nmemcg 5\n").unwrap_err();
        assert!(matches!(err, LedgerError::OrphanGeneration { line_no: 1 }));
    }

    #[test]
    fn test_repeated_header_appends() {
        let ledger = parse_ledger("memcg 5\n 1 0 0 0\nmemcg 6\n 3 0 0 0\nmemcg 5\n 2 0 0 0\n")
            .unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get("5").unwrap().generations.len(), 2);
    }
}
