//! Generate testdata command implementation.
//!
//! Writes a synthetic page flag table, a generation ledger and a JSON
//! manifest. Point `--kpageflags` and `--lru-gen` at the output to run the
//! driver without kernel support; directives then overwrite the ledger file.

use anyhow::{ensure, Context};
use chrono::Utc;
use lru_gen_driver::kpageflags::encode_records;
use lru_gen_driver::kpageflags::flags::{
    KPF_ANON, KPF_BUDDY, KPF_COMPOUND_HEAD, KPF_COMPOUND_TAIL, KPF_LRU, KPF_NOPAGE, KPF_PGTABLE,
    KPF_RESERVED, KPF_SLAB, KPF_SWAPBACKED,
};
use rand::Rng;
use serde::Serialize;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FLAG_TABLE_FILE: &str = "kpageflags.bin";
pub const LEDGER_FILE: &str = "lru_gen.txt";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Longest run of identically flagged pages.
const MAX_RUN_PAGES: usize = 64;
/// Most generations a synthetic memcg holds; the kernel keeps at most four.
const MAX_GENERATIONS: u64 = 4;

/// Description of a generated data set.
#[derive(Debug, Clone, Serialize)]
pub struct TestDataManifest {
    pub version: String,
    pub generated_at: String,
    pub pages: usize,
    pub memcgs: usize,
    pub flag_table: PathBuf,
    pub ledger: PathBuf,
}

/// Generates a synthetic flag table and ledger under `output`.
pub fn command_generate_testdata(
    output: PathBuf,
    pages: usize,
    memcgs: usize,
) -> anyhow::Result<()> {
    ensure!(pages > 0, "at least one page is required");

    fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let mut rng = rand::thread_rng();
    let words = generate_flag_words(&mut rng, pages);
    let ledger = generate_ledger(&mut rng, memcgs);

    let manifest = TestDataManifest {
        version: "1.0".to_string(),
        generated_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        pages: words.len(),
        memcgs,
        flag_table: output.join(FLAG_TABLE_FILE),
        ledger: output.join(LEDGER_FILE),
    };

    write_file(&manifest.flag_table, encode_records(&words))?;
    write_file(&manifest.ledger, ledger.into_bytes())?;
    write_file(
        &output.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&manifest)?.into_bytes(),
    )?;

    println!(
        "✅ Generated test data: {} pages, {} memcgs in {}",
        manifest.pages,
        memcgs,
        output.display()
    );
    println!(
        "   Run: lru-gen-driver --kpageflags {} --lru-gen {} --dry-run cycle",
        manifest.flag_table.display(),
        manifest.ledger.display()
    );
    Ok(())
}

fn write_file(path: &Path, content: Vec<u8>) -> anyhow::Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Generates `pages` flag words as runs of similar pages, including
/// compound slab pages and holes without a backing frame.
pub fn generate_flag_words(rng: &mut impl Rng, pages: usize) -> Vec<u64> {
    let mut words = Vec::with_capacity(pages);

    while words.len() < pages {
        let run = rng.gen_range(1..=MAX_RUN_PAGES).min(pages - words.len());
        match rng.gen_range(0..100) {
            0..=29 => words.extend(std::iter::repeat(1u64 << KPF_BUDDY).take(run)),
            30..=59 => words.extend(std::iter::repeat(1u64 << KPF_LRU).take(run)),
            60..=74 => words.extend(
                std::iter::repeat((1u64 << KPF_LRU) | (1 << KPF_ANON) | (1 << KPF_SWAPBACKED))
                    .take(run),
            ),
            75..=84 => {
                words.push((1u64 << KPF_SLAB) | (1 << KPF_COMPOUND_HEAD));
                words.extend(std::iter::repeat(1u64 << KPF_COMPOUND_TAIL).take(run - 1));
            }
            85..=89 => words.extend(std::iter::repeat(1u64 << KPF_PGTABLE).take(run)),
            90..=93 => words.extend(std::iter::repeat(1u64 << KPF_NOPAGE).take(run)),
            94..=96 => words.extend(std::iter::repeat(1u64 << KPF_RESERVED).take(run)),
            _ => words.extend(std::iter::repeat(0u64).take(run)),
        }
    }

    words
}

/// Generates a ledger with the root memcg followed by `memcgs` children.
pub fn generate_ledger(rng: &mut impl Rng, memcgs: usize) -> String {
    let mut out = String::new();
    let mut id = 1u64;

    for n in 0..=memcgs {
        let path = if n == 0 {
            "/".to_string()
        } else {
            format!("/test.slice/app-{}.service", n)
        };
        // Root is always listed as id 0
        let cgroup_id = if n == 0 { 0 } else { id };
        id += rng.gen_range(1..8);

        writeln!(out, "memcg {:5} {}", cgroup_id, path).ok();
        writeln!(out, " node {:5}", 0).ok();

        let count = rng.gen_range(1..=MAX_GENERATIONS);
        let min_gen = rng.gen_range(0..16u64);
        for generation in min_gen..min_gen + count {
            let age_ms = (min_gen + count - generation) * rng.gen_range(1000..60_000u64);
            writeln!(
                out,
                " {:10} {:10} {:10} {:10}",
                generation,
                age_ms,
                rng.gen_range(0..50_000u64),
                rng.gen_range(0..200_000u64)
            )
            .ok();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lru_gen_driver::lru_gen::{parse_ledger, ROOT_CGROUP_ID};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_flag_words_have_requested_length() {
        let mut rng = StdRng::seed_from_u64(7);
        for pages in [1, 5, 1000] {
            assert_eq!(generate_flag_words(&mut rng, pages).len(), pages);
        }
    }

    #[test]
    fn test_generated_ledger_parses() {
        let mut rng = StdRng::seed_from_u64(11);
        let ledger = parse_ledger(&generate_ledger(&mut rng, 6)).unwrap();

        assert_eq!(ledger.len(), 7);
        assert_eq!(ledger.entries()[0].cgroup_id, ROOT_CGROUP_ID);
        for entry in ledger.entries() {
            let stats = entry.stats().unwrap();
            assert!(stats.gen_count as u64 <= MAX_GENERATIONS);
        }
    }

    #[test]
    fn test_command_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        command_generate_testdata(dir.path().to_path_buf(), 256, 3).unwrap();

        let table = fs::read(dir.path().join(FLAG_TABLE_FILE)).unwrap();
        assert_eq!(table.len(), 256 * 8);
        assert!(dir.path().join(LEDGER_FILE).exists());

        let manifest: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(manifest["pages"], 256);
    }

    #[test]
    fn test_zero_pages_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(command_generate_testdata(dir.path().to_path_buf(), 0, 1).is_err());
    }
}
