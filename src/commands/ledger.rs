//! Ledger command implementation.
//!
//! Reads the generation ledger once and prints it together with the
//! directives the next cycle would issue. Nothing is written.

use lru_gen_driver::lru_gen::{
    parse_ledger, CommandPort, Ledger, LruGenFile, ReclaimController, ReclaimDirective,
};
use lru_gen_driver::DriverConfig;
use serde::Serialize;
use std::fmt::Write as FmtWrite;

use crate::cli::ReportFormat;

#[derive(Serialize)]
struct LedgerView<'a> {
    ledger: &'a Ledger,
    reclaim: Vec<ReclaimDirective>,
    age: Vec<ReclaimDirective>,
}

/// Prints the ledger and planned directives.
pub fn command_ledger(
    cfg: &DriverConfig,
    format: ReportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut port = LruGenFile::new(&cfg.lru_gen_path);
    let ledger = parse_ledger(&port.read_all()?)?;

    let controller = ReclaimController::new(cfg.node_id);
    let view = LedgerView {
        reclaim: controller.plan_reclaim(&ledger),
        age: controller.plan_age(&ledger),
        ledger: &ledger,
    };

    match format {
        ReportFormat::Text => print!("{}", render_text(&view)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
    }
    Ok(())
}

fn render_text(view: &LedgerView<'_>) -> String {
    let mut out = String::new();
    for entry in view.ledger.entries() {
        let path = entry.path.as_deref().unwrap_or("-");
        let _ = match entry.stats() {
            Some(stats) => writeln!(
                out,
                "memcg {:>6} {:30} gens {}..{} ({}), anon {} pages, file {} pages",
                entry.cgroup_id,
                path,
                stats.min_gen,
                stats.max_gen,
                stats.gen_count,
                entry.total_anon_pages(),
                entry.total_file_pages()
            ),
            None => writeln!(out, "memcg {:>6} {:30} no generations", entry.cgroup_id, path),
        };
    }

    writeln!(out).ok();
    writeln!(out, "planned directives:").ok();
    for directive in view.reclaim.iter().chain(&view.age) {
        writeln!(out, "  {}", directive).ok();
    }
    out
}
