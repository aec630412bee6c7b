//! Scan command implementation.
//!
//! Classifies the page flag table once and prints totals.

use lru_gen_driver::kpageflags::PageFlagDecoder;
use lru_gen_driver::{CycleDriver, DriverConfig};

use crate::cli::ReportFormat;

/// Prints one classifier snapshot.
pub fn command_scan(
    cfg: &DriverConfig,
    format: ReportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = CycleDriver::from_config(cfg);
    let report = driver.snapshot()?;

    match format {
        ReportFormat::Text => {
            print!("{}", report.render_text(cfg.reclaim_unit_bytes));
            println!();
            println!(
                "pages: {} scanned, {} without a backing frame",
                report.pages_scanned, report.pages_skipped
            );
            println!(
                "layout: {} ({})",
                cfg.flag_layout.as_str(),
                PageFlagDecoder::new(cfg.flag_layout).rule_order()
            );
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
