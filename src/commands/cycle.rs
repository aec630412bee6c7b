//! Cycle command implementation.
//!
//! Runs exactly one reclaim/age cycle against the configured interfaces.

use lru_gen_driver::{CycleDriver, DriverConfig};

use crate::cli::ReportFormat;

/// Runs one cycle and prints its report.
pub fn command_cycle(
    cfg: &DriverConfig,
    format: ReportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.dry_run {
        println!("🧪 Dry run: directives are logged, not written");
    }

    let mut driver = CycleDriver::from_config(cfg);
    let report = driver.run_cycle()?;

    match format {
        ReportFormat::Text => {
            for (title, snapshot) in [("BEFORE", &report.before), ("AFTER", &report.after)] {
                println!("{}", title);
                match snapshot {
                    Some(s) => print!("{}", s.render_text(cfg.reclaim_unit_bytes)),
                    None => println!("(page flag table unavailable)"),
                }
                println!();
            }
            print!("{}", report.render_delta_text());
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
