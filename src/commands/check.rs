//! Check command implementation.
//!
//! Validates system requirements and configuration.

use lru_gen_driver::lru_gen::{parse_ledger, CommandPort, LruGenFile};
use lru_gen_driver::{CycleDriver, DriverConfig};

use crate::config::{validate_effective_config, Config};
use crate::startup_checks::validate_requirements;

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 lru-gen-driver - System Check");
    println!("================================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    let driver_cfg: Option<DriverConfig> = match validate_effective_config(config)
        .and_then(|_| config.to_driver_config())
    {
        Ok(cfg) => {
            println!("   ✅ Configuration is valid");
            Some(cfg)
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
            None
        }
    };

    if let Some(cfg) = driver_cfg {
        println!("\n🔐 Checking kernel interfaces...");
        match validate_requirements(&cfg) {
            Ok(()) => println!("   ✅ Interfaces accessible"),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }

        println!("\n📄 Scanning page flag table...");
        match CycleDriver::from_config(&cfg).snapshot() {
            Ok(report) => println!(
                "   ✅ {} pages classified ({} without a backing frame)",
                report.pages_scanned, report.pages_skipped
            ),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }

        println!("\n📊 Parsing generation ledger...");
        let mut port = LruGenFile::new(&cfg.lru_gen_path);
        match port.read_all() {
            Ok(text) => match parse_ledger(&text) {
                Ok(ledger) => println!("   ✅ {} memcgs in ledger", ledger.len()),
                Err(e) => {
                    println!("   ❌ {}", e);
                    all_ok = false;
                }
            },
            Err(e) => {
                println!("   ❌ Cannot read {}: {}", cfg.lru_gen_path.display(), e);
                all_ok = false;
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
