//! Startup requirement validation for lru-gen-driver.
//!
//! This module validates that the driver has the permissions and kernel
//! interfaces it needs before the first cycle runs.

use lru_gen_driver::DriverConfig;
use nix::unistd::geteuid;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Sysfs switch of the multi-generational LRU.
pub const LRU_GEN_ENABLED_PATH: &str = "/sys/kernel/mm/lru_gen/enabled";

/// Validate all runtime requirements
pub fn validate_requirements(cfg: &DriverConfig) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    check_flag_table_access(&cfg.kpageflags_path)?;
    check_lru_gen_interface(&cfg.lru_gen_path)?;
    check_lru_gen_enabled(Path::new(LRU_GEN_ENABLED_PATH));

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - the flag table and lru_gen are root-only");
        warn!("   Recommendation: Run as root or grant CAP_SYS_ADMIN");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

/// Check that the page flag table can be opened
fn check_flag_table_access(path: &Path) -> Result<(), ValidationError> {
    match fs::File::open(path) {
        Ok(_) => {
            info!("✅ Flag table readable: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!("❌ Cannot read {} - insufficient permissions", path.display());
            Err(ValidationError::InsufficientPermissions(format!(
                "{}: {}",
                path.display(),
                e
            )))
        }
        Err(e) => {
            error!("❌ Cannot open {}: {}", path.display(), e);
            Err(ValidationError::FlagTableUnavailable(format!(
                "{}: {}",
                path.display(),
                e
            )))
        }
    }
}

/// Check that the lru_gen command interface exists
fn check_lru_gen_interface(path: &Path) -> Result<(), ValidationError> {
    if path.exists() {
        info!("✅ lru_gen interface present: {}", path.display());
        return Ok(());
    }

    error!("❌ {} not found", path.display());
    error!("   Solutions:");
    error!("   1. Mount debugfs: mount -t debugfs none /sys/kernel/debug");
    error!("   2. Use a kernel built with CONFIG_LRU_GEN");
    Err(ValidationError::LruGenMissing(path.display().to_string()))
}

/// Warn when the multi-generational LRU is switched off
fn check_lru_gen_enabled(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match parse_enabled_mask(&content) {
            Some(0) => {
                warn!("⚠️  Multi-generational LRU is disabled ({})", path.display());
                warn!("   Solution: echo y > {}", path.display());
            }
            Some(mask) => info!("✅ Multi-generational LRU enabled (mask {:#06x})", mask),
            None => warn!(
                "⚠️  Unrecognised content in {}: {:?}",
                path.display(),
                content.trim()
            ),
        },
        Err(e) => debug!("Could not read {}: {}", path.display(), e),
    }
}

/// Parses the hex capability mask, e.g. `0x0007`.
pub fn parse_enabled_mask(content: &str) -> Option<u32> {
    let trimmed = content.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u32::from_str_radix(digits, 16).ok()
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Page flag table unavailable: {0}")]
    FlagTableUnavailable(String),

    #[error("lru_gen interface not found at {0}")]
    LruGenMissing(String),
}
