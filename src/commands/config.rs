//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("lru-gen-driver.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# lru-gen-driver Configuration
# ============================
#
# Server Configuration
# --------------------
# bind: "127.0.0.1"            # Bind IP for /metrics and /health
# port: 9216                   # HTTP port
# enable_http: true            # Disable to run the driver loop only
#
# Kernel Interfaces
# -----------------
# kpageflags_path: /proc/kpageflags
# lru_gen_path: /sys/kernel/debug/lru_gen
# flag_layout: canonical       # canonical or legacy (no PGTABLE/RESERVED/MAPPEDTODISK)
# node_id: 0                   # NUMA node addressed by directives
#
# Sizing
# ------
# page_size: 4096              # Defaults to the system page size
# reclaim_unit_bytes: 16384    # Contiguity window, multiple of page_size
#
# Scheduling
# ----------
# interval_seconds: 30         # Sleep between cycles
# dry_run: false               # Log directives instead of writing them
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
