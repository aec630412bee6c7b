//! CLI arguments and subcommands for lru-gen-driver.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "lru-gen-driver",
    about = "Userspace driver for the multi-generational LRU",
    long_about = "Userspace driver for the multi-generational LRU.\n\n\
                  Classifies physical memory from /proc/kpageflags, reports contiguous \
                  reclaimable regions, and periodically evicts the oldest generation and \
                  ages every memory cgroup through the lru_gen debugfs interface.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port for /metrics and /health
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Disable the HTTP status server
    #[arg(long)]
    pub disable_http: bool,

    /// Log level (default: config file value, then info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Print only the loaded user config file + full path and exit
    #[arg(long)]
    pub show_user_config: bool,

    /// Output format for --show-config*
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Path of the page flag table
    #[arg(long)]
    pub kpageflags: Option<PathBuf>,

    /// Path of the lru_gen interface
    #[arg(long)]
    pub lru_gen: Option<PathBuf>,

    /// Seconds to sleep between cycles
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Page size in bytes (default: system page size)
    #[arg(long)]
    pub page_size: Option<u64>,

    /// Contiguity window in bytes
    #[arg(long)]
    pub reclaim_unit_bytes: Option<u64>,

    /// Page flag bit layout (canonical or legacy)
    #[arg(long)]
    pub flag_layout: Option<String>,

    /// Log directives instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify physical memory once and print totals
    Scan {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Print the generation ledger and the directives a cycle would issue
    Ledger {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Run exactly one reclaim/age cycle
    Cycle {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Check runtime requirements and permissions
    CheckRequirements,

    /// Generate a synthetic flag table and ledger
    GenerateTestdata {
        /// Output directory
        #[arg(short = 'o', long, default_value = "testdata")]
        output: PathBuf,

        /// Number of physical pages in the flag table
        #[arg(long, default_value_t = 65536)]
        pages: usize,

        /// Number of non-root memcgs in the ledger
        #[arg(long, default_value_t = 6)]
        memcgs: usize,
    },
}
