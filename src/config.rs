//! Configuration management for lru-gen-driver.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use clap::ValueEnum;
use lru_gen_driver::kpageflags::{FlagLayout, PAGE_SIZE};
use lru_gen_driver::lru_gen::DEFAULT_LRU_GEN_PATH;
use lru_gen_driver::settings::{
    DEFAULT_INTERVAL_SECONDS, DEFAULT_KPAGEFLAGS_PATH, DEFAULT_RECLAIM_UNIT_BYTES,
};
use lru_gen_driver::DriverConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9216;

/// Default config file locations, tried in order
const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "/etc/lru-gen-driver/config.yaml",
    "/etc/lru-gen-driver/config.yml",
    "./lru-gen-driver.yaml",
    "./lru-gen-driver.yml",
];

/// Merged configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,
    #[serde(alias = "enable-http")]
    pub enable_http: Option<bool>,

    // Kernel interfaces
    #[serde(alias = "kpageflags-path")]
    pub kpageflags_path: Option<PathBuf>,
    #[serde(alias = "lru-gen-path")]
    pub lru_gen_path: Option<PathBuf>,
    #[serde(alias = "flag-layout")]
    pub flag_layout: Option<String>,
    #[serde(alias = "node-id")]
    pub node_id: Option<u32>,

    // Sizing
    #[serde(alias = "page-size")]
    pub page_size: Option<u64>,
    #[serde(alias = "reclaim-unit-bytes")]
    pub reclaim_unit_bytes: Option<u64>,

    // Scheduling
    #[serde(alias = "interval-seconds")]
    pub interval_seconds: Option<u64>,
    #[serde(alias = "dry-run")]
    pub dry_run: Option<bool>,

    // Logging
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            enable_http: Some(true),
            kpageflags_path: Some(PathBuf::from(DEFAULT_KPAGEFLAGS_PATH)),
            lru_gen_path: Some(PathBuf::from(DEFAULT_LRU_GEN_PATH)),
            flag_layout: Some(FlagLayout::default().as_str().to_string()),
            node_id: Some(0),
            page_size: Some(*PAGE_SIZE),
            reclaim_unit_bytes: Some(DEFAULT_RECLAIM_UNIT_BYTES),
            interval_seconds: Some(DEFAULT_INTERVAL_SECONDS),
            dry_run: Some(false),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    /// Builds the driver settings, falling back to defaults for unset fields.
    pub fn to_driver_config(&self) -> Result<DriverConfig, Box<dyn std::error::Error>> {
        let defaults = DriverConfig::default();
        let flag_layout = match self.flag_layout.as_deref() {
            Some(layout) => layout.parse::<FlagLayout>()?,
            None => defaults.flag_layout,
        };

        Ok(DriverConfig {
            kpageflags_path: self
                .kpageflags_path
                .clone()
                .unwrap_or(defaults.kpageflags_path),
            lru_gen_path: self.lru_gen_path.clone().unwrap_or(defaults.lru_gen_path),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            reclaim_unit_bytes: self
                .reclaim_unit_bytes
                .unwrap_or(defaults.reclaim_unit_bytes),
            interval_seconds: self.interval_seconds.unwrap_or(defaults.interval_seconds),
            flag_layout,
            node_id: self.node_id.unwrap_or(defaults.node_id),
            dry_run: self.dry_run.unwrap_or(defaults.dry_run),
        })
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let page_size = cfg.page_size.unwrap_or(*PAGE_SIZE);
    if page_size == 0 || !page_size.is_power_of_two() {
        return Err(format!("page_size must be a nonzero power of two, got {}", page_size).into());
    }

    let reclaim_unit = cfg.reclaim_unit_bytes.unwrap_or(DEFAULT_RECLAIM_UNIT_BYTES);
    if reclaim_unit == 0 || reclaim_unit % page_size != 0 {
        return Err(format!(
            "reclaim_unit_bytes ({}) must be a nonzero multiple of page_size ({})",
            reclaim_unit, page_size
        )
        .into());
    }

    if cfg.interval_seconds == Some(0) {
        return Err("interval_seconds must be greater than zero".into());
    }

    if let Some(layout) = cfg.flag_layout.as_deref() {
        layout.parse::<FlagLayout>()?;
    }

    // Directives always target node 0
    if let Some(node_id) = cfg.node_id.filter(|&id| id != 0) {
        return Err(format!("node_id must be 0, got {}", node_id).into());
    }

    if cfg.enable_http.unwrap_or(true) && cfg.port == Some(0) {
        return Err("port must be nonzero when the HTTP server is enabled".into());
    }

    if let Some(level) = cfg.log_level.as_deref() {
        LogLevel::from_str(level, true)
            .map_err(|_| format!("Invalid log_level '{}'", level))?;
    }

    if let Some(bind) = cfg.bind.as_deref() {
        bind.parse::<std::net::IpAddr>()
            .map_err(|e| format!("Invalid bind address '{}': {}", bind, e))?;
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if args.disable_http {
        config.enable_http = Some(false);
    }

    if let Some(path) = &args.kpageflags {
        config.kpageflags_path = Some(path.clone());
    }
    if let Some(path) = &args.lru_gen {
        config.lru_gen_path = Some(path.clone());
    }
    if let Some(layout) = &args.flag_layout {
        config.flag_layout = Some(layout.clone());
    }

    if let Some(page_size) = args.page_size {
        config.page_size = Some(page_size);
    }
    if let Some(bytes) = args.reclaim_unit_bytes {
        config.reclaim_unit_bytes = Some(bytes);
    }
    if let Some(interval) = args.interval {
        config.interval_seconds = Some(interval);
    }
    if args.dry_run {
        config.dry_run = Some(true);
    }

    Ok(config)
}

/// Loads a config file; without an explicit path the default locations are tried.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(found) => PathBuf::from(found),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)?;
    let config = parse_config(&content, &path)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config text, choosing the format from the file extension.
fn parse_config(content: &str, path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    // Missing keys fall back to defaults
    let partial: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(merge_defaults(partial))
}

fn merge_defaults(partial: Config) -> Config {
    let d = Config::default();
    Config {
        port: partial.port.or(d.port),
        bind: partial.bind.or(d.bind),
        enable_http: partial.enable_http.or(d.enable_http),
        kpageflags_path: partial.kpageflags_path.or(d.kpageflags_path),
        lru_gen_path: partial.lru_gen_path.or(d.lru_gen_path),
        flag_layout: partial.flag_layout.or(d.flag_layout),
        node_id: partial.node_id.or(d.node_id),
        page_size: partial.page_size.or(d.page_size),
        reclaim_unit_bytes: partial.reclaim_unit_bytes.or(d.reclaim_unit_bytes),
        interval_seconds: partial.interval_seconds.or(d.interval_seconds),
        dry_run: partial.dry_run.or(d.dry_run),
        log_level: partial.log_level.or(d.log_level),
    }
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(
    config: &Config,
    format: ConfigFormat,
    user_config: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = render_config(config, &format)?;

    if user_config {
        println!("User configuration (effective values):");
    }
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config {
            page_size: Some(4096),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sizes() {
        let cfg = Config {
            page_size: Some(3000),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            page_size: Some(4096),
            reclaim_unit_bytes: Some(10000),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval_and_unknown_layout() {
        let cfg = Config {
            page_size: Some(4096),
            interval_seconds: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            page_size: Some(4096),
            flag_layout: Some("v9".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let cfg = Config {
            page_size: Some(4096),
            log_level: Some("verbose".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_nonzero_node_id() {
        let mut cfg = Config {
            page_size: Some(4096),
            node_id: Some(1),
            ..Config::default()
        };
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("node_id must be 0"));
        cfg.node_id = Some(0);
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_zero_port_allowed_without_http() {
        let mut cfg = Config {
            page_size: Some(4096),
            port: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
        cfg.enable_http = Some(false);
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_load_yaml_file_merges_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "interval_seconds: 5\nflag_layout: legacy").unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.interval_seconds, Some(5));
        assert_eq!(cfg.flag_layout.as_deref(), Some("legacy"));
        assert_eq!(cfg.port, Some(DEFAULT_PORT));
    }

    #[test]
    fn test_load_toml_and_json() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "reclaim_unit_bytes = 32768").unwrap();
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.reclaim_unit_bytes, Some(32768));

        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"dry-run": true}}"#).unwrap();
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.dry_run, Some(true));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/lru-gen-driver.yaml"))).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "interval_seconds: 5\nport: 9000").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let args = Args::parse_from([
            "lru-gen-driver",
            "--config",
            path.as_str(),
            "--interval",
            "60",
            "--dry-run",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.interval_seconds, Some(60));
        assert_eq!(cfg.port, Some(9000));
        assert_eq!(cfg.dry_run, Some(true));
    }

    #[test]
    fn test_to_driver_config() {
        let cfg = Config {
            page_size: Some(4096),
            reclaim_unit_bytes: Some(65536),
            flag_layout: Some("legacy".into()),
            ..Config::default()
        };
        let driver = cfg.to_driver_config().unwrap();
        assert_eq!(driver.window_pages(), 16);
        assert_eq!(driver.flag_layout, FlagLayout::Legacy);
        assert_eq!(driver.kpageflags_path, PathBuf::from(DEFAULT_KPAGEFLAGS_PATH));
    }
}
