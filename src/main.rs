//! lru-gen-driver - version 0.1.0
//!
//! Userspace driver for the multi-generational LRU with tracing logging.
//! This is the main entry point that starts the driver loop, the optional
//! status server, and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod health_stats;
mod metrics;
mod startup_checks;
mod state;

use axum::{routing::get, Router};
use clap::{Parser, ValueEnum};
use lru_gen_driver::{CycleDriver, IntervalTicker, StopSignal};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};

use cli::{Args, Commands, LogLevel};
use commands::{
    command_check, command_config, command_cycle, command_generate_testdata, command_ledger,
    command_scan,
};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{health_handler, metrics_handler, report_handler, root_handler};
use state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let level = match (&args.log_level, config.log_level.as_deref()) {
        (Some(level), _) => level.clone(),
        (None, Some(name)) => LogLevel::from_str(name, true)
            .map_err(|e| format!("Invalid log_level '{}': {}", name, e))?,
        (None, None) => LogLevel::Info,
    };

    let log_level = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    // Reports go to stdout, logs to stderr
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Binds the status server socket, or returns `None` when HTTP is disabled.
async fn bind_listener(
    config: &Config,
) -> Result<Option<TcpListener>, Box<dyn std::error::Error>> {
    if !config.enable_http.unwrap_or(true) {
        info!("HTTP server disabled");
        return Ok(None);
    }

    let bind: IpAddr = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR).parse()?;
    let addr = SocketAddr::new(bind, config.port.unwrap_or(DEFAULT_PORT));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind {}: {}", addr, e);
        e
    })?;
    info!("lru-gen-driver listening on http://{}", addr);
    Ok(Some(listener))
}

/// Runs the driver loop until a shutdown signal arrives.
async fn run_daemon(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let driver_cfg = config.to_driver_config()?;

    info!(
        "Starting lru-gen-driver: kpageflags={}, lru_gen={}, interval={}s",
        driver_cfg.kpageflags_path.display(),
        driver_cfg.lru_gen_path.display(),
        driver_cfg.interval_seconds
    );
    info!(
        "page_size={}, reclaim_unit={}B, layout={}, dry_run={}",
        driver_cfg.page_size,
        driver_cfg.reclaim_unit_bytes,
        driver_cfg.flag_layout.as_str(),
        driver_cfg.dry_run
    );

    if let Err(e) = startup_checks::validate_requirements(&driver_cfg) {
        warn!("⚠️  Requirement check failed: {} - continuing, cycles may fail", e);
    }

    let state: SharedState = Arc::new(AppState::new(config.clone())?);

    // Bind before the worker starts; a failed bind must not leave it running
    let listener = bind_listener(&config).await?;

    let stop = StopSignal::new();

    // Cycles block on file I/O; they run on a dedicated blocking thread.
    let worker = {
        let state = state.clone();
        let stop = stop.clone();
        tokio::task::spawn_blocking(move || {
            let mut driver = CycleDriver::from_config(&driver_cfg);
            let mut ticker = IntervalTicker::new(driver_cfg.interval());
            driver.run(&mut ticker, &stop, |result| state.record_cycle(result))
        })
    };

    let served = match listener {
        Some(listener) => {
            let app = Router::new()
                .route("/", get(root_handler))
                .route("/metrics", get(metrics_handler))
                .route("/health", get(health_handler))
                .route("/report", get(report_handler))
                .with_state(state.clone());

            let server_stop = stop.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    server_stop.stop();
                })
                .await
        }
        None => {
            shutdown_signal().await;
            Ok(())
        }
    };

    // The worker must always be stopped and joined, or runtime shutdown blocks on it
    stop.stop();
    info!("Waiting for the running cycle to finish");
    let cycles = worker.await?;
    info!("lru-gen-driver stopped gracefully after {} cycles", cycles);

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.show_user_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        if args.show_config {
            return show_config(&config, args.config_format, false);
        }

        if args.show_user_config {
            return show_config(&config, args.config_format, true);
        }
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        // Config and GenerateTestdata don't need config validation
        match command {
            Commands::Config {
                output,
                format,
                commented,
            } => return command_config(output.clone(), format.clone(), *commented),
            Commands::GenerateTestdata {
                output,
                pages,
                memcgs,
            } => return Ok(command_generate_testdata(output.clone(), *pages, *memcgs)?),
            _ => {
                // Other commands need config validation
            }
        }

        let config = load_validated_config(&args)?;
        setup_logging(&config, &args)?;
        let driver_cfg = config.to_driver_config()?;

        return match command {
            Commands::Scan { format } => command_scan(&driver_cfg, *format),
            Commands::Ledger { format } => command_ledger(&driver_cfg, *format),
            Commands::Cycle { format } => command_cycle(&driver_cfg, *format),
            Commands::CheckRequirements => command_check(&config),

            Commands::Config { .. } => unreachable!("Config handled above"),
            Commands::GenerateTestdata { .. } => unreachable!("GenerateTestdata handled above"),
        };
    }

    // Load configuration for daemon mode
    let config = load_validated_config(&args)?;
    setup_logging(&config, &args)?;
    run_daemon(config).await
}
