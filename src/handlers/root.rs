//! Root endpoint handler for the landing page.

use axum::{extract::State, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;

    let cfg = &state.config;
    let mut out = String::new();
    writeln!(out, "lru-gen-driver {version}").ok();
    writeln!(out, "uptime: {}h {}m {}s", hours, minutes, seconds).ok();
    writeln!(out).ok();
    writeln!(out, "ENDPOINTS").ok();
    writeln!(out, "  /metrics  Prometheus metrics").ok();
    writeln!(out, "  /health   Driver health (503 until a cycle succeeds)").ok();
    writeln!(out, "  /report   JSON report of the last cycle").ok();
    writeln!(out).ok();
    writeln!(out, "SETTINGS").ok();
    if let Some(path) = &cfg.kpageflags_path {
        writeln!(out, "  kpageflags: {}", path.display()).ok();
    }
    if let Some(path) = &cfg.lru_gen_path {
        writeln!(out, "  lru_gen:    {}", path.display()).ok();
    }
    if let Some(interval) = cfg.interval_seconds {
        writeln!(out, "  interval:   {}s", interval).ok();
    }
    if cfg.dry_run.unwrap_or(false) {
        writeln!(out, "  dry-run:    directives are logged, not written").ok();
    }

    ([("Content-Type", "text/plain; charset=utf-8")], out)
}
