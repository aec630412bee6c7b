//! Health check endpoint handler.
//!
//! Returns 200 while the most recent cycle succeeded with both page
//! snapshots, 503 before the first cycle and after a failed or partial one.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::{LastCycle, SharedState};

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let status = if state.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let message = match state.last_cycle.read().as_deref() {
        Ok(Some(LastCycle::Ok(report))) if report.is_complete() => {
            format!("OK - cycle {}", report.cycle)
        }
        Ok(Some(LastCycle::Ok(report))) => format!(
            "Cycle {} ran without page statistics: {}",
            report.cycle,
            report.snapshot_errors.join("; ")
        ),
        Ok(Some(LastCycle::Failed(e))) => format!("Last cycle failed: {}", e),
        Ok(None) => "No cycle completed yet".to_string(),
        Err(_) => "State unavailable".to_string(),
    };

    let uptime_str = format_uptime(state.health_stats.get_uptime_seconds());
    let table = state.health_stats.render_table();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("{message}\n\nUptime: {uptime_str}\n\n{table}"),
    )
}

fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(90), "1.5 minutes");
        assert_eq!(format_uptime(7200), "2.0 hours");
        assert_eq!(format_uptime(172800), "2.0 days");
    }
}
