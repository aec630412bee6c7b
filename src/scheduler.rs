//! Periodic scheduling with an explicit stop signal.
//!
//! The driver loop asks a [`Ticker`] whether to run another cycle. The stop
//! signal is only observed between cycles, so a cycle in progress always
//! completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Shared flag requesting the driver loop to end.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Decides when the next cycle starts.
pub trait Ticker {
    /// Blocks until the next cycle is due. Returns `false` once the loop
    /// should end instead.
    fn wait(&mut self, stop: &StopSignal) -> bool;
}

/// Fixed sleep between cycles, checked against the stop signal in slices.
#[derive(Debug, Clone)]
pub struct IntervalTicker {
    period: Duration,
    slice: Duration,
}

/// Granularity at which a sleeping ticker notices a stop request.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            slice: STOP_POLL_INTERVAL.min(period),
        }
    }
}

impl Ticker for IntervalTicker {
    fn wait(&mut self, stop: &StopSignal) -> bool {
        let deadline = Instant::now() + self.period;
        debug!("Sleeping {:?} until next cycle", self.period);

        loop {
            if stop.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(self.slice.min(deadline - now));
        }
    }
}

/// Allows a fixed number of further cycles without sleeping.
#[derive(Debug, Clone)]
pub struct FixedTicks {
    remaining: usize,
}

impl FixedTicks {
    pub fn new(ticks: usize) -> Self {
        Self { remaining: ticks }
    }
}

impl Ticker for FixedTicks {
    fn wait(&mut self, stop: &StopSignal) -> bool {
        if stop.is_stopped() || self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}
