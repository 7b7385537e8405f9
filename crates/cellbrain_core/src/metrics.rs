//! Tick metrics and logging setup.

use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Tick counters for a driver loop.
#[derive(Debug, Clone)]
pub struct Metrics {
    tick_count: u64,
    total_tick_time: Duration,
    last_tick_time: Duration,
    log_interval: u64,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Metrics {
    /// Logs a summary every `log_interval` ticks; 0 disables the summary.
    #[must_use]
    pub fn new(log_interval: u64) -> Self {
        Self {
            tick_count: 0,
            total_tick_time: Duration::ZERO,
            last_tick_time: Duration::ZERO,
            log_interval,
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick with its duration.
    pub fn record_tick(&mut self, duration: Duration, automata: usize) {
        self.tick_count += 1;
        self.total_tick_time += duration;
        self.last_tick_time = duration;

        if self.log_interval > 0 && self.tick_count % self.log_interval == 0 {
            info!(
                tick = self.tick_count,
                automata,
                duration_us = duration.as_micros() as u64,
                mean_us = self.mean_tick_time().as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    #[must_use]
    pub fn last_tick_time(&self) -> Duration {
        self.last_tick_time
    }

    #[must_use]
    pub fn total_tick_time(&self) -> Duration {
        self.total_tick_time
    }

    #[must_use]
    pub fn mean_tick_time(&self) -> Duration {
        if self.tick_count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_tick_time.as_nanos() / u128::from(self.tick_count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Time since the metrics were created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Installs a fmt subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
}
