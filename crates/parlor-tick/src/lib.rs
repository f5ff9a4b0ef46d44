//! Fixed-period tick scheduler for Parlor's continuous-motion games.
//!
//! Drives the simulation loop at a fixed period (100ms by default) with
//! overrun handling, budget monitoring, and pause/resume support. The
//! scheduler only keeps time — the driver task owns the loop:
//!
//! ```ignore
//! let mut scheduler = TickScheduler::new(TickConfig::with_period(period));
//! loop {
//!     scheduler.wait_for_tick().await;
//!     server.tick().await;
//!     scheduler.record_tick_end();
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

/// The default simulation period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires later than its scheduled deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Skip the missed tick(s) and reschedule from now.
    /// Safest default — a slow tick can never snowball into a backlog.
    #[default]
    Skip,

    /// Keep the original cadence regardless of the overrun; the next tick
    /// fires at its originally scheduled time.
    Drop,
}

/// Configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// The simulation period.
    pub period: Duration,

    /// Overrun handling policy.
    pub policy: TickPolicy,

    /// Fraction of the period (0.0–1.0) above which a tick's execution
    /// time draws a warning. Default: 0.80.
    pub budget_warn_threshold: f64,

    /// Random jitter (up to this much) added to the first tick, so
    /// several processes started at the same instant don't tick in
    /// lockstep.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            initial_jitter: Duration::from_millis(2),
        }
    }
}

impl TickConfig {
    /// Config for a specific period with default settings otherwise.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to run with.
    /// A zero period is forced up to the default.
    pub fn validated(mut self) -> Self {
        if self.period.is_zero() {
            warn!("tick period of zero is not runnable, using default");
            self.period = DEFAULT_PERIOD;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info and metrics
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// The fixed step for this tick (always the configured period).
    /// Simulation code should use this, not wall-clock elapsed time.
    pub dt: Duration,
    /// `true` if this tick fired noticeably late.
    pub overrun: bool,
    /// How many whole periods were skipped because of the overrun.
    pub ticks_skipped: u64,
}

/// Running metrics, updated on every tick.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Exponential moving average of tick execution time (alpha = 0.1).
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Last observed execution time as a fraction of the period.
    /// Greater than 1.0 means the tick blew its budget.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler. One per game process.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// When the next tick should fire.
    next_tick: TokioInstant,
    /// When the current tick's simulation work started; set by
    /// `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    paused: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let us = rand::rng().random_range(0..config.initial_jitter.as_micros() as u64);
            Duration::from_micros(us)
        };
        let next_tick = TokioInstant::now() + config.period + jitter;

        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick scheduler created"
        );

        Self {
            config,
            tick_count: 0,
            next_tick,
            tick_start: None,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    /// Waits until the next tick is due.
    ///
    /// While paused this future pends forever; a `tokio::select!` caller
    /// still makes progress on its other branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
            unreachable!()
        }

        time::sleep_until(self.next_tick).await;

        let now = TokioInstant::now();
        let period = self.config.period;
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        // >10% late counts as an overrun.
        let late_by = now.saturating_duration_since(self.next_tick);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                now + period
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, keeping original cadence"
                    );
                }
                self.next_tick + period
            }
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: period,
            overrun,
            ticks_skipped,
        }
    }

    /// Records that the simulation work for the current tick has finished,
    /// enabling budget warnings and timing metrics.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();

        let utilization = elapsed.as_secs_f64() / self.config.period.as_secs_f64();
        self.metrics.budget_utilization = utilization;
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.config.period.as_secs_f64() * 1000.0,
                "tick approaching budget limit"
            );
        }

        if elapsed > self.metrics.max_tick_time {
            self.metrics.max_tick_time = elapsed;
        }
        let alpha = 0.1;
        let prev = self.metrics.avg_tick_time.as_secs_f64();
        self.metrics.avg_tick_time =
            Duration::from_secs_f64(prev * (1.0 - alpha) + elapsed.as_secs_f64() * alpha);
    }

    /// Pauses the tick loop. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes after a pause, rescheduling from now so the time spent
    /// paused doesn't register as one giant overrun.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = TokioInstant::now() + self.config.period;
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }
}
