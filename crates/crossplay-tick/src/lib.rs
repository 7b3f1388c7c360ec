//! Fixed-period tick scheduling for Crossplay.
//!
//! Live-map updates are pushed on fixed periods (player positions every
//! 100 ms, world metadata every 2 s). This crate provides:
//!
//! - [`TickScheduler`]: a period timer with overrun detection and budget
//!   monitoring, meant to sit inside a `tokio::select!` loop.
//! - [`PeriodicTask`]: a spawned loop that runs an async body on every
//!   tick until it is stopped.
//!
//! # Failure isolation
//!
//! A tick body that panics is logged and the loop carries on with the next
//! tick. A slow body delays the following tick; under [`TickPolicy::Skip`]
//! the missed ticks are dropped instead of bursting.
//!
//! ```ignore
//! let task = PeriodicTask::spawn("player-updates", TickConfig::every(period), move |_tick| {
//!     let hub = hub.clone();
//!     async move { hub.push_player_update().await }
//! });
//! // ...
//! task.stop().await;
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, error, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Skip the missed tick(s) and schedule the next one a full period
    /// from now.
    #[default]
    Skip,
    /// Ignore the overrun. The next tick fires at its originally scheduled
    /// time, so a late scheduler fires back-to-back until it catches up.
    Drop,
}

/// Full configuration for a tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks.
    pub period: Duration,
    /// Fire the first tick right away instead of one period after creation.
    pub fire_immediately: bool,
    /// Overrun handling policy.
    pub policy: TickPolicy,
    /// Fraction of the period (0.0–1.0) above which a tick body's run time
    /// is logged as a warning. Default: 0.80.
    pub budget_warn_threshold: f64,
    /// Fraction of the period (0.0–1.0) above which a tick body's run time
    /// is logged as critical. Default: 1.0.
    pub budget_critical_threshold: f64,
    /// Track per-tick timing in [`TickMetrics`].
    pub metrics_enabled: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            fire_immediately: true,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
        }
    }
}

impl TickConfig {
    /// Shortest period the scheduler accepts.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Longest period the scheduler accepts.
    pub const MAX_PERIOD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// A config ticking every `period`, first tick immediately.
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Wait one full period before the first tick.
    pub fn delayed(mut self) -> Self {
        self.fire_immediately = false;
        self
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`]. Rules:
    /// - `period` raised to at least [`Self::MIN_PERIOD`] and capped at
    ///   [`Self::MAX_PERIOD`].
    /// - Thresholds clamped to `0.0..=1.0`.
    /// - `budget_warn_threshold` forced ≤ `budget_critical_threshold`.
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_secs_f64() * 1000.0,
                "tick period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        if self.period > Self::MAX_PERIOD {
            warn!(period_s = self.period.as_secs(), "tick period above maximum, clamping");
            self.period = Self::MAX_PERIOD;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about one tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// The configured period.
    pub period: Duration,
    /// `true` if this tick fired more than 10% of a period late.
    pub overrun: bool,
    /// How many whole ticks were skipped because of the overrun.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for a tick scheduler.
///
/// Timing values refer to the tick body's run time as reported via
/// [`TickScheduler::record_tick_end`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Total overruns detected.
    pub total_overruns: u64,
    /// Total ticks skipped under [`TickPolicy::Skip`].
    pub total_skipped: u64,
    /// Exponential moving average of tick body time (α = 0.1).
    pub avg_tick_time: Duration,
    /// Longest tick body time observed.
    pub max_tick_time: Duration,
    /// Last tick's body time as a fraction of the period. >1.0 means overrun.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// When the next tick should fire (Tokio instant for `sleep_until`).
    next_tick: TokioInstant,
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let now = TokioInstant::now();
        let next_tick = if config.fire_immediately {
            now
        } else {
            now + config.period
        };

        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            fire_immediately = config.fire_immediately,
            policy = ?config.policy,
            "tick scheduler created"
        );

        Self {
            config,
            tick_count: 0,
            next_tick,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Create a scheduler ticking every `period` with default settings.
    pub fn every(period: Duration) -> Self {
        Self::new(TickConfig::every(period))
    }

    /// Wait until the next tick is due. Returns [`TickInfo`] for the tick.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = self.next_tick;
        let period = self.config.period;

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
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
                        "tick overrun, keeping original schedule"
                    );
                }
                next + period
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
            period,
            overrun,
            ticks_skipped,
        }
    }

    /// Record that the body for the current tick has finished.
    ///
    /// Enables budget warnings and timing metrics. A call without a
    /// preceding tick is ignored.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let budget = self.config.period;

        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        self.metrics.budget_utilization = utilization;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "CRITICAL: tick exceeded budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = budget.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.config.period
    }
}

// ---------------------------------------------------------------------------
// Periodic task
// ---------------------------------------------------------------------------

/// A spawned loop running an async body on every tick of a
/// [`TickScheduler`].
///
/// Stop it with [`PeriodicTask::stop`]. Dropping the handle aborts the loop
/// without waiting for it.
#[derive(Debug)]
pub struct PeriodicTask {
    name: String,
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawns the loop on the current Tokio runtime.
    ///
    /// Each tick awaits `body` to completion before the next tick is
    /// scheduled, so ticks of one task never overlap. A panic inside `body`
    /// is logged and does not end the loop.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<F, Fut>(name: impl Into<String>, config: TickConfig, mut body: F) -> Self
    where
        F: FnMut(TickInfo) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut scheduler = TickScheduler::new(config);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    info = scheduler.wait_for_tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        let tick = info.tick;
                        if AssertUnwindSafe(body(info)).catch_unwind().await.is_err() {
                            error!(task = %task_name, tick, "tick body panicked");
                        }
                        scheduler.record_tick_end();
                    }
                }
            }
            debug!(
                task = %task_name,
                ticks = scheduler.tick_count(),
                overruns = scheduler.metrics().total_overruns,
                "periodic task stopped"
            );
        });

        debug!(task = %name, "periodic task started");
        Self {
            name,
            stop_tx,
            handle: Some(handle),
        }
    }

    /// The name given at spawn time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` until the loop has been stopped or has exited.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the loop and waits until it has exited.
    ///
    /// A tick body that is suspended at an `.await` is cancelled there.
    /// Once this returns, no further tick body runs. Idempotent.
    pub async fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            match handle.await {
                Err(e) if e.is_panic() => {
                    error!(task = %self.name, "periodic task panicked during shutdown");
                }
                _ => {}
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
