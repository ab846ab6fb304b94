//! Headless driver for Antix worlds: pacing, progress reporting and shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use antix_core::World;
use serde::Serialize;
use tracing::info;

/// Cooperative stop signal shared between the run loop and whoever ends it.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of a [`Runner::run`] session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RunReport {
    /// Ticks executed during this session.
    pub ticks: u64,
    pub elapsed: Duration,
    /// Successful pickups since the world was built.
    pub pickups: u64,
    /// Successful drops since the world was built.
    pub drops: u64,
    /// Free pucks lying inside a home when the run ended.
    pub delivered: usize,
    /// Pucks still carried when the run ended.
    pub held: usize,
}

impl RunReport {
    /// Mean simulation rate over the whole session.
    #[must_use]
    pub fn ticks_per_second(&self) -> f64 {
        rate(self.ticks, self.elapsed)
    }
}

fn rate(ticks: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { ticks as f64 / secs } else { 0.0 }
}

/// Steps a [`World`] until its tick bound is reached or the stop flag is raised.
#[derive(Debug)]
pub struct Runner {
    world: World,
    stop: StopFlag,
    pacing: Duration,
    report_interval: u64,
}

impl Runner {
    /// Pacing and reporting cadence come from the world's configuration.
    #[must_use]
    pub fn new(world: World) -> Self {
        let pacing = Duration::from_millis(world.config().sleep_ms);
        let report_interval = world.config().report_interval;
        Self {
            world,
            stop: StopFlag::new(),
            pacing,
            report_interval,
        }
    }

    #[must_use]
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Handle that ends [`Runner::run`] after the current tick.
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    pub fn run(&mut self) -> RunReport {
        let started = Instant::now();
        let first_tick = self.world.tick().0;
        let mut window = (started, first_tick);

        while !self.world.is_finished() && !self.stop.is_raised() {
            self.world.step();
            let tick = self.world.tick().0;
            if self.report_interval > 0 && tick % self.report_interval == 0 {
                let now = Instant::now();
                let summary = self.summarize(tick - first_tick, now - started);
                info!(
                    tick,
                    rate = rate(tick - window.1, now - window.0),
                    mean_rate = summary.ticks_per_second(),
                    held = summary.held,
                    delivered = summary.delivered,
                    "progress"
                );
                window = (now, tick);
            }
            if !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
        }

        let report = self.summarize(self.world.tick().0 - first_tick, started.elapsed());
        info!(
            ticks = report.ticks,
            elapsed_ms = report.elapsed.as_millis() as u64,
            mean_rate = report.ticks_per_second(),
            pickups = report.pickups,
            drops = report.drops,
            delivered = report.delivered,
            stopped = self.stop.is_raised(),
            "run finished"
        );
        report
    }

    fn summarize(&self, ticks: u64, elapsed: Duration) -> RunReport {
        let totals = self.world.totals();
        RunReport {
            ticks,
            elapsed,
            pickups: totals.pickups,
            drops: totals.drops,
            delivered: self.world.delivered_pucks(),
            held: self
                .world
                .robots()
                .filter(|(_, robot)| robot.holding())
                .count(),
        }
    }
}
