//! Loop ownership and timers.
//!
//! Every spawned loop lives in a `LoopHandle`, and every handle lives in one
//! `Scheduler`. Stopping, replacing or dropping a handle aborts its task.

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Deserialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};

use super::RenderSurface;
use crate::game::state::{GamePhase, RenderSnapshot};

/// Shortest movement period a ticker accepts.
const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Timer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Render loop rate
    pub render_fps: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { render_fps: 60 }
    }
}

impl SchedulerConfig {
    /// Time between frames. Never zero.
    pub fn render_period(&self) -> Duration {
        Duration::from_micros((1_000_000 / self.render_fps.max(1) as u64).max(1))
    }
}

/// A spawned task that is aborted when replaced, stopped or dropped.
#[derive(Debug, Default)]
pub struct LoopHandle(Option<JoinHandle<()>>);

impl LoopHandle {
    /// Install a task, aborting the previous one.
    pub fn replace(&mut self, handle: JoinHandle<()>) {
        self.abort();
        self.0 = Some(handle);
    }

    /// Abort the task, if any.
    pub fn abort(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }

    /// Check if a task is installed and still running.
    pub fn is_active(&self) -> bool {
        self.0.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Owner of the movement loop, render loop and ad countdown.
#[derive(Debug, Default)]
pub struct Scheduler {
    movement: LoopHandle,
    render: LoopHandle,
    countdown: LoopHandle,
}

impl Scheduler {
    /// Create an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install both play loops.
    pub fn run_loops(&mut self, movement: JoinHandle<()>, render: JoinHandle<()>) {
        self.movement.replace(movement);
        self.render.replace(render);
    }

    /// Install the ad countdown.
    pub fn run_countdown(&mut self, countdown: JoinHandle<()>) {
        self.countdown.replace(countdown);
    }

    /// Stop the movement and render loops.
    pub fn stop_loops(&mut self) {
        self.movement.abort();
        self.render.abort();
    }

    /// Stop everything, the countdown included.
    pub fn stop_all(&mut self) {
        self.stop_loops();
        self.countdown.abort();
    }

    /// Check if the play loops are running.
    pub fn loops_active(&self) -> bool {
        self.movement.is_active() || self.render.is_active()
    }

    /// Check if the ad countdown is running.
    pub fn countdown_active(&self) -> bool {
        self.countdown.is_active()
    }
}

/// Movement timer whose first tick is one full period away.
///
/// Missed ticks are skipped, so a stalled or resumed loop never catches up.
/// Periods are clamped to at least one millisecond.
pub fn movement_ticker(period: Duration) -> Interval {
    let period = period.max(MIN_TICK_PERIOD);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Draw the latest snapshot every frame until one outside `playing` is drawn.
pub async fn render_loop(
    mut snapshots: watch::Receiver<RenderSnapshot>,
    surface: Arc<dyn RenderSurface>,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let snapshot = snapshots.borrow_and_update().clone();
        surface.draw(&snapshot);
        if snapshot.phase != GamePhase::Playing {
            break;
        }
    }
}
