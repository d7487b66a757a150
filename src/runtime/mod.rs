//! Async runtime (non-deterministic).
//!
//! Drives a `GameMachine` with tokio timers: the movement loop, the render
//! loop and the one-shot ad countdown. All simulation still happens inside
//! the synchronous machine; this layer only decides *when*.

pub mod scheduler;
pub mod driver;

pub use scheduler::{Scheduler, SchedulerConfig};
pub use driver::GameDriver;

use crate::game::state::RenderSnapshot;

/// Drawing target owned by the host (canvas, terminal, test recorder).
pub trait RenderSurface: Send + Sync + 'static {
    /// Draw one frame. Must not block.
    fn draw(&self, snapshot: &RenderSnapshot);
}
