//! Frame timing and pass counters.
//!
//! The [`FrameClock`] lives inside the [`Simulation`](crate::ecs::Simulation)
//! and is advanced by `update()` and `render()`. Systems read it through
//! [`SimulationFrame`](crate::ecs::SimulationFrame).

use std::time::{Duration, Instant};

/// Per-simulation timing state.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    /// When the previous update started. `None` before the first update.
    last_update: Option<Instant>,
    /// Delta handed to the current (or most recent) update.
    delta: Duration,
    /// Sum of all deltas so far.
    elapsed: Duration,
    /// Completed update passes.
    tick: u64,
    /// Completed render passes.
    frame: u64,
    /// Wall time of the most recent render pass.
    last_render_time: Duration,
}

impl FrameClock {
    pub(crate) fn new() -> Self {
        Self {
            last_update: None,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            tick: 0,
            frame: 0,
            last_render_time: Duration::ZERO,
        }
    }

    /// Time since the previous call, `Duration::ZERO` on the first one.
    pub(crate) fn measure_update(&mut self) -> Duration {
        let now = Instant::now();
        let delta = self.last_update.map_or(Duration::ZERO, |last| now - last);
        self.last_update = Some(now);
        delta
    }

    /// Forget the previous update mark so a host driving fixed steps does not
    /// see a huge delta if it switches back to `update()`.
    pub(crate) fn mark_update(&mut self) {
        self.last_update = Some(Instant::now());
    }

    pub(crate) fn begin_update(&mut self, delta: Duration) {
        self.delta = delta;
    }

    pub(crate) fn end_update(&mut self) {
        self.elapsed += self.delta;
        self.tick += 1;
    }

    pub(crate) fn end_render(&mut self, duration: Duration) {
        self.last_render_time = duration;
        self.frame += 1;
    }

    /// Delta of the current update pass.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta time in seconds (f32), the most common way to use it.
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Simulated time: the sum of every update's delta.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of completed update passes. Reads 0 during the first update.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of completed render passes.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Wall time the previous render pass took.
    pub fn last_render_time(&self) -> Duration {
        self.last_render_time
    }

    /// Updates per second estimated from the last delta.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
