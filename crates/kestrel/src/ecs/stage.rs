//! # Stage — The Scheduler's Execution Tree
//!
//! A [`Stage`] is a named, switchable group of systems that may own child
//! stages. The [`Scheduler`] owns the top-level stages and is the executor a
//! [`Simulation`] normally talks to.
//!
//! ## Execution Order
//!
//! Within a stage, enabled children run first (depth-first, in registration
//! order), then the stage's own systems (in registration order):
//!
//! ```text
//! Scheduler
//! ├── "simulate"                  ⑤ own systems run after both children
//! │   ├── "physics"   [Gravity]   ① ②
//! │   └── "collide"   [Bounce]    ③
//! │   [Gameplay, Score]           ④ ⑤
//! └── "present"       [Hud]       ⑥
//! ```
//!
//! The same walk is used for setup, update, and render. A disabled stage is
//! skipped together with its whole subtree in every pass.
//!
//! ## Timing
//!
//! Each stage times its own update and render calls. The measurement wraps the
//! children, so a parent's time includes its sub-stages.

use std::any::Any;
use std::time::{Duration, Instant};

use super::error::SetupError;
use super::frame::SimulationFrame;
use super::simulation::Simulation;
use super::system::{IntoRegistration, SystemEntry, SystemExecutor};

/// Wall-clock measurements for one pass of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimer {
    last: Duration,
    total: Duration,
    runs: u64,
}

impl StageTimer {
    fn record(&mut self, elapsed: Duration) {
        self.last = elapsed;
        self.total += elapsed;
        self.runs += 1;
    }

    /// Duration of the most recent run.
    pub fn last(&self) -> Duration {
        self.last
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn average(&self) -> Duration {
        match u32::try_from(self.runs) {
            Ok(0) => Duration::ZERO,
            Ok(runs) => self.total / runs,
            Err(_) => self.total.div_f64(self.runs as f64),
        }
    }
}

/// A named node in the scheduler tree.
pub struct Stage {
    label: String,
    enabled: bool,
    sub_stages: Vec<Stage>,
    systems: Vec<SystemEntry>,
    update_timer: StageTimer,
    render_timer: StageTimer,
}

impl Stage {
    /// A new, enabled, empty stage.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            sub_stages: Vec::new(),
            systems: Vec::new(),
            update_timer: StageTimer::default(),
            render_timer: StageTimer::default(),
        }
    }

    /// Register a system at this level. Accepts a bare system or a
    /// [`Registration`](super::system::Registration).
    pub fn add(&mut self, system: impl IntoRegistration) -> &mut Self {
        self.systems.push(SystemEntry::new(system));
        self
    }

    /// Append a child stage. Children run before this stage's own systems.
    pub fn add_stage(&mut self, stage: Stage) -> &mut Self {
        self.sub_stages.push(stage);
        self
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, system: impl IntoRegistration) -> Self {
        self.add(system);
        self
    }

    /// Builder-style [`add_stage`](Self::add_stage).
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.add_stage(stage);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Takes effect from the next pass. A pass already running keeps going.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!(
                "stage `{}` {}",
                self.label,
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.enabled = enabled;
    }

    pub fn enable(&mut self) {
        self.set_enabled(true);
    }

    pub fn disable(&mut self) {
        self.set_enabled(false);
    }

    pub fn sub_stages(&self) -> &[Stage] {
        &self.sub_stages
    }

    pub fn sub_stages_mut(&mut self) -> &mut [Stage] {
        &mut self.sub_stages
    }

    /// Systems registered directly on this stage, in execution order.
    pub fn systems(&self) -> &[SystemEntry] {
        &self.systems
    }

    pub fn update_timer(&self) -> &StageTimer {
        &self.update_timer
    }

    pub fn render_timer(&self) -> &StageTimer {
        &self.render_timer
    }

    /// Depth-first search for `label`, starting with this stage.
    pub fn find(&self, label: &str) -> Option<&Stage> {
        if self.label == label {
            return Some(self);
        }
        self.sub_stages.iter().find_map(|stage| stage.find(label))
    }

    pub fn find_mut(&mut self, label: &str) -> Option<&mut Stage> {
        if self.label == label {
            return Some(self);
        }
        self.sub_stages
            .iter_mut()
            .find_map(|stage| stage.find_mut(label))
    }

    /// Every system in this subtree, in execution order.
    pub fn all_systems(&self) -> Vec<&SystemEntry> {
        let mut out = Vec::new();
        self.collect_systems(&mut out);
        out
    }

    fn collect_systems<'a>(&'a self, out: &mut Vec<&'a SystemEntry>) {
        for stage in &self.sub_stages {
            stage.collect_systems(out);
        }
        out.extend(self.systems.iter());
    }

    // ── Passes ──────────────────────────────────────────────────────────

    pub(crate) fn setup(&mut self, sim: &mut Simulation) -> Result<(), SetupError> {
        if !self.enabled {
            return Ok(());
        }
        log::debug!("setup stage `{}`", self.label);
        for stage in &mut self.sub_stages {
            stage.setup(sim)?;
        }
        for entry in &mut self.systems {
            entry.run_setup(&self.label, sim)?;
        }
        Ok(())
    }

    pub(crate) fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        if !self.enabled {
            return;
        }
        let start = Instant::now();
        for stage in &mut self.sub_stages {
            stage.update(frame);
        }
        for entry in &mut self.systems {
            entry.run_update(frame);
        }
        self.update_timer.record(start.elapsed());
    }

    pub(crate) fn render(&mut self, frame: &mut SimulationFrame<'_>) {
        if !self.enabled {
            return;
        }
        let start = Instant::now();
        for stage in &mut self.sub_stages {
            stage.render(frame);
        }
        for entry in &mut self.systems {
            entry.run_render(frame);
        }
        self.render_timer.record(start.elapsed());
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("label", &self.label)
            .field("enabled", &self.enabled)
            .field("sub_stages", &self.sub_stages)
            .field("systems", &self.systems)
            .finish()
    }
}

// ── Scheduler ───────────────────────────────────────────────────────────

/// Ordered list of top-level stages. The default executor of a
/// [`Simulation`].
#[derive(Debug, Default)]
pub struct Scheduler {
    stages: Vec<Stage>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, stage: Stage) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.add_stage(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    /// Top-level stage with this label.
    pub fn by_name(&self, label: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.label == label)
    }

    pub fn by_name_mut(&mut self, label: &str) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|stage| stage.label == label)
    }

    /// First stage with this label anywhere in the tree, depth-first.
    pub fn find(&self, label: &str) -> Option<&Stage> {
        self.stages.iter().find_map(|stage| stage.find(label))
    }

    pub fn find_mut(&mut self, label: &str) -> Option<&mut Stage> {
        self.stages.iter_mut().find_map(|stage| stage.find_mut(label))
    }
}

impl SystemExecutor for Scheduler {
    fn setup(&mut self, sim: &mut Simulation) -> Result<(), SetupError> {
        for stage in &mut self.stages {
            stage.setup(sim)?;
        }
        Ok(())
    }

    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        for stage in &mut self.stages {
            stage.update(frame);
        }
    }

    fn render(&mut self, frame: &mut SimulationFrame<'_>) {
        for stage in &mut self.stages {
            stage.render(frame);
        }
    }

    fn systems(&self) -> Vec<&SystemEntry> {
        self.stages.iter().flat_map(Stage::all_systems).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
