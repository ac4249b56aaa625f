//! # System — Logic That Runs Every Pass
//!
//! A system is any value with an `update(&mut self, frame)` method. Two
//! optional capabilities enrol it in the other passes:
//!
//! ```text
//! trait      pass      when
//! ─────────  ────────  ──────────────────────────────────────────
//! Setup      setup     once, before the first update; may fail
//! System     update    once per Simulation::update()
//! Render     render    once per Simulation::render()
//! ```
//!
//! ## Explicit Capabilities
//!
//! Rust has no runtime "does this value implement `Render`?" check, so the
//! caller states capabilities when registering:
//!
//! ```ignore
//! stage.add(Gravity);                                   // update only
//! stage.add(Registration::new(Loader).with_setup());    // setup + update
//! stage.add(Registration::new(Hud).with_render());      // update + render
//! ```
//!
//! `with_setup` only compiles when the system implements [`Setup`], and
//! `with_render` only when it implements [`Render`]. Enrolment is fixed at
//! registration time.
//!
//! Any `FnMut(&mut SimulationFrame)` closure is an update-only system.
//!
//! ## Executors
//!
//! A [`SystemExecutor`] is whatever drives the three passes for a
//! [`Simulation`]. Two ship with the crate: the stage tree
//! [`Scheduler`](super::stage::Scheduler) and the flat [`SequentialExecutor`].

use std::any::{Any, type_name};
use std::fmt;
#[cfg(feature = "diagnostics")]
use std::time::{Duration, Instant};

use super::component::short_type_name;
use super::error::{BoxError, SetupError};
use super::frame::SimulationFrame;
use super::simulation::Simulation;

/// Stage label used in [`SetupError`]s raised outside any stage.
pub const ROOT_STAGE: &str = "<root>";

// ── Capability traits ───────────────────────────────────────────────────

/// A system that runs in the update pass.
///
/// ```ignore
/// struct Gravity;
///
/// impl System for Gravity {
///     fn update(&mut self, frame: &mut SimulationFrame<'_>) {
///         let dt = frame.delta_secs();
///         for (vel,) in frame.query::<(Shared<Velocity>,)>().into_iter(frame.storage()) {
///             vel.borrow_mut().y -= 9.8 * dt;
///         }
///     }
/// }
/// ```
pub trait System: 'static {
    fn update(&mut self, frame: &mut SimulationFrame<'_>);
}

/// Any `FnMut(&mut SimulationFrame)` is an update-only system.
impl<F: FnMut(&mut SimulationFrame<'_>) + 'static> System for F {
    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        (self)(frame);
    }
}

/// One-time initialisation before the first update.
pub trait Setup: System {
    fn setup(&mut self, sim: &mut Simulation) -> Result<(), BoxError>;
}

/// A system that also runs in the render pass.
pub trait Render: System {
    fn render(&mut self, frame: &mut SimulationFrame<'_>);
}

// ── Registration ────────────────────────────────────────────────────────

type SetupFn<S> = fn(&mut S, &mut Simulation) -> Result<(), BoxError>;
type RenderFn<S> = fn(&mut S, &mut SimulationFrame<'_>);
type DescribeFn<S> = fn(&S) -> String;

/// A system plus the passes and inspector hooks it is enrolled in.
pub struct Registration<S> {
    system: S,
    setup: Option<SetupFn<S>>,
    render: Option<RenderFn<S>>,
    debug: Option<DescribeFn<S>>,
    inspect: Option<DescribeFn<S>>,
}

impl<S: System> Registration<S> {
    pub fn new(system: S) -> Self {
        Self {
            system,
            setup: None,
            render: None,
            debug: None,
            inspect: None,
        }
    }

    /// Enrol in the setup pass.
    pub fn with_setup(mut self) -> Self
    where
        S: Setup,
    {
        self.setup = Some(<S as Setup>::setup);
        self
    }

    /// Enrol in the render pass.
    pub fn with_render(mut self) -> Self
    where
        S: Render,
    {
        self.render = Some(<S as Render>::render);
        self
    }

    /// Let the inspector render the system's fields with `Debug`.
    pub fn with_debug(mut self) -> Self
    where
        S: fmt::Debug,
    {
        self.debug = Some(|system: &S| format!("{system:?}"));
        self
    }

    /// Let the inspector append the system's own [`Inspect`](crate::diag::Inspect)
    /// output after the default rendering.
    #[cfg(feature = "diagnostics")]
    pub fn with_inspect(mut self) -> Self
    where
        S: crate::diag::Inspect,
    {
        self.inspect = Some(<S as crate::diag::Inspect>::inspect);
        self
    }
}

/// Anything a stage or executor accepts: a bare [`System`] (update only) or
/// a [`Registration`].
pub trait IntoRegistration {
    type System: System;

    fn into_registration(self) -> Registration<Self::System>;
}

impl<S: System> IntoRegistration for S {
    type System = S;

    fn into_registration(self) -> Registration<S> {
        Registration::new(self)
    }
}

impl<S: System> IntoRegistration for Registration<S> {
    type System = S;

    fn into_registration(self) -> Registration<S> {
        self
    }
}

// ── SystemEntry ─────────────────────────────────────────────────────────

/// Object-safe view of a `Registration<S>`.
trait ErasedSystem {
    fn has_setup(&self) -> bool;
    fn has_render(&self) -> bool;
    fn setup(&mut self, sim: &mut Simulation) -> Result<(), BoxError>;
    fn update(&mut self, frame: &mut SimulationFrame<'_>);
    fn render(&mut self, frame: &mut SimulationFrame<'_>);
    fn debug(&self) -> Option<String>;
    fn inspect(&self) -> Option<String>;
}

impl<S: System> ErasedSystem for Registration<S> {
    fn has_setup(&self) -> bool {
        self.setup.is_some()
    }

    fn has_render(&self) -> bool {
        self.render.is_some()
    }

    fn setup(&mut self, sim: &mut Simulation) -> Result<(), BoxError> {
        match self.setup {
            Some(setup) => setup(&mut self.system, sim),
            None => Ok(()),
        }
    }

    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        self.system.update(frame);
    }

    fn render(&mut self, frame: &mut SimulationFrame<'_>) {
        if let Some(render) = self.render {
            render(&mut self.system, frame);
        }
    }

    fn debug(&self) -> Option<String> {
        self.debug.map(|describe| describe(&self.system))
    }

    fn inspect(&self) -> Option<String> {
        self.inspect.map(|describe| describe(&self.system))
    }
}

/// A registered system, type-erased, with its short name.
pub struct SystemEntry {
    name: String,
    system: Box<dyn ErasedSystem>,
    #[cfg(feature = "diagnostics")]
    last_update: Duration,
    #[cfg(feature = "diagnostics")]
    last_render: Duration,
}

impl SystemEntry {
    pub(crate) fn new(system: impl IntoRegistration) -> Self {
        Self::from_registration(system.into_registration())
    }

    fn from_registration<S: System>(registration: Registration<S>) -> Self {
        Self {
            name: short_type_name(type_name::<S>()),
            system: Box::new(registration),
            #[cfg(feature = "diagnostics")]
            last_update: Duration::ZERO,
            #[cfg(feature = "diagnostics")]
            last_render: Duration::ZERO,
        }
    }

    /// Type name without module paths, `<closure>` for closures.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_setup(&self) -> bool {
        self.system.has_setup()
    }

    pub fn has_render(&self) -> bool {
        self.system.has_render()
    }

    /// `Debug` rendering, if registered `with_debug`.
    pub fn debug(&self) -> Option<String> {
        self.system.debug()
    }

    /// The system's own inspector output, if registered `with_inspect`.
    pub fn inspect(&self) -> Option<String> {
        self.system.inspect()
    }

    /// Wall time of this system's most recent update.
    #[cfg(feature = "diagnostics")]
    pub fn last_update(&self) -> Duration {
        self.last_update
    }

    /// Wall time of this system's most recent render.
    #[cfg(feature = "diagnostics")]
    pub fn last_render(&self) -> Duration {
        self.last_render
    }

    /// Run setup if enrolled, tagging a failure with `stage` and this
    /// system's name.
    pub(crate) fn run_setup(&mut self, stage: &str, sim: &mut Simulation) -> Result<(), SetupError> {
        if !self.system.has_setup() {
            return Ok(());
        }
        log::trace!("setup `{}` in `{}`", self.name, stage);
        self.system.setup(sim).map_err(|source| SetupError {
            stage: stage.to_string(),
            system: self.name.clone(),
            source,
        })
    }

    pub(crate) fn run_update(&mut self, frame: &mut SimulationFrame<'_>) {
        #[cfg(feature = "diagnostics")]
        {
            let start = Instant::now();
            self.system.update(frame);
            self.last_update = start.elapsed();
        }
        #[cfg(not(feature = "diagnostics"))]
        self.system.update(frame);
    }

    pub(crate) fn run_render(&mut self, frame: &mut SimulationFrame<'_>) {
        if !self.system.has_render() {
            return;
        }
        #[cfg(feature = "diagnostics")]
        {
            let start = Instant::now();
            self.system.render(frame);
            self.last_render = start.elapsed();
        }
        #[cfg(not(feature = "diagnostics"))]
        self.system.render(frame);
    }
}

impl fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemEntry")
            .field("name", &self.name)
            .field("setup", &self.has_setup())
            .field("render", &self.has_render())
            .finish()
    }
}

// ── Executors ───────────────────────────────────────────────────────────

/// Drives the setup, update, and render passes for a
/// [`Simulation`].
///
/// The simulation moves its executor out while a pass runs, so an
/// implementation never sees itself through `sim`.
pub trait SystemExecutor: Any {
    /// Run every enrolled setup hook, stopping at the first failure.
    fn setup(&mut self, sim: &mut Simulation) -> Result<(), SetupError>;

    fn update(&mut self, frame: &mut SimulationFrame<'_>);

    fn render(&mut self, frame: &mut SimulationFrame<'_>);

    /// Every registered system, in execution order.
    fn systems(&self) -> Vec<&SystemEntry>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Flat executor: runs systems in registration order, no stages.
#[derive(Default)]
pub struct SequentialExecutor {
    systems: Vec<SystemEntry>,
}

impl SequentialExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, system: impl IntoRegistration) -> &mut Self {
        self.systems.push(SystemEntry::new(system));
        self
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, system: impl IntoRegistration) -> Self {
        self.add(system);
        self
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl SystemExecutor for SequentialExecutor {
    fn setup(&mut self, sim: &mut Simulation) -> Result<(), SetupError> {
        for entry in &mut self.systems {
            entry.run_setup(ROOT_STAGE, sim)?;
        }
        Ok(())
    }

    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        for entry in &mut self.systems {
            entry.run_update(frame);
        }
    }

    fn render(&mut self, frame: &mut SimulationFrame<'_>) {
        for entry in &mut self.systems {
            entry.run_render(frame);
        }
    }

    fn systems(&self) -> Vec<&SystemEntry> {
        self.systems.iter().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ecs::error::SimulationError;
    use crate::ecs::simulation::SimulationBuilder;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Debug)]
    struct Recorder {
        tag: &'static str,
        log: Log,
        fail_setup: bool,
    }

    impl Recorder {
        fn new(tag: &'static str, log: &Log) -> Self {
            Self {
                tag,
                log: Rc::clone(log),
                fail_setup: false,
            }
        }

        fn failing(tag: &'static str, log: &Log) -> Self {
            Self {
                fail_setup: true,
                ..Self::new(tag, log)
            }
        }
    }

    impl System for Recorder {
        fn update(&mut self, _frame: &mut SimulationFrame<'_>) {
            self.log.borrow_mut().push(format!("update:{}", self.tag));
        }
    }

    impl Setup for Recorder {
        fn setup(&mut self, _sim: &mut Simulation) -> Result<(), BoxError> {
            self.log.borrow_mut().push(format!("setup:{}", self.tag));
            if self.fail_setup {
                return Err(format!("{} refused", self.tag).into());
            }
            Ok(())
        }
    }

    impl Render for Recorder {
        fn render(&mut self, _frame: &mut SimulationFrame<'_>) {
            self.log.borrow_mut().push(format!("render:{}", self.tag));
        }
    }

    fn drain(log: &Log) -> Vec<String> {
        log.borrow_mut().drain(..).collect()
    }

    #[test]
    fn sequential_runs_in_registration_order() {
        let log = Log::default();
        let executor = SequentialExecutor::new()
            .with(Recorder::new("a", &log))
            .with(Registration::new(Recorder::new("b", &log)).with_render())
            .with(Recorder::new("c", &log));
        let mut sim = SimulationBuilder::new().executor(executor).build();

        sim.update();
        assert_eq!(drain(&log), ["update:a", "update:b", "update:c"]);

        sim.render();
        assert_eq!(drain(&log), ["render:b"]);
    }

    #[test]
    fn setup_only_runs_enrolled_systems_and_fails_fast() {
        let log = Log::default();
        let executor = SequentialExecutor::new()
            .with(Recorder::new("plain", &log))
            .with(Registration::new(Recorder::new("ok", &log)).with_setup())
            .with(Registration::new(Recorder::failing("bad", &log)).with_setup())
            .with(Registration::new(Recorder::new("never", &log)).with_setup());
        let mut sim = SimulationBuilder::new().executor(executor).build();

        let err = sim.setup().expect_err("bad system fails");
        assert_eq!(drain(&log), ["setup:ok", "setup:bad"]);
        match err {
            SimulationError::Setup(setup) => {
                assert_eq!(setup.stage, ROOT_STAGE);
                assert_eq!(setup.system, "Recorder");
                assert_eq!(setup.source.to_string(), "bad refused");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn closures_are_update_systems() {
        let log = Log::default();
        let sink = Rc::clone(&log);
        let executor = SequentialExecutor::new().with(move |frame: &mut SimulationFrame<'_>| {
            sink.borrow_mut().push(format!("tick {}", frame.tick()));
        });
        let mut sim = SimulationBuilder::new().executor(executor).build();
        sim.update();
        sim.update();
        assert_eq!(drain(&log), ["tick 0", "tick 1"]);

        let names: Vec<_> = sim
            .executor()
            .map(|e| e.systems().iter().map(|s| s.name().to_string()).collect())
            .unwrap_or_default();
        assert_eq!(names, ["<closure>"]);
    }

    #[test]
    fn entry_reports_capabilities_and_hooks() {
        let log = Log::default();
        let entry = SystemEntry::new(
            Registration::new(Recorder::new("x", &log))
                .with_setup()
                .with_debug(),
        );
        assert_eq!(entry.name(), "Recorder");
        assert!(entry.has_setup());
        assert!(!entry.has_render());
        assert!(entry.debug().is_some_and(|d| d.contains("tag: \"x\"")));
        assert!(entry.inspect().is_none());
    }
}
