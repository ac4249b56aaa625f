//! # Simulation — Storage, Executor, and the Frame Driver
//!
//! The [`Simulation`] is the façade everything else talks to. It owns:
//!
//! ```text
//! Simulation
//! ├── storage:  Box<dyn EntityStorage>     entity → components
//! ├── executor: Box<dyn SystemExecutor>    usually a Scheduler
//! ├── ids:      EntityIdAllocator          1, 2, 3, … never reused
//! ├── clock:    FrameClock                 delta, tick, frame, render time
//! └── data:     FrameData                  string-keyed scratch space
//! ```
//!
//! ## Host Loop
//!
//! ```ignore
//! let mut sim = Simulation::new();
//! sim.scheduler_mut().unwrap().add_stage(Stage::new("main").with(Movement));
//! sim.setup()?;
//! loop {
//!     sim.update();
//!     sim.render();
//! }
//! ```
//!
//! ## Borrowing During a Pass
//!
//! Systems receive `&mut Simulation` (through the frame), yet the executor
//! that calls them is owned by that same simulation. The executor is
//! therefore moved out for the duration of a pass and put back afterwards.
//! While it is out, `executor()` returns `None` and a nested `setup()`,
//! `update()` or `render()` is refused.

use std::any::TypeId;
use std::time::{Duration, Instant};

use super::component::{Component, ComponentBox, ComponentSet, short_type_name};
use super::entity::{EntityId, EntityIdAllocator};
use super::error::SimulationError;
use super::frame::{FrameData, SimulationFrame};
use super::query::{Query, QueryIter, QueryShape};
use super::stage::Scheduler;
use super::storage::{EntityStorage, SimpleStorage};
use super::system::{SequentialExecutor, SystemExecutor};
use crate::time::FrameClock;

enum ExecutorSlot {
    Idle(Box<dyn SystemExecutor>),
    /// Moved out for a running pass.
    Busy,
    Missing,
}

/// The top-level ECS object: one storage engine plus one executor.
pub struct Simulation {
    storage: Box<dyn EntityStorage>,
    executor: ExecutorSlot,
    ids: EntityIdAllocator,
    clock: FrameClock,
    data: FrameData,
}

impl Simulation {
    /// [`SimpleStorage`] with an empty [`Scheduler`].
    pub fn new() -> Self {
        SimulationBuilder::new().build()
    }

    /// [`SimpleStorage`] with a flat [`SequentialExecutor`].
    pub fn simple() -> Self {
        SimulationBuilder::new()
            .executor(SequentialExecutor::new())
            .build()
    }

    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    // ── Entities ────────────────────────────────────────────────────────

    /// Create an entity with an initial component set (possibly `()`).
    pub fn add_entity(&mut self, components: impl ComponentSet) -> EntityId {
        let id = self.ids.allocate();
        let boxes = components.into_boxes();
        log::debug!("add entity {} with {} components", id, boxes.len());
        self.storage.add(id, boxes);
        id
    }

    /// Remove an entity and all of its components. Its id is never handed
    /// out again.
    pub fn delete_entity(&mut self, id: EntityId) {
        log::debug!("delete entity {}", id);
        self.storage.delete(id);
    }

    pub fn has_entity(&self, id: EntityId) -> bool {
        self.storage.has(id)
    }

    pub fn entity_count(&self) -> usize {
        self.storage.len()
    }

    /// Total ids handed out, including those of deleted entities.
    pub fn allocated_ids(&self) -> u32 {
        self.ids.allocated()
    }

    // ── Components ──────────────────────────────────────────────────────

    /// Attach one component. See
    /// [`EntityStorage::add_component`] for the value/shared rules.
    pub fn add_component<C: Component>(&mut self, id: EntityId, component: C) {
        self.storage.add_component(id, ComponentBox::new(component));
    }

    /// Attach each component of `components` in turn.
    pub fn add_components(&mut self, id: EntityId, components: impl ComponentSet) {
        for component in components.into_boxes() {
            self.storage.add_component(id, component);
        }
    }

    pub fn remove_component<C: Component>(&mut self, id: EntityId) {
        self.storage.remove_component(id, TypeId::of::<C>());
    }

    /// Copy of the component. For a [`Shared`](super::component::Shared)
    /// component this is another handle to the same instance.
    pub fn get_component<C: Component + Clone>(&self, id: EntityId) -> Option<C> {
        self.component::<C>(id).cloned()
    }

    /// Borrow the stored component in place.
    pub fn component<C: Component>(&self, id: EntityId) -> Option<&C> {
        self.storage
            .get_component(id, TypeId::of::<C>())?
            .downcast_ref()
    }

    pub fn component_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.storage
            .get_component_mut(id, TypeId::of::<C>())?
            .downcast_mut()
    }

    /// Copy of the component on the lowest-id entity carrying `C`.
    pub fn singleton<C: Component + Clone>(&self) -> Option<C> {
        self.singleton_ref::<C>().cloned()
    }

    pub fn singleton_ref<C: Component>(&self) -> Option<&C> {
        let (_, component) = self.storage.find_one(TypeId::of::<C>())?;
        component.downcast_ref()
    }

    /// Like [`singleton`](Self::singleton), falling back to `C::default()`.
    pub fn singleton_or_default<C: Component + Clone + Default>(&self) -> C {
        self.singleton::<C>().unwrap_or_default()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Compile `Q` and snapshot its matches.
    ///
    /// # Panics
    ///
    /// Panics if `Q` is not a valid shape (see [`Query::new`]).
    pub fn query<Q: QueryShape>(&self) -> QueryIter<Q> {
        Query::<Q>::new().execute(self.storage.as_ref())
    }

    /// Read one entity into `Q`, `None` if it is gone or does not match.
    pub fn read<Q: QueryShape>(&self, id: EntityId) -> Option<Q> {
        Query::<Q>::read(self.storage.as_ref(), id)
    }

    pub fn storage(&self) -> &dyn EntityStorage {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn EntityStorage {
        self.storage.as_mut()
    }

    // ── Executor ────────────────────────────────────────────────────────

    /// The installed executor, `None` while a pass is running or if none
    /// is installed.
    pub fn executor(&self) -> Option<&dyn SystemExecutor> {
        match &self.executor {
            ExecutorSlot::Idle(executor) => Some(executor.as_ref()),
            ExecutorSlot::Busy | ExecutorSlot::Missing => None,
        }
    }

    pub fn executor_mut(&mut self) -> Option<&mut dyn SystemExecutor> {
        match &mut self.executor {
            ExecutorSlot::Idle(executor) => Some(executor.as_mut()),
            ExecutorSlot::Busy | ExecutorSlot::Missing => None,
        }
    }

    /// The executor downcast to its concrete type.
    pub fn executor_as<E: SystemExecutor>(&self) -> Option<&E> {
        self.executor()?.as_any().downcast_ref()
    }

    pub fn executor_as_mut<E: SystemExecutor>(&mut self) -> Option<&mut E> {
        self.executor_mut()?.as_any_mut().downcast_mut()
    }

    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.executor_as()
    }

    pub fn scheduler_mut(&mut self) -> Option<&mut Scheduler> {
        self.executor_as_mut()
    }

    /// Install `executor`, returning the previous one if it was idle.
    pub fn set_executor(
        &mut self,
        executor: impl SystemExecutor,
    ) -> Option<Box<dyn SystemExecutor>> {
        let previous = std::mem::replace(&mut self.executor, ExecutorSlot::Idle(Box::new(executor)));
        match previous {
            ExecutorSlot::Idle(old) => Some(old),
            ExecutorSlot::Busy => {
                log::warn!("executor replaced while a pass is running");
                None
            }
            ExecutorSlot::Missing => None,
        }
    }

    fn take_executor(&mut self) -> Result<Box<dyn SystemExecutor>, SimulationError> {
        match std::mem::replace(&mut self.executor, ExecutorSlot::Busy) {
            ExecutorSlot::Idle(executor) => Ok(executor),
            ExecutorSlot::Busy => Err(SimulationError::ExecutorBusy),
            ExecutorSlot::Missing => {
                self.executor = ExecutorSlot::Missing;
                Err(SimulationError::MissingExecutor)
            }
        }
    }

    fn restore_executor(&mut self, executor: Box<dyn SystemExecutor>) {
        if matches!(self.executor, ExecutorSlot::Busy) {
            self.executor = ExecutorSlot::Idle(executor);
        } else {
            log::debug!("a system installed a new executor; dropping the one that just ran");
        }
    }

    // ── Passes ──────────────────────────────────────────────────────────

    /// Run every enrolled setup hook once. Stops at the first failure.
    pub fn setup(&mut self) -> Result<(), SimulationError> {
        let mut executor = self.take_executor()?;
        log::debug!("setup pass");
        let result = executor.setup(self);
        self.restore_executor(executor);
        if let Err(err) = &result {
            log::error!("{}", err);
        }
        result.map_err(SimulationError::from)
    }

    /// Run one update pass with the wall time since the previous `update()`
    /// as delta. The first update sees a zero delta.
    pub fn update(&mut self) {
        let Some(executor) = self.acquire_executor("update") else {
            return;
        };
        let delta = self.clock.measure_update();
        self.run_update(executor, delta);
    }

    /// Run one update pass with a caller-chosen delta (fixed-step hosts).
    pub fn update_with_delta(&mut self, delta: Duration) {
        let Some(executor) = self.acquire_executor("update") else {
            return;
        };
        self.clock.mark_update();
        self.run_update(executor, delta);
    }

    /// Take the executor for an update or render pass. A refused pass leaves
    /// the clock untouched.
    fn acquire_executor(&mut self, pass: &str) -> Option<Box<dyn SystemExecutor>> {
        match self.take_executor() {
            Ok(executor) => Some(executor),
            Err(err) => {
                log::warn!("{} skipped: {}", pass, err);
                None
            }
        }
    }

    fn run_update(&mut self, mut executor: Box<dyn SystemExecutor>, delta: Duration) {
        self.clock.begin_update(delta);
        log::trace!("update pass, tick {}", self.clock.tick());
        executor.update(&mut SimulationFrame::new(self));
        self.restore_executor(executor);
        self.clock.end_update();
    }

    /// Run one render pass and record how long it took.
    pub fn render(&mut self) {
        let Some(mut executor) = self.acquire_executor("render") else {
            return;
        };
        let start = Instant::now();
        executor.render(&mut SimulationFrame::new(self));
        let elapsed = start.elapsed();
        self.restore_executor(executor);
        self.clock.end_render(elapsed);
    }

    // ── Frame state ─────────────────────────────────────────────────────

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    pub fn frame_data(&self) -> &FrameData {
        &self.data
    }

    pub fn frame_data_mut(&mut self) -> &mut FrameData {
        &mut self.data
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let executor = match &self.executor {
            ExecutorSlot::Idle(executor) => executor.systems().len().to_string() + " systems",
            ExecutorSlot::Busy => "busy".to_string(),
            ExecutorSlot::Missing => "none".to_string(),
        };
        f.debug_struct("Simulation")
            .field("entities", &self.storage.len())
            .field("executor", &executor)
            .field("tick", &self.clock.tick())
            .field("frame", &self.clock.frame())
            .finish()
    }
}

// ── Builder ─────────────────────────────────────────────────────────────

/// Picks the storage engine and executor for a [`Simulation`].
///
/// ```ignore
/// let sim = Simulation::builder()
///     .storage(ArchetypeStorage::new())
///     .executor(Scheduler::new().with_stage(Stage::new("main")))
///     .build();
/// ```
pub struct SimulationBuilder {
    storage: Option<Box<dyn EntityStorage>>,
    executor: ExecutorSlot,
}

impl SimulationBuilder {
    /// Defaults: [`SimpleStorage`] and an empty [`Scheduler`].
    pub fn new() -> Self {
        Self {
            storage: None,
            executor: ExecutorSlot::Idle(Box::new(Scheduler::new())),
        }
    }

    pub fn storage(mut self, storage: impl EntityStorage + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    pub fn executor(mut self, executor: impl SystemExecutor) -> Self {
        self.executor = ExecutorSlot::Idle(Box::new(executor));
        self
    }

    /// Build without an executor. Passes are refused until
    /// [`Simulation::set_executor`] installs one.
    pub fn without_executor(mut self) -> Self {
        self.executor = ExecutorSlot::Missing;
        self
    }

    pub fn build(self) -> Simulation {
        let storage = self
            .storage
            .unwrap_or_else(|| Box::new(SimpleStorage::new()));
        log::debug!(
            "simulation built ({} storage)",
            short_type_name(storage.engine_name())
        );
        Simulation {
            storage,
            executor: self.executor,
            ids: EntityIdAllocator::new(),
            clock: FrameClock::new(),
            data: FrameData::new(),
        }
    }
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ecs::component::{NameComponent, Shared};
    use crate::ecs::query::{AllEntities, Without};
    use crate::ecs::stage::Stage;
    use crate::ecs::storage::ArchetypeStorage;
    use crate::ecs::system::{Registration, Setup, System};
    use crate::ecs::error::BoxError;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {}

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }
    impl Component for Velocity {}

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Gravity(f32);
    impl Component for Gravity {}

    #[derive(Debug, Clone)]
    struct Frozen;
    impl Component for Frozen {}

    fn both_engines() -> [Simulation; 2] {
        [
            Simulation::new(),
            Simulation::builder().storage(ArchetypeStorage::new()).build(),
        ]
    }

    #[test]
    fn ids_strictly_increase_and_are_not_reused() {
        let mut sim = Simulation::new();
        let a = sim.add_entity(());
        let b = sim.add_entity((NameComponent::new("b"),));
        sim.delete_entity(a);
        let c = sim.add_entity(());
        assert_eq!((a.raw(), b.raw(), c.raw()), (1, 2, 3));
        assert_eq!(sim.allocated_ids(), 3);
        assert_eq!(sim.entity_count(), 2);
    }

    #[test]
    fn component_round_trip() {
        for mut sim in both_engines() {
            let id = sim.add_entity(());
            let pos = Position { x: 1.0, y: 2.0 };
            sim.add_component(id, pos.clone());
            assert_eq!(sim.get_component::<Position>(id), Some(pos));

            sim.remove_component::<Position>(id);
            assert_eq!(sim.get_component::<Position>(id), None);
            assert!(sim.has_entity(id));
        }
    }

    #[test]
    fn delete_removes_every_component() {
        for mut sim in both_engines() {
            let id = sim.add_entity((
                Position { x: 0.0, y: 0.0 },
                Velocity { dx: 1.0, dy: 1.0 },
                NameComponent::new("gone"),
            ));
            sim.delete_entity(id);
            assert!(sim.get_component::<Position>(id).is_none());
            assert!(sim.get_component::<Velocity>(id).is_none());
            assert!(sim.get_component::<NameComponent>(id).is_none());
            assert!(sim.storage().get(id).is_empty());
            assert!(!sim.has_entity(id));
        }
    }

    #[test]
    fn value_add_keeps_original() {
        for mut sim in both_engines() {
            let id = sim.add_entity((Position { x: 1.0, y: 1.0 },));
            sim.add_component(id, Position { x: 9.0, y: 9.0 });
            assert_eq!(sim.get_component::<Position>(id), Some(Position { x: 1.0, y: 1.0 }));

            // By reference is the way to change a value component.
            if let Some(pos) = sim.component_mut::<Position>(id) {
                pos.x = 5.0;
            }
            assert_eq!(sim.component::<Position>(id).map(|p| p.x), Some(5.0));
        }
    }

    #[test]
    fn shared_add_replaces_and_aliases() {
        for mut sim in both_engines() {
            let first = Shared::new(Position { x: 0.0, y: 0.0 });
            let id = sim.add_entity((first.clone(),));

            first.borrow_mut().x = 3.0;
            let read = sim.get_component::<Shared<Position>>(id).expect("attached");
            assert_eq!(read.get().x, 3.0);

            let second = Shared::new(Position { x: 7.0, y: 0.0 });
            sim.add_component(id, second.clone());
            let read = sim.get_component::<Shared<Position>>(id).expect("attached");
            assert!(read.ptr_eq(&second));
        }
    }

    #[test]
    fn add_components_batch() {
        let mut sim = Simulation::new();
        let id = sim.add_entity(());
        sim.add_components(id, (Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
        assert!(sim.read::<(Position, Velocity)>(id).is_some());
    }

    #[test]
    fn singleton_lookup() {
        let mut sim = Simulation::new();
        assert_eq!(sim.singleton::<Gravity>(), None);
        assert_eq!(sim.singleton_or_default::<Gravity>(), Gravity(0.0));
        sim.add_entity((Gravity(-9.8),));
        assert_eq!(sim.singleton::<Gravity>(), Some(Gravity(-9.8)));
        assert_eq!(sim.singleton_ref::<Gravity>().map(|g| g.0), Some(-9.8));
    }

    #[test]
    fn optional_and_required_on_thousand_entities() {
        for mut sim in both_engines() {
            for n in 0..1000 {
                sim.add_entity((Position { x: n as f32, y: 0.0 },));
            }
            assert!(sim.query::<(Position, Velocity)>().is_empty());

            let list = sim.query::<(Position, Option<Velocity>)>().to_list(sim.storage());
            assert_eq!(list.len(), 1000);
            assert!(list.iter().all(|(_, vel)| vel.is_none()));
            assert_eq!(sim.query::<AllEntities>().len(), 1000);
        }
    }

    struct Mover;

    impl System for Mover {
        fn update(&mut self, frame: &mut SimulationFrame<'_>) {
            let dt = frame.delta_secs();
            let mut iter = frame.query::<(EntityId, Position, Velocity, Without<Frozen>)>();
            while iter.next(frame.storage()) {
                let Some((id, _, vel, _)) = iter.take_item() else {
                    continue;
                };
                if let Some(pos) = frame.component_mut::<Position>(id) {
                    pos.x += vel.dx * dt;
                    pos.y += vel.dy * dt;
                }
            }
        }
    }

    #[test]
    fn systems_mutate_through_the_frame() {
        let scheduler = Scheduler::new().with_stage(Stage::new("main").with(Mover));
        let mut sim = SimulationBuilder::new().executor(scheduler).build();
        let moving = sim.add_entity((Position { x: 0.0, y: 0.0 }, Velocity { dx: 2.0, dy: 0.0 }));
        let frozen = sim.add_entity((
            Position { x: 0.0, y: 0.0 },
            Velocity { dx: 2.0, dy: 0.0 },
            Frozen,
        ));

        sim.update_with_delta(Duration::from_millis(500));
        sim.update_with_delta(Duration::from_millis(500));

        assert_eq!(sim.component::<Position>(moving).map(|p| p.x), Some(2.0));
        assert_eq!(sim.component::<Position>(frozen).map(|p| p.x), Some(0.0));
        assert_eq!(sim.tick(), 2);
        assert_eq!(sim.clock().elapsed(), Duration::from_secs(1));
    }

    /// On every step deletes the next pending id and spawns a new entity.
    /// The snapshot neither grows nor faults.
    struct Reaper {
        visited: Rc<RefCell<Vec<Option<u32>>>>,
    }

    impl System for Reaper {
        fn update(&mut self, frame: &mut SimulationFrame<'_>) {
            let mut iter = frame.query::<(EntityId, Position)>();
            iter.sort();
            while iter.next(frame.storage()) {
                let visited = iter.item().map(|(_, pos)| pos.x as u32);
                self.visited.borrow_mut().push(visited);
                let pending = iter.len() - iter.remaining();
                if let Some(&next) = iter.ids().get(pending) {
                    frame.delete_entity(next);
                }
                frame.add_entity((Position { x: 100.0, y: 0.0 },));
            }
        }
    }

    #[test]
    fn iteration_snapshot_is_isolated_from_mutation() {
        let visited = Rc::new(RefCell::new(Vec::new()));
        let executor = SequentialExecutor::new().with(Reaper {
            visited: Rc::clone(&visited),
        });
        let mut sim = SimulationBuilder::new().executor(executor).build();
        for n in 1..=4 {
            sim.add_entity((Position { x: n as f32, y: 0.0 },));
        }
        sim.update();

        // 1 is live and deletes 2, 3 and 4 one step ahead of the cursor.
        assert_eq!(*visited.borrow(), vec![Some(1), None, None, None]);
        // Entity 1 plus the four spawned ones.
        assert_eq!(sim.entity_count(), 5);
    }

    #[test]
    fn render_records_duration_and_counts_frames() {
        let executor = SequentialExecutor::new().with(
            Registration::new(Sleeper).with_render(),
        );
        let mut sim = SimulationBuilder::new().executor(executor).build();
        sim.render();
        assert_eq!(sim.frame(), 1);
        assert!(sim.clock().last_render_time() >= Duration::from_millis(1));
    }

    struct Sleeper;

    impl System for Sleeper {
        fn update(&mut self, _frame: &mut SimulationFrame<'_>) {}
    }

    impl crate::ecs::system::Render for Sleeper {
        fn render(&mut self, frame: &mut SimulationFrame<'_>) {
            std::thread::sleep(Duration::from_millis(1));
            frame.set("last_frame", frame.frame());
        }
    }

    struct Nested;

    impl System for Nested {
        fn update(&mut self, frame: &mut SimulationFrame<'_>) {
            // The executor is out; this must be refused, not recurse.
            frame.update();
            frame.set("saw_executor", frame.executor().is_some());
        }
    }

    impl Setup for Nested {
        fn setup(&mut self, sim: &mut Simulation) -> Result<(), BoxError> {
            match sim.setup() {
                Err(SimulationError::ExecutorBusy) => Ok(()),
                other => Err(format!("nested setup returned {other:?}").into()),
            }
        }
    }

    #[test]
    fn reentrant_passes_are_refused() {
        let executor = SequentialExecutor::new().with(Registration::new(Nested).with_setup());
        let mut sim = SimulationBuilder::new().executor(executor).build();
        sim.setup().expect("nested setup is refused with ExecutorBusy");
        sim.update();
        assert_eq!(sim.tick(), 1);
        assert_eq!(sim.frame_data().get::<bool>("saw_executor"), Some(&false));
        assert!(sim.executor().is_some());
    }

    #[test]
    fn missing_executor() {
        let mut sim = SimulationBuilder::new().without_executor().build();
        assert!(matches!(sim.setup(), Err(SimulationError::MissingExecutor)));
        sim.update();
        sim.render();
        assert_eq!((sim.tick(), sim.frame()), (0, 0));

        assert!(sim.set_executor(SequentialExecutor::new()).is_none());
        sim.update();
        assert_eq!(sim.tick(), 1);
        assert!(sim.scheduler().is_none());
        assert!(sim.executor_as::<SequentialExecutor>().is_some());
    }

    #[test]
    fn simple_uses_sequential_executor() {
        let sim = Simulation::simple();
        assert!(sim.executor_as::<SequentialExecutor>().is_some());
        assert!(Simulation::new().scheduler().is_some());
    }

    #[test]
    fn refused_update_does_not_move_the_delta_clock() {
        let mut sim = SimulationBuilder::new().without_executor().build();
        sim.update();
        std::thread::sleep(Duration::from_millis(5));
        sim.set_executor(SequentialExecutor::new());
        sim.update();
        assert_eq!(sim.clock().delta(), Duration::ZERO);

        let executor = SequentialExecutor::new().with(|frame: &mut SimulationFrame<'_>| {
            if frame.tick() == 0 {
                std::thread::sleep(Duration::from_millis(20));
                frame.update();
            }
        });
        let mut sim = SimulationBuilder::new().executor(executor).build();
        sim.update();
        sim.update();
        assert!(sim.clock().delta() >= Duration::from_millis(20));
    }

    #[test]
    fn update_delta_is_measured() {
        let mut sim = Simulation::new();
        sim.update();
        assert_eq!(sim.clock().delta(), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        sim.update();
        assert!(sim.clock().delta() >= Duration::from_millis(2));
    }
}
