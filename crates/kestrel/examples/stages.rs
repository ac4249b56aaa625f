//! Stages — a nested scheduler with switchable stages.
//!
//! Demonstrates stage ordering (children before a stage's own systems),
//! disabling a subtree at runtime, shared components mutated in place,
//! `Option`/`Without` query slots, the archetype storage engine, and the
//! inspector snapshot.
//!
//! Run with: `RUST_LOG=debug cargo run -p kestrel --example stages`

use glam::Vec3;
use kestrel::prelude::*;

// ── Components ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Transform {
    translation: Vec3,
}
impl Component for Transform {}

#[derive(Debug, Clone)]
struct Spin(f32);
impl Component for Spin {}

#[derive(Debug, Clone)]
struct Sleeping;
impl Component for Sleeping {}

// ── Systems ──────────────────────────────────────────────────────────────

/// Pushes every awake body along +x. Shared transforms are edited in place.
struct Drift;

impl System for Drift {
    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        let dt = frame.delta_secs();
        let query = Query::<(Shared<Transform>, Option<Spin>, Without<Sleeping>)>::new();
        for (transform, spin, _) in query.execute(frame.storage()).into_iter(frame.storage()) {
            let speed = spin.map_or(1.0, |s| s.0);
            transform.borrow_mut().translation.x += speed * dt;
        }
    }
}

/// Wakes everything up once enough time has passed.
struct Alarm {
    at_tick: u64,
}

impl System for Alarm {
    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        if frame.tick() != self.at_tick {
            return;
        }
        let sleepers: Vec<EntityId> = frame
            .query::<(EntityId, Sleeping)>()
            .to_list(frame.storage())
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        for id in sleepers {
            log::info!("tick {}: waking entity {}", frame.tick(), id);
            frame.remove_component::<Sleeping>(id);
        }
    }
}

/// Records which stage ran, to show ordering.
#[derive(Debug)]
struct Trace(&'static str);

impl System for Trace {
    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        match frame.data_mut::<Vec<&'static str>>("order") {
            Some(order) => order.push(self.0),
            None => frame.set("order", vec![self.0]),
        }
    }
}

fn main() {
    env_logger::init();

    let scheduler = Scheduler::new()
        .with_stage(
            Stage::new("simulate")
                .with_stage(Stage::new("wake").with(Alarm { at_tick: 3 }).with(Trace("wake")))
                .with_stage(Stage::new("motion").with(Drift).with(Trace("motion")))
                .with(Registration::new(Trace("simulate")).with_debug()),
        )
        .with_stage(Stage::new("present").with(Trace("present")));

    let mut sim = Simulation::builder()
        .storage(ArchetypeStorage::new())
        .executor(scheduler)
        .build();

    let probe = Shared::new(Transform { translation: Vec3::ZERO });
    sim.add_entity((probe.clone(), Spin(2.0), NameComponent::new("probe")));
    let sleeper = Shared::new(Transform { translation: Vec3::ZERO });
    sim.add_entity((sleeper.clone(), Sleeping, NameComponent::new("sleeper")));

    if let Err(err) = sim.setup() {
        log::error!("setup failed: {err}");
        return;
    }

    let step = std::time::Duration::from_millis(100);
    for tick in 0..6 {
        if tick == 4
            && let Some(motion) = sim.scheduler_mut().and_then(|s| s.find_mut("motion"))
        {
            motion.disable();
        }
        sim.frame_data_mut().remove("order");
        sim.update_with_delta(step);
        log::info!(
            "tick {tick}: order {:?}, probe x = {:.2}, sleeper x = {:.2}",
            sim.frame_data().get::<Vec<&'static str>>("order"),
            probe.borrow().translation.x,
            sleeper.borrow().translation.x,
        );
    }

    let mut registry = ComponentRegistry::with_builtins();
    registry.register::<Shared<Transform>>().register::<Spin>();
    match kestrel::diag::snapshot(&sim, &registry).to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("snapshot failed: {err}"),
    }
}
