//! Particles — a fountain of short-lived particles.
//!
//! Demonstrates value components mutated by reference, entity deletion while a
//! query snapshot is being walked, a singleton config component, and the
//! setup/update/render passes on a flat executor.
//!
//! Run with: `RUST_LOG=info cargo run -p kestrel --example particles`

use glam::Vec2;
use kestrel::prelude::*;

// ── Components ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Position(Vec2);
impl Component for Position {}

#[derive(Debug, Clone, Copy)]
struct Velocity(Vec2);
impl Component for Velocity {}

/// Seconds left before the particle is removed.
#[derive(Debug, Clone, Copy)]
struct Lifetime(f32);
impl Component for Lifetime {}

/// Singleton: world settings.
#[derive(Debug, Clone, Copy)]
struct Settings {
    gravity: Vec2,
    spawn_per_tick: u32,
}
impl Component for Settings {}

// ── Systems ──────────────────────────────────────────────────────────────

/// Spawns particles in a fan above the origin.
struct Emitter {
    spawned: u32,
}

impl Emitter {
    fn spawn(&mut self, sim: &mut Simulation, count: u32) {
        for _ in 0..count {
            let angle = 0.3 + (self.spawned % 16) as f32 * 0.16;
            let velocity = Vec2::new(angle.cos(), angle.sin()) * 6.0;
            sim.add_entity((
                Position(Vec2::ZERO),
                Velocity(velocity),
                Lifetime(1.5),
                NameComponent::new(format!("particle-{}", self.spawned)),
            ));
            self.spawned += 1;
        }
    }
}

impl System for Emitter {
    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        let per_tick = frame
            .singleton::<Settings>()
            .map_or(0, |settings| settings.spawn_per_tick);
        self.spawn(frame.sim, per_tick);
    }
}

impl Setup for Emitter {
    fn setup(&mut self, sim: &mut Simulation) -> Result<(), BoxError> {
        if sim.singleton::<Settings>().is_none() {
            return Err("no Settings entity".into());
        }
        self.spawn(sim, 8);
        Ok(())
    }
}

/// Applies gravity and moves every particle.
struct Integrate;

impl System for Integrate {
    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        let dt = frame.delta_secs();
        let gravity = frame
            .singleton::<Settings>()
            .map_or(Vec2::ZERO, |settings| settings.gravity);

        let mut iter = frame.query::<(EntityId, Velocity)>();
        while iter.next(frame.storage()) {
            let Some((id, Velocity(vel))) = iter.take_item() else {
                continue;
            };
            let vel = vel + gravity * dt;
            if let Some(v) = frame.component_mut::<Velocity>(id) {
                v.0 = vel;
            }
            if let Some(p) = frame.component_mut::<Position>(id) {
                p.0 += vel * dt;
            }
        }
    }
}

/// Removes particles whose lifetime ran out or that fell below the floor.
struct Reaper;

impl System for Reaper {
    fn update(&mut self, frame: &mut SimulationFrame<'_>) {
        let dt = frame.delta_secs();
        let mut removed = 0u32;
        let mut iter = frame.query::<(EntityId, Position, Lifetime)>();
        while iter.next(frame.storage()) {
            let Some((id, pos, life)) = iter.take_item() else {
                continue;
            };
            let left = life.0 - dt;
            if left <= 0.0 || pos.0.y < -2.0 {
                frame.delete_entity(id);
                removed += 1;
            } else if let Some(l) = frame.component_mut::<Lifetime>(id) {
                l.0 = left;
            }
        }
        frame.set("removed", removed);
    }
}

/// Logs a summary every 20 rendered frames.
struct Stats;

impl System for Stats {
    fn update(&mut self, _frame: &mut SimulationFrame<'_>) {}
}

impl Render for Stats {
    fn render(&mut self, frame: &mut SimulationFrame<'_>) {
        if !frame.frame().is_multiple_of(20) {
            return;
        }
        let alive = frame.query::<(Position,)>().len();
        let highest = frame
            .query::<(Position,)>()
            .to_list(frame.storage())
            .into_iter()
            .map(|(p,)| p.0.y)
            .fold(f32::MIN, f32::max);
        log::info!(
            "frame {:>3}: {} particles alive, highest at y = {:.2}, {} removed last tick, last render {:?}",
            frame.frame(),
            alive,
            highest,
            frame.data::<u32>("removed").copied().unwrap_or(0),
            frame.last_render_time(),
        );
    }
}

fn main() {
    env_logger::init();

    let executor = SequentialExecutor::new()
        .with(Registration::new(Emitter { spawned: 0 }).with_setup())
        .with(Integrate)
        .with(Reaper)
        .with(Registration::new(Stats).with_render());
    let mut sim = Simulation::builder().executor(executor).build();

    sim.add_entity((Settings {
        gravity: Vec2::new(0.0, -9.8),
        spawn_per_tick: 2,
    },));

    if let Err(err) = sim.setup() {
        log::error!("setup failed: {err}");
        return;
    }

    // Fixed 60 Hz step, two seconds.
    let step = std::time::Duration::from_secs_f32(1.0 / 60.0);
    for _ in 0..120 {
        sim.update_with_delta(step);
        sim.render();
    }

    log::info!(
        "done after {} ticks: {} entities alive, {} ids handed out",
        sim.tick(),
        sim.entity_count(),
        sim.allocated_ids()
    );
}
