//! The per-pass context handed to systems.
//!
//! [`SimulationFrame`] is a thin view over the running [`Simulation`]: it
//! derefs to it, so systems query and mutate entities directly through the
//! frame, and adds the timing counters plus the [`FrameData`] bag.
//!
//! ```text
//! sim.update()
//!   └─ executor.update(&mut SimulationFrame { sim })
//!        ├─ system A: frame.set("contacts", vec![..])
//!        └─ system B: frame.data::<Vec<Contact>>("contacts")
//! ```
//!
//! Frame data is never cleared automatically. Whoever writes a key owns its
//! lifetime.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use super::simulation::Simulation;

/// String-keyed, type-erased values shared between systems.
#[derive(Default)]
pub struct FrameData {
    entries: HashMap<String, Box<dyn Any>>,
}

impl FrameData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing whatever was there.
    pub fn set<T: 'static>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// `None` if the key is missing or holds another type.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)?.downcast_mut()
    }

    /// Remove `key`, returning its value if it had type `T`.
    pub fn take<T: 'static>(&mut self, key: &str) -> Option<T> {
        let boxed = self.entries.remove(key)?;
        boxed.downcast().ok().map(|value| *value)
    }

    /// Remove `key` whatever its type. Returns `true` if it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FrameData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("FrameData").field("keys", &keys).finish()
    }
}

/// What a system sees during update and render.
pub struct SimulationFrame<'a> {
    pub sim: &'a mut Simulation,
}

impl<'a> SimulationFrame<'a> {
    pub fn new(sim: &'a mut Simulation) -> Self {
        Self { sim }
    }

    pub fn delta(&self) -> Duration {
        self.sim.clock().delta()
    }

    pub fn delta_secs(&self) -> f32 {
        self.sim.clock().delta_secs()
    }

    /// Completed update passes before this one.
    pub fn tick(&self) -> u64 {
        self.sim.clock().tick()
    }

    /// Completed render passes before this one.
    pub fn frame(&self) -> u64 {
        self.sim.clock().frame()
    }

    pub fn last_render_time(&self) -> Duration {
        self.sim.clock().last_render_time()
    }

    pub fn data<T: 'static>(&self, key: &str) -> Option<&T> {
        self.sim.frame_data().get(key)
    }

    pub fn data_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.sim.frame_data_mut().get_mut(key)
    }

    pub fn set<T: 'static>(&mut self, key: impl Into<String>, value: T) {
        self.sim.frame_data_mut().set(key, value);
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.sim.frame_data_mut().remove(key)
    }

    /// Drop every frame-data entry.
    pub fn clear(&mut self) {
        self.sim.frame_data_mut().clear();
    }
}

impl Deref for SimulationFrame<'_> {
    type Target = Simulation;

    fn deref(&self) -> &Simulation {
        self.sim
    }
}

impl DerefMut for SimulationFrame<'_> {
    fn deref_mut(&mut self) -> &mut Simulation {
        self.sim
    }
}
