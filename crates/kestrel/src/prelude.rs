//! Convenience re-exports — `use kestrel::prelude::*` for the common items.

pub use crate::ecs::{
    AllEntities, ArchetypeStorage, BoxError, Component, ComponentSet, EntityId, EntityStorage,
    LabelComponent, NameComponent, Query, Registration, Render, Scheduler, SequentialExecutor,
    Setup, Shared, SimpleStorage, Simulation, SimulationError, SimulationFrame, Skip, Stage,
    System, SystemExecutor, Without,
};
pub use crate::time::FrameClock;

// Diagnostics (feature-gated)
#[cfg(feature = "diagnostics")]
pub use crate::diag::{ComponentRegistry, Inspect};
